use crate::{
    file::parser::Parser,
    metadata::{
        tables::{RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The `Module` table holds the single row describing the current module. `TableId` = 0x00
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// Offset of the row inside its table
    pub offset: usize,
    /// Reserved, zero
    pub generation: u16,
    /// an index into the String heap
    pub name: u32,
    /// an index into the GUID heap; the module version id
    pub mvid: u32,
    /// an index into the GUID heap, reserved
    pub encid: u32,
    /// an index into the GUID heap, reserved
    pub encbaseid: u32,
}

impl RowReadable for ModuleRaw {
    const TABLE: TableId = TableId::Module;

    fn row_read(parser: &mut Parser, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(ModuleRaw {
            rid,
            token: Token::from_parts(TableId::Module, rid),
            offset: parser.pos(),
            generation: parser.read_le::<u16>()?,
            name: parser.read_dyn(info.is_large_str())?,
            mvid: parser.read_dyn(info.is_large_guid())?,
            encid: parser.read_dyn(info.is_large_guid())?,
            encbaseid: parser.read_dyn(info.is_large_guid())?,
        })
    }
}
