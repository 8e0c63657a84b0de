use crate::{
    file::parser::Parser,
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// Mask of the visibility bits in `TypeAttributes`
pub const VISIBILITY_MASK: u32 = 0x0000_0007;

/// Type visibility, the low three bits of `TypeAttributes`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TypeVisibility {
    NotPublic,
    Public,
    NestedPublic,
    NestedPrivate,
    NestedFamily,
    NestedAssembly,
    NestedFamAndAssem,
    NestedFamOrAssem,
}

impl TypeVisibility {
    /// Decode the visibility bits of `flags`.
    #[must_use]
    pub fn from_flags(flags: u32) -> Self {
        match flags & VISIBILITY_MASK {
            0 => TypeVisibility::NotPublic,
            1 => TypeVisibility::Public,
            2 => TypeVisibility::NestedPublic,
            3 => TypeVisibility::NestedPrivate,
            4 => TypeVisibility::NestedFamily,
            5 => TypeVisibility::NestedAssembly,
            6 => TypeVisibility::NestedFamAndAssem,
            _ => TypeVisibility::NestedFamOrAssem,
        }
    }
}

/// The `TypeDef` table defines types (classes, interfaces, value types, enums) in the current
/// module. `TableId` = 0x02
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDefRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// Offset of the row inside its table
    pub offset: usize,
    /// a 4-byte bitmask of type `TypeAttributes`
    pub flags: u32,
    /// an index into the String heap
    pub type_name: u32,
    /// an index into the String heap
    pub type_namespace: u32,
    /// an index into the `TypeDef`, `TypeRef`, or `TypeSpec` table; more precisely, a `TypeDefOrRef`
    pub extends: CodedIndex,
    /// an index into the Field table; first of the fields owned by this type
    pub field_list: u32,
    /// an index into the `MethodDef` table; first of the methods owned by this type
    pub method_list: u32,
}

impl TypeDefRaw {
    /// Visibility of this type.
    #[must_use]
    pub fn visibility(&self) -> TypeVisibility {
        TypeVisibility::from_flags(self.flags)
    }

    /// Returns `true` when the public visibility bit (bit 0 of `flags`) is set.
    ///
    /// This holds for `Public` and for the nested visibilities with odd values. Use
    /// [`TypeDefRaw::visibility`] to tell them apart.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.flags & 0x1 != 0
    }
}

impl RowReadable for TypeDefRaw {
    const TABLE: TableId = TableId::TypeDef;

    fn row_read(parser: &mut Parser, rid: u32, info: &TableInfo) -> Result<Self> {
        let offset = parser.pos();
        Ok(TypeDefRaw {
            rid,
            token: Token::from_parts(TableId::TypeDef, rid),
            offset,
            flags: parser.read_le::<u32>()?,
            type_name: parser.read_dyn(info.is_large_str())?,
            type_namespace: parser.read_dyn(info.is_large_str())?,
            extends: CodedIndex::read(parser, info, CodedIndexType::TypeDefOrRef)?,
            field_list: parser.read_dyn(info.get(TableId::Field).is_large)?,
            method_list: parser.read_dyn(info.get(TableId::MethodDef).is_large)?,
        })
    }
}
