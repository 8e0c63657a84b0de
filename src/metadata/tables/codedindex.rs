//! Coded indices.
//!
//! A coded index references a row in one of several candidate tables. The low `tag_bits` bits
//! select the table, the remaining bits hold the row id. The column is 2 bytes wide unless the
//! largest candidate table has too many rows to leave room for the tag in 16 bits.
//!
//! ## References
//!
//! - ECMA-335, Partition II, 24.2.6

use strum::{EnumCount, EnumIter};

use crate::{
    file::parser::Parser,
    metadata::{
        tables::{TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The coded index kinds defined by ECMA-335.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
#[allow(missing_docs)]
pub enum CodedIndexType {
    TypeDefOrRef,
    HasConstant,
    HasCustomAttribute,
    HasFieldMarshal,
    HasDeclSecurity,
    MemberRefParent,
    HasSemantics,
    MethodDefOrRef,
    MemberForwarded,
    Implementation,
    CustomAttributeType,
    ResolutionScope,
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// Candidate tables, indexed by tag value. `None` marks a tag that selects no table.
    #[must_use]
    pub fn tables(&self) -> &'static [Option<TableId>] {
        match self {
            CodedIndexType::TypeDefOrRef => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasConstant => &[
                Some(TableId::Field),
                Some(TableId::Param),
                Some(TableId::Property),
            ],
            CodedIndexType::HasCustomAttribute => &[
                Some(TableId::MethodDef),
                Some(TableId::Field),
                Some(TableId::TypeRef),
                Some(TableId::TypeDef),
                Some(TableId::Param),
                Some(TableId::InterfaceImpl),
                Some(TableId::MemberRef),
                Some(TableId::Module),
                Some(TableId::DeclSecurity),
                Some(TableId::Property),
                Some(TableId::Event),
                Some(TableId::StandAloneSig),
                Some(TableId::ModuleRef),
                Some(TableId::TypeSpec),
                Some(TableId::Assembly),
                Some(TableId::AssemblyRef),
                Some(TableId::File),
                Some(TableId::ExportedType),
                Some(TableId::ManifestResource),
                Some(TableId::GenericParam),
                Some(TableId::GenericParamConstraint),
                Some(TableId::MethodSpec),
            ],
            CodedIndexType::HasFieldMarshal => &[Some(TableId::Field), Some(TableId::Param)],
            CodedIndexType::HasDeclSecurity => &[
                Some(TableId::TypeDef),
                Some(TableId::MethodDef),
                Some(TableId::Assembly),
            ],
            CodedIndexType::MemberRefParent => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::ModuleRef),
                Some(TableId::MethodDef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasSemantics => &[Some(TableId::Event), Some(TableId::Property)],
            CodedIndexType::MethodDefOrRef => &[
                Some(TableId::MethodDef),
                Some(TableId::MemberRef),
            ],
            CodedIndexType::MemberForwarded => &[Some(TableId::Field), Some(TableId::MethodDef)],
            CodedIndexType::Implementation => &[
                Some(TableId::File),
                Some(TableId::AssemblyRef),
                Some(TableId::ExportedType),
            ],
            // Tags 0, 1 and 4 are unused; they only widen the tag to 3 bits
            CodedIndexType::CustomAttributeType => &[
                None,
                None,
                Some(TableId::MethodDef),
                Some(TableId::MemberRef),
                None,
            ],
            CodedIndexType::ResolutionScope => &[
                Some(TableId::Module),
                Some(TableId::ModuleRef),
                Some(TableId::AssemblyRef),
                Some(TableId::TypeRef),
            ],
            CodedIndexType::TypeOrMethodDef => &[
                Some(TableId::TypeDef),
                Some(TableId::MethodDef),
            ],
        }
    }

    /// Number of low bits holding the tag: `ceil(log2(candidates))`.
    #[must_use]
    pub fn tag_bits(&self) -> u32 {
        let candidates = self.tables().len();
        usize::BITS - (candidates - 1).leading_zeros()
    }
}

/// A decoded coded index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodedIndex {
    /// The table selected by the tag
    pub tag: TableId,
    /// The 1-based row id, 0 for a nil reference
    pub row: u32,
    /// The equivalent metadata token
    pub token: Token,
}

impl CodedIndex {
    /// Read and decode a coded index of kind `ci_type` at the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if the column does not fit, or a malformed error
    /// for a tag without a candidate table.
    pub fn read(parser: &mut Parser, info: &TableInfo, ci_type: CodedIndexType) -> Result<Self> {
        let value = parser.read_dyn(info.coded_index_bytes(ci_type) == 4)?;
        Self::decode(value, ci_type)
    }

    /// Split a raw coded index value into table and row.
    ///
    /// # Errors
    /// Returns a malformed error if the tag selects no table.
    pub fn decode(value: u32, ci_type: CodedIndexType) -> Result<Self> {
        let tables = ci_type.tables();
        let tag_bits = ci_type.tag_bits();
        let tag = (value & ((1 << tag_bits) - 1)) as usize;

        let Some(table) = tables.get(tag).copied().flatten() else {
            return Err(malformed_error!(
                "Tag {} selects no table for {:?}",
                tag,
                ci_type
            ));
        };

        Ok(CodedIndex::new(table, value >> tag_bits))
    }

    /// Create a coded index referencing `row` in `tag`.
    #[must_use]
    pub fn new(tag: TableId, row: u32) -> CodedIndex {
        CodedIndex {
            tag,
            row,
            token: Token::from_parts(tag, row),
        }
    }
}
