//! Column widths and row sizes.
//!
//! Every metadata table has a fixed row size, but the width of its heap and table index
//! columns depends on the heap size flags and on the row counts of the referenced tables.
//! [`TableInfo`] captures those inputs once and answers every width question.

use strum::{EnumCount, IntoEnumIterator};

use crate::metadata::tables::{CodedIndexType, TableId};

/// Heap size flag: `#Strings` indices are 4 bytes
pub const HEAP_LARGE_STRINGS: u8 = 0x01;
/// Heap size flag: `#GUID` indices are 4 bytes
pub const HEAP_LARGE_GUID: u8 = 0x02;
/// Heap size flag: `#Blob` indices are 4 bytes
pub const HEAP_LARGE_BLOB: u8 = 0x04;
/// Heap size flag: 4 extra bytes follow the row counts
pub const HEAP_EXTRA_DATA: u8 = 0x40;

/// Row count of one table and whether references to it need 4 bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableRowInfo {
    /// Number of rows
    pub rows: u32,
    /// Bits needed to represent the largest row id
    pub bits: u8,
    /// Simple indices into this table are 4 bytes wide
    pub is_large: bool,
}

impl TableRowInfo {
    /// Describe a table holding `rows` rows.
    #[must_use]
    pub fn new(rows: u32) -> Self {
        let bits = (u32::BITS - rows.leading_zeros()) as u8;
        TableRowInfo {
            rows,
            bits,
            is_large: rows > u32::from(u16::MAX),
        }
    }
}

/// Row counts and heap index widths of one tables stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableInfo {
    rows: Vec<TableRowInfo>,
    coded_indexes: Vec<u8>,
    is_large_str: bool,
    is_large_guid: bool,
    is_large_blob: bool,
}

impl TableInfo {
    /// Build the width table from the row counts of the present tables and the `heap_sizes`
    /// byte. Tables not listed have zero rows.
    #[must_use]
    pub fn new(row_counts: &[(TableId, u32)], heap_sizes: u8) -> Self {
        let mut rows = vec![TableRowInfo::default(); TableId::COUNT];
        for (table, count) in row_counts {
            rows[*table as usize] = TableRowInfo::new(*count);
        }

        let mut info = TableInfo {
            rows,
            coded_indexes: Vec::with_capacity(CodedIndexType::COUNT),
            is_large_str: heap_sizes & HEAP_LARGE_STRINGS != 0,
            is_large_guid: heap_sizes & HEAP_LARGE_GUID != 0,
            is_large_blob: heap_sizes & HEAP_LARGE_BLOB != 0,
        };

        let coded_indexes = CodedIndexType::iter()
            .map(|ci_type| info.compute_coded_index_bytes(ci_type))
            .collect();
        info.coded_indexes = coded_indexes;
        info
    }

    fn compute_coded_index_bytes(&self, ci_type: CodedIndexType) -> u8 {
        let max_bits = ci_type
            .tables()
            .iter()
            .flatten()
            .map(|table| self.rows[*table as usize].bits)
            .max()
            .unwrap_or(0);

        if u32::from(max_bits) + ci_type.tag_bits() > 16 {
            4
        } else {
            2
        }
    }

    /// Row count and width information of `table`.
    #[must_use]
    pub fn get(&self, table: TableId) -> TableRowInfo {
        self.rows[table as usize]
    }

    /// Number of rows in `table`.
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.rows[table as usize].rows
    }

    /// Returns `true` if `#Strings` indices are 4 bytes.
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_str
    }

    /// Returns `true` if `#GUID` indices are 4 bytes.
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_guid
    }

    /// Returns `true` if `#Blob` indices are 4 bytes.
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_blob
    }

    /// Width of a `#Strings` index.
    #[must_use]
    pub fn str_bytes(&self) -> u8 {
        if self.is_large_str {
            4
        } else {
            2
        }
    }

    /// Width of a `#GUID` index.
    #[must_use]
    pub fn guid_bytes(&self) -> u8 {
        if self.is_large_guid {
            4
        } else {
            2
        }
    }

    /// Width of a `#Blob` index.
    #[must_use]
    pub fn blob_bytes(&self) -> u8 {
        if self.is_large_blob {
            4
        } else {
            2
        }
    }

    /// Width of a simple index into `table`.
    #[must_use]
    pub fn table_index_bytes(&self, table: TableId) -> u8 {
        if self.rows[table as usize].is_large {
            4
        } else {
            2
        }
    }

    /// Width of a coded index of kind `ci_type`.
    #[must_use]
    pub fn coded_index_bytes(&self, ci_type: CodedIndexType) -> u8 {
        self.coded_indexes[ci_type as usize]
    }

    /// Size in bytes of one row of `table` (ECMA-335, Partition II, 22).
    #[must_use]
    #[rustfmt::skip]
    pub fn row_size(&self, table: TableId) -> u32 {
        let str = self.str_bytes();
        let guid = self.guid_bytes();
        let blob = self.blob_bytes();
        let idx = |table: TableId| self.table_index_bytes(table);
        let coded = |ci_type: CodedIndexType| self.coded_index_bytes(ci_type);

        let size = match table {
            TableId::Module => {
                /* generation */    2 +
                /* name */          str +
                /* mvid */          guid +
                /* encid */         guid +
                /* encbaseid */     guid
            }
            TableId::TypeRef => {
                /* resolution_scope */  coded(CodedIndexType::ResolutionScope) +
                /* type_name */         str +
                /* type_namespace */    str
            }
            TableId::TypeDef => {
                /* flags */         4 +
                /* type_name */     str +
                /* type_namespace */str +
                /* extends */       coded(CodedIndexType::TypeDefOrRef) +
                /* field_list */    idx(TableId::Field) +
                /* method_list */   idx(TableId::MethodDef)
            }
            TableId::FieldPtr => {
                /* field */         idx(TableId::Field)
            }
            TableId::Field => {
                /* flags */         2 +
                /* name */          str +
                /* signature */     blob
            }
            TableId::MethodPtr => {
                /* method */        idx(TableId::MethodDef)
            }
            TableId::MethodDef => {
                /* rva */           4 +
                /* impl_flags */    2 +
                /* flags */         2 +
                /* name */          str +
                /* signature */     blob +
                /* param_list */    idx(TableId::Param)
            }
            TableId::ParamPtr => {
                /* param */         idx(TableId::Param)
            }
            TableId::Param => {
                /* flags */         2 +
                /* sequence */      2 +
                /* name */          str
            }
            TableId::InterfaceImpl => {
                /* class */         idx(TableId::TypeDef) +
                /* interface */     coded(CodedIndexType::TypeDefOrRef)
            }
            TableId::MemberRef => {
                /* class */         coded(CodedIndexType::MemberRefParent) +
                /* name */          str +
                /* signature */     blob
            }
            TableId::Constant => {
                /* type */          1 +
                /* padding */       1 +
                /* parent */        coded(CodedIndexType::HasConstant) +
                /* value */         blob
            }
            TableId::CustomAttribute => {
                /* parent */        coded(CodedIndexType::HasCustomAttribute) +
                /* type */          coded(CodedIndexType::CustomAttributeType) +
                /* value */         blob
            }
            TableId::FieldMarshal => {
                /* parent */        coded(CodedIndexType::HasFieldMarshal) +
                /* native_type */   blob
            }
            TableId::DeclSecurity => {
                /* action */        2 +
                /* parent */        coded(CodedIndexType::HasDeclSecurity) +
                /* permission_set */blob
            }
            TableId::ClassLayout => {
                /* packing_size */  2 +
                /* class_size */    4 +
                /* parent */        idx(TableId::TypeDef)
            }
            TableId::FieldLayout => {
                /* offset */        4 +
                /* field */         idx(TableId::Field)
            }
            TableId::StandAloneSig => {
                /* signature */     blob
            }
            TableId::EventMap => {
                /* parent */        idx(TableId::TypeDef) +
                /* event_list */    idx(TableId::Event)
            }
            TableId::EventPtr => {
                /* event */         idx(TableId::Event)
            }
            TableId::Event => {
                /* flags */         2 +
                /* name */          str +
                /* event_type */    coded(CodedIndexType::TypeDefOrRef)
            }
            TableId::PropertyMap => {
                /* parent */        idx(TableId::TypeDef) +
                /* property_list */ idx(TableId::Property)
            }
            TableId::PropertyPtr => {
                /* property */      idx(TableId::Property)
            }
            TableId::Property => {
                /* flags */         2 +
                /* name */          str +
                /* type */          blob
            }
            TableId::MethodSemantics => {
                /* semantics */     2 +
                /* method */        idx(TableId::MethodDef) +
                /* association */   coded(CodedIndexType::HasSemantics)
            }
            TableId::MethodImpl => {
                /* class */         idx(TableId::TypeDef) +
                /* method_body */   coded(CodedIndexType::MethodDefOrRef) +
                /* method_decl */   coded(CodedIndexType::MethodDefOrRef)
            }
            TableId::ModuleRef => {
                /* name */          str
            }
            TableId::TypeSpec => {
                /* signature */     blob
            }
            TableId::ImplMap => {
                /* mapping_flags */ 2 +
                /* member_forwarded */ coded(CodedIndexType::MemberForwarded) +
                /* import_name */   str +
                /* import_scope */  idx(TableId::ModuleRef)
            }
            TableId::FieldRVA => {
                /* rva */           4 +
                /* field */         idx(TableId::Field)
            }
            TableId::EncLog => {
                /* token */         4 +
                /* func_code */     4
            }
            TableId::EncMap => {
                /* token */         4
            }
            TableId::Assembly => {
                /* hash_alg_id */   4 +
                /* version */       8 +
                /* flags */         4 +
                /* public_key */    blob +
                /* name */          str +
                /* culture */       str
            }
            TableId::AssemblyProcessor => {
                /* processor */     4
            }
            TableId::AssemblyOS => {
                /* os_platform_id */4 +
                /* os_major */      4 +
                /* os_minor */      4
            }
            TableId::AssemblyRef => {
                /* version */       8 +
                /* flags */         4 +
                /* public_key_or_token */ blob +
                /* name */          str +
                /* culture */       str +
                /* hash_value */    blob
            }
            TableId::AssemblyRefProcessor => {
                /* processor */     4 +
                /* assembly_ref */  idx(TableId::AssemblyRef)
            }
            TableId::AssemblyRefOS => {
                /* os_platform_id */4 +
                /* os_major */      4 +
                /* os_minor */      4 +
                /* assembly_ref */  idx(TableId::AssemblyRef)
            }
            TableId::File => {
                /* flags */         4 +
                /* name */          str +
                /* hash_value */    blob
            }
            TableId::ExportedType => {
                /* flags */         4 +
                /* type_def_id */   4 +
                /* type_name */     str +
                /* type_namespace */str +
                /* implementation */coded(CodedIndexType::Implementation)
            }
            TableId::ManifestResource => {
                /* offset */        4 +
                /* flags */         4 +
                /* name */          str +
                /* implementation */coded(CodedIndexType::Implementation)
            }
            TableId::NestedClass => {
                /* nested_class */  idx(TableId::TypeDef) +
                /* enclosing_class */ idx(TableId::TypeDef)
            }
            TableId::GenericParam => {
                /* number */        2 +
                /* flags */         2 +
                /* owner */         coded(CodedIndexType::TypeOrMethodDef) +
                /* name */          str
            }
            TableId::MethodSpec => {
                /* method */        coded(CodedIndexType::MethodDefOrRef) +
                /* instantiation */ blob
            }
            TableId::GenericParamConstraint => {
                /* owner */         idx(TableId::GenericParam) +
                /* constraint */    coded(CodedIndexType::TypeDefOrRef)
            }
        };

        u32::from(size)
    }
}
