//! Header of the `#~` tables stream.
//!
//! The header lists which tables are present (`valid`), which are sorted, and the row count of
//! every present table. Row data follows immediately, table after table in id order, with no
//! padding in between. Because the row size of one table depends on the row counts of others,
//! nothing can be located until every row count has been read; [`TableLayout`] is computed
//! once from those counts and reused for every later lookup.
//!
//! # Reference
//! - [ECMA-335 II.24.2.6](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use strum::IntoEnumIterator;

use crate::{
    file::parser::Parser,
    metadata::tables::{
        MetadataTable, RowReadable, TableId, TableInfo, HEAP_EXTRA_DATA,
    },
    Result,
};

/// Size of the fixed part of the header, up to the row counts
pub const TABLES_HEADER_SIZE: usize = 24;

/// Position and size of one present table inside the tables stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableSummary {
    /// The table
    pub table_id: TableId,
    /// Number of rows
    pub row_count: u32,
    /// Size of one row in bytes
    pub row_size: u32,
    /// Offset of the first row, relative to the start of the tables stream
    pub offset: usize,
}

impl TableSummary {
    /// Size of the table in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::from(self.row_count) * u64::from(self.row_size)
    }
}

/// Start offsets of every present table and the offset just past the last row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableLayout {
    tables: Vec<TableSummary>,
    end_of_tables: Option<usize>,
    unknown_tables: Vec<u8>,
}

impl TableLayout {
    fn compute(info: &TableInfo, valid: u64, rows_offset: usize) -> TableLayout {
        let mut tables = Vec::new();
        let mut offset = Some(rows_offset);

        for table_id in TableId::iter() {
            if valid & (1 << table_id as u64) == 0 {
                continue;
            }

            let row_count = info.rows(table_id);
            let row_size = info.row_size(table_id);

            let Some(start) = offset else {
                break;
            };
            tables.push(TableSummary {
                table_id,
                row_count,
                row_size,
                offset: start,
            });

            offset = usize::try_from(u64::from(row_count) * u64::from(row_size))
                .ok()
                .and_then(|size| start.checked_add(size));
        }

        let unknown_tables: Vec<u8> = (TableId::GenericParamConstraint as u8 + 1..64)
            .filter(|bit| valid & (1 << bit) != 0)
            .collect();

        if !unknown_tables.is_empty() {
            log::debug!(
                "Tables stream lists unknown tables {:?}, end of tables is unknown",
                unknown_tables
            );
            offset = None;
        }

        TableLayout {
            tables,
            end_of_tables: offset,
            unknown_tables,
        }
    }

    /// Every locatable table, in id order.
    #[must_use]
    pub fn tables(&self) -> &[TableSummary] {
        &self.tables
    }

    /// The summary of `table_id`, if present and locatable.
    #[must_use]
    pub fn get(&self, table_id: TableId) -> Option<&TableSummary> {
        self.tables.iter().find(|table| table.table_id == table_id)
    }

    /// Offset just past the last row, relative to the start of the tables stream.
    ///
    /// `None` if a table of unknown size is present.
    #[must_use]
    pub fn end_of_tables(&self) -> Option<usize> {
        self.end_of_tables
    }

    /// Bits of the `valid` mask that name no known table.
    #[must_use]
    pub fn unknown_tables(&self) -> &[u8] {
        &self.unknown_tables
    }
}

/// The decoded header of a tables stream, with its layout.
///
/// # Examples
///
/// ```rust,no_run
/// use pescope::metadata::{streams::TablesHeader, tables::{TableId, TypeDefRaw}};
///
/// # fn demo(stream: &[u8]) -> pescope::Result<()> {
/// let header = TablesHeader::from(stream)?;
/// println!("{} TypeDef rows", header.row_count(TableId::TypeDef));
/// if let Some(types) = header.table::<TypeDefRaw>()? {
///     for row in types.iter().flatten() {
///         println!("0x{:08x}", row.flags);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct TablesHeader<'a> {
    data: &'a [u8],
    /// Major version of the table schema, 2 for ECMA-335
    pub major_version: u8,
    /// Minor version of the table schema
    pub minor_version: u8,
    /// Heap index width flags
    pub heap_sizes: u8,
    /// Bit mask of present tables
    pub valid: u64,
    /// Bit mask of sorted tables
    pub sorted: u64,
    info: TableInfo,
    layout: TableLayout,
}

impl<'a> TablesHeader<'a> {
    /// Decode the header of the tables stream `data` and lay out its tables.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if the header or row counts are cut short, or a
    /// malformed error if no table is present.
    pub fn from(data: &'a [u8]) -> Result<TablesHeader<'a>> {
        let mut parser = Parser::new(data);
        parser.ensure_remaining(TABLES_HEADER_SIZE)?;

        let _reserved = parser.read_le::<u32>()?;
        let major_version = parser.read_le::<u8>()?;
        let minor_version = parser.read_le::<u8>()?;
        let heap_sizes = parser.read_le::<u8>()?;
        let _reserved = parser.read_le::<u8>()?;
        let valid = parser.read_le::<u64>()?;
        let sorted = parser.read_le::<u64>()?;

        if valid == 0 {
            return Err(malformed_error!("No valid rows in any of the tables"));
        }

        let mut row_counts = Vec::with_capacity(valid.count_ones() as usize);
        for bit in 0..64_u8 {
            if valid & (1 << bit) == 0 {
                continue;
            }

            let rows = parser.read_le::<u32>()?;
            if let Some(table_id) = TableId::from_repr(bit) {
                row_counts.push((table_id, rows));
            }
        }

        if heap_sizes & HEAP_EXTRA_DATA != 0 {
            parser.advance_by(4)?;
        }

        let info = TableInfo::new(&row_counts, heap_sizes);
        let layout = TableLayout::compute(&info, valid, parser.pos());

        log::debug!(
            "Tables stream v{}.{}: {} tables, heap sizes 0x{:02x}, end of tables {:?}",
            major_version,
            minor_version,
            valid.count_ones(),
            heap_sizes,
            layout.end_of_tables()
        );

        Ok(TablesHeader {
            data,
            major_version,
            minor_version,
            heap_sizes,
            valid,
            sorted,
            info,
            layout,
        })
    }

    /// Number of tables flagged present.
    #[must_use]
    pub fn table_count(&self) -> u32 {
        self.valid.count_ones()
    }

    /// Returns `true` if `table_id` is flagged present.
    #[must_use]
    pub fn has_table(&self, table_id: TableId) -> bool {
        self.valid & (1 << table_id as u64) != 0
    }

    /// Row count of `table_id`, 0 if absent.
    #[must_use]
    pub fn row_count(&self, table_id: TableId) -> u32 {
        self.info.rows(table_id)
    }

    /// Column width information.
    #[must_use]
    pub fn info(&self) -> &TableInfo {
        &self.info
    }

    /// The table layout computed at construction.
    #[must_use]
    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    /// Summaries of every present, locatable table.
    #[must_use]
    pub fn summaries(&self) -> &[TableSummary] {
        self.layout.tables()
    }

    /// Offset just past the last row of the last table, relative to the stream start.
    ///
    /// # Errors
    /// Returns a malformed error if a table of unknown size makes the end unknowable.
    pub fn end_of_tables(&self) -> Result<usize> {
        self.layout.end_of_tables().ok_or_else(|| {
            malformed_error!(
                "Unknown tables {:?} make the end of the tables stream unknowable",
                self.layout.unknown_tables()
            )
        })
    }

    /// A typed view over the rows of `T`'s table, or `None` if the table is absent.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if the rows extend past the stream.
    pub fn table<T: RowReadable>(&self) -> Result<Option<MetadataTable<'_, T>>> {
        let Some(summary) = self.layout.get(T::TABLE) else {
            return Ok(None);
        };

        let Some(rows) = self.data.get(summary.offset..) else {
            return Err(crate::Error::TruncatedRead);
        };

        Ok(Some(MetadataTable::new(rows, summary.row_count, &self.info)?))
    }
}
