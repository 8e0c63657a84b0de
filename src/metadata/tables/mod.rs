//! Metadata tables of the `#~` stream.
//!
//! Every table is an array of fixed-size rows. The row size follows from the heap size flags
//! and the row counts of all tables ([`TableInfo`]), so a single table can be read in isolation
//! once its start offset is known. Only the rows needed for a structural summary are decoded
//! into typed records: [`ModuleRaw`] and [`TypeDefRaw`]. The remaining tables are sized and
//! skipped.
//!
//! # Reference
//! - [ECMA-335 II.22](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

mod codedindex;
mod module;
mod tableid;
mod tableinfo;
mod typedef;

use std::marker::PhantomData;

pub use codedindex::{CodedIndex, CodedIndexType};
pub use module::ModuleRaw;
pub use tableid::TableId;
pub use tableinfo::{
    TableInfo, TableRowInfo, HEAP_EXTRA_DATA, HEAP_LARGE_BLOB, HEAP_LARGE_GUID,
    HEAP_LARGE_STRINGS,
};
pub use typedef::{TypeDefRaw, TypeVisibility, VISIBILITY_MASK};

use crate::{file::parser::Parser, Error, Result};

/// A row type that can be decoded from its table.
pub trait RowReadable: Sized {
    /// The table this row belongs to
    const TABLE: TableId;

    /// Decode one row at the cursor.
    ///
    /// ## Arguments
    /// * `parser` - Cursor positioned at the start of the row
    /// * `rid`    - The 1-based row id
    /// * `info`   - Column widths of the tables stream
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if the row does not fit the data.
    fn row_read(parser: &mut Parser, rid: u32, info: &TableInfo) -> Result<Self>;
}

/// A typed view over the rows of one metadata table.
pub struct MetadataTable<'a, T> {
    data: &'a [u8],
    row_count: u32,
    row_size: u32,
    info: &'a TableInfo,
    _p: PhantomData<T>,
}

impl<'a, T: RowReadable> MetadataTable<'a, T> {
    /// Create a view over `row_count` rows starting at the beginning of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if `data` cannot hold all rows.
    pub fn new(data: &'a [u8], row_count: u32, info: &'a TableInfo) -> Result<Self> {
        let row_size = info.row_size(T::TABLE);
        let needed = u64::from(row_count) * u64::from(row_size);
        if needed > data.len() as u64 {
            return Err(Error::TruncatedRead);
        }

        Ok(MetadataTable {
            data,
            row_count,
            row_size,
            info,
            _p: PhantomData,
        })
    }

    /// Total size of the table in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::from(self.row_count) * u64::from(self.row_size)
    }

    /// Size of one row in bytes.
    #[must_use]
    pub fn row_size(&self) -> u32 {
        self.row_size
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Decode row `rid` (1-based).
    ///
    /// # Errors
    /// Returns a malformed error for a row id outside the table, or the row's decode error.
    pub fn get(&self, rid: u32) -> Result<T> {
        if rid == 0 || rid > self.row_count {
            return Err(malformed_error!(
                "Row {} is outside {:?} with {} rows",
                rid,
                T::TABLE,
                self.row_count
            ));
        }

        let offset = (rid - 1) as usize * self.row_size as usize;
        let mut parser = Parser::at(self.data, offset)?;
        T::row_read(&mut parser, rid, self.info)
    }

    /// Iterate over all rows in order. A row that fails to decode is yielded as an error
    /// without ending the iteration.
    #[must_use]
    pub fn iter(&self) -> TableIterator<'_, 'a, T> {
        TableIterator {
            table: self,
            next_rid: 1,
        }
    }
}

/// Iterator over the rows of a [`MetadataTable`].
pub struct TableIterator<'t, 'a, T> {
    table: &'t MetadataTable<'a, T>,
    next_rid: u32,
}

impl<T: RowReadable> Iterator for TableIterator<'_, '_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_rid > self.table.row_count {
            return None;
        }

        let rid = self.next_rid;
        self.next_rid += 1;
        Some(self.table.get(rid))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.table.row_count - (self.next_rid - 1)) as usize;
        (left, Some(left))
    }
}
