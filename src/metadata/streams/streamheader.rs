//! Stream headers of the metadata root.
//!
//! Each header names one stream and locates it relative to the metadata root. The name is a
//! NUL-terminated ASCII string of at most 32 bytes, padded to a 4-byte boundary.
//!
//! # Reference
//! - [ECMA-335 II.24.2.2](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{file::parser::Parser, Result};

/// Longest stream name, terminator included
pub const MAX_STREAM_NAME: usize = 32;

/// A stream header: name, offset and size of one metadata stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Stream name, e.g. `#~` or `#Strings`
    pub name: String,
}

impl StreamHeader {
    /// Read one stream header at the cursor, leaving it aligned on the next header.
    ///
    /// Names are not restricted to the standard set; unknown streams are listed but ignored.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if the header does not fit, or
    /// [`crate::Error::IterationLimit`] if the name is not terminated within 32 bytes.
    pub fn read(parser: &mut Parser) -> Result<StreamHeader> {
        let offset = parser.read_le::<u32>()?;
        let size = parser.read_le::<u32>()?;
        let name = parser.read_string_lossy(MAX_STREAM_NAME - 1)?;
        parser.align(4)?;

        Ok(StreamHeader { offset, size, name })
    }

    /// Returns `true` for the compressed (`#~`) or uncompressed (`#-`) tables stream.
    #[must_use]
    pub fn is_tables(&self) -> bool {
        self.name == "#~" || self.name == "#-"
    }
}
