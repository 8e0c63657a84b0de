//! Metadata root header and stream directory.
//!
//! The metadata root is the entry point of the CLR metadata located by the COR20 header. It
//! carries a version string (e.g. `v4.0.30319`) and the directory of streams that follow it.
//!
//! # Example
//!
//! ```rust
//! use pescope::metadata::root::Root;
//!
//! #[rustfmt::skip]
//! let root = Root::read(&[
//!     0x42, 0x53, 0x4A, 0x42,
//!     0x01, 0x00,
//!     0x01, 0x00,
//!     0x00, 0x00, 0x00, 0x00,
//!     0x08, 0x00, 0x00, 0x00,
//!     b'v', b'4', b'.', b'0', 0x00, 0x00, 0x00, 0x00,
//!     0x00, 0x00,
//!     0x01, 0x00,
//!     0x2C, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x23, 0x7E, 0x00, 0x00,
//!     0x00, 0x00, 0x00, 0x00,
//! ], 16)?;
//! assert_eq!(root.version, "v4.0");
//! assert_eq!(root.stream_headers[0].name, "#~");
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! # References
//!
//! - [ECMA-335 II.24.2.1: Metadata root](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{file::parser::Parser, metadata::streams::StreamHeader, Error, Result};

/// "BSJB", the metadata root signature
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// Longest version string accepted, padding included
const MAX_VERSION_LENGTH: u32 = 255;

/// The metadata root and its stream directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Root {
    /// Magic signature, 0x424A5342
    pub signature: u32,
    /// Major version, ignored on read
    pub major_version: u16,
    /// Minor version, ignored on read
    pub minor_version: u16,
    /// Reserved, always 0
    pub reserved: u32,
    /// Length of the version string field, padding included
    pub length: u32,
    /// The runtime version string, up to its first NUL
    pub version: String,
    /// Reserved, always 0
    pub flags: u16,
    /// Number of streams declared
    pub stream_number: u16,
    /// The stream headers actually read
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Decode the metadata root at the start of `data`, reading at most `max_streams` stream
    /// headers.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if the root is cut short, or a malformed error
    /// for a bad signature or version length.
    pub fn read(data: &[u8], max_streams: usize) -> Result<Root> {
        let mut parser = Parser::new(data);

        let signature = parser.read_le::<u32>()?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - 0x{:08x}",
                signature
            ));
        }

        let major_version = parser.read_le::<u16>()?;
        let minor_version = parser.read_le::<u16>()?;
        let reserved = parser.read_le::<u32>()?;
        let length = parser.read_le::<u32>()?;
        if length > MAX_VERSION_LENGTH {
            return Err(malformed_error!("Version string length {} is too large", length));
        }

        let padded_length = (length as usize).div_ceil(4) * 4;
        let version_bytes = parser.read_bytes(padded_length)?;
        let version_end = version_bytes
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(version_bytes.len());
        let version = String::from_utf8_lossy(&version_bytes[..version_end]).into_owned();

        let flags = parser.read_le::<u16>()?;
        let stream_number = parser.read_le::<u16>()?;

        let mut count = usize::from(stream_number);
        if count > max_streams {
            log::warn!(
                "Metadata root declares {} streams, reading the first {}",
                count,
                max_streams
            );
            count = max_streams;
        }

        let mut stream_headers = Vec::with_capacity(count);
        for _ in 0..count {
            stream_headers.push(StreamHeader::read(&mut parser)?);
        }

        Ok(Root {
            signature,
            major_version,
            minor_version,
            reserved,
            length,
            version,
            flags,
            stream_number,
            stream_headers,
        })
    }

    /// The first stream header named `name`.
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|header| header.name == name)
    }

    /// The tables stream header, `#~` or `#-`.
    #[must_use]
    pub fn tables_stream(&self) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|header| header.is_tables())
    }

    /// Borrow the bytes of `header` from the metadata `data` this root was read from.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if the stream extends past the metadata.
    pub fn stream_data<'a>(&self, data: &'a [u8], header: &StreamHeader) -> Result<&'a [u8]> {
        let start = header.offset as usize;
        let end = start
            .checked_add(header.size as usize)
            .ok_or(Error::TruncatedRead)?;
        data.get(start..end).ok_or(Error::TruncatedRead)
    }
}
