//! Image access and PE/COFF structure decoding.
//!
//! This module abstracts over where the bytes of an image come from and decodes the
//! structures every later stage depends on.
//!
//! # Key Components
//!
//! - [`crate::file::File`] - An image whose structural headers decoded successfully
//! - [`crate::file::Backend`] - Trait for data sources (memory-mapped files, owned buffers)
//! - [`crate::file::parser::Parser`] - Bounds-checked cursor used by all decoders
//! - [`crate::file::io`] - Fixed-offset little-endian reads
//! - [`crate::file::pe`] - Headers, sections, imports, exports and the certificate locator
//!
//! # Examples
//!
//! ```rust,no_run
//! use pescope::File;
//! use pescope::file::pe::header::DataDirectoryKind;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("kernel32.dll"))?;
//! println!("Image base: 0x{:x}", file.imagebase());
//!
//! if let Some(clr) = file.data_directory(DataDirectoryKind::ClrRuntimeHeader) {
//!     let offset = file.rva_to_offset(clr.virtual_address)?;
//!     println!("CLR header at file offset 0x{:x}", offset);
//! }
//! # Ok::<(), pescope::Error>(())
//! ```

pub mod io;
pub mod parser;
pub mod pe;

mod memory;
mod physical;

use std::path::Path;

use crate::{
    file::{
        io::slice_at,
        parser::Parser,
        pe::{
            header::{Bitness, DataDirectory, DataDirectoryKind, ImageHeader},
            section::SectionTable,
        },
    },
    Error::{Empty, UnmappedAddress},
    Result,
};
pub use memory::Memory;
pub use physical::Physical;

/// Backend trait for image data sources.
///
/// All implementations must be thread-safe so parsed images can be shared across threads.
pub trait Backend: Send + Sync {
    /// Returns `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if the span exceeds the data.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the complete data.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data.
    fn len(&self) -> usize;
}

/// A PE image whose structural headers are valid.
///
/// Construction decodes the DOS header, NT headers, optional header and section table, and
/// fails if any of them is damaged. Everything else is resolved lazily by the caller through
/// the RVA translation and slicing helpers.
pub struct File {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
    /// The decoded structural headers
    header: ImageHeader,
}

impl File {
    /// Loads an image from the given path through a read-only memory mapping.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or mapped, is empty, or is not a PE
    /// image.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Loads an image from an owned buffer.
    ///
    /// # Errors
    /// Returns an error if the buffer is empty or is not a PE image.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    /// Internal loader for any backend.
    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let header = ImageHeader::read(data.data())?;

        Ok(File {
            data: Box::new(data),
            header,
        })
    }

    /// Returns the total size of the image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the image has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// Returns the raw bytes of the image.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Returns `len` bytes starting at file offset `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if the span exceeds the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.data.data_slice(offset, len)
    }

    /// The decoded structural headers.
    #[must_use]
    pub fn header(&self) -> &ImageHeader {
        &self.header
    }

    /// The section table, in on-disk order.
    #[must_use]
    pub fn sections(&self) -> &SectionTable {
        &self.header.sections
    }

    /// The optional header layout.
    #[must_use]
    pub fn bitness(&self) -> Bitness {
        self.header.bitness()
    }

    /// The preferred load address of the image.
    #[must_use]
    pub fn imagebase(&self) -> u64 {
        self.header.image_base()
    }

    /// Returns the directory entry of the given kind if it is present.
    #[must_use]
    pub fn data_directory(&self, kind: DataDirectoryKind) -> Option<DataDirectory> {
        self.header.data_directory(kind)
    }

    /// Returns the bytes covered by a data directory, or `None` if it is absent.
    ///
    /// The certificate directory holds a file offset; every other directory is translated
    /// through the section table.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if the directory's RVA is not covered by any
    /// section, or [`crate::Error::TruncatedRead`] if it extends past the end of the image.
    pub fn data_directory_bytes(&self, kind: DataDirectoryKind) -> Result<Option<&[u8]>> {
        let Some(directory) = self.data_directory(kind) else {
            return Ok(None);
        };

        let offset = if kind == DataDirectoryKind::Certificate {
            directory.virtual_address as usize
        } else {
            self.rva_to_offset(directory.virtual_address)?
        };

        self.data_slice(offset, directory.size as usize).map(Some)
    }

    /// Translate a relative virtual address to a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if no section contains `rva`.
    pub fn rva_to_offset(&self, rva: u32) -> Result<usize> {
        self.header
            .sections
            .rva_to_offset(rva)
            .ok_or(UnmappedAddress(rva))
    }

    /// Translate a file offset to a relative virtual address.
    ///
    /// # Errors
    /// Returns a malformed error if no section's raw data covers `offset`.
    pub fn offset_to_rva(&self, offset: usize) -> Result<u32> {
        self.header
            .sections
            .offset_to_rva(offset)
            .ok_or_else(|| malformed_error!("Offset 0x{:x} is not covered by any section", offset))
    }

    /// A fresh cursor positioned at the file offset of `rva`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if `rva` is not mapped, or
    /// [`crate::Error::TruncatedRead`] if it maps past the end of the image.
    pub fn parser_at_rva(&self, rva: u32) -> Result<Parser<'_>> {
        Parser::at(self.data(), self.rva_to_offset(rva)?)
    }

    /// `len` bytes at the file offset of `rva`.
    ///
    /// # Errors
    /// See [`File::parser_at_rva`].
    pub fn slice_at_rva(&self, rva: u32, len: usize) -> Result<&[u8]> {
        slice_at(self.data(), self.rva_to_offset(rva)?, len)
    }

    /// Read a NUL-terminated string located at `rva`, with invalid UTF-8 replaced.
    ///
    /// # Errors
    /// See [`File::parser_at_rva`] and [`Parser::read_cstr`].
    pub fn string_at_rva(&self, rva: u32, max_length: usize) -> Result<String> {
        self.parser_at_rva(rva)?.read_string_lossy(max_length)
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("len", &self.len())
            .field("header", &self.header)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test::ImageBuilder, Error};

    #[test]
    fn load_buffer() {
        let image = ImageBuilder::pe32().section(".text", 0x1000, vec![0x90; 0x200]).build();
        let file = File::from_mem(image).unwrap();

        assert!(!file.is_empty());
        assert_eq!(file.bitness(), Bitness::Pe32);
        assert_eq!(file.imagebase(), 0x0040_0000);
        assert_eq!(file.sections().len(), 1);
        assert_eq!(file.sections().as_slice()[0].name_lossy(), ".text");

        let offset = file.rva_to_offset(0x1010).unwrap();
        assert_eq!(file.offset_to_rva(offset).unwrap(), 0x1010);
        assert_eq!(file.slice_at_rva(0x1000, 2).unwrap(), &[0x90, 0x90]);
        assert!(matches!(
            file.rva_to_offset(0x9000),
            Err(Error::UnmappedAddress(0x9000))
        ));
        assert!(file.data_directory(DataDirectoryKind::Import).is_none());
        assert!(file
            .data_directory_bytes(DataDirectoryKind::Import)
            .unwrap()
            .is_none());
    }

    #[test]
    fn load_invalid() {
        assert!(matches!(File::from_mem(vec![]), Err(Error::Empty)));
        assert!(matches!(
            File::from_mem(vec![0xCC; 0x100]),
            Err(Error::NotPeFile(_))
        ));

        let mut image = ImageBuilder::pe32().build();
        image.truncate(0x90);
        assert!(matches!(File::from_mem(image), Err(Error::TruncatedRead)));
    }
}
