//! DOS header, NT headers and data directories.
//!
//! The structural headers are the only part of an image whose decoding is fatal: without a
//! valid DOS header, NT signature, file header and optional header there is nothing to
//! translate RVAs against. Everything is decoded field-by-field in on-disk order with explicit
//! widths.
//!
//! The optional header exists in two layouts selected by its magic: PE32 (`0x10B`) stores
//! pointer-sized fields in 4 bytes and carries `BaseOfData`, PE32+ (`0x20B`) stores them in 8
//! bytes and drops `BaseOfData`.
//!
//! # Reference
//! - Microsoft PE/COFF Specification, sections 3 and 4

use goblin::pe::{
    header::{machine_to_str, DOS_MAGIC, PE_MAGIC},
    optional_header::{MAGIC_32, MAGIC_64},
};
use strum::{EnumCount, EnumIter, FromRepr};

use crate::{
    file::{parser::Parser, pe::section::SectionTable},
    Error::NotPeFile,
    Result,
};

/// Offset of `e_lfanew` inside the DOS header
const DOS_LFANEW_OFFSET: usize = 0x3C;

/// Size of the COFF file header in bytes
pub const FILE_HEADER_SIZE: usize = 20;

/// Maximum number of data directories an optional header can carry
pub const MAX_DATA_DIRECTORIES: usize = 16;

/// `IMAGE_FILE_DLL` bit of [`FileHeader::characteristics`]
const IMAGE_FILE_DLL: u16 = 0x2000;

/// Layout of the optional header, selected by its magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bitness {
    /// 32-bit image (`IMAGE_NT_OPTIONAL_HDR32_MAGIC`, 0x10B)
    Pe32,
    /// 64-bit image (`IMAGE_NT_OPTIONAL_HDR64_MAGIC`, 0x20B)
    Pe32Plus,
}

impl Bitness {
    /// Map an optional header magic to its layout.
    ///
    /// ## Arguments
    /// * 'magic' - The first two bytes of the optional header
    #[must_use]
    pub fn from_magic(magic: u16) -> Option<Bitness> {
        match magic {
            MAGIC_32 => Some(Bitness::Pe32),
            MAGIC_64 => Some(Bitness::Pe32Plus),
            _ => None,
        }
    }

    /// Width of pointer-sized optional header fields and of import thunks.
    #[must_use]
    pub fn pointer_size(self) -> usize {
        match self {
            Bitness::Pe32 => 4,
            Bitness::Pe32Plus => 8,
        }
    }

    /// Size of the optional header fields preceding the data directories.
    #[must_use]
    pub fn fixed_optional_size(self) -> usize {
        match self {
            Bitness::Pe32 => 96,
            Bitness::Pe32Plus => 112,
        }
    }
}

impl std::fmt::Display for Bitness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bitness::Pe32 => write!(f, "PE32"),
            Bitness::Pe32Plus => write!(f, "PE32+"),
        }
    }
}

/// The parts of the legacy DOS header that matter for locating the NT headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DosHeader {
    /// `MZ`, 0x5A4D
    pub e_magic: u16,
    /// File offset of the NT signature
    pub e_lfanew: u32,
}

impl DosHeader {
    /// Decode the DOS header at the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotPeFile`] for a wrong magic and [`crate::Error::TruncatedRead`]
    /// if the buffer ends before `e_lfanew`.
    pub fn read(data: &[u8]) -> Result<DosHeader> {
        let mut parser = Parser::new(data);

        let e_magic = parser.read_le::<u16>()?;
        if e_magic != DOS_MAGIC {
            return Err(NotPeFile("bad DOS magic"));
        }

        parser.seek(DOS_LFANEW_OFFSET)?;
        let e_lfanew = parser.read_le::<u32>()?;

        Ok(DosHeader { e_magic, e_lfanew })
    }
}

/// The COFF file header following the NT signature.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct FileHeader {
    pub machine: u16,
    pub number_of_sections: u16,
    pub time_date_stamp: u32,
    pub pointer_to_symbol_table: u32,
    pub number_of_symbols: u32,
    pub size_of_optional_header: u16,
    pub characteristics: u16,
}

impl FileHeader {
    /// Decode a file header at the current cursor position.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if fewer than 20 bytes remain.
    pub fn read(parser: &mut Parser) -> Result<FileHeader> {
        parser.ensure_remaining(FILE_HEADER_SIZE)?;

        Ok(FileHeader {
            machine: parser.read_le::<u16>()?,
            number_of_sections: parser.read_le::<u16>()?,
            time_date_stamp: parser.read_le::<u32>()?,
            pointer_to_symbol_table: parser.read_le::<u32>()?,
            number_of_symbols: parser.read_le::<u32>()?,
            size_of_optional_header: parser.read_le::<u16>()?,
            characteristics: parser.read_le::<u16>()?,
        })
    }
}

/// Index of an entry in the optional header's data directory array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, FromRepr)]
#[repr(usize)]
pub enum DataDirectoryKind {
    /// Export table
    Export = 0,
    /// Import table
    Import = 1,
    /// Resource table
    Resource = 2,
    /// Exception table
    Exception = 3,
    /// Attribute certificate table, addressed by file offset
    Certificate = 4,
    /// Base relocation table
    BaseRelocation = 5,
    /// Debug data
    Debug = 6,
    /// Reserved, must be zero
    Architecture = 7,
    /// Global pointer register value
    GlobalPtr = 8,
    /// Thread local storage table
    Tls = 9,
    /// Load configuration table
    LoadConfig = 10,
    /// Bound import table
    BoundImport = 11,
    /// Import address table
    Iat = 12,
    /// Delay-load import descriptors
    DelayImport = 13,
    /// CLR runtime (COR20) header
    ClrRuntimeHeader = 14,
    /// Reserved, must be zero
    Reserved = 15,
}

/// One `(RVA, size)` pair of the data directory array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataDirectory {
    /// Relative virtual address (a file offset for [`DataDirectoryKind::Certificate`])
    pub virtual_address: u32,
    /// Size in bytes
    pub size: u32,
}

impl DataDirectory {
    /// A directory with a zero address does not exist in the image.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.virtual_address != 0
    }

    /// Returns `true` if `rva` lies within `[virtual_address, virtual_address + size)`.
    #[must_use]
    pub fn contains(&self, rva: u32) -> bool {
        rva >= self.virtual_address
            && u64::from(rva) < u64::from(self.virtual_address) + u64::from(self.size)
    }
}

/// The Windows-specific optional header, for both layouts.
///
/// Pointer-sized fields are stored as `u64` regardless of [`Bitness`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct OptionalHeader {
    pub magic: u16,
    pub major_linker_version: u8,
    pub minor_linker_version: u8,
    pub size_of_code: u32,
    pub size_of_initialized_data: u32,
    pub size_of_uninitialized_data: u32,
    pub address_of_entry_point: u32,
    pub base_of_code: u32,
    /// Only present in PE32 images
    pub base_of_data: Option<u32>,
    pub image_base: u64,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub major_operating_system_version: u16,
    pub minor_operating_system_version: u16,
    pub major_image_version: u16,
    pub minor_image_version: u16,
    pub major_subsystem_version: u16,
    pub minor_subsystem_version: u16,
    pub win32_version_value: u32,
    pub size_of_image: u32,
    pub size_of_headers: u32,
    pub check_sum: u32,
    pub subsystem: u16,
    pub dll_characteristics: u16,
    pub size_of_stack_reserve: u64,
    pub size_of_stack_commit: u64,
    pub size_of_heap_reserve: u64,
    pub size_of_heap_commit: u64,
    pub loader_flags: u32,
    /// The declared count, which may exceed the number of directories actually read
    pub number_of_rva_and_sizes: u32,
    /// At most [`MAX_DATA_DIRECTORIES`] entries
    pub data_directories: Vec<DataDirectory>,
}

impl OptionalHeader {
    /// Decode an optional header of `size_of_optional_header` bytes at the current position.
    ///
    /// The cursor is left after the last data directory that was read; callers locate the
    /// section table from the declared size, not from the cursor.
    ///
    /// # Errors
    /// - [`crate::Error::NotPeFile`] for an unknown magic
    /// - [`crate::Error::Malformed`] if the declared size cannot hold the fixed fields
    /// - [`crate::Error::TruncatedRead`] if the buffer ends early
    pub fn read(parser: &mut Parser, size_of_optional_header: u16) -> Result<OptionalHeader> {
        let magic = parser.read_le::<u16>()?;
        let Some(bitness) = Bitness::from_magic(magic) else {
            return Err(NotPeFile("unknown optional header magic"));
        };

        let declared_size = usize::from(size_of_optional_header);
        let fixed_size = bitness.fixed_optional_size();
        if declared_size < fixed_size {
            return Err(malformed_error!(
                "SizeOfOptionalHeader {} is smaller than the {} bytes of fixed fields",
                declared_size,
                fixed_size
            ));
        }

        parser.ensure_remaining(fixed_size - 2)?;
        let wide = bitness == Bitness::Pe32Plus;

        let major_linker_version = parser.read_le::<u8>()?;
        let minor_linker_version = parser.read_le::<u8>()?;
        let size_of_code = parser.read_le::<u32>()?;
        let size_of_initialized_data = parser.read_le::<u32>()?;
        let size_of_uninitialized_data = parser.read_le::<u32>()?;
        let address_of_entry_point = parser.read_le::<u32>()?;
        let base_of_code = parser.read_le::<u32>()?;
        let base_of_data = if wide {
            None
        } else {
            Some(parser.read_le::<u32>()?)
        };
        let image_base = parser.read_word(wide)?;
        let section_alignment = parser.read_le::<u32>()?;
        let file_alignment = parser.read_le::<u32>()?;
        let major_operating_system_version = parser.read_le::<u16>()?;
        let minor_operating_system_version = parser.read_le::<u16>()?;
        let major_image_version = parser.read_le::<u16>()?;
        let minor_image_version = parser.read_le::<u16>()?;
        let major_subsystem_version = parser.read_le::<u16>()?;
        let minor_subsystem_version = parser.read_le::<u16>()?;
        let win32_version_value = parser.read_le::<u32>()?;
        let size_of_image = parser.read_le::<u32>()?;
        let size_of_headers = parser.read_le::<u32>()?;
        let check_sum = parser.read_le::<u32>()?;
        let subsystem = parser.read_le::<u16>()?;
        let dll_characteristics = parser.read_le::<u16>()?;
        let size_of_stack_reserve = parser.read_word(wide)?;
        let size_of_stack_commit = parser.read_word(wide)?;
        let size_of_heap_reserve = parser.read_word(wide)?;
        let size_of_heap_commit = parser.read_word(wide)?;
        let loader_flags = parser.read_le::<u32>()?;
        let number_of_rva_and_sizes = parser.read_le::<u32>()?;

        let fitting = (declared_size - fixed_size) / 8;
        let count = usize::try_from(number_of_rva_and_sizes)
            .unwrap_or(usize::MAX)
            .min(MAX_DATA_DIRECTORIES)
            .min(fitting);
        if count < number_of_rva_and_sizes as usize {
            log::debug!(
                "Reading {} of {} declared data directories",
                count,
                number_of_rva_and_sizes
            );
        }

        let mut data_directories = Vec::with_capacity(count);
        for _ in 0..count {
            data_directories.push(DataDirectory {
                virtual_address: parser.read_le::<u32>()?,
                size: parser.read_le::<u32>()?,
            });
        }

        Ok(OptionalHeader {
            magic,
            major_linker_version,
            minor_linker_version,
            size_of_code,
            size_of_initialized_data,
            size_of_uninitialized_data,
            address_of_entry_point,
            base_of_code,
            base_of_data,
            image_base,
            section_alignment,
            file_alignment,
            major_operating_system_version,
            minor_operating_system_version,
            major_image_version,
            minor_image_version,
            major_subsystem_version,
            minor_subsystem_version,
            win32_version_value,
            size_of_image,
            size_of_headers,
            check_sum,
            subsystem,
            dll_characteristics,
            size_of_stack_reserve,
            size_of_stack_commit,
            size_of_heap_reserve,
            size_of_heap_commit,
            loader_flags,
            number_of_rva_and_sizes,
            data_directories,
        })
    }

    /// The layout this header was decoded with.
    #[must_use]
    pub fn bitness(&self) -> Bitness {
        if self.magic == MAGIC_64 {
            Bitness::Pe32Plus
        } else {
            Bitness::Pe32
        }
    }
}

/// DOS header, NT headers and section table of an image.
///
/// # Examples
///
/// ```rust,no_run
/// use pescope::file::pe::header::{Bitness, ImageHeader};
///
/// let data = std::fs::read("kernel32.dll")?;
/// let header = ImageHeader::read(&data)?;
/// if header.bitness() == Bitness::Pe32Plus {
///     println!("64-bit image for {}", header.machine_name());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct ImageHeader {
    /// The DOS header
    pub dos: DosHeader,
    /// The COFF file header
    pub file: FileHeader,
    /// The optional header
    pub optional: OptionalHeader,
    /// The section table, in on-disk order
    pub sections: SectionTable,
}

impl ImageHeader {
    /// Decode all structural headers of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotPeFile`] if a magic or signature check fails, and
    /// [`crate::Error::TruncatedRead`] or [`crate::Error::Malformed`] if the headers are
    /// damaged.
    pub fn read(data: &[u8]) -> Result<ImageHeader> {
        let dos = DosHeader::read(data)?;

        let mut parser = Parser::at(data, dos.e_lfanew as usize)?;
        let signature = parser.read_le::<u32>()?;
        if signature != PE_MAGIC {
            return Err(NotPeFile("bad NT signature"));
        }

        let file = FileHeader::read(&mut parser)?;

        let optional_start = parser.pos();
        let optional = OptionalHeader::read(&mut parser, file.size_of_optional_header)?;

        let section_start = optional_start
            .checked_add(usize::from(file.size_of_optional_header))
            .ok_or(crate::Error::TruncatedRead)?;
        parser.seek(section_start)?;
        let sections = SectionTable::read(&mut parser, file.number_of_sections)?;

        log::debug!(
            "Decoded {:?} headers for {} with {} sections",
            optional.bitness(),
            machine_to_str(file.machine),
            sections.len()
        );

        Ok(ImageHeader {
            dos,
            file,
            optional,
            sections,
        })
    }

    /// The optional header layout of this image.
    #[must_use]
    pub fn bitness(&self) -> Bitness {
        self.optional.bitness()
    }

    /// Human readable name of the target machine, e.g. `X86_64`.
    #[must_use]
    pub fn machine_name(&self) -> &'static str {
        machine_to_str(self.file.machine)
    }

    /// Returns `true` if the image is a dynamic-link library.
    #[must_use]
    pub fn is_dll(&self) -> bool {
        self.file.characteristics & IMAGE_FILE_DLL != 0
    }

    /// The preferred load address of the image.
    #[must_use]
    pub fn image_base(&self) -> u64 {
        self.optional.image_base
    }

    /// Returns the directory entry of the given kind, if the header declares it and its address
    /// is non-zero.
    #[must_use]
    pub fn data_directory(&self, kind: DataDirectoryKind) -> Option<DataDirectory> {
        self.optional
            .data_directories
            .get(kind as usize)
            .copied()
            .filter(DataDirectory::is_present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use strum::IntoEnumIterator;

    #[rustfmt::skip]
    fn pe32_optional(number_of_rva_and_sizes: u32) -> Vec<u8> {
        let mut data = vec![
            0x0B, 0x01,             // magic
            0x0E, 0x00,             // linker version
            0x00, 0x10, 0x00, 0x00, // size_of_code
            0x00, 0x02, 0x00, 0x00, // size_of_initialized_data
            0x00, 0x00, 0x00, 0x00, // size_of_uninitialized_data
            0x34, 0x12, 0x00, 0x00, // address_of_entry_point
            0x00, 0x10, 0x00, 0x00, // base_of_code
            0x00, 0x20, 0x00, 0x00, // base_of_data
            0x00, 0x00, 0x40, 0x00, // image_base
            0x00, 0x10, 0x00, 0x00, // section_alignment
            0x00, 0x02, 0x00, 0x00, // file_alignment
            0x06, 0x00, 0x00, 0x00, // os version
            0x00, 0x00, 0x00, 0x00, // image version
            0x06, 0x00, 0x00, 0x00, // subsystem version
            0x00, 0x00, 0x00, 0x00, // win32_version_value
            0x00, 0x40, 0x00, 0x00, // size_of_image
            0x00, 0x02, 0x00, 0x00, // size_of_headers
            0x00, 0x00, 0x00, 0x00, // check_sum
            0x03, 0x00,             // subsystem
            0x40, 0x85,             // dll_characteristics
            0x00, 0x00, 0x10, 0x00, // size_of_stack_reserve
            0x00, 0x10, 0x00, 0x00, // size_of_stack_commit
            0x00, 0x00, 0x10, 0x00, // size_of_heap_reserve
            0x00, 0x10, 0x00, 0x00, // size_of_heap_commit
            0x00, 0x00, 0x00, 0x00, // loader_flags
        ];
        data.extend_from_slice(&number_of_rva_and_sizes.to_le_bytes());
        for index in 0..16_u32 {
            data.extend_from_slice(&(0x1000 * (index + 1)).to_le_bytes());
            data.extend_from_slice(&0x10_u32.to_le_bytes());
        }
        data
    }

    #[test]
    fn pe32_optional_header() {
        let data = pe32_optional(16);
        assert_eq!(data.len(), 224);

        let mut parser = Parser::new(&data);
        let header = OptionalHeader::read(&mut parser, 224).unwrap();

        assert_eq!(header.bitness(), Bitness::Pe32);
        assert_eq!(header.address_of_entry_point, 0x1234);
        assert_eq!(header.base_of_data, Some(0x2000));
        assert_eq!(header.image_base, 0x0040_0000);
        assert_eq!(header.size_of_stack_reserve, 0x0010_0000);
        assert_eq!(header.size_of_heap_commit, 0x1000);
        assert_eq!(header.dll_characteristics, 0x8540);
        assert_eq!(header.data_directories.len(), 16);
        assert_eq!(header.data_directories[14].virtual_address, 0xF000);
        assert_eq!(parser.pos(), 224);
    }

    #[rustfmt::skip]
    fn pe32_plus_optional(number_of_rva_and_sizes: u32) -> Vec<u8> {
        let mut data = vec![
            0x0B, 0x02,             // magic
            0x0E, 0x00,             // linker version
            0x00, 0x10, 0x00, 0x00, // size_of_code
            0x00, 0x02, 0x00, 0x00, // size_of_initialized_data
            0x00, 0x00, 0x00, 0x00, // size_of_uninitialized_data
            0x34, 0x12, 0x00, 0x00, // address_of_entry_point
            0x00, 0x10, 0x00, 0x00, // base_of_code
            0x00, 0x00, 0x00, 0x40, 0x01, 0x00, 0x00, 0x00, // image_base
            0x00, 0x10, 0x00, 0x00, // section_alignment
            0x00, 0x02, 0x00, 0x00, // file_alignment
            0x06, 0x00, 0x00, 0x00, // os version
            0x00, 0x00, 0x00, 0x00, // image version
            0x06, 0x00, 0x00, 0x00, // subsystem version
            0x00, 0x00, 0x00, 0x00, // win32_version_value
            0x00, 0x40, 0x00, 0x00, // size_of_image
            0x00, 0x02, 0x00, 0x00, // size_of_headers
            0x00, 0x00, 0x00, 0x00, // check_sum
            0x02, 0x00,             // subsystem
            0x60, 0x81,             // dll_characteristics
            0x11, 0x22, 0x33, 0x44, 0x05, 0x00, 0x00, 0x00, // size_of_stack_reserve
            0x00, 0x10, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, // size_of_stack_commit
            0x55, 0x66, 0x77, 0x88, 0x07, 0x00, 0x00, 0x00, // size_of_heap_reserve
            0x00, 0x20, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, // size_of_heap_commit
            0x00, 0x00, 0x00, 0x00, // loader_flags
        ];
        data.extend_from_slice(&number_of_rva_and_sizes.to_le_bytes());
        for index in 0..number_of_rva_and_sizes {
            data.extend_from_slice(&(0x1000 * (index + 1)).to_le_bytes());
            data.extend_from_slice(&0x20_u32.to_le_bytes());
        }
        data
    }

    #[test]
    fn pe32_plus_optional_header() {
        let data = pe32_plus_optional(0);
        assert_eq!(data.len(), 112);

        let mut parser = Parser::new(&data);
        let header = OptionalHeader::read(&mut parser, 112).unwrap();

        assert_eq!(header.bitness(), Bitness::Pe32Plus);
        assert_eq!(header.address_of_entry_point, 0x1234);
        assert_eq!(header.base_of_code, 0x1000);
        assert_eq!(header.base_of_data, None);
        assert_eq!(header.image_base, 0x0000_0001_4000_0000);
        assert_eq!(header.section_alignment, 0x1000);
        assert_eq!(header.size_of_stack_reserve, 0x0000_0005_4433_2211);
        assert_eq!(header.size_of_stack_commit, 0x0000_0006_0000_1000);
        assert_eq!(header.size_of_heap_reserve, 0x0000_0007_8877_6655);
        assert_eq!(header.size_of_heap_commit, 0x0000_0008_0000_2000);
        assert_eq!(header.dll_characteristics, 0x8160);
        assert_eq!(header.loader_flags, 0);
        assert!(header.data_directories.is_empty());
        assert_eq!(parser.pos(), 112);

        let data = pe32_plus_optional(2);
        let mut parser = Parser::new(&data);
        let header = OptionalHeader::read(&mut parser, 128).unwrap();
        assert_eq!(header.data_directories.len(), 2);
        assert_eq!(header.data_directories[1].virtual_address, 0x2000);
        assert_eq!(header.data_directories[1].size, 0x20);
        assert_eq!(parser.pos(), 128);

        // The 96-byte PE32 minimum does not hold the wider fields
        let mut parser = Parser::new(&data);
        assert!(matches!(
            OptionalHeader::read(&mut parser, 96),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn directory_count_is_clamped() {
        let data = pe32_optional(0xFFFF_FFFF);
        let mut parser = Parser::new(&data);
        let header = OptionalHeader::read(&mut parser, 224).unwrap();
        assert_eq!(header.number_of_rva_and_sizes, 0xFFFF_FFFF);
        assert_eq!(header.data_directories.len(), 16);

        let data = pe32_optional(2);
        let mut parser = Parser::new(&data);
        let header = OptionalHeader::read(&mut parser, 224).unwrap();
        assert_eq!(header.data_directories.len(), 2);

        // Only four directories fit into the declared optional header size
        let data = pe32_optional(16);
        let mut parser = Parser::new(&data);
        let header = OptionalHeader::read(&mut parser, 96 + 4 * 8 + 4).unwrap();
        assert_eq!(header.data_directories.len(), 4);
    }

    #[test]
    fn optional_header_errors() {
        let mut data = pe32_optional(16);
        let mut parser = Parser::new(&data);
        assert!(matches!(
            OptionalHeader::read(&mut parser, 64),
            Err(Error::Malformed { .. })
        ));

        data[0] = 0x07;
        let mut parser = Parser::new(&data);
        assert!(matches!(
            OptionalHeader::read(&mut parser, 224),
            Err(Error::NotPeFile(_))
        ));

        let data = pe32_optional(16);
        let mut parser = Parser::new(&data[..50]);
        assert!(matches!(
            OptionalHeader::read(&mut parser, 224),
            Err(Error::TruncatedRead)
        ));
    }

    #[test]
    fn dos_header() {
        let mut data = vec![0_u8; 0x40];
        data[0] = b'M';
        data[1] = b'Z';
        data[0x3C] = 0x80;
        let dos = DosHeader::read(&data).unwrap();
        assert_eq!(dos.e_magic, 0x5A4D);
        assert_eq!(dos.e_lfanew, 0x80);

        assert!(matches!(
            DosHeader::read(&data[..0x3E]),
            Err(Error::TruncatedRead)
        ));

        data[0] = b'Z';
        assert!(matches!(DosHeader::read(&data), Err(Error::NotPeFile(_))));
    }

    #[test]
    fn bitness() {
        assert_eq!(Bitness::from_magic(0x10B), Some(Bitness::Pe32));
        assert_eq!(Bitness::from_magic(0x20B), Some(Bitness::Pe32Plus));
        assert_eq!(Bitness::from_magic(0x107), None);
        assert_eq!(Bitness::Pe32.pointer_size(), 4);
        assert_eq!(Bitness::Pe32Plus.pointer_size(), 8);
    }

    #[test]
    fn directory_kinds() {
        assert_eq!(DataDirectoryKind::COUNT, MAX_DATA_DIRECTORIES);
        for (index, kind) in DataDirectoryKind::iter().enumerate() {
            assert_eq!(kind as usize, index);
            assert_eq!(DataDirectoryKind::from_repr(index), Some(kind));
        }

        let directory = DataDirectory {
            virtual_address: 0x2000,
            size: 0x100,
        };
        assert!(directory.contains(0x2000));
        assert!(directory.contains(0x20FF));
        assert!(!directory.contains(0x2100));
        assert!(!DataDirectory::default().is_present());
    }
}
