//! Section table and RVA translation.
//!
//! The section table maps the virtual layout of a loaded image back onto the file. It is
//! neither guaranteed to be sorted nor free of overlaps, so lookups scan it in table order and
//! the first containing section wins.

use bitflags::bitflags;

use crate::{file::parser::Parser, Result};

/// Size of one section header in bytes
pub const SECTION_HEADER_SIZE: usize = 40;

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    /// The subset of `IMAGE_SCN_*` flags used to describe section contents
    pub struct SectionCharacteristics : u32 {
        /// The section contains executable code
        const CNT_CODE = 0x0000_0020;
        /// The section contains initialized data
        const CNT_INITIALIZED_DATA = 0x0000_0040;
        /// The section contains uninitialized data
        const CNT_UNINITIALIZED_DATA = 0x0000_0080;
        /// The section can be discarded as needed
        const MEM_DISCARDABLE = 0x0200_0000;
        /// The section can be shared in memory
        const MEM_SHARED = 0x1000_0000;
        /// The section can be executed as code
        const MEM_EXECUTE = 0x2000_0000;
        /// The section can be read
        const MEM_READ = 0x4000_0000;
        /// The section can be written to
        const MEM_WRITE = 0x8000_0000;
    }
}

/// One 40-byte entry of the section table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    /// NUL padded, not guaranteed to be UTF-8
    pub name: [u8; 8],
    /// Size of the section once loaded
    pub virtual_size: u32,
    /// RVA of the first byte of the section
    pub virtual_address: u32,
    /// Size of the initialized data on disk
    pub size_of_raw_data: u32,
    /// File offset of the section data
    pub pointer_to_raw_data: u32,
    /// File offset of the relocation entries
    pub pointer_to_relocations: u32,
    /// File offset of the line-number entries
    pub pointer_to_linenumbers: u32,
    /// Number of relocation entries
    pub number_of_relocations: u16,
    /// Number of line-number entries
    pub number_of_linenumbers: u16,
    /// Raw `IMAGE_SCN_*` flags, unknown bits retained
    pub characteristics: SectionCharacteristics,
}

impl SectionHeader {
    /// Decode a section header at the current cursor position.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if fewer than 40 bytes remain.
    pub fn read(parser: &mut Parser) -> Result<SectionHeader> {
        parser.ensure_remaining(SECTION_HEADER_SIZE)?;

        let mut name = [0_u8; 8];
        name.copy_from_slice(parser.read_bytes(8)?);

        Ok(SectionHeader {
            name,
            virtual_size: parser.read_le::<u32>()?,
            virtual_address: parser.read_le::<u32>()?,
            size_of_raw_data: parser.read_le::<u32>()?,
            pointer_to_raw_data: parser.read_le::<u32>()?,
            pointer_to_relocations: parser.read_le::<u32>()?,
            pointer_to_linenumbers: parser.read_le::<u32>()?,
            number_of_relocations: parser.read_le::<u16>()?,
            number_of_linenumbers: parser.read_le::<u16>()?,
            characteristics: SectionCharacteristics::from_bits_retain(parser.read_le::<u32>()?),
        })
    }

    /// The section name up to the first NUL, with invalid UTF-8 replaced.
    #[must_use]
    pub fn name_lossy(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    /// Extent of the section in the virtual layout.
    ///
    /// Some linkers leave `VirtualSize` zero; the raw size stands in for it then.
    #[must_use]
    pub fn virtual_span(&self) -> u32 {
        if self.virtual_size == 0 {
            self.size_of_raw_data
        } else {
            self.virtual_size
        }
    }

    /// Returns `true` if `rva` falls inside `[VirtualAddress, VirtualAddress + span)`.
    #[must_use]
    pub fn contains_rva(&self, rva: u32) -> bool {
        match self.virtual_address.checked_add(self.virtual_span()) {
            Some(end) => rva >= self.virtual_address && rva < end,
            None => false,
        }
    }

    /// Translate `rva` to a file offset if this section contains it.
    #[must_use]
    pub fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        if !self.contains_rva(rva) {
            return None;
        }

        let delta = rva - self.virtual_address;
        let offset = self.pointer_to_raw_data.checked_add(delta)?;
        usize::try_from(offset).ok()
    }
}

/// All section headers of an image, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionTable {
    sections: Vec<SectionHeader>,
}

impl SectionTable {
    /// Read `count` consecutive section headers at the current cursor position.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if the table does not fit into the buffer.
    pub fn read(parser: &mut Parser, count: u16) -> Result<SectionTable> {
        parser.ensure_remaining(usize::from(count) * SECTION_HEADER_SIZE)?;

        let mut sections = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            sections.push(SectionHeader::read(parser)?);
        }

        Ok(SectionTable { sections })
    }

    /// Number of sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Returns `true` if the image declares no sections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// The section headers as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[SectionHeader] {
        &self.sections
    }

    /// Iterate the section headers in table order.
    pub fn iter(&self) -> impl Iterator<Item = &SectionHeader> {
        self.sections.iter()
    }

    /// The first section, in table order, that contains `rva`.
    #[must_use]
    pub fn section_for_rva(&self, rva: u32) -> Option<&SectionHeader> {
        self.sections.iter().find(|section| section.contains_rva(rva))
    }

    /// Translate an RVA to a file offset.
    ///
    /// Returns `None` if no section covers `rva`. The result is not checked against the
    /// length of the file.
    #[must_use]
    pub fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        self.section_for_rva(rva)?.rva_to_offset(rva)
    }

    /// Translate a file offset back into an RVA.
    ///
    /// Returns `None` if no section's raw data covers `offset`.
    #[must_use]
    pub fn offset_to_rva(&self, offset: usize) -> Option<u32> {
        let offset = u32::try_from(offset).ok()?;
        self.sections.iter().find_map(|section| {
            let end = section.pointer_to_raw_data.checked_add(section.size_of_raw_data)?;
            if offset >= section.pointer_to_raw_data && offset < end {
                section
                    .virtual_address
                    .checked_add(offset - section.pointer_to_raw_data)
            } else {
                None
            }
        })
    }
}

impl<'a> IntoIterator for &'a SectionTable {
    type Item = &'a SectionHeader;
    type IntoIter = std::slice::Iter<'a, SectionHeader>;

    fn into_iter(self) -> Self::IntoIter {
        self.sections.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(virtual_address: u32, virtual_size: u32, raw_size: u32, raw_ptr: u32) -> SectionHeader {
        SectionHeader {
            name: *b".text\0\0\0",
            virtual_size,
            virtual_address,
            size_of_raw_data: raw_size,
            pointer_to_raw_data: raw_ptr,
            pointer_to_relocations: 0,
            pointer_to_linenumbers: 0,
            number_of_relocations: 0,
            number_of_linenumbers: 0,
            characteristics: SectionCharacteristics::CNT_CODE | SectionCharacteristics::MEM_READ,
        }
    }

    #[test]
    #[rustfmt::skip]
    fn read_header() {
        let data = [
            b'.', b'r', b'd', b'a', b't', b'a', 0x00, 0x00,
            0x00, 0x02, 0x00, 0x00, // virtual_size
            0x00, 0x20, 0x00, 0x00, // virtual_address
            0x00, 0x02, 0x00, 0x00, // size_of_raw_data
            0x00, 0x06, 0x00, 0x00, // pointer_to_raw_data
            0x00, 0x00, 0x00, 0x00, // pointer_to_relocations
            0x00, 0x00, 0x00, 0x00, // pointer_to_linenumbers
            0x00, 0x00,             // number_of_relocations
            0x00, 0x00,             // number_of_linenumbers
            0x40, 0x00, 0x00, 0x40, // characteristics
        ];

        let mut parser = Parser::new(&data);
        let table = SectionTable::read(&mut parser, 1).unwrap();
        let header = &table.as_slice()[0];

        assert_eq!(header.name_lossy(), ".rdata");
        assert_eq!(header.virtual_address, 0x2000);
        assert_eq!(header.pointer_to_raw_data, 0x600);
        assert_eq!(
            header.characteristics,
            SectionCharacteristics::CNT_INITIALIZED_DATA | SectionCharacteristics::MEM_READ
        );

        let mut parser = Parser::new(&data);
        assert!(SectionTable::read(&mut parser, 2).is_err());
    }

    #[test]
    fn translate() {
        let table = SectionTable {
            sections: vec![
                section(0x1000, 0x200, 0x200, 0x400),
                section(0x2000, 0x100, 0x200, 0x600),
            ],
        };

        assert_eq!(table.rva_to_offset(0x1000), Some(0x400));
        assert_eq!(table.rva_to_offset(0x11FF), Some(0x5FF));
        assert_eq!(table.rva_to_offset(0x1200), None);
        assert_eq!(table.rva_to_offset(0x2050), Some(0x650));
        assert_eq!(table.rva_to_offset(0x2100), None);
        assert_eq!(table.rva_to_offset(0x0FFF), None);

        assert_eq!(table.offset_to_rva(0x650), Some(0x2050));
        assert_eq!(table.offset_to_rva(0x100), None);
    }

    #[test]
    fn first_match_wins() {
        let table = SectionTable {
            sections: vec![
                section(0x1000, 0x1000, 0x1000, 0x400),
                section(0x1800, 0x1000, 0x1000, 0x4000),
            ],
        };

        assert_eq!(table.rva_to_offset(0x1900), Some(0x1300));
        assert_eq!(table.rva_to_offset(0x2100), Some(0x4900));
    }

    #[test]
    fn zero_virtual_size_uses_raw_size() {
        let table = SectionTable {
            sections: vec![section(0x1000, 0, 0x200, 0x400)],
        };
        assert_eq!(table.rva_to_offset(0x1100), Some(0x500));
        assert_eq!(table.rva_to_offset(0x1200), None);
    }

    #[test]
    fn overflowing_sections_never_match() {
        let table = SectionTable {
            sections: vec![
                section(0xFFFF_F000, 0x2000, 0x2000, 0x400),
                section(0x1000, 0x1000, 0x1000, 0xFFFF_FF00),
            ],
        };
        assert_eq!(table.rva_to_offset(0xFFFF_F800), None);
        assert_eq!(table.rva_to_offset(0x1080), Some(0xFFFF_FF80));
        assert_eq!(table.rva_to_offset(0x1200), None);
    }

    #[test]
    fn lossy_names() {
        let mut header = section(0, 0, 0, 0);
        header.name = *b"ABCDEFGH";
        assert_eq!(header.name_lossy(), "ABCDEFGH");
        header.name = [b'x', 0xFF, 0, 0, 0, 0, 0, 0];
        assert_eq!(header.name_lossy(), "x\u{FFFD}");
    }
}
