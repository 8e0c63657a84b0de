//! Export directory resolution.
//!
//! The export directory consists of three parallel arrays: the export address table (one RVA
//! per ordinal), the name pointer table and the name ordinal table, the latter two mapping
//! names onto indices of the address table. Slots without a name are exported by ordinal only;
//! slots whose RVA points back into the export directory hold a forwarder string of the form
//! `DLL.Function` instead of code.

use std::collections::HashMap;

use crate::{
    config::ParserConfig,
    file::{pe::header::DataDirectoryKind, File},
    Result,
};

/// Size of the export directory table
const EXPORT_DIRECTORY_SIZE: usize = 40;

/// A single exported function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// Export name, `None` for ordinal-only exports
    pub name: Option<String>,
    /// Ordinal base plus the index into the export address table
    pub ordinal: u32,
    /// Export address table entry
    pub rva: u32,
    /// Target of a forwarded export, e.g. `NTDLL.RtlAllocateHeap`
    pub forwarder: Option<String>,
}

impl Export {
    /// Returns `true` if this export forwards to another DLL.
    #[must_use]
    pub fn is_forwarded(&self) -> bool {
        self.forwarder.is_some()
    }
}

/// The decoded export directory of an image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exports {
    /// Name of the exporting module, as recorded by the linker
    pub dll_name: Option<String>,
    /// Ordinal of the first export address table entry
    pub ordinal_base: u32,
    /// Creation time of the export data
    pub time_date_stamp: u32,
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    entries: Vec<Export>,
}

impl Exports {
    /// Walk the export directory.
    ///
    /// Returns an empty set if the directory is absent.
    ///
    /// # Errors
    /// Returns an error if the directory table itself cannot be read; damage inside the
    /// arrays drops the affected entries instead.
    pub fn parse(file: &File, config: &ParserConfig) -> Result<Exports> {
        let Some(directory) = file.data_directory(DataDirectoryKind::Export) else {
            return Ok(Exports::default());
        };

        let mut parser = file.parser_at_rva(directory.virtual_address)?;
        parser.ensure_remaining(EXPORT_DIRECTORY_SIZE)?;

        let _characteristics = parser.read_le::<u32>()?;
        let time_date_stamp = parser.read_le::<u32>()?;
        let major_version = parser.read_le::<u16>()?;
        let minor_version = parser.read_le::<u16>()?;
        let name_rva = parser.read_le::<u32>()?;
        let ordinal_base = parser.read_le::<u32>()?;
        let number_of_functions = parser.read_le::<u32>()? as usize;
        let number_of_names = parser.read_le::<u32>()? as usize;
        let address_of_functions = parser.read_le::<u32>()?;
        let address_of_names = parser.read_le::<u32>()?;
        let address_of_name_ordinals = parser.read_le::<u32>()?;

        let dll_name = match file.string_at_rva(name_rva, config.max_string_length) {
            Ok(name) => Some(name),
            Err(error) => {
                log::warn!("Export directory name unreadable - {}", error);
                None
            }
        };

        let function_count = clamp(number_of_functions, config.max_exports, "functions");
        let name_count = clamp(number_of_names, config.max_exports, "names");
        let names = read_names(
            file,
            config,
            address_of_names,
            address_of_name_ordinals,
            name_count,
        );

        let mut entries = Vec::new();
        if function_count > 0 {
            match file.parser_at_rva(address_of_functions) {
                Ok(mut functions) => {
                    for index in 0..function_count {
                        let rva = match functions.read_le::<u32>() {
                            Ok(rva) => rva,
                            Err(error) => {
                                log::warn!("Export address table truncated - {}", error);
                                break;
                            }
                        };
                        if rva == 0 {
                            continue;
                        }

                        let Some(ordinal) = u32::try_from(index)
                            .ok()
                            .and_then(|index| ordinal_base.checked_add(index))
                        else {
                            break;
                        };

                        let forwarder = if directory.contains(rva) {
                            match file.string_at_rva(rva, config.max_string_length) {
                                Ok(target) => Some(target),
                                Err(error) => {
                                    log::warn!("Dropping forwarded export #{} - {}", ordinal, error);
                                    continue;
                                }
                            }
                        } else {
                            None
                        };

                        entries.push(Export {
                            name: names.get(&index).cloned(),
                            ordinal,
                            rva,
                            forwarder,
                        });
                    }
                }
                Err(error) => log::warn!("Export address table unreadable - {}", error),
            }
        }

        log::debug!("Resolved {} exports", entries.len());
        Ok(Exports {
            dll_name,
            ordinal_base,
            time_date_stamp,
            major_version,
            minor_version,
            entries,
        })
    }

    /// All exports in ordinal order.
    #[must_use]
    pub fn entries(&self) -> &[Export] {
        &self.entries
    }

    /// Number of exports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is exported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an export by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Export> {
        self.entries
            .iter()
            .find(|export| export.name.as_deref() == Some(name))
    }

    /// Look up an export by ordinal.
    #[must_use]
    pub fn by_ordinal(&self, ordinal: u32) -> Option<&Export> {
        self.entries.iter().find(|export| export.ordinal == ordinal)
    }
}

fn clamp(count: usize, limit: usize, what: &str) -> usize {
    if count > limit {
        log::warn!("Export directory declares {} {}, reading {}", count, what, limit);
        limit
    } else {
        count
    }
}

/// Map export address table indices to names; the first name for an index wins.
fn read_names(
    file: &File,
    config: &ParserConfig,
    address_of_names: u32,
    address_of_name_ordinals: u32,
    count: usize,
) -> HashMap<usize, String> {
    let mut names = HashMap::new();
    if count == 0 {
        return names;
    }

    let (mut pointers, mut ordinals) = match (
        file.parser_at_rva(address_of_names),
        file.parser_at_rva(address_of_name_ordinals),
    ) {
        (Ok(pointers), Ok(ordinals)) => (pointers, ordinals),
        (Err(error), _) | (_, Err(error)) => {
            log::warn!("Export name tables unreadable - {}", error);
            return names;
        }
    };

    for _ in 0..count {
        let (Ok(name_rva), Ok(index)) = (pointers.read_le::<u32>(), ordinals.read_le::<u16>())
        else {
            log::warn!("Export name tables truncated after {} entries", names.len());
            break;
        };

        match file.string_at_rva(name_rva, config.max_string_length) {
            Ok(name) => {
                names.entry(usize::from(index)).or_insert(name);
            }
            Err(error) => log::warn!("Dropping export name for index {} - {}", index, error),
        }
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{ExportSpec, ImageBuilder};

    #[test]
    fn named_ordinal_and_forwarded() {
        let image = ImageBuilder::pe32()
            .dll()
            .exports(
                ExportSpec::new("sample.dll", 5)
                    .function("Alpha", 0x1010)
                    .unnamed(0x1020)
                    .empty()
                    .forwarder("HeapAlloc", "NTDLL.RtlAllocateHeap"),
            )
            .build();
        let file = File::from_mem(image).unwrap();

        let exports = Exports::parse(&file, &ParserConfig::default()).unwrap();
        assert_eq!(exports.dll_name.as_deref(), Some("sample.dll"));
        assert_eq!(exports.ordinal_base, 5);
        assert_eq!(exports.len(), 3);

        let alpha = exports.by_name("Alpha").unwrap();
        assert_eq!(alpha.ordinal, 5);
        assert_eq!(alpha.rva, 0x1010);
        assert!(!alpha.is_forwarded());

        let unnamed = exports.by_ordinal(6).unwrap();
        assert_eq!(unnamed.name, None);
        assert_eq!(unnamed.rva, 0x1020);

        assert!(exports.by_ordinal(7).is_none());

        let forwarded = exports.by_name("HeapAlloc").unwrap();
        assert_eq!(forwarded.ordinal, 8);
        assert_eq!(forwarded.forwarder.as_deref(), Some("NTDLL.RtlAllocateHeap"));
    }

    #[test]
    fn export_limit() {
        let image = ImageBuilder::pe32()
            .exports(
                ExportSpec::new("limit.dll", 1)
                    .function("A", 0x1000)
                    .function("B", 0x1004)
                    .function("C", 0x1008),
            )
            .build();
        let file = File::from_mem(image).unwrap();

        let config = ParserConfig {
            max_exports: 2,
            ..ParserConfig::default()
        };
        let exports = Exports::parse(&file, &config).unwrap();
        assert_eq!(exports.len(), 2);
        assert_eq!(exports.entries()[1].name.as_deref(), Some("B"));
    }

    #[test]
    fn unmapped_directory() {
        let image = ImageBuilder::pe32().directory(0, 0x00F0_0000, 40).build();
        let file = File::from_mem(image).unwrap();
        assert!(Exports::parse(&file, &ParserConfig::default()).is_err());
    }
}
