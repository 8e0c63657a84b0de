//! Import and delay-load import resolution.
//!
//! Both directories list the DLLs an image depends on together with the functions taken from
//! each of them. The regular import directory is an array of 20-byte descriptors terminated by
//! an all-zero entry; the delay-load directory is an array of 32-byte descriptors terminated by
//! a zero DLL name.
//!
//! Every descriptor points at a thunk array of pointer-sized entries. A thunk with its top bit
//! set imports by ordinal; otherwise its low 31 bits are the RVA of a hint/name pair.
//!
//! Damage is contained as locally as possible: a descriptor whose name cannot be read is
//! skipped, a thunk whose name cannot be read is dropped, and a descriptor array that cannot be
//! read any further ends the walk with whatever was collected so far.

use std::collections::HashSet;

use crate::{
    config::ParserConfig,
    file::{
        pe::header::{Bitness, DataDirectoryKind},
        File,
    },
    Error::UnmappedAddress,
    Result,
};

/// Size of a regular import descriptor
const IMPORT_DESCRIPTOR_SIZE: usize = 20;

/// Size of a delay-load import descriptor
const DELAY_DESCRIPTOR_SIZE: usize = 32;

/// `dlattrRva`: descriptor fields are RVAs instead of virtual addresses
const DELAY_ATTRIBUTE_RVA: u32 = 0x1;

/// How an imported function is identified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImportName {
    /// Imported by name; the hint indexes the exporting DLL's name table
    ByName {
        /// Export name table index suggested by the linker
        hint: u16,
        /// Function name
        name: String,
    },
    /// Imported by ordinal only
    ByOrdinal(u16),
}

impl ImportName {
    /// The function name, if imported by name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            ImportName::ByName { name, .. } => Some(name),
            ImportName::ByOrdinal(_) => None,
        }
    }

    /// The ordinal for ordinal imports, or the hint for named imports.
    #[must_use]
    pub fn ordinal(&self) -> u16 {
        match self {
            ImportName::ByName { hint, .. } => *hint,
            ImportName::ByOrdinal(ordinal) => *ordinal,
        }
    }
}

impl std::fmt::Display for ImportName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportName::ByName { name, .. } => write!(f, "{}", name),
            ImportName::ByOrdinal(ordinal) => write!(f, "#{}", ordinal),
        }
    }
}

/// A single imported function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Name of the DLL this function is taken from
    pub dll: String,
    /// Name or ordinal of the function
    pub name: ImportName,
    /// RVA of the import address table slot patched by the loader
    pub iat_rva: u32,
    /// `true` for entries from the delay-load directory
    pub is_delay_loaded: bool,
}

/// Imported functions together with the list of DLLs they come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Imports {
    records: Vec<Import>,
    dependencies: Vec<String>,
    seen: HashSet<String>,
    limited: bool,
}

impl Imports {
    /// Walk the regular import directory.
    ///
    /// Returns an empty set if the directory is absent.
    ///
    /// # Errors
    /// Returns an error only if the directory itself cannot be located; damage further in
    /// truncates the result instead.
    pub fn parse(file: &File, config: &ParserConfig) -> Result<Imports> {
        let mut imports = Imports::default();
        let Some(directory) = file.data_directory(DataDirectoryKind::Import) else {
            return Ok(imports);
        };

        let bitness = file.bitness();
        let mut parser = file.parser_at_rva(directory.virtual_address)?;

        for index in 0.. {
            let descriptor = parser.transactional(|parser| {
                parser.ensure_remaining(IMPORT_DESCRIPTOR_SIZE)?;
                Ok([
                    parser.read_le::<u32>()?,
                    parser.read_le::<u32>()?,
                    parser.read_le::<u32>()?,
                    parser.read_le::<u32>()?,
                    parser.read_le::<u32>()?,
                ])
            });
            let Ok([original_first_thunk, _time_date_stamp, _forwarder_chain, name_rva, first_thunk]) =
                descriptor
            else {
                log::warn!("Import descriptor array truncated after {} entries", index);
                break;
            };

            if original_first_thunk == 0 && name_rva == 0 && first_thunk == 0 {
                break;
            }

            if index >= config.max_import_descriptors {
                log::warn!(
                    "Import walk stopped after {} descriptors",
                    config.max_import_descriptors
                );
                imports.limited = true;
                break;
            }

            let dll = match file.string_at_rva(name_rva, config.max_string_length) {
                Ok(dll) => dll,
                Err(error) => {
                    log::warn!("Skipping import descriptor {} - unreadable name: {}", index, error);
                    continue;
                }
            };

            let thunks = if original_first_thunk != 0 {
                original_first_thunk
            } else {
                first_thunk
            };

            imports.add_dependency(&dll);
            let walk = ThunkWalk {
                dll: &dll,
                thunk_rva: thunks,
                iat_rva: first_thunk,
                bitness,
                va_base: None,
                is_delay_loaded: false,
            };
            imports.limited |= walk.run(file, config, &mut imports.records);
        }

        log::debug!(
            "Resolved {} imports from {} DLLs",
            imports.records.len(),
            imports.dependencies.len()
        );
        Ok(imports)
    }

    /// Walk the delay-load import directory.
    ///
    /// Returns an empty set if the directory is absent. Descriptors using the legacy
    /// virtual-address form are converted to RVAs against the image base.
    ///
    /// # Errors
    /// Returns an error only if the directory itself cannot be located.
    pub fn parse_delayed(file: &File, config: &ParserConfig) -> Result<Imports> {
        let mut imports = Imports::default();
        let Some(directory) = file.data_directory(DataDirectoryKind::DelayImport) else {
            return Ok(imports);
        };

        let bitness = file.bitness();
        let image_base = file.imagebase();
        let mut parser = file.parser_at_rva(directory.virtual_address)?;

        for index in 0.. {
            let descriptor = parser.transactional(|parser| {
                parser.ensure_remaining(DELAY_DESCRIPTOR_SIZE)?;
                let mut fields = [0_u32; 8];
                for field in &mut fields {
                    *field = parser.read_le::<u32>()?;
                }
                Ok(fields)
            });
            let Ok([attributes, dll_name, _module_handle, iat, int, _bound_iat, _unload, _timestamp]) =
                descriptor
            else {
                log::warn!("Delay import descriptor array truncated after {} entries", index);
                break;
            };

            if dll_name == 0 {
                break;
            }

            if index >= config.max_import_descriptors {
                log::warn!(
                    "Delay import walk stopped after {} descriptors",
                    config.max_import_descriptors
                );
                imports.limited = true;
                break;
            }

            let va_base = (attributes & DELAY_ATTRIBUTE_RVA == 0).then_some(image_base);
            let resolved = [dll_name, iat, int].map(|address| to_rva(address, va_base));
            let [Some(name_rva), Some(iat_rva), Some(int_rva)] = resolved else {
                log::warn!(
                    "Skipping delay import descriptor {} - addresses below the image base",
                    index
                );
                continue;
            };

            let dll = match file.string_at_rva(name_rva, config.max_string_length) {
                Ok(dll) => dll,
                Err(error) => {
                    log::warn!(
                        "Skipping delay import descriptor {} - unreadable name: {}",
                        index,
                        error
                    );
                    continue;
                }
            };

            imports.add_dependency(&dll);
            let walk = ThunkWalk {
                dll: &dll,
                thunk_rva: if int_rva != 0 { int_rva } else { iat_rva },
                iat_rva,
                bitness,
                va_base,
                is_delay_loaded: true,
            };
            imports.limited |= walk.run(file, config, &mut imports.records);
        }

        log::debug!(
            "Resolved {} delay-loaded imports from {} DLLs",
            imports.records.len(),
            imports.dependencies.len()
        );
        Ok(imports)
    }

    /// Move all records and dependencies of `other` into `self`, keeping the first-seen order
    /// of dependencies.
    pub fn append(&mut self, other: Imports) {
        for dll in &other.dependencies {
            self.add_dependency(dll);
        }
        self.records.extend(other.records);
        self.limited |= other.limited;
    }

    /// All imported functions, in directory order.
    #[must_use]
    pub fn records(&self) -> &[Import] {
        &self.records
    }

    /// DLL names in first-seen order, de-duplicated case-insensitively.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Number of imported functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no function is imported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns `true` if a descriptor or thunk walk stopped at a [`ParserConfig`] limit while
    /// more entries followed.
    #[must_use]
    pub fn is_limited(&self) -> bool {
        self.limited
    }

    /// Iterate all imports taken from `dll`, compared case-insensitively.
    pub fn by_dll<'a>(&'a self, dll: &'a str) -> impl Iterator<Item = &'a Import> + 'a {
        self.records
            .iter()
            .filter(move |import| import.dll.eq_ignore_ascii_case(dll))
    }

    fn add_dependency(&mut self, dll: &str) {
        if self.seen.insert(dll.to_ascii_lowercase()) {
            self.dependencies.push(dll.to_string());
        }
    }
}

/// Convert a legacy virtual address into an RVA; RVAs pass through unchanged.
fn to_rva(address: u32, va_base: Option<u64>) -> Option<u32> {
    match va_base {
        None => Some(address),
        Some(_) if address == 0 => Some(0),
        Some(base) => u64::from(address)
            .checked_sub(base)
            .and_then(|rva| u32::try_from(rva).ok()),
    }
}

/// One thunk array to be turned into import records.
struct ThunkWalk<'a> {
    dll: &'a str,
    thunk_rva: u32,
    iat_rva: u32,
    bitness: Bitness,
    /// Image base to subtract from hint/name pointers of legacy delay descriptors
    va_base: Option<u64>,
    is_delay_loaded: bool,
}

impl ThunkWalk<'_> {
    /// Append the records of this thunk array. Returns `true` if the walk stopped at
    /// `max_thunks_per_descriptor` before the terminator.
    fn run(&self, file: &File, config: &ParserConfig, records: &mut Vec<Import>) -> bool {
        let mut parser = match file.parser_at_rva(self.thunk_rva) {
            Ok(parser) => parser,
            Err(error) => {
                log::warn!("Skipping thunks of {} - {}", self.dll, error);
                return false;
            }
        };

        let wide = self.bitness == Bitness::Pe32Plus;
        let ordinal_flag = if wide { 1_u64 << 63 } else { 1_u64 << 31 };
        let step = self.bitness.pointer_size() as u32;
        let slot_base = if self.iat_rva != 0 {
            self.iat_rva
        } else {
            self.thunk_rva
        };

        for index in 0..config.max_thunks_per_descriptor {
            let thunk = match parser.read_word(wide) {
                Ok(0) => return false,
                Ok(thunk) => thunk,
                Err(error) => {
                    log::warn!("Thunk array of {} truncated - {}", self.dll, error);
                    return false;
                }
            };

            let Some(iat_rva) = u32::try_from(index)
                .ok()
                .and_then(|index| index.checked_mul(step))
                .and_then(|delta| slot_base.checked_add(delta))
            else {
                return false;
            };

            let name = if thunk & ordinal_flag != 0 {
                ImportName::ByOrdinal((thunk & 0xFFFF) as u16)
            } else {
                match self.read_hint_name(file, config, thunk) {
                    Ok(name) => name,
                    Err(error) => {
                        log::warn!("Dropping import {} of {} - {}", index, self.dll, error);
                        continue;
                    }
                }
            };

            records.push(Import {
                dll: self.dll.to_string(),
                name,
                iat_rva,
                is_delay_loaded: self.is_delay_loaded,
            });
        }

        // A full array is only cut short if its terminator does not follow
        if let Ok(0) = parser.read_word(wide) {
            return false;
        }

        log::warn!(
            "Thunk walk of {} stopped after {} entries",
            self.dll,
            config.max_thunks_per_descriptor
        );
        true
    }

    fn read_hint_name(&self, file: &File, config: &ParserConfig, thunk: u64) -> Result<ImportName> {
        let address = (thunk & 0x7FFF_FFFF) as u32;
        let rva = to_rva(address, self.va_base).ok_or(UnmappedAddress(address))?;

        let mut parser = file.parser_at_rva(rva)?;
        let hint = parser.read_le::<u16>()?;
        let name = parser.read_string_lossy(config.max_string_length)?;

        Ok(ImportName::ByName { hint, name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{ImageBuilder, ImportSpec};

    #[test]
    fn import_names() {
        let named = ImportName::ByName {
            hint: 0x15A,
            name: "ExitProcess".to_string(),
        };
        assert_eq!(named.name(), Some("ExitProcess"));
        assert_eq!(named.ordinal(), 0x15A);
        assert_eq!(named.to_string(), "ExitProcess");

        let ordinal = ImportName::ByOrdinal(17);
        assert_eq!(ordinal.name(), None);
        assert_eq!(ordinal.to_string(), "#17");
    }

    #[test]
    fn legacy_addresses() {
        assert_eq!(to_rva(0x2000, None), Some(0x2000));
        assert_eq!(to_rva(0x0040_2000, Some(0x0040_0000)), Some(0x2000));
        assert_eq!(to_rva(0, Some(0x0040_0000)), Some(0));
        assert_eq!(to_rva(0x1000, Some(0x0040_0000)), None);
    }

    #[test]
    fn walk_pe32() {
        let image = ImageBuilder::pe32()
            .imports(vec![
                ImportSpec::new("KERNEL32.dll").named(0x15A, "ExitProcess").ordinal(17),
                ImportSpec::new("user32.dll").named(0, "MessageBoxA"),
                ImportSpec::new("kernel32.DLL").named(1, "Sleep"),
            ])
            .build();
        let file = File::from_mem(image).unwrap();

        let imports = Imports::parse(&file, &ParserConfig::default()).unwrap();
        assert_eq!(imports.len(), 4);
        assert_eq!(imports.dependencies(), &["KERNEL32.dll", "user32.dll"]);

        let records = imports.records();
        assert_eq!(records[0].dll, "KERNEL32.dll");
        assert_eq!(
            records[0].name,
            ImportName::ByName {
                hint: 0x15A,
                name: "ExitProcess".to_string()
            }
        );
        assert_eq!(records[1].name, ImportName::ByOrdinal(17));
        assert_eq!(records[1].iat_rva, records[0].iat_rva + 4);
        assert!(!records[0].is_delay_loaded);
        assert_eq!(imports.by_dll("KERNEL32.DLL").count(), 3);
    }

    #[test]
    fn walk_pe32_plus() {
        let image = ImageBuilder::pe32_plus()
            .imports(vec![ImportSpec::new("ntdll.dll")
                .named(3, "NtClose")
                .ordinal(0x8001)])
            .build();
        let file = File::from_mem(image).unwrap();

        let imports = Imports::parse(&file, &ParserConfig::default()).unwrap();
        let records = imports.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name.name(), Some("NtClose"));
        assert_eq!(records[1].name, ImportName::ByOrdinal(0x8001));
        assert_eq!(records[1].iat_rva, records[0].iat_rva + 8);
    }

    #[test]
    fn thunk_limit() {
        let image = ImageBuilder::pe32()
            .imports(vec![ImportSpec::new("a.dll")
                .named(0, "A")
                .named(1, "B")
                .named(2, "C")])
            .build();
        let file = File::from_mem(image).unwrap();

        let config = ParserConfig {
            max_thunks_per_descriptor: 2,
            ..ParserConfig::default()
        };
        let imports = Imports::parse(&file, &config).unwrap();
        assert_eq!(imports.len(), 2);
        assert!(imports.is_limited());
    }

    #[test]
    fn thunk_array_filling_the_limit() {
        for builder in [ImageBuilder::pe32(), ImageBuilder::pe32_plus()] {
            let image = builder
                .imports(vec![ImportSpec::new("a.dll").named(0, "A").named(1, "B")])
                .build();
            let file = File::from_mem(image).unwrap();

            let config = ParserConfig {
                max_thunks_per_descriptor: 2,
                ..ParserConfig::default()
            };
            let imports = Imports::parse(&file, &config).unwrap();
            assert_eq!(imports.len(), 2);
            assert!(!imports.is_limited());
        }
    }

    #[test]
    fn descriptor_limit() {
        let specs = |count: usize| {
            (0..count)
                .map(|index| ImportSpec::new(&format!("dep{}.dll", index)).ordinal(1))
                .collect::<Vec<_>>()
        };
        let config = ParserConfig {
            max_import_descriptors: 3,
            ..ParserConfig::default()
        };

        let file = File::from_mem(ImageBuilder::pe32().imports(specs(3)).build()).unwrap();
        let imports = Imports::parse(&file, &config).unwrap();
        assert_eq!(imports.dependencies().len(), 3);
        assert!(!imports.is_limited());

        let file = File::from_mem(ImageBuilder::pe32().imports(specs(4)).build()).unwrap();
        let imports = Imports::parse(&file, &config).unwrap();
        assert_eq!(imports.dependencies().len(), 3);
        assert!(imports.is_limited());

        let file = File::from_mem(ImageBuilder::pe32().delay_imports(specs(3)).build()).unwrap();
        let delayed = Imports::parse_delayed(&file, &config).unwrap();
        assert_eq!(delayed.dependencies().len(), 3);
        assert!(!delayed.is_limited());
    }

    #[test]
    fn delayed() {
        let image = ImageBuilder::pe32()
            .imports(vec![ImportSpec::new("KERNEL32.dll").named(0, "ExitProcess")])
            .delay_imports(vec![ImportSpec::new("WINHTTP.dll")
                .named(4, "WinHttpOpen")
                .ordinal(9)])
            .build();
        let file = File::from_mem(image).unwrap();

        let mut imports = Imports::parse(&file, &ParserConfig::default()).unwrap();
        let delayed = Imports::parse_delayed(&file, &ParserConfig::default()).unwrap();
        assert_eq!(delayed.len(), 2);
        assert!(delayed.records().iter().all(|import| import.is_delay_loaded));
        assert_eq!(delayed.records()[0].name.name(), Some("WinHttpOpen"));
        assert_eq!(delayed.records()[1].name, ImportName::ByOrdinal(9));

        imports.append(delayed);
        assert_eq!(imports.dependencies(), &["KERNEL32.dll", "WINHTTP.dll"]);
        assert_eq!(imports.len(), 3);
    }

    #[test]
    fn absent_directory() {
        let file = File::from_mem(ImageBuilder::pe32().build()).unwrap();
        assert!(Imports::parse(&file, &ParserConfig::default()).unwrap().is_empty());
        assert!(Imports::parse_delayed(&file, &ParserConfig::default())
            .unwrap()
            .is_empty());
    }
}
