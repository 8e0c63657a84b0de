//! Summary of the CLR data of a managed image.
//!
//! [`ClrInfo::parse`] follows the `ClrRuntimeHeader` directory to the COR20 header, then the
//! metadata root, its stream directory and the tables stream. From the tables it extracts the
//! module name, the MVID and the names of the publicly visible types.
//!
//! Only the COR20 header is required. Problems further down (a damaged stream directory, an
//! unlocatable string heap, an unreadable type name) are logged, recorded in
//! [`MetadataInfo::issues`] or [`ClrInfo::metadata_error`], and leave the rest of the summary
//! intact.

use crate::{
    config::ParserConfig,
    file::{pe::header::DataDirectoryKind, File},
    metadata::{
        cor20header::{Architecture, Cor20Header, EntryPoint, COR20_HEADER_SIZE},
        root::Root,
        streams::{Guid, StreamHeader, Strings, TableSummary, TablesHeader},
        tables::{ModuleRaw, TypeDefRaw},
    },
    Result,
};

/// The decoded CLR header and a summary of the metadata it locates.
#[derive(Clone, Debug, PartialEq)]
pub struct ClrInfo {
    /// The COR20 header
    pub header: Cor20Header,
    /// Target architecture derived from the runtime flags
    pub architecture: Architecture,
    /// Names of the set runtime flags
    pub flags: Vec<&'static str>,
    /// The metadata summary, `None` if the header locates no metadata or it failed to parse
    pub metadata: Option<MetadataInfo>,
    /// Why the metadata could not be summarized
    pub metadata_error: Option<String>,
}

/// Structural summary of the metadata root and tables.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct MetadataInfo {
    /// Runtime version string of the metadata root, e.g. `v4.0.30319`
    pub version: String,
    /// The stream directory
    pub streams: Vec<StreamHeader>,
    /// Every present, locatable table
    pub tables: Vec<TableSummary>,
    /// `valid` bits naming tables outside the known set
    pub unknown_tables: Vec<u8>,
    /// Name of the module, from the `Module` table
    pub module_name: Option<String>,
    /// Module version id, from the `Module` table
    pub mvid: Option<uguid::Guid>,
    /// Names of types with the public visibility bit set, `Namespace.Name` or the bare name
    pub public_types: Vec<String>,
    /// Recoverable problems met while summarizing
    pub issues: Vec<String>,
}

impl ClrInfo {
    /// Decode the CLR data of `file`.
    ///
    /// Returns `None` if the image has no `ClrRuntimeHeader` directory.
    ///
    /// # Errors
    /// Returns an error if the COR20 header is unmapped, truncated, or rejected in strict
    /// mode.
    pub fn parse(file: &File, config: &ParserConfig) -> Result<Option<ClrInfo>> {
        let Some(directory) = file.data_directory(DataDirectoryKind::ClrRuntimeHeader) else {
            return Ok(None);
        };

        let header_data = file.slice_at_rva(directory.virtual_address, COR20_HEADER_SIZE)?;
        let header = Cor20Header::read(header_data, config.strict_clr_header)?;
        let flags = header.clr_flags();

        log::debug!(
            "CLR header v{}.{}, flags 0x{:08x}, metadata at 0x{:08x} ({} bytes)",
            header.major_runtime_version,
            header.minor_runtime_version,
            header.flags,
            header.meta_data_rva,
            header.meta_data_size
        );

        let (metadata, metadata_error) = if header.meta_data_rva == 0 {
            (None, None)
        } else {
            match MetadataInfo::parse(file, &header, config) {
                Ok(metadata) => (Some(metadata), None),
                Err(error) => {
                    log::warn!("Failed to parse CLR metadata: {}", error);
                    (None, Some(error.to_string()))
                }
            }
        };

        Ok(Some(ClrInfo {
            architecture: Architecture::from_flags(flags),
            flags: flags.descriptions(),
            header,
            metadata,
            metadata_error,
        }))
    }

    /// The entry point named by the header.
    #[must_use]
    pub fn entry_point(&self) -> EntryPoint {
        self.header.entry_point()
    }
}

impl MetadataInfo {
    fn parse(file: &File, header: &Cor20Header, config: &ParserConfig) -> Result<MetadataInfo> {
        let data = file.slice_at_rva(header.meta_data_rva, header.meta_data_size as usize)?;
        let root = Root::read(data, config.max_streams)?;

        let mut info = MetadataInfo {
            version: root.version.clone(),
            streams: root.stream_headers.clone(),
            ..MetadataInfo::default()
        };

        let Some(tables_stream) = root.tables_stream() else {
            info.issue("Metadata has no tables stream".to_string());
            return Ok(info);
        };

        let tables = TablesHeader::from(root.stream_data(data, tables_stream)?)?;
        info.tables = tables.summaries().to_vec();
        info.unknown_tables = tables.layout().unknown_tables().to_vec();

        let strings = match string_heap(data, &root, tables_stream, &tables) {
            Ok(strings) => strings,
            Err(error) => {
                info.issue(format!("String heap is not locatable: {}", error));
                return Ok(info);
            }
        };

        let guids = root
            .stream("#GUID")
            .and_then(|guid| root.stream_data(data, guid).ok())
            .and_then(|guid| Guid::from(guid).ok());

        if let Err(error) = info.read_module(&tables, &strings, guids.as_ref(), config) {
            info.issue(format!("Module row is unreadable: {}", error));
        }

        if config.discover_public_types {
            if let Err(error) = info.read_public_types(&tables, &strings, config) {
                info.issue(format!("TypeDef table is unreadable: {}", error));
            }
        }

        Ok(info)
    }

    fn issue(&mut self, message: String) {
        log::warn!("{}", message);
        self.issues.push(message);
    }

    fn read_module(
        &mut self,
        tables: &TablesHeader,
        strings: &Strings,
        guids: Option<&Guid>,
        config: &ParserConfig,
    ) -> Result<()> {
        let Some(modules) = tables.table::<ModuleRaw>()? else {
            return Ok(());
        };
        let module = modules.get(1)?;

        self.module_name = Some(
            strings
                .get_bounded(module.name as usize, config.max_string_length)?
                .to_string(),
        );

        if module.mvid != 0 {
            self.mvid = match guids {
                Some(guids) => Some(guids.get(module.mvid as usize)?),
                None => None,
            };
        }

        Ok(())
    }

    fn read_public_types(
        &mut self,
        tables: &TablesHeader,
        strings: &Strings,
        config: &ParserConfig,
    ) -> Result<()> {
        let Some(types) = tables.table::<TypeDefRaw>()? else {
            return Ok(());
        };

        if types.row_count() as usize > config.max_type_rows {
            log::warn!(
                "TypeDef table has {} rows, walking the first {}",
                types.row_count(),
                config.max_type_rows
            );
        }

        for row in types.iter().take(config.max_type_rows) {
            let row = row?;
            if !row.is_public() {
                continue;
            }

            let name = strings.get_bounded(row.type_name as usize, config.max_string_length);
            let namespace =
                strings.get_bounded(row.type_namespace as usize, config.max_string_length);

            match (name, namespace) {
                (Ok(name), Ok("")) => self.public_types.push(name.to_string()),
                (Ok(name), Ok(namespace)) => {
                    self.public_types.push(format!("{}.{}", namespace, name));
                }
                (Err(error), _) | (_, Err(error)) => {
                    log::debug!("Skipping type {}: {}", row.token, error);
                }
            }
        }

        Ok(())
    }
}

/// Locate the `#Strings` heap: the listed stream if there is one, otherwise the bytes right
/// after the last table row.
fn string_heap<'a>(
    data: &'a [u8],
    root: &Root,
    tables_stream: &StreamHeader,
    tables: &TablesHeader,
) -> Result<Strings<'a>> {
    let after_tables = tables
        .end_of_tables()
        .ok()
        .and_then(|end| (tables_stream.offset as usize).checked_add(end));

    if let Some(header) = root.stream("#Strings") {
        if after_tables.is_some_and(|offset| offset != header.offset as usize) {
            log::debug!(
                "#Strings at 0x{:x} does not follow the tables, which end at 0x{:x}",
                header.offset,
                after_tables.unwrap_or_default()
            );
        }
        return Strings::from(root.stream_data(data, header)?);
    }

    let start = match after_tables {
        Some(start) => start,
        None => tables_stream.offset as usize + tables.end_of_tables()?,
    };
    log::debug!("No #Strings stream, using the bytes after the tables at 0x{:x}", start);

    Strings::from(data.get(start..).ok_or(crate::Error::TruncatedRead)?)
}
