//! The parsed image.
//!
//! [`PeImage`] runs the structural header decoder and then every optional stage enabled in
//! [`ParserConfig`]: imports, delay-load imports, exports, the attribute certificate and the CLR
//! metadata. Header decoding is the only fatal step. Each optional stage is isolated: its
//! failure is logged, recorded in the [`ParseReport`], and leaves the other stages untouched.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pescope::{image::StageStatus, PeImage};
//!
//! let image = PeImage::from_file("kernel32.dll".as_ref())?;
//! println!("{} image for {}", image.bitness(), image.machine_name());
//! for dll in image.dependencies() {
//!     println!("depends on {}", dll);
//! }
//! if let StageStatus::Failed(reason) = &image.status().exports {
//!     eprintln!("exports damaged: {}", reason);
//! }
//! # Ok::<(), pescope::Error>(())
//! ```

use std::{fmt, path::Path};

use rayon::prelude::*;

use crate::{
    config::ParserConfig,
    file::{
        pe::{
            certificate::CertificateInfo,
            exports::Exports,
            header::{Bitness, DataDirectory, DataDirectoryKind, ImageHeader},
            imports::{Import, Imports},
            section::SectionTable,
        },
        File,
    },
    metadata::clrinfo::ClrInfo,
    Result,
};

/// Outcome of one optional parse stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageStatus {
    /// Turned off in the [`ParserConfig`]
    Disabled,
    /// The image has no data directory for this stage
    NotPresent,
    /// The stage completed; its result may still be partial where single records were damaged
    Parsed,
    /// The stage failed as a whole
    Failed(String),
}

impl StageStatus {
    /// Returns `true` for [`StageStatus::Parsed`].
    #[must_use]
    pub fn is_parsed(&self) -> bool {
        matches!(self, StageStatus::Parsed)
    }

    /// Returns `true` for [`StageStatus::Failed`].
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, StageStatus::Failed(_))
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Disabled => write!(f, "disabled"),
            StageStatus::NotPresent => write!(f, "not present"),
            StageStatus::Parsed => write!(f, "parsed"),
            StageStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Per-stage outcome of a parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseReport {
    /// The import directory
    pub imports: StageStatus,
    /// The delay-load import directory
    pub delay_imports: StageStatus,
    /// The export directory
    pub exports: StageStatus,
    /// The attribute certificate
    pub certificate: StageStatus,
    /// The CLR header and metadata
    pub clr: StageStatus,
}

impl ParseReport {
    /// Returns `true` if no stage failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.stages().iter().all(|(_, status)| !status.is_failed())
    }

    /// Every stage with its name, in execution order.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageStatus); 5] {
        [
            ("imports", &self.imports),
            ("delay imports", &self.delay_imports),
            ("exports", &self.exports),
            ("certificate", &self.certificate),
            ("clr", &self.clr),
        ]
    }
}

/// Run one optional stage, turning its error into a [`StageStatus::Failed`].
fn run_stage<T, F>(
    name: &str,
    enabled: bool,
    present: bool,
    stage: F,
) -> (Option<T>, StageStatus)
where
    F: FnOnce() -> Result<T>,
{
    if !enabled {
        return (None, StageStatus::Disabled);
    }
    if !present {
        return (None, StageStatus::NotPresent);
    }

    match stage() {
        Ok(result) => {
            log::debug!("Parsed {}", name);
            (Some(result), StageStatus::Parsed)
        }
        Err(error) => {
            log::warn!("Failed to parse {}: {}", name, error);
            (None, StageStatus::Failed(error.to_string()))
        }
    }
}

/// A parsed PE image.
///
/// Immutable once constructed; `Send + Sync`.
pub struct PeImage {
    file: File,
    imports: Imports,
    exports: Option<Exports>,
    certificate: Option<CertificateInfo>,
    clr: Option<ClrInfo>,
    report: ParseReport,
}

impl PeImage {
    /// Parse the image at `path` with the default configuration.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped or its headers are not a valid PE image.
    pub fn from_file(path: &Path) -> Result<PeImage> {
        Self::from_file_with_config(path, ParserConfig::default())
    }

    /// Parse the image at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped or its headers are not a valid PE image.
    pub fn from_file_with_config(path: &Path, config: ParserConfig) -> Result<PeImage> {
        Ok(Self::load(File::from_file(path)?, &config))
    }

    /// Parse an in-memory image with the default configuration.
    ///
    /// # Errors
    /// Returns an error if the headers are not a valid PE image.
    pub fn from_mem(data: Vec<u8>) -> Result<PeImage> {
        Self::from_mem_with_config(data, ParserConfig::default())
    }

    /// Parse an in-memory image.
    ///
    /// # Errors
    /// Returns an error if the headers are not a valid PE image.
    pub fn from_mem_with_config(data: Vec<u8>, config: ParserConfig) -> Result<PeImage> {
        Ok(Self::load(File::from_mem(data)?, &config))
    }

    /// Parse many files concurrently, one independent parse per file.
    ///
    /// Results are returned in the order of `paths`.
    pub fn from_files_parallel<P>(paths: &[P], config: ParserConfig) -> Vec<Result<PeImage>>
    where
        P: AsRef<Path> + Sync,
    {
        paths
            .par_iter()
            .map(|path| Self::from_file_with_config(path.as_ref(), config))
            .collect()
    }

    fn load(file: File, config: &ParserConfig) -> PeImage {
        let has = |kind| file.data_directory(kind).is_some();

        let (imports, imports_status) = run_stage(
            "imports",
            config.parse_imports,
            has(DataDirectoryKind::Import),
            || Imports::parse(&file, config),
        );
        let (delayed, delay_status) = run_stage(
            "delay imports",
            config.parse_delay_imports,
            has(DataDirectoryKind::DelayImport),
            || Imports::parse_delayed(&file, config),
        );
        let (exports, exports_status) = run_stage(
            "exports",
            config.parse_exports,
            has(DataDirectoryKind::Export),
            || Exports::parse(&file, config),
        );
        let (certificate, certificate_status) = run_stage(
            "certificate",
            config.parse_certificate,
            has(DataDirectoryKind::Certificate),
            || CertificateInfo::parse(&file),
        );
        let (clr, clr_status) = run_stage(
            "clr",
            config.parse_clr,
            has(DataDirectoryKind::ClrRuntimeHeader),
            || ClrInfo::parse(&file, config),
        );

        let mut imports = imports.unwrap_or_default();
        if let Some(delayed) = delayed {
            imports.append(delayed);
        }

        PeImage {
            imports,
            exports,
            certificate: certificate.flatten(),
            clr: clr.flatten(),
            report: ParseReport {
                imports: imports_status,
                delay_imports: delay_status,
                exports: exports_status,
                certificate: certificate_status,
                clr: clr_status,
            },
            file,
        }
    }

    /// The underlying file with its decoded headers.
    #[must_use]
    pub fn file(&self) -> &File {
        &self.file
    }

    /// The structural headers.
    #[must_use]
    pub fn header(&self) -> &ImageHeader {
        self.file.header()
    }

    /// PE32 or PE32+.
    #[must_use]
    pub fn bitness(&self) -> Bitness {
        self.file.bitness()
    }

    /// Name of the target machine, e.g. `X86` or `X86_64`.
    #[must_use]
    pub fn machine_name(&self) -> &'static str {
        self.header().machine_name()
    }

    /// Returns `true` if the image is a DLL.
    #[must_use]
    pub fn is_dll(&self) -> bool {
        self.header().is_dll()
    }

    /// The section table.
    #[must_use]
    pub fn sections(&self) -> &SectionTable {
        self.file.sections()
    }

    /// Regular and delay-loaded imports.
    #[must_use]
    pub fn imports(&self) -> &Imports {
        &self.imports
    }

    /// Every import record, regular imports first.
    #[must_use]
    pub fn import_records(&self) -> &[Import] {
        self.imports.records()
    }

    /// Names of the DLLs this image imports from, de-duplicated case-insensitively.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        self.imports.dependencies()
    }

    /// The export directory, if present and parsed.
    #[must_use]
    pub fn exports(&self) -> Option<&Exports> {
        self.exports.as_ref()
    }

    /// The attribute certificate header, if present and parsed.
    #[must_use]
    pub fn certificate(&self) -> Option<&CertificateInfo> {
        self.certificate.as_ref()
    }

    /// The CLR summary, if the image is managed and its COR20 header parsed.
    #[must_use]
    pub fn clr(&self) -> Option<&ClrInfo> {
        self.clr.as_ref()
    }

    /// Returns `true` if a CLR header was decoded.
    #[must_use]
    pub fn is_managed(&self) -> bool {
        self.clr.is_some()
    }

    /// Per-stage outcome of the parse.
    #[must_use]
    pub fn status(&self) -> &ParseReport {
        &self.report
    }

    /// The data directory `kind`, if present.
    #[must_use]
    pub fn data_directory(&self, kind: DataDirectoryKind) -> Option<DataDirectory> {
        self.file.data_directory(kind)
    }

    /// The bytes of data directory `kind`, if present.
    ///
    /// # Errors
    /// Returns an error if the directory is unmapped or extends past the image.
    pub fn data_directory_bytes(&self, kind: DataDirectoryKind) -> Result<Option<&[u8]>> {
        self.file.data_directory_bytes(kind)
    }

    /// Translate `rva` to a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if no section covers `rva`.
    pub fn rva_to_offset(&self, rva: u32) -> Result<usize> {
        self.file.rva_to_offset(rva)
    }

    /// `len` bytes at file offset `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if the range extends past the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.file.data_slice(offset, len)
    }

    /// The raw image bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.file.data()
    }
}

impl fmt::Debug for PeImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeImage")
            .field("bitness", &self.bitness())
            .field("machine", &self.machine_name())
            .field("sections", &self.sections().len())
            .field("imports", &self.imports.len())
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}
