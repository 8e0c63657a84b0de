//! Parser configuration
//!
//! This module controls which optional stages run after the structural headers have been
//! decoded, and bounds every walk over terminator-driven or count-driven structures found in
//! untrusted images.

/// Configuration for parsing a single image
///
/// Passed explicitly to [`crate::PeImage::from_mem_with_config`] and friends; there is no
/// global configuration. Every limit applies per image.
///
/// # Examples
///
/// ```rust
/// use pescope::ParserConfig;
///
/// let config = ParserConfig {
///     max_exports: 1024,
///     ..ParserConfig::default()
/// };
/// assert!(config.parse_imports);
/// assert!(!ParserConfig::headers_only().parse_clr);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ParserConfig {
    /// Walk the import directory
    pub parse_imports: bool,

    /// Walk the delay-load import directory
    pub parse_delay_imports: bool,

    /// Walk the export directory
    pub parse_exports: bool,

    /// Locate the attribute certificate and decode its header
    pub parse_certificate: bool,

    /// Decode the CLR header and its metadata
    pub parse_clr: bool,

    /// Walk the TypeDef table to collect publicly visible type names (requires `parse_clr`)
    pub discover_public_types: bool,

    /// Reject CLR headers whose size field is not 72 or whose reserved fields are set
    pub strict_clr_header: bool,

    /// Maximum number of import or delay-import descriptors per directory (default: 4096)
    pub max_import_descriptors: usize,

    /// Maximum number of thunks walked per import descriptor (default: 65536)
    pub max_thunks_per_descriptor: usize,

    /// Maximum number of export address table entries (default: 65536)
    pub max_exports: usize,

    /// Maximum number of metadata streams (default: 16)
    pub max_streams: usize,

    /// Maximum length of any NUL-terminated string, terminator excluded (default: 4096)
    pub max_string_length: usize,

    /// Maximum number of TypeDef rows walked during public type discovery (default: 1_000_000)
    pub max_type_rows: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            parse_imports: true,
            parse_delay_imports: true,
            parse_exports: true,
            parse_certificate: true,
            parse_clr: true,
            discover_public_types: true,
            strict_clr_header: false,
            max_import_descriptors: 4096,
            max_thunks_per_descriptor: 65536,
            max_exports: 65536,
            max_streams: 16,
            max_string_length: 4096,
            max_type_rows: 1_000_000,
        }
    }
}

impl ParserConfig {
    /// Decode the structural headers and the section table only
    ///
    /// Every optional stage reports [`crate::image::StageStatus::Disabled`].
    #[must_use]
    pub fn headers_only() -> Self {
        Self {
            parse_imports: false,
            parse_delay_imports: false,
            parse_exports: false,
            parse_certificate: false,
            parse_clr: false,
            discover_public_types: false,
            ..Self::default()
        }
    }

    /// Default stages with strict CLR header checks and tighter walk limits
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict_clr_header: true,
            max_import_descriptors: 1024,
            max_thunks_per_descriptor: 16384,
            max_exports: 16384,
            max_string_length: 1024,
            ..Self::default()
        }
    }
}
