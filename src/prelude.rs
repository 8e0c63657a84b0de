//! # pescope Prelude
//!
//! The most commonly used types of the library. Import this module to get quick access to
//! everything needed for a structural summary of an image.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all pescope operations
pub use crate::Error;

/// The result type used throughout pescope
pub use crate::Result;

/// Parse stages and walk limits
pub use crate::ParserConfig;

// ================================================================================================
// Images
// ================================================================================================

/// A parsed image and its per-stage report
pub use crate::image::{ParseReport, PeImage, StageStatus};

/// An image with its decoded headers
pub use crate::File;

// ================================================================================================
// PE/COFF Structures
// ================================================================================================

/// Headers and data directories
pub use crate::file::pe::header::{Bitness, DataDirectory, DataDirectoryKind, ImageHeader};

/// Sections and RVA translation
pub use crate::file::pe::section::{SectionCharacteristics, SectionHeader, SectionTable};

/// Imports and exports
pub use crate::file::pe::{
    exports::{Export, Exports},
    imports::{Import, ImportName, Imports},
};

/// The attribute certificate
pub use crate::file::pe::certificate::CertificateInfo;

// ================================================================================================
// CLR Metadata
// ================================================================================================

/// The CLR summary
pub use crate::metadata::clrinfo::{ClrInfo, MetadataInfo};

/// COR20 header and architecture
pub use crate::metadata::cor20header::{Architecture, ClrFlags, Cor20Header, EntryPoint};

/// Tables and tokens
pub use crate::metadata::{tables::TableId, token::Token};

// ================================================================================================
// Low-level Parsing
// ================================================================================================

/// Bounds-checked little-endian cursor
pub use crate::Parser;
