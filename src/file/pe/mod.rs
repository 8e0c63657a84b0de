//! PE/COFF structures.
//!
//! - [`header`] - DOS header, NT headers, optional header and data directories
//! - [`section`] - Section table and RVA translation
//! - [`imports`] - Import and delay-load import directories
//! - [`exports`] - Export directory
//! - [`certificate`] - Attribute certificate locator

pub mod certificate;
pub mod exports;
pub mod header;
pub mod imports;
pub mod section;
