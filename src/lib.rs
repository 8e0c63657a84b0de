// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' memory-maps its input

//! # pescope
//!
//! A structural parser for Windows PE images and the CLR metadata of .NET assemblies. Built in
//! pure Rust, `pescope` decodes headers, sections, imports, exports, the attribute certificate
//! and the ECMA-335 metadata tables of untrusted images without loading or executing them.
//!
//! ## Features
//!
//! - **Headers** - DOS, NT and optional headers for PE32 and PE32+, every data directory
//! - **RVA translation** - section-based mapping between RVAs and file offsets
//! - **Imports and exports** - regular and delay-load imports, ordinals, forwarders
//! - **CLR metadata** - COR20 header, architecture classification, streams, table layout,
//!   module identity and public type names
//! - **Bounded and isolated** - every walk is bounded by [`ParserConfig`]; a damaged directory
//!   fails its own stage, never the whole parse
//! - **Parallel batches** - [`PeImage::from_files_parallel`] parses many files at once
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pescope::prelude::*;
//!
//! let image = PeImage::from_file("kernel32.dll".as_ref())?;
//! println!("{} image for {}", image.bitness(), image.machine_name());
//!
//! for section in image.sections() {
//!     println!("{:8} 0x{:08x}", section.name_lossy(), section.virtual_address);
//! }
//!
//! for import in image.import_records() {
//!     println!("{}!{}", import.dll, import.name);
//! }
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! ### Managed images
//!
//! ```rust,no_run
//! use pescope::PeImage;
//!
//! let image = PeImage::from_file("Sample.dll".as_ref())?;
//! if let Some(clr) = image.clr() {
//!     println!("Architecture: {}", clr.architecture);
//!     if let Some(metadata) = &clr.metadata {
//!         println!("Module: {:?}", metadata.module_name);
//!         println!("Public types: {:?}", metadata.public_types);
//!     }
//! }
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! ### Configuration
//!
//! ```rust,no_run
//! use pescope::{ParserConfig, PeImage};
//!
//! let config = ParserConfig {
//!     discover_public_types: false,
//!     ..ParserConfig::strict()
//! };
//! let image = PeImage::from_file_with_config("Sample.dll".as_ref(), config)?;
//! println!("{:?}", image.status());
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Only the structural headers are required. Errors there abort the parse; errors inside an
//! optional stage are logged through the `log` facade and reported by [`PeImage::status`].
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! cargo +nightly fuzz run peimage --release
//! ```

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use pescope::prelude::*;
///
/// let image = PeImage::from_file("kernel32.dll".as_ref())?;
/// let dependencies = image.dependencies();
/// # Ok::<(), pescope::Error>(())
/// ```
pub mod prelude;

/// Parser configuration: optional stages and walk limits.
pub mod config;

/// Input backends, the byte cursor, and the PE/COFF structures.
///
/// - [`file::File`] - An image with its decoded headers, backed by memory or a mapped file
/// - [`file::parser::Parser`] - Bounds-checked little-endian cursor
/// - [`file::pe`] - Headers, sections, imports, exports and the certificate locator
pub mod file;

/// CLR header and ECMA-335 metadata.
///
/// - [`metadata::cor20header`] - The COR20 header and architecture classification
/// - [`metadata::root`] - Metadata root and stream directory
/// - [`metadata::streams`] - Tables stream layout and the string and GUID heaps
/// - [`metadata::tables`] - Table ids, row sizes and typed rows
/// - [`metadata::clrinfo`] - The summary exposed by [`PeImage::clr`]
pub mod metadata;

/// The parsed image and its per-stage report.
pub mod image;

/// `pescope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust,no_run
/// use pescope::{PeImage, Result};
///
/// fn load(path: &str) -> Result<PeImage> {
///     PeImage::from_file(std::path::Path::new(path))
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `pescope` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use pescope::{Error, PeImage};
///
/// match PeImage::from_file(std::path::Path::new("crafted.exe")) {
///     Ok(image) => println!("Loaded {} sections", image.sections().len()),
///     Err(Error::NotPeFile(reason)) => println!("Not a PE image: {}", reason),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// Main entry point: a parsed PE image.
pub use image::PeImage;

/// Configuration passed to the `*_with_config` constructors.
pub use config::ParserConfig;

/// Low-level access to the image bytes.
///
/// # Example
///
/// ```rust
/// use pescope::Parser;
///
/// let data = [0x4D, 0x5A, 0x90, 0x00];
/// let mut parser = Parser::new(&data);
/// assert_eq!(parser.read_le::<u16>()?, 0x5A4D);
/// # Ok::<(), pescope::Error>(())
/// ```
pub use file::{parser::Parser, File};
