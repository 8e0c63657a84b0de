//! CLR metadata of managed images.
//!
//! Managed images carry a COR20 header behind the `ClrRuntimeHeader` data directory. It
//! locates the ECMA-335 metadata: a root with a version string, a directory of streams, and
//! the tables stream holding the typed rows. This module decodes as much of that as a
//! structural summary needs.
//!
//! # Key Components
//!
//! - [`cor20header`] - The COR20 header, runtime flags and architecture classification
//! - [`root`] - Metadata root and stream directory
//! - [`streams`] - The `#~`, `#Strings` and `#GUID` streams
//! - [`tables`] - Table ids, column widths, row sizes and typed row readers
//! - [`token`] - Metadata tokens
//! - [`clrinfo`] - The summary handed out by [`crate::PeImage::clr`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use pescope::PeImage;
//!
//! let image = PeImage::from_file("Sample.dll".as_ref())?;
//! if let Some(clr) = image.clr() {
//!     println!("Architecture: {}", clr.architecture);
//!     if let Some(metadata) = &clr.metadata {
//!         println!("Runtime {}", metadata.version);
//!         for name in &metadata.public_types {
//!             println!("  {}", name);
//!         }
//!     }
//! }
//! # Ok::<(), pescope::Error>(())
//! ```

pub mod clrinfo;
pub mod cor20header;
pub mod root;
pub mod streams;
pub mod tables;
pub mod token;
