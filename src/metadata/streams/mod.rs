//! Metadata streams.
//!
//! The metadata root is followed by a directory of named streams. Three of them matter for a
//! structural summary:
//!
//! - **`#~`** (or the uncompressed **`#-`**) - the metadata tables, see [`TablesHeader`]
//! - **`#Strings`** - NUL-terminated UTF-8 identifiers, see [`Strings`]
//! - **`#GUID`** - 16-byte GUIDs addressed by 1-based index, see [`Guid`]
//!
//! `#US` and `#Blob` are listed in the stream directory but never decoded.
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 24.2.2 - Stream Headers

mod guid;
mod streamheader;
mod strings;
mod tablesheader;

pub use guid::Guid;
pub use streamheader::{StreamHeader, MAX_STREAM_NAME};
pub use strings::Strings;
pub use tablesheader::{TableLayout, TableSummary, TablesHeader, TABLES_HEADER_SIZE};
