use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants fall into two groups. [`Error::NotPeFile`] is always fatal: the input is not a
/// PE image and no result is produced. Everything else is fatal only while the structural
/// headers are being decoded; once the headers are valid, errors raised by an optional stage
/// (imports, exports, CLR metadata, ...) are caught at the stage boundary and reported through
/// [`crate::image::ParseReport`] instead of aborting the parse.
///
/// # Examples
///
/// ```rust,no_run
/// use pescope::{Error, PeImage};
/// use std::path::Path;
///
/// match PeImage::from_file(Path::new("kernel32.dll")) {
///     Ok(image) => println!("{} sections", image.sections().len()),
///     Err(Error::NotPeFile(reason)) => eprintln!("Not a PE image: {}", reason),
///     Err(Error::TruncatedRead) => eprintln!("Headers are truncated"),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The DOS magic, the NT signature or the optional header magic is wrong.
    ///
    /// The associated string names which check failed.
    #[error("Not a PE image - {0}")]
    NotPeFile(&'static str),

    /// A read would have crossed the end of the buffer.
    ///
    /// Raised by every cursor operation whose span exceeds the available data. Fatal only while
    /// decoding the structural headers.
    #[error("Truncated read - the requested span exceeds the available data")]
    TruncatedRead,

    /// No section contains the given relative virtual address.
    ///
    /// Always recoverable; the optional piece that needed the address is treated as absent.
    #[error("RVA 0x{0:08X} is not covered by any section")]
    UnmappedAddress(u32),

    /// The file is damaged and could not be parsed.
    ///
    /// Covers inconsistent structures such as a metadata bitmask naming an unknown table, a
    /// stream that points outside the metadata or an optional header that is too small. The
    /// error includes the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A terminator-driven walk exceeded its configured bound.
    ///
    /// The associated value is the limit that was reached.
    #[error("Reached the maximum iteration count allowed - {0}")]
    IterationLimit(usize),

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures, such as a failed memory mapping.
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Returns `true` if this error always aborts the parse, regardless of the stage it was
    /// raised in.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::NotPeFile(_) | Error::Empty | Error::FileError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_macro_records_location() {
        let error = malformed_error!("bad table - {}", 7);
        match error {
            Error::Malformed {
                message,
                file,
                line,
            } => {
                assert_eq!(message, "bad table - 7");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            _ => panic!("Expected a Malformed error"),
        }
    }

    #[test]
    fn fatal_classification() {
        assert!(Error::NotPeFile("bad DOS magic").is_fatal());
        assert!(Error::Empty.is_fatal());
        assert!(!Error::TruncatedRead.is_fatal());
        assert!(!Error::UnmappedAddress(0x1000).is_fatal());
        assert!(!malformed_error!("x").is_fatal());
    }

    #[test]
    fn display() {
        assert_eq!(
            Error::UnmappedAddress(0x2000).to_string(),
            "RVA 0x00002000 is not covered by any section"
        );
        assert_eq!(
            Error::NotPeFile("bad DOS magic").to_string(),
            "Not a PE image - bad DOS magic"
        );
    }
}
