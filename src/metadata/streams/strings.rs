//! The `#Strings` heap.
//!
//! A sequence of NUL-terminated UTF-8 strings addressed by byte offset. Offset 0 is the empty
//! string.

use std::{ffi::CStr, str};

use crate::{Error, Result};

/// A view over the `#Strings` heap.
///
/// # Examples
///
/// ```rust
/// use pescope::metadata::streams::Strings;
///
/// let heap = b"\0<Module>\0Program\0";
/// let strings = Strings::from(heap)?;
/// assert_eq!(strings.get(1)?, "<Module>");
/// assert_eq!(strings.get(0)?, "");
/// # Ok::<(), pescope::Error>(())
/// ```
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Wrap heap data.
    ///
    /// # Errors
    /// Returns a malformed error for an empty heap.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.is_empty() {
            return Err(malformed_error!("Provided #Strings heap is empty"));
        }

        Ok(Strings { data })
    }

    /// Size of the heap in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the heap holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The string starting at `index`.
    ///
    /// # Errors
    /// Returns [`Error::TruncatedRead`] if `index` is past the heap, or a malformed error if the
    /// string is not terminated or not valid UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        self.get_bounded(index, self.data.len())
    }

    /// The string starting at `index`, rejecting strings longer than `max_length` bytes.
    ///
    /// # Errors
    /// See [`Strings::get`]; additionally fails for a string exceeding `max_length`.
    pub fn get_bounded(&self, index: usize, max_length: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(Error::TruncatedRead);
        }

        let end = index
            .saturating_add(max_length)
            .saturating_add(1)
            .min(self.data.len());

        match CStr::from_bytes_until_nul(&self.data[index..end]) {
            Ok(result) => match result.to_str() {
                Ok(result) => Ok(result),
                Err(_) => Err(malformed_error!("Invalid string at index - {}", index)),
            },
            Err(_) => Err(malformed_error!("Unterminated string at index - {}", index)),
        }
    }
}
