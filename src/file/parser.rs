//! Bounds-checked byte cursor used by every decoder in this crate.
//!
//! [`Parser`] keeps a position inside a borrowed byte slice and decodes little-endian values at
//! that position. Every operation validates the requested span first: reading, seeking or
//! advancing past the end fails with [`crate::Error::TruncatedRead`] and leaves the cursor where
//! it was. There is no implicit growth and no wraparound.
//!
//! Sub-structures referenced by RVA are decoded with a fresh cursor created through
//! [`Parser::at`], so a caller never has to save and restore its own position around a nested
//! read.
//!
//! # Examples
//!
//! ```rust
//! use pescope::Parser;
//!
//! let data = [0x4D, 0x5A, 0x00, 0x00, b'P', b'E', 0x00, 0x00];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_le::<u16>()?, 0x5A4D);
//! parser.seek(4)?;
//! assert_eq!(parser.read_le::<u32>()?, 0x0000_4550);
//! assert_eq!(parser.remaining(), 0);
//! assert!(parser.read_le::<u8>().is_err());
//! # Ok::<(), pescope::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, read_le_at_dyn, LeBytes},
    Error::{IterationLimit, TruncatedRead},
    Result,
};

/// A cursor over a byte slice with bounds-checked little-endian reads.
///
/// # Examples
///
/// ```rust
/// use pescope::Parser;
///
/// let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
/// let mut parser = Parser::new(&data);
///
/// let first = parser.read_le::<u32>()?;
/// assert_eq!(first, 0x04030201);
/// assert_eq!(parser.remaining(), 4);
/// # Ok::<(), pescope::Error>(())
/// ```
#[derive(Clone)]
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Create a new [`Parser`] positioned at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if `offset` lies beyond the end of `data`.
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self> {
        let mut parser = Parser::new(data);
        parser.seek(offset)?;
        Ok(parser)
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of bytes between the current position and the end of the buffer.
    ///
    /// Higher layers use this to validate a declared count before issuing the reads.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Fails unless at least `needed` bytes are left.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if fewer than `needed` bytes remain.
    pub fn ensure_remaining(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(TruncatedRead);
        }
        Ok(())
    }

    /// Move the cursor to the absolute offset `pos`.
    ///
    /// Seeking to exactly the end of the buffer is allowed; any read from there fails.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if `pos` is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(TruncatedRead);
        }

        self.position = pos;
        Ok(())
    }

    /// Move the cursor forward by `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if this would move past the end of the buffer.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        let Some(target) = self.position.checked_add(step) else {
            return Err(TruncatedRead);
        };

        self.seek(target)
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Get access to the underlying data buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Advance the cursor to the next multiple of `alignment`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if the aligned position lies beyond the buffer.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        if alignment == 0 {
            return Ok(());
        }

        let padding = (alignment - (self.position % alignment)) % alignment;
        self.advance_by(padding)
    }

    /// Decode a `T` at the current position without moving the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if reading `T` would exceed the data length.
    pub fn peek_le<T: LeBytes>(&self) -> Result<T> {
        let mut position = self.position;
        read_le_at::<T>(self.data, &mut position)
    }

    /// Execute `f`, restoring the cursor position if it fails.
    ///
    /// # Errors
    /// Returns whatever error `f` produced.
    pub fn transactional<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let saved_position = self.position;
        let result = f(self);
        if result.is_err() {
            self.position = saved_position;
        }
        result
    }

    /// Decode a `T` at the current position and advance past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if reading would exceed the data length.
    pub fn read_le<T: LeBytes>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read a 2-byte (`is_large == false`) or 4-byte index, widened to `u32`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if reading would exceed the data length.
    pub fn read_dyn(&mut self, is_large: bool) -> Result<u32> {
        read_le_at_dyn(self.data, &mut self.position, is_large)
    }

    /// Read a pointer-sized value: 8 bytes when `wide`, otherwise 4 bytes widened to `u64`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if reading would exceed the data length.
    pub fn read_word(&mut self, wide: bool) -> Result<u64> {
        if wide {
            self.read_le::<u64>()
        } else {
            Ok(u64::from(self.read_le::<u32>()?))
        }
    }

    /// Borrow the next `length` bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.position.checked_add(length).ok_or(TruncatedRead)?;
        let bytes = self.data.get(self.position..end).ok_or(TruncatedRead)?;
        self.position = end;
        Ok(bytes)
    }

    /// Borrow a NUL-terminated byte string (without the terminator) and advance past it.
    ///
    /// The string may hold at most `max_length` bytes before its terminator.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedRead`] if the buffer ends before a terminator, or
    /// [`crate::Error::IterationLimit`] if the string is longer than `max_length` bytes.
    pub fn read_cstr(&mut self, max_length: usize) -> Result<&'a [u8]> {
        let window_end = self
            .position
            .saturating_add(max_length)
            .saturating_add(1)
            .min(self.data.len());
        let window = &self.data[self.position..window_end];

        match window.iter().position(|&byte| byte == 0) {
            Some(length) => {
                let bytes = &window[..length];
                self.position += length + 1;
                Ok(bytes)
            }
            None if window_end == self.data.len() => Err(TruncatedRead),
            None => Err(IterationLimit(max_length)),
        }
    }

    /// Read a NUL-terminated string, replacing invalid UTF-8 sequences.
    ///
    /// Names inside PE images are not guaranteed to be valid UTF-8, so this never fails on
    /// content, only on truncation.
    ///
    /// # Errors
    /// See [`Parser::read_cstr`].
    pub fn read_string_lossy(&mut self, max_length: usize) -> Result<String> {
        let bytes = self.read_cstr(max_length)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
