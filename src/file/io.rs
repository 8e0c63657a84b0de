//! Fixed-offset little-endian reads over byte slices.
//!
//! Every on-disk structure this crate decodes (PE/COFF headers, import and export tables,
//! the COR20 header and the ECMA-335 metadata streams) is little-endian. The helpers in this
//! module read primitive values at a given offset with strict bounds checking: a read that
//! would cross the end of the slice fails with [`crate::Error::TruncatedRead`] and never
//! wraps around.
//!
//! Sequential decoding goes through [`crate::file::parser::Parser`], which is built on top of
//! these functions.
//!
//! # Examples
//!
//! ```rust
//! use pescope::file::io::{read_le, read_le_at, read_le_at_dyn};
//!
//! let data = [0x4D, 0x5A, 0x90, 0x00, 0x03, 0x00, 0x00, 0x00];
//! assert_eq!(read_le::<u16>(&data)?, 0x5A4D);
//!
//! let mut offset = 4;
//! assert_eq!(read_le_at::<u32>(&data, &mut offset)?, 3);
//! assert_eq!(offset, 8);
//!
//! // Metadata indices are 2 or 4 bytes wide depending on runtime information
//! let mut offset = 0;
//! assert_eq!(read_le_at_dyn(&data, &mut offset, false)?, 0x5A4D);
//! # Ok::<(), pescope::Error>(())
//! ```

use crate::{Error::TruncatedRead, Result};

/// Primitive values that can be decoded from a fixed number of little-endian bytes.
///
/// Implemented for the unsigned and signed integer types used by the PE/COFF and ECMA-335
/// layouts.
pub trait LeBytes: Sized {
    /// Number of bytes occupied by the encoded value
    const SIZE: usize;

    /// Decode the value from exactly [`LeBytes::SIZE`] bytes.
    ///
    /// Returns `None` if `bytes` has the wrong length.
    fn from_le_slice(bytes: &[u8]) -> Option<Self>;
}

macro_rules! impl_le_bytes {
    ($($ty:ty),*) => {
        $(
            impl LeBytes for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn from_le_slice(bytes: &[u8]) -> Option<Self> {
                    bytes.try_into().ok().map(<$ty>::from_le_bytes)
                }
            }
        )*
    };
}

impl_le_bytes!(u8, i8, u16, i16, u32, i32, u64, i64);

/// Read a `T` from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::TruncatedRead`] if `data` is shorter than `T`.
pub fn read_le<T: LeBytes>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Read a `T` at `offset` and advance `offset` past it.
///
/// On failure `offset` is left untouched.
///
/// # Errors
/// Returns [`crate::Error::TruncatedRead`] if the value does not fit between `offset` and the
/// end of `data`.
pub fn read_le_at<T: LeBytes>(data: &[u8], offset: &mut usize) -> Result<T> {
    let Some(end) = offset.checked_add(T::SIZE) else {
        return Err(TruncatedRead);
    };

    let Some(bytes) = data.get(*offset..end) else {
        return Err(TruncatedRead);
    };

    let value = T::from_le_slice(bytes).ok_or(TruncatedRead)?;
    *offset = end;

    Ok(value)
}

/// Read a 2-byte or 4-byte index at `offset`, widened to `u32`.
///
/// Metadata heap and table indices switch between both widths depending on the heap-size
/// flags and on the row counts of the referenced tables.
///
/// # Errors
/// Returns [`crate::Error::TruncatedRead`] if the index does not fit into `data`.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    if is_large {
        read_le_at::<u32>(data, offset)
    } else {
        Ok(u32::from(read_le_at::<u16>(data, offset)?))
    }
}

/// Returns `length` bytes starting at `offset`, with overflow-checked bounds.
///
/// # Errors
/// Returns [`crate::Error::TruncatedRead`] if the span exceeds `data`.
pub fn slice_at(data: &[u8], offset: usize, length: usize) -> Result<&[u8]> {
    let end = offset.checked_add(length).ok_or(TruncatedRead)?;
    data.get(offset..end).ok_or(TruncatedRead)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn read_le_widths() {
        assert_eq!(read_le::<u8>(&TEST_BUFFER).unwrap(), 0x01);
        assert_eq!(read_le::<u16>(&TEST_BUFFER).unwrap(), 0x0201);
        assert_eq!(read_le::<u32>(&TEST_BUFFER).unwrap(), 0x0403_0201);
        assert_eq!(read_le::<u64>(&TEST_BUFFER).unwrap(), 0x0807_0605_0403_0201);
        assert_eq!(read_le::<i16>(&[0xFF, 0xFF]).unwrap(), -1);
    }

    #[test]
    fn read_le_at_advances() {
        let mut offset = 2;
        assert_eq!(read_le_at::<u16>(&TEST_BUFFER, &mut offset).unwrap(), 0x0403);
        assert_eq!(offset, 4);
        assert_eq!(read_le_at::<u32>(&TEST_BUFFER, &mut offset).unwrap(), 0x0807_0605);
        assert_eq!(offset, 8);
    }

    #[test]
    fn truncated_reads_leave_offset() {
        let mut offset = 6;
        assert!(matches!(
            read_le_at::<u32>(&TEST_BUFFER, &mut offset),
            Err(Error::TruncatedRead)
        ));
        assert_eq!(offset, 6);

        let mut offset = usize::MAX - 1;
        assert!(matches!(
            read_le_at::<u32>(&TEST_BUFFER, &mut offset),
            Err(Error::TruncatedRead)
        ));

        assert!(read_le::<u64>(&TEST_BUFFER[..7]).is_err());
        assert!(read_le::<u8>(&[]).is_err());
    }

    #[test]
    fn dynamic_width() {
        let mut offset = 0;
        assert_eq!(read_le_at_dyn(&TEST_BUFFER, &mut offset, false).unwrap(), 0x0201);
        assert_eq!(offset, 2);
        assert_eq!(
            read_le_at_dyn(&TEST_BUFFER, &mut offset, true).unwrap(),
            0x0605_0403
        );
        assert_eq!(offset, 6);
        assert!(read_le_at_dyn(&TEST_BUFFER, &mut offset, true).is_err());
    }

    #[test]
    fn slices() {
        assert_eq!(slice_at(&TEST_BUFFER, 6, 2).unwrap(), &[0x07, 0x08]);
        assert!(slice_at(&TEST_BUFFER, 6, 3).is_err());
        assert!(slice_at(&TEST_BUFFER, usize::MAX, 2).is_err());
        assert!(slice_at(&TEST_BUFFER, 8, 0).unwrap().is_empty());
    }
}
