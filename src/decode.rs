//! Payload decoding into typed numeric sequences.
//!
//! Payloads are little-endian, homogeneous, and tightly packed. Decoding
//! validates the element width and the payload length before reading any
//! element; a payload is decoded in full or not at all.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::dtype::Dtype;

/// Errors raised while decoding an accumulated payload.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The element width is not one of 8, 16, 32 or 64 bits.
    #[error("{0} is not a valid size")]
    Size(u32),
    /// The payload does not hold a whole number of elements.
    #[error("improper amount of bytes received: {len} bytes for {width}-bit elements")]
    Alignment {
        /// Payload length in bytes.
        len: usize,
        /// Element width in bits.
        width: u32,
    },
}

/// A decoded, homogeneous numeric sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum Sequence {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Uint8(Vec<u8>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
    Uint64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl Sequence {
    /// Descriptor matching the element type.
    #[must_use]
    pub fn dtype(&self) -> Dtype {
        match self {
            Sequence::Int8(_) => Dtype::Int8,
            Sequence::Int16(_) => Dtype::Int16,
            Sequence::Int32(_) => Dtype::Int32,
            Sequence::Int64(_) => Dtype::Int64,
            Sequence::Uint8(_) => Dtype::Uint8,
            Sequence::Uint16(_) => Dtype::Uint16,
            Sequence::Uint32(_) => Dtype::Uint32,
            Sequence::Uint64(_) => Dtype::Uint64,
            Sequence::Float32(_) => Dtype::Float32,
            Sequence::Float64(_) => Dtype::Float64,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Sequence::Int8(v) => v.len(),
            Sequence::Int16(v) => v.len(),
            Sequence::Int32(v) => v.len(),
            Sequence::Int64(v) => v.len(),
            Sequence::Uint8(v) => v.len(),
            Sequence::Uint16(v) => v.len(),
            Sequence::Uint32(v) => v.len(),
            Sequence::Uint64(v) => v.len(),
            Sequence::Float32(v) => v.len(),
            Sequence::Float64(v) => v.len(),
        }
    }

    /// Returns `true` if the sequence holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Encode the elements as packed little-endian bytes.
    ///
    /// This is the inverse of [`decode`]; floats are written by bit
    /// pattern so NaN payloads survive.
    ///
    /// # Examples
    ///
    /// ```
    /// use numwire::decode::{Sequence, decode};
    ///
    /// let values = Sequence::Int16(vec![-2, 300]);
    /// let bytes = values.to_le_bytes();
    /// assert_eq!(&bytes[..], &[0xfe, 0xff, 0x2c, 0x01]);
    /// assert_eq!(decode(&bytes, values.dtype()), Ok(values));
    /// ```
    #[must_use]
    pub fn to_le_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.len() * self.dtype().width_bytes());
        match self {
            Sequence::Int8(v) => v.iter().for_each(|x| out.put_i8(*x)),
            Sequence::Int16(v) => v.iter().for_each(|x| out.put_i16_le(*x)),
            Sequence::Int32(v) => v.iter().for_each(|x| out.put_i32_le(*x)),
            Sequence::Int64(v) => v.iter().for_each(|x| out.put_i64_le(*x)),
            Sequence::Uint8(v) => out.put_slice(v),
            Sequence::Uint16(v) => v.iter().for_each(|x| out.put_u16_le(*x)),
            Sequence::Uint32(v) => v.iter().for_each(|x| out.put_u32_le(*x)),
            Sequence::Uint64(v) => v.iter().for_each(|x| out.put_u64_le(*x)),
            Sequence::Float32(v) => v.iter().for_each(|x| out.put_u32_le(x.to_bits())),
            Sequence::Float64(v) => v.iter().for_each(|x| out.put_u64_le(x.to_bits())),
        }
        out.freeze()
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sequence::Int8(v) => write!(f, "{v:?}"),
            Sequence::Int16(v) => write!(f, "{v:?}"),
            Sequence::Int32(v) => write!(f, "{v:?}"),
            Sequence::Int64(v) => write!(f, "{v:?}"),
            Sequence::Uint8(v) => write!(f, "{v:?}"),
            Sequence::Uint16(v) => write!(f, "{v:?}"),
            Sequence::Uint32(v) => write!(f, "{v:?}"),
            Sequence::Uint64(v) => write!(f, "{v:?}"),
            Sequence::Float32(v) => write!(f, "{v:?}"),
            Sequence::Float64(v) => write!(f, "{v:?}"),
        }
    }
}

/// Validate that `len` bytes hold a whole number of `width`-bit elements.
///
/// The width check is redundant for widths taken from a [`Dtype`] but
/// guards callers passing raw widths.
///
/// # Errors
///
/// Returns [`DecodeError::Size`] unless `width` is 8, 16, 32 or 64, and
/// [`DecodeError::Alignment`] when `len * 8` is not a multiple of `width`.
///
/// # Examples
///
/// ```
/// use numwire::decode::{DecodeError, check_bytes};
///
/// assert!(check_bytes(64, 8).is_ok());
/// assert_eq!(check_bytes(24, 8), Err(DecodeError::Size(24)));
/// assert!(matches!(check_bytes(32, 7), Err(DecodeError::Alignment { .. })));
/// ```
pub fn check_bytes(width: u32, len: usize) -> Result<(), DecodeError> {
    if !matches!(width, 8 | 16 | 32 | 64) {
        return Err(DecodeError::Size(width));
    }
    let bits = u128::try_from(len).map_or(u128::MAX, |n| n * 8);
    if bits % u128::from(width) != 0 {
        return Err(DecodeError::Alignment { len, width });
    }
    Ok(())
}

/// Decode `buffer` as a sequence of `dtype` elements.
///
/// # Errors
///
/// Returns a [`DecodeError`] if the buffer length is not a whole number of
/// elements.
pub fn decode(buffer: &[u8], dtype: Dtype) -> Result<Sequence, DecodeError> {
    check_bytes(dtype.width_bits(), buffer.len())?;
    let count = buffer.len() / dtype.width_bytes();

    Ok(match dtype {
        Dtype::Int8 => Sequence::Int8(collect(buffer, count, Buf::get_i8)),
        Dtype::Int16 => Sequence::Int16(collect(buffer, count, Buf::get_i16_le)),
        Dtype::Int32 => Sequence::Int32(collect(buffer, count, Buf::get_i32_le)),
        Dtype::Int64 => Sequence::Int64(collect(buffer, count, Buf::get_i64_le)),
        Dtype::Uint8 => Sequence::Uint8(buffer.to_vec()),
        Dtype::Uint16 => Sequence::Uint16(collect(buffer, count, Buf::get_u16_le)),
        Dtype::Uint32 => Sequence::Uint32(collect(buffer, count, Buf::get_u32_le)),
        Dtype::Uint64 => Sequence::Uint64(collect(buffer, count, Buf::get_u64_le)),
        Dtype::Float32 => Sequence::Float32(collect(buffer, count, |b: &mut &[u8]| {
            f32::from_bits(b.get_u32_le())
        })),
        Dtype::Float64 => Sequence::Float64(collect(buffer, count, |b: &mut &[u8]| {
            f64::from_bits(b.get_u64_le())
        })),
    })
}

fn collect<'a, T>(mut buffer: &'a [u8], count: usize, read: impl Fn(&mut &'a [u8]) -> T) -> Vec<T> {
    let mut out = Vec::with_capacity(count);
    while buffer.has_remaining() {
        out.push(read(&mut buffer));
    }
    out
}
