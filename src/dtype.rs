//! Data-type descriptors carried in the first frame of a session.
//!
//! A descriptor is a two-digit base-10 code: the tens digit selects the
//! element kind (0 → signed, 1 → unsigned, 2 → float) and the units digit
//! the element width (0 → 8 bits, 1 → 16, 2 → 32, 3 → 64). Only `f32` (22)
//! and `f64` (23) exist among the floats.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Numeric kind of a sequence element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Two's-complement signed integer.
    Signed,
    /// Unsigned integer.
    Unsigned,
    /// IEEE-754 binary floating point.
    Float,
}

/// Element type of a session payload.
///
/// # Examples
///
/// ```
/// use numwire::dtype::{Dtype, ElementKind};
///
/// let dtype = Dtype::try_from(11_u8).expect("11 is uint16");
/// assert_eq!(dtype, Dtype::Uint16);
/// assert_eq!(dtype.width_bits(), 16);
/// assert_eq!(dtype.kind(), ElementKind::Unsigned);
/// assert!(Dtype::try_from(20_u8).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Dtype {
    Int8 = 0,
    Int16 = 1,
    Int32 = 2,
    Int64 = 3,
    Uint8 = 10,
    Uint16 = 11,
    Uint32 = 12,
    Uint64 = 13,
    Float32 = 22,
    Float64 = 23,
}

impl Dtype {
    /// Every valid descriptor, in code order.
    pub const ALL: [Dtype; 10] = [
        Dtype::Int8,
        Dtype::Int16,
        Dtype::Int32,
        Dtype::Int64,
        Dtype::Uint8,
        Dtype::Uint16,
        Dtype::Uint32,
        Dtype::Uint64,
        Dtype::Float32,
        Dtype::Float64,
    ];

    /// Wire code of this descriptor.
    #[must_use]
    pub fn code(self) -> u8 { self.into() }

    /// Element width in bits.
    #[must_use]
    pub fn width_bits(self) -> u32 {
        match self {
            Dtype::Int8 | Dtype::Uint8 => 8,
            Dtype::Int16 | Dtype::Uint16 => 16,
            Dtype::Int32 | Dtype::Uint32 | Dtype::Float32 => 32,
            Dtype::Int64 | Dtype::Uint64 | Dtype::Float64 => 64,
        }
    }

    /// Element width in bytes.
    #[must_use]
    pub fn width_bytes(self) -> usize {
        match self {
            Dtype::Int8 | Dtype::Uint8 => 1,
            Dtype::Int16 | Dtype::Uint16 => 2,
            Dtype::Int32 | Dtype::Uint32 | Dtype::Float32 => 4,
            Dtype::Int64 | Dtype::Uint64 | Dtype::Float64 => 8,
        }
    }

    /// Numeric kind of the elements.
    #[must_use]
    pub fn kind(self) -> ElementKind {
        match self {
            Dtype::Int8 | Dtype::Int16 | Dtype::Int32 | Dtype::Int64 => ElementKind::Signed,
            Dtype::Uint8 | Dtype::Uint16 | Dtype::Uint32 | Dtype::Uint64 => ElementKind::Unsigned,
            Dtype::Float32 | Dtype::Float64 => ElementKind::Float,
        }
    }

    /// Lower-case type name used in logs and metric labels.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Dtype::Int8 => "int8",
            Dtype::Int16 => "int16",
            Dtype::Int32 => "int32",
            Dtype::Int64 => "int64",
            Dtype::Uint8 => "uint8",
            Dtype::Uint16 => "uint16",
            Dtype::Uint32 => "uint32",
            Dtype::Uint64 => "uint64",
            Dtype::Float32 => "float32",
            Dtype::Float64 => "float64",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}
