#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumTryAs};

/// Represents an integer element type with a specific bit width.
///
/// Signedness is not represented here; all integer elements are treated as
/// raw bit patterns. Consumers that interpret buffer contents decide how the
/// bits are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct IntType {
    num_bits: u32,
}

impl IntType {
    /// Common integer element types.
    pub const I1: Self = Self { num_bits: 1 };
    pub const I8: Self = Self { num_bits: 8 };
    pub const I16: Self = Self { num_bits: 16 };
    pub const I32: Self = Self { num_bits: 32 };
    pub const I64: Self = Self { num_bits: 64 };
    pub const MIN_BITS: u32 = 1;
    pub const MAX_BITS: u32 = 1 << 16;

    #[inline]
    const fn check_validity(num_bits: u32) -> bool {
        num_bits >= Self::MIN_BITS && num_bits <= Self::MAX_BITS
    }

    /// Creates a new `IntType` with the specified number of bits.
    #[inline]
    pub const fn new(num_bits: u32) -> Option<Self> {
        if Self::check_validity(num_bits) {
            Some(Self { num_bits })
        } else {
            None
        }
    }

    /// Returns the number of bits of the integer type.
    #[inline]
    pub const fn num_bits(&self) -> u32 {
        self.num_bits
    }

    /// Returns the number of bytes required to store one element.
    #[inline]
    pub const fn byte_size(&self) -> u32 {
        (self.num_bits + 7) / 8
    }

    /// Returns `true` if the element is byte-aligned (i.e., its number of bits is a multiple of 8).
    #[inline]
    pub const fn byte_aligned(&self) -> bool {
        self.num_bits % 8 == 0
    }
}

impl std::fmt::Display for IntType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "i{}", self.num_bits)
    }
}

/// Represents a floating-point element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FloatType {
    /// 16-bit floating point value (IEEE-754 binary16)
    /// Also known as "half precision".
    F16,

    /// 16-bit "brain" floating point value (7-bit significand). Provides the
    /// same number of exponent bits as `FloatType::F32`, so that it matches
    /// the dynamic range but with greatly reduced precision.
    Bf16,

    /// 32-bit floating point value (IEEE-754 binary32)
    /// Corresponds to Rust's `f32` type.
    F32,

    /// 64-bit floating point value (IEEE-754 binary64)
    /// Corresponds to Rust's `f64` type.
    F64,
}

impl FloatType {
    /// Returns the number of bits of the floating-point type.
    #[inline]
    pub const fn num_bits(&self) -> u32 {
        match self {
            FloatType::F16 | FloatType::Bf16 => 16,
            FloatType::F32 => 32,
            FloatType::F64 => 64,
        }
    }

    /// Returns the number of bytes required to store one element.
    #[inline]
    pub const fn byte_size(&self) -> u32 {
        self.num_bits() / 8
    }
}

impl std::fmt::Display for FloatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FloatType::F16 => "f16",
            FloatType::Bf16 => "bf16",
            FloatType::F32 => "f32",
            FloatType::F64 => "f64",
        };
        write!(f, "{}", s)
    }
}

/// Scalar element type stored inside buffers and views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumTryAs, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ElemType {
    Int(IntType),
    Float(FloatType),
}

impl ElemType {
    /// Returns the number of bits of one element.
    #[inline]
    pub const fn num_bits(&self) -> u32 {
        match self {
            ElemType::Int(itype) => itype.num_bits(),
            ElemType::Float(ftype) => ftype.num_bits(),
        }
    }

    /// Returns the number of bytes required to store one element.
    #[inline]
    pub const fn byte_size(&self) -> u32 {
        match self {
            ElemType::Int(itype) => itype.byte_size(),
            ElemType::Float(ftype) => ftype.byte_size(),
        }
    }
}

impl From<IntType> for ElemType {
    fn from(itype: IntType) -> Self {
        ElemType::Int(itype)
    }
}

impl From<FloatType> for ElemType {
    fn from(ftype: FloatType) -> Self {
        ElemType::Float(ftype)
    }
}

impl std::fmt::Display for ElemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElemType::Int(itype) => write!(f, "{}", itype),
            ElemType::Float(ftype) => write!(f, "{}", ftype),
        }
    }
}
