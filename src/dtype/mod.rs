//! Data type system for logcumsumexp tensors
//!
//! This module provides the `DType` enum naming every storage type a tensor can
//! hold, the [`Element`] trait that ties Rust types to it, and the
//! [`Accumulator`] trait for the wider type kernels compute in.

mod accumulator;
mod element;

pub use accumulator::Accumulator;
pub use element::Element;

use std::fmt;

/// Data types supported by tensors
///
/// This enum represents the element type of a tensor at runtime, which lets a
/// single operation entry point dispatch to the right kernel instantiation.
///
/// # Discriminant Values (Serialization Stability)
///
/// - Floats: 0-9 (F64=0, F32=1, F16=2, BF16=3)
/// - Signed ints: 10-19 (I32=11)
///
/// Existing values are never changed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
#[repr(u8)]
pub enum DType {
    /// 64-bit floating point
    F64 = 0,
    /// 32-bit floating point (most common)
    F32 = 1,
    /// 16-bit floating point (IEEE 754)
    F16 = 2,
    /// 16-bit brain floating point
    BF16 = 3,
    /// 32-bit signed integer
    I32 = 11,
}

impl DType {
    /// Size of one element in bytes
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::F64 => 8,
            Self::F32 | Self::I32 => 4,
            Self::F16 | Self::BF16 => 2,
        }
    }

    /// Returns true if this is a floating point type
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F64 | Self::F32 | Self::F16 | Self::BF16)
    }

    /// Short lowercase name (`f32`, `bf16`, ...)
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::F16 => "f16",
            Self::BF16 => "bf16",
            Self::I32 => "i32",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_size() {
        assert_eq!(DType::F64.size_in_bytes(), 8);
        assert_eq!(DType::F32.size_in_bytes(), 4);
        assert_eq!(DType::F16.size_in_bytes(), 2);
        assert_eq!(DType::BF16.size_in_bytes(), 2);
        assert_eq!(DType::I32.size_in_bytes(), 4);
    }

    #[test]
    fn test_dtype_categories() {
        assert!(DType::F32.is_float());
        assert!(DType::BF16.is_float());
        assert!(!DType::I32.is_float());
    }

    #[test]
    fn test_display() {
        assert_eq!(DType::BF16.to_string(), "bf16");
        assert_eq!(format!("{}", DType::F64), "f64");
    }
}
