//! Element trait for mapping Rust types to DType

use super::{Accumulator, DType};
use bytemuck::{Pod, Zeroable};
use std::fmt::Debug;

/// Trait for types that can be elements of a tensor
///
/// This trait connects Rust's type system to the runtime dtype system and
/// names the wider type kernels compute in.
///
/// # Bounds
/// - `Copy + Send + Sync + 'static` - Basic trait requirements
/// - `Pod + Zeroable` - Safe memory transmutation (bytemuck)
/// - `PartialOrd` - Comparison for max tracking
pub trait Element: Copy + Send + Sync + Pod + Zeroable + PartialOrd + Debug + 'static {
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Type that loads are widened into
    type Accum: Accumulator;

    /// Widen to the accumulation type
    fn to_accum(self) -> Self::Accum;

    /// Narrow from the accumulation type (round to nearest)
    fn from_accum(v: Self::Accum) -> Self;

    /// Convert to f64 for reference computations
    fn to_f64(self) -> f64;

    /// Convert from f64 to this type
    fn from_f64(v: f64) -> Self;
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;
    type Accum = f64;

    #[inline]
    fn to_accum(self) -> f64 {
        self
    }

    #[inline]
    fn from_accum(v: f64) -> Self {
        v
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;
    type Accum = f32;

    #[inline]
    fn to_accum(self) -> f32 {
        self
    }

    #[inline]
    fn from_accum(v: f32) -> Self {
        v
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

// Integers exist so tensors of them can be built and rejected by float-only ops.
impl Element for i32 {
    const DTYPE: DType = DType::I32;
    type Accum = f64;

    #[inline]
    fn to_accum(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_accum(v: f64) -> Self {
        v as i32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as i32
    }
}

// Half-precision floating point types (requires "f16" feature)

#[cfg(feature = "f16")]
impl Element for half::f16 {
    const DTYPE: DType = DType::F16;
    type Accum = f32;

    #[inline]
    fn to_accum(self) -> f32 {
        self.to_f32()
    }

    #[inline]
    fn from_accum(v: f32) -> Self {
        half::f16::from_f32(v)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self.to_f64()
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        half::f16::from_f64(v)
    }
}

#[cfg(feature = "f16")]
impl Element for half::bf16 {
    const DTYPE: DType = DType::BF16;
    type Accum = f32;

    #[inline]
    fn to_accum(self) -> f32 {
        self.to_f32()
    }

    #[inline]
    fn from_accum(v: f32) -> Self {
        half::bf16::from_f32(v)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self.to_f64()
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        half::bf16::from_f64(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accum_round_trip_f32() {
        let x = 1.5f32;
        assert_eq!(f32::from_accum(x.to_accum()), x);
        assert_eq!(<f32 as Element>::DTYPE, DType::F32);
    }

    #[test]
    fn test_infinity_survives_widening() {
        assert_eq!(f32::NEG_INFINITY.to_accum(), f32::NEG_INFINITY);
        assert_eq!(f64::NEG_INFINITY.to_accum(), f64::NEG_INFINITY);
    }

    #[cfg(feature = "f16")]
    #[test]
    fn test_half_widens_to_f32() {
        let h = half::f16::from_f32(0.5);
        let acc: f32 = h.to_accum();
        assert_eq!(acc, 0.5);
        assert_eq!(half::bf16::from_accum(2.0f32).to_f32(), 2.0);
        assert_eq!(half::f16::from_accum(f32::NEG_INFINITY), half::f16::NEG_INFINITY);
    }
}
