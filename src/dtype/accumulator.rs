//! Accumulation types used inside kernels

use num_traits::Float;
use std::fmt::Debug;
use std::ops::{AddAssign, MulAssign};

/// Floating-point type that kernels accumulate in
///
/// Storage types are widened to their accumulator on load and narrowed again
/// on store, so max/exp/sum never run in half precision.
///
/// | Storage    | Accumulator |
/// |------------|-------------|
/// | F64        | f64         |
/// | F32        | f32         |
/// | F16 / BF16 | f32         |
pub trait Accumulator: Float + AddAssign + MulAssign + Debug + Send + Sync + 'static {
    /// Substitute for an exact zero cumulative sum before taking its log
    ///
    /// Only reached when every input so far underflowed to zero; adding the
    /// running max afterwards keeps an all `-inf` prefix at `-inf`.
    const LOG_ZERO_CLAMP: Self;
}

impl Accumulator for f32 {
    const LOG_ZERO_CLAMP: Self = 1e-20;
}

impl Accumulator for f64 {
    const LOG_ZERO_CLAMP: Self = 1e-20;
}
