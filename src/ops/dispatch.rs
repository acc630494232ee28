//! DType dispatch utilities
//!
//! This module provides the `dispatch_float_dtype!` macro for runtime type
//! dispatch. It converts a `DType` value into a concrete Rust type so a generic
//! kernel can be instantiated for it.
//!
//! # Usage
//!
//! ```ignore
//! fn my_operation(dtype: DType) -> Result<()> {
//!     dispatch_float_dtype!(dtype, T => {
//!         // T is now a concrete float type (f32, f64, half::f16, half::bf16)
//!         let size = std::mem::size_of::<T>();
//!     }, "my_operation");
//!     Ok(())
//! }
//! ```
//!
//! ## Arguments
//!
//! * `$dtype` - Expression evaluating to a `DType` value
//! * `$T` - Identifier to bind to the concrete type in the body
//! * `$body` - Code block to execute with `T` bound
//! * `$error_op` - Operation name for error messages
//!
//! ## Supported Types
//!
//! - `F64` -> `f64`
//! - `F32` -> `f32`
//! - `F16` -> `half::f16` (requires "f16" feature)
//! - `BF16` -> `half::bf16` (requires "f16" feature)
//! - anything else -> `UnsupportedDType` error

/// Internal helper macro to dispatch types requiring the "f16" feature.
/// Parameterized by type to avoid duplicating macro for F16 vs BF16.
#[macro_export]
#[doc(hidden)]
macro_rules! dispatch_f16_type {
    ($T:ident, $body:block, $dtype:expr, $type:ty) => {{
        #[cfg(feature = "f16")]
        {
            type $T = $type;
            $body
        }
        #[cfg(not(feature = "f16"))]
        {
            return Err($crate::error::Error::FeatureRequired {
                dtype: $dtype,
                feature: "f16",
            });
        }
    }};
}

/// Macro for runtime dtype dispatch to float-only kernels.
///
/// Integer dtypes return `Error::UnsupportedDType` from the enclosing function.
#[macro_export]
macro_rules! dispatch_float_dtype {
    ($dtype:expr, $T:ident => $body:block, $error_op:expr) => {
        match $dtype {
            $crate::dtype::DType::F64 => {
                type $T = f64;
                $body
            }
            $crate::dtype::DType::F32 => {
                type $T = f32;
                $body
            }
            $crate::dtype::DType::F16 => {
                $crate::dispatch_f16_type!($T, $body, $dtype, half::f16)
            }
            $crate::dtype::DType::BF16 => {
                $crate::dispatch_f16_type!($T, $body, $dtype, half::bf16)
            }
            other => {
                return Err($crate::error::Error::UnsupportedDType {
                    dtype: other,
                    op: $error_op,
                });
            }
        }
    };
}
