//! Tensor types
//!
//! This module provides the `Tensor` type, a contiguous n-dimensional array
//! stored on a compute device.

mod core;
mod layout;
mod storage;

pub use core::Tensor;
pub use layout::{Layout, Shape, Strides};
pub use storage::Storage;
