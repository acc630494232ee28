//! CPU kernel implementations
//!
//! Kernels are generic over `T: Element`, take raw pointers and never fail:
//! every shape and dtype check happens in `helpers` before launch.

pub(crate) mod access;
pub(crate) mod logcumsumexp;

pub(crate) use logcumsumexp::logcumsumexp_kernel;
