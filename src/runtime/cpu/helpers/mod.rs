//! Helper functions for CPU tensor operations
//!
//! Validation, dtype dispatch and launch-grid construction shared by the
//! operation implementations in `crate::ops::cpu`.

pub mod cumulative;

pub use cumulative::{logcumsumexp_impl, logcumsumexp_into_impl};
