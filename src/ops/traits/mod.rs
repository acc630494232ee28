//! Operation traits implemented by runtime clients

mod cumulative;

pub use cumulative::{AccessMode, CumulativeOps, LogCumsumExpOptions};
