//! Launch configurations for the blocked scan kernels

use crate::error::{Error, Result};
use std::fmt;

/// Number of time steps processed per block (`BT`)
///
/// Only a small set of sizes is offered: the lower-triangular mask is
/// `BT × BT`, so larger blocks trade quadratic mask work for fewer carries.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlockSize {
    /// 16 rows per block
    B16,
    /// 32 rows per block
    #[default]
    B32,
    /// 64 rows per block
    B64,
}

impl BlockSize {
    /// Every block size, smallest first
    pub const ALL: [BlockSize; 3] = [BlockSize::B16, BlockSize::B32, BlockSize::B64];

    /// Rows per block
    #[inline]
    pub const fn rows(self) -> usize {
        match self {
            Self::B16 => 16,
            Self::B32 => 32,
            Self::B64 => 64,
        }
    }

    /// Parse a row count into a block size
    pub fn from_rows(rows: usize) -> Result<Self> {
        match rows {
            16 => Ok(Self::B16),
            32 => Ok(Self::B32),
            64 => Ok(Self::B64),
            _ => Err(Error::invalid_argument(
                "block_size",
                format!("{rows} is not one of 16, 32, 64"),
            )),
        }
    }

    /// Number of blocks covering `seq_len` rows (ceiling division)
    #[inline]
    pub const fn num_blocks(self, seq_len: usize) -> usize {
        seq_len.div_ceil(self.rows())
    }
}

/// Tiling and parallel-width parameters for one kernel launch
///
/// Neither field affects output values; they only change how work is cut up.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct KernelConfig {
    /// Rows of the time axis per block
    pub block_size: BlockSize,
    /// Column groups each batch-head's features are split into
    ///
    /// Each group is scheduled as its own task. Clamped to the feature width
    /// at launch.
    pub lanes: usize,
}

impl KernelConfig {
    /// Lane counts searched by the autotuner
    pub const LANE_CANDIDATES: [usize; 3] = [2, 4, 8];

    /// Create a config
    pub const fn new(block_size: BlockSize, lanes: usize) -> Self {
        Self { block_size, lanes }
    }

    /// Full candidate grid: every block size crossed with every lane count
    pub fn candidates() -> Vec<KernelConfig> {
        BlockSize::ALL
            .iter()
            .flat_map(|&block_size| {
                Self::LANE_CANDIDATES
                    .iter()
                    .map(move |&lanes| Self::new(block_size, lanes))
            })
            .collect()
    }

    /// Reject configs that cannot be launched
    pub fn validate(&self) -> Result<()> {
        if self.lanes == 0 {
            return Err(Error::invalid_argument("lanes", "must be at least 1"));
        }
        Ok(())
    }

    /// Column groups actually launched for a feature width
    #[inline]
    pub fn column_groups(&self, width: usize) -> usize {
        self.lanes.min(width).max(1)
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new(BlockSize::default(), 4)
    }
}

impl fmt::Display for KernelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BT={}, lanes={}", self.block_size.rows(), self.lanes)
    }
}
