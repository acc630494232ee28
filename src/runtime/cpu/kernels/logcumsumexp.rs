//! Streaming log-cumsum-exp along the time axis
//!
//! The time axis is cut into blocks of `BT` rows. Inside a block the inclusive
//! prefix sum is a product with the `BT × BT` lower-triangular all-ones matrix;
//! across blocks a per-column carry `(max, sum)` holds the running max and the
//! partial sum of `exp(s - max)`. Whenever the max grows the carried sum is
//! rescaled, so `exp` never sees a positive argument.
//!
//! The shift is the block max, so results are exact only while values within
//! one block stay inside the accumulator's `exp` range of the max (about 103
//! for f32, 745 for f64); earlier rows further below it underflow to the
//! zero-sum clamp.

use super::access::{BlockAccess, BlockPtrAccess, DescriptorAccess};
use crate::autotune::BlockSize;
use crate::dtype::{Accumulator, Element};
use crate::ops::AccessMode;
use num_traits::{Float, Zero};
use std::ops::Range;

/// Running `(max, sum)` per column, carried from block to block
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CarryState<A> {
    /// Largest input seen so far (`b_mp`)
    pub max: Vec<A>,
    /// Inclusive sum of `exp(s - max)` so far (`b_zp`)
    pub sum: Vec<A>,
}

impl<A: Accumulator> CarryState<A> {
    pub(crate) fn new(cols: usize) -> Self {
        Self {
            max: vec![A::neg_infinity(); cols],
            sum: vec![A::zero(); cols],
        }
    }

    /// Raise the running max of each column to `new_max`, rescaling the sum
    ///
    /// A column whose previous max is `-inf` has an exactly zero sum, so the
    /// rescale is skipped rather than evaluating `exp(-inf - -inf)`.
    pub(crate) fn rebase(&mut self, new_max: &[A]) {
        for ((max, sum), &m) in self.max.iter_mut().zip(&mut self.sum).zip(new_max) {
            if *max != A::neg_infinity() {
                *sum *= (*max - m).exp();
            }
            *max = m;
        }
    }
}

/// `exp(x - m)`, with `exp(-inf - m)` taken as exactly zero
#[inline]
pub(crate) fn shifted_exp<A: Accumulator>(x: A, m: A) -> A {
    if x == A::neg_infinity() {
        A::zero()
    } else {
        (x - m).exp()
    }
}

/// `rows × rows` row-major matrix with ones on and below the diagonal
pub(crate) fn lower_triangular_ones<A: Accumulator>(rows: usize) -> Vec<A> {
    let mut mask = vec![A::zero(); rows * rows];
    for r in 0..rows {
        mask[r * rows..=r * rows + r].fill(A::one());
    }
    mask
}

/// `out = mask · b`, with `mask` `[rows, rows]` and `b`, `out` `[rows, cols]`
pub(crate) fn tril_matmul<A: Accumulator>(
    mask: &[A],
    b: &[A],
    out: &mut [A],
    rows: usize,
    cols: usize,
) {
    debug_assert_eq!(mask.len(), rows * rows);
    debug_assert_eq!(b.len(), rows * cols);
    debug_assert_eq!(out.len(), rows * cols);

    out.fill(A::zero());
    for i in 0..rows {
        let out_row = &mut out[i * cols..(i + 1) * cols];
        for k in 0..rows {
            let m = mask[i * rows + k];
            if m == A::zero() {
                continue;
            }
            let b_row = &b[k * cols..(k + 1) * cols];
            for (o, &v) in out_row.iter_mut().zip(b_row) {
                *o += m * v;
            }
        }
    }
}

/// Scan one column group of one batch-head
///
/// # Safety
/// `access` must have been built over valid `[seq_len, _]` input and output
/// views, and the output columns it covers must not be written by anyone
/// else while this runs.
pub(crate) unsafe fn logcumsumexp_blocks<T: Element, M: BlockAccess<T>>(
    access: &mut M,
    seq_len: usize,
    cols: usize,
    block: BlockSize,
) {
    let rows = block.rows();
    let mask = lower_triangular_ones::<T::Accum>(rows);
    let mut carry = CarryState::<T::Accum>::new(cols);
    let mut tile = vec![T::Accum::zero(); rows * cols];
    let mut b_s = vec![T::Accum::zero(); rows * cols];
    let mut block_max = vec![T::Accum::neg_infinity(); cols];

    for i_t in 0..block.num_blocks(seq_len) {
        unsafe { access.load(i_t, &mut tile, T::Accum::neg_infinity()) };

        block_max.copy_from_slice(&carry.max);
        for row in tile.chunks_exact(cols) {
            for (m, &v) in block_max.iter_mut().zip(row) {
                *m = m.max(v);
            }
        }
        carry.rebase(&block_max);

        for (e, row) in b_s.chunks_exact_mut(cols).zip(tile.chunks_exact(cols)) {
            for ((e, &v), &m) in e.iter_mut().zip(row).zip(&block_max) {
                *e = shifted_exp(v, m);
            }
        }

        // The tile is free again; reuse it for the block's prefix sums.
        tril_matmul(&mask, &b_s, &mut tile, rows, cols);
        for row in tile.chunks_exact_mut(cols) {
            for (z, &zp) in row.iter_mut().zip(&carry.sum) {
                *z += zp;
            }
        }

        for row in tile.chunks_exact(cols) {
            for (zc, &z) in carry.sum.iter_mut().zip(row) {
                *zc = zc.max(z);
            }
        }

        let eps = T::Accum::LOG_ZERO_CLAMP;
        for row in tile.chunks_exact_mut(cols) {
            for (z, &m) in row.iter_mut().zip(&block_max) {
                let sum = if *z != T::Accum::zero() { *z } else { eps };
                *z = sum.ln() + m;
            }
        }

        unsafe { access.store(i_t, &tile) };
    }
}

/// Scan columns `cols` of the `[seq_len, width]` batch-head at `s`, writing
/// the matching slice of `z`
///
/// # Safety
/// `s` and `z` must each point at `seq_len * width` valid elements, and no
/// other task may write columns `cols` of `z` concurrently.
pub(crate) unsafe fn logcumsumexp_kernel<T: Element>(
    s: *const T,
    z: *mut T,
    seq_len: usize,
    width: usize,
    cols: Range<usize>,
    block: BlockSize,
    mode: AccessMode,
) {
    let n = cols.len();
    if n == 0 || seq_len == 0 {
        return;
    }
    let rows = block.rows();
    match mode {
        AccessMode::Descriptor => {
            let mut access = DescriptorAccess::new(s, z, seq_len, width, cols.start, n, rows);
            unsafe { logcumsumexp_blocks::<T, _>(&mut access, seq_len, n, block) }
        }
        AccessMode::BlockPointer => {
            let mut access = BlockPtrAccess::new(s, z, seq_len, width, cols.start, n, rows);
            unsafe { logcumsumexp_blocks::<T, _>(&mut access, seq_len, n, block) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(s: &[f64], seq_len: usize, width: usize) -> Vec<f64> {
        let mut out = vec![0.0; s.len()];
        for c in 0..width {
            let mut m = f64::NEG_INFINITY;
            let mut acc = 0.0;
            for t in 0..seq_len {
                let x = s[t * width + c];
                if x > m {
                    if m != f64::NEG_INFINITY {
                        acc *= (m - x).exp();
                    }
                    m = x;
                }
                if x != f64::NEG_INFINITY {
                    acc += (x - m).exp();
                }
                out[t * width + c] = if acc == 0.0 { f64::NEG_INFINITY } else { acc.ln() + m };
            }
        }
        out
    }

    fn run<T: Element>(
        s: &[T],
        seq_len: usize,
        width: usize,
        block: BlockSize,
        mode: AccessMode,
    ) -> Vec<T> {
        let mut z = vec![T::from_f64(0.0); s.len()];
        unsafe {
            logcumsumexp_kernel(s.as_ptr(), z.as_mut_ptr(), seq_len, width, 0..width, block, mode)
        };
        z
    }

    #[test]
    fn test_lower_triangular_ones() {
        let mask = lower_triangular_ones::<f32>(3);
        assert_eq!(mask, vec![1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_tril_matmul_is_prefix_sum() {
        let mask = lower_triangular_ones::<f64>(4);
        let b = vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0];
        let mut out = vec![0.0; 8];
        tril_matmul(&mask, &b, &mut out, 4, 2);
        assert_eq!(out, vec![1.0, 10.0, 3.0, 30.0, 6.0, 60.0, 10.0, 100.0]);
    }

    #[test]
    fn test_shifted_exp_neg_infinity_is_zero() {
        assert_eq!(shifted_exp(f32::NEG_INFINITY, f32::NEG_INFINITY), 0.0);
        assert_eq!(shifted_exp(f32::NEG_INFINITY, 3.0), 0.0);
        assert!((shifted_exp(1.0f64, 1.0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_carry_rebase() {
        let mut carry = CarryState::<f64>::new(2);
        carry.rebase(&[0.0, f64::NEG_INFINITY]);
        assert_eq!(carry.sum, vec![0.0, 0.0]);

        carry.sum = vec![1.0, 0.0];
        carry.rebase(&[2.0f64.ln(), 5.0]);
        assert!((carry.sum[0] - 0.5).abs() < 1e-15);
        assert_eq!(carry.sum[1], 0.0);
        assert_eq!(carry.max[1], 5.0);
    }

    #[test]
    fn test_zeros_give_log_counts() {
        let z = run(&[0.0f64; 6], 3, 2, BlockSize::B16, AccessMode::Descriptor);
        let expected = [0.0, 0.0, 2f64.ln(), 2f64.ln(), 3f64.ln(), 3f64.ln()];
        for (a, b) in z.iter().zip(expected) {
            assert!((a - b).abs() < 1e-12, "{a} vs {b}");
        }
    }

    #[test]
    fn test_crosses_block_boundaries() {
        let seq_len = 70;
        let width = 3;
        let s: Vec<f64> = (0..seq_len * width)
            .map(|i| ((i * 37 % 101) as f64 - 50.0) / 7.0)
            .collect();
        let expected = reference(&s, seq_len, width);

        for block in BlockSize::ALL {
            for mode in [AccessMode::Descriptor, AccessMode::BlockPointer] {
                let z = run(&s, seq_len, width, block, mode);
                for (a, b) in z.iter().zip(&expected) {
                    assert!((a - b).abs() < 1e-10, "{block:?} {mode:?}: {a} vs {b}");
                }
            }
        }
    }

    #[test]
    fn test_all_neg_infinity_column() {
        let s = vec![f32::NEG_INFINITY, 0.0, f32::NEG_INFINITY, 0.0];
        for mode in [AccessMode::Descriptor, AccessMode::BlockPointer] {
            let z = run(&s, 2, 2, BlockSize::B16, mode);
            assert_eq!(z[0], f32::NEG_INFINITY);
            assert_eq!(z[2], f32::NEG_INFINITY);
            assert!(z.iter().all(|v| !v.is_nan()));
        }
    }

    #[test]
    fn test_leading_neg_infinity_then_finite() {
        // -inf for a whole block, then a finite value in the next block.
        let mut s = vec![f64::NEG_INFINITY; 17];
        s[16] = 1.5;
        let z = run(&s, 17, 1, BlockSize::B16, AccessMode::BlockPointer);
        assert!(z[..16].iter().all(|v| *v == f64::NEG_INFINITY));
        assert!((z[16] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_spread_beyond_exp_range_within_block() {
        // Row 0 sits 2e30 below the block max, so its own prefix underflows.
        let s = [1e30f32, -1e30, 3e30, 3e30];
        for mode in [AccessMode::Descriptor, AccessMode::BlockPointer] {
            let z = run(&s, 4, 1, BlockSize::B16, mode);
            assert_eq!(z, vec![3e30f32; 4]);
        }

        // A 700 gap is still inside the f64 range.
        let mut s = vec![-200.0f64; 17];
        s[0] = 500.0;
        let z = run(&s, 17, 1, BlockSize::B16, AccessMode::Descriptor);
        assert_eq!(z[0], 500.0);
        assert!((z[16] - 500.0).abs() < 1e-12);
    }

    #[test]
    fn test_column_group_writes_only_its_columns() {
        let s = vec![0.0f32; 12];
        let mut z = vec![7.0f32; 12];
        unsafe {
            logcumsumexp_kernel(
                s.as_ptr(),
                z.as_mut_ptr(),
                3,
                4,
                1..3,
                BlockSize::B16,
                AccessMode::Descriptor,
            )
        };
        for row in z.chunks(4) {
            assert_eq!(row[0], 7.0);
            assert_eq!(row[3], 7.0);
        }
        assert!((z[9] - 3f32.ln()).abs() < 1e-6);
    }
}
