//! Layout: shape and strides for tensor memory layout

use smallvec::SmallVec;
use std::fmt;

/// Stack allocation threshold for dimensions
/// Sequence tensors are `[B, H, T, S]` at most, so we stack-allocate up to 4
const STACK_DIMS: usize = 4;

/// Shape type: dimensions of a tensor
pub type Shape = SmallVec<[usize; STACK_DIMS]>;

/// Strides type: element offsets between consecutive elements along each dimension
/// NOTE: Strides are in ELEMENTS, not bytes
pub type Strides = SmallVec<[usize; STACK_DIMS]>;

/// Row-major layout of a tensor
///
/// Address of element at indices [i0, i1, ..., in]:
///   i0 * strides[0] + i1 * strides[1] + ... + in * strides[n]
#[derive(Clone, PartialEq, Eq)]
pub struct Layout {
    shape: Shape,
    strides: Strides,
}

impl Layout {
    /// Create a new contiguous (row-major/C-order) layout from a shape
    ///
    /// # Example
    /// ```
    /// use logcumsumexp::tensor::Layout;
    /// let layout = Layout::contiguous(&[2, 3, 4]);
    /// assert_eq!(layout.shape(), &[2, 3, 4]);
    /// assert_eq!(layout.strides(), &[12, 4, 1]);
    /// ```
    pub fn contiguous(shape: &[usize]) -> Self {
        let shape: Shape = shape.iter().copied().collect();
        let strides = Self::compute_contiguous_strides(&shape);
        Self { shape, strides }
    }

    /// Compute contiguous strides for a given shape (row-major order)
    fn compute_contiguous_strides(shape: &[usize]) -> Strides {
        let mut strides: Strides = SmallVec::with_capacity(shape.len());
        let mut stride = 1usize;

        for &dim in shape.iter().rev() {
            strides.push(stride);
            stride *= dim;
        }

        strides.reverse();
        strides
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the strides
    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Number of dimensions (rank)
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements
    #[inline]
    pub fn elem_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Size along a dimension (supports negative indexing)
    pub fn dim(&self, index: isize) -> Option<usize> {
        let ndim = self.ndim() as isize;
        let idx = if index < 0 { index + ndim } else { index };
        if (0..ndim).contains(&idx) {
            Some(self.shape[idx as usize])
        } else {
            None
        }
    }

    /// View the layout as `[batch, rows, cols]` over its last two dimensions
    ///
    /// Every leading dimension is folded into `batch`; a rank-2 layout has a
    /// batch of one. Returns `None` for rank below 2.
    pub fn as_batched_matrix(&self) -> Option<(usize, usize, usize)> {
        let ndim = self.ndim();
        if ndim < 2 {
            return None;
        }
        let batch = self.shape[..ndim - 2].iter().product();
        Some((batch, self.shape[ndim - 2], self.shape[ndim - 1]))
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layout")
            .field("shape", &self.shape.as_slice())
            .field("strides", &self.strides.as_slice())
            .finish()
    }
}
