//! Blocked tile access into `[T, S]` batch-head slices
//!
//! Both strategies move a `[rows, cols]` box between a strided 2-D view and a
//! dense row-major tile in accumulation precision. They differ only in how
//! bounds are handled:
//!
//! - [`TensorDescriptor`] clips the box against the view once per call and
//!   then copies whole row segments.
//! - [`BlockPtr`] carries its own offsets, checks every element against the
//!   view bounds and is stepped down the time axis with [`BlockPtr::advance`].
//!
//! Slots of the tile that fall outside the view are filled on load and are
//! never written back on store.

use crate::dtype::Element;

/// Moves one block of rows between the input/output views and a tile
///
/// Blocks are always visited in increasing order starting at zero.
pub(crate) trait BlockAccess<T: Element> {
    /// Load block `block` of the input into `tile`, padding with `fill`
    ///
    /// # Safety
    /// The input view this accessor was built over must be readable.
    unsafe fn load(&mut self, block: usize, tile: &mut [T::Accum], fill: T::Accum);

    /// Store the in-bounds part of `tile` as block `block` of the output
    ///
    /// # Safety
    /// The output view this accessor was built over must be writable and not
    /// aliased by any other task.
    unsafe fn store(&mut self, block: usize, tile: &[T::Accum]);
}

// ============================================================================
// Descriptor strategy
// ============================================================================

/// Shape and stride description of a 2-D row-major view
///
/// Addressed by absolute `[row, col]` offsets; the view itself keeps no
/// cursor.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TensorDescriptor<T> {
    base: *mut T,
    shape: [usize; 2],
    strides: [usize; 2],
    block_shape: [usize; 2],
}

impl<T: Element> TensorDescriptor<T> {
    /// Describe `shape` elements starting at `base`
    ///
    /// Read-only views are built from a `*const` cast to `*mut`; only
    /// [`store_box`](Self::store_box) ever writes through `base`.
    pub(crate) fn new(
        base: *mut T,
        shape: [usize; 2],
        strides: [usize; 2],
        block_shape: [usize; 2],
    ) -> Self {
        Self {
            base,
            shape,
            strides,
            block_shape,
        }
    }

    /// Rows and columns of the box at `offsets` that lie inside the view
    #[inline]
    fn clipped(&self, offsets: [usize; 2]) -> (usize, usize) {
        let rows = self.block_shape[0].min(self.shape[0].saturating_sub(offsets[0]));
        let cols = self.block_shape[1].min(self.shape[1].saturating_sub(offsets[1]));
        (rows, cols)
    }

    /// Copy the box at `offsets` into `tile`
    ///
    /// # Safety
    /// Every in-bounds element of the view must be readable.
    pub(crate) unsafe fn load_box(
        &self,
        offsets: [usize; 2],
        tile: &mut [T::Accum],
        fill: T::Accum,
    ) {
        let [block_rows, block_cols] = self.block_shape;
        debug_assert_eq!(tile.len(), block_rows * block_cols);

        let (rows, cols) = self.clipped(offsets);
        if rows < block_rows || cols < block_cols {
            tile.fill(fill);
        }

        for r in 0..rows {
            let start = (offsets[0] + r) * self.strides[0] + offsets[1] * self.strides[1];
            let dst = &mut tile[r * block_cols..r * block_cols + cols];
            if self.strides[1] == 1 {
                let src = unsafe { std::slice::from_raw_parts(self.base.add(start), cols) };
                for (d, &s) in dst.iter_mut().zip(src) {
                    *d = s.to_accum();
                }
            } else {
                for (c, d) in dst.iter_mut().enumerate() {
                    *d = unsafe { *self.base.add(start + c * self.strides[1]) }.to_accum();
                }
            }
        }
    }

    /// Write the in-bounds part of `tile` to the box at `offsets`
    ///
    /// # Safety
    /// Every in-bounds element of the view must be writable by this caller
    /// alone.
    pub(crate) unsafe fn store_box(&self, offsets: [usize; 2], tile: &[T::Accum]) {
        let block_cols = self.block_shape[1];
        let (rows, cols) = self.clipped(offsets);

        for r in 0..rows {
            let start = (offsets[0] + r) * self.strides[0] + offsets[1] * self.strides[1];
            let src = &tile[r * block_cols..r * block_cols + cols];
            if self.strides[1] == 1 {
                let dst = unsafe { std::slice::from_raw_parts_mut(self.base.add(start), cols) };
                for (d, &s) in dst.iter_mut().zip(src) {
                    *d = T::from_accum(s);
                }
            } else {
                for (c, &s) in src.iter().enumerate() {
                    unsafe { *self.base.add(start + c * self.strides[1]) = T::from_accum(s) };
                }
            }
        }
    }
}

/// Input and output descriptors for one column group
pub(crate) struct DescriptorAccess<T> {
    s: TensorDescriptor<T>,
    z: TensorDescriptor<T>,
    col: usize,
    block_rows: usize,
}

impl<T: Element> DescriptorAccess<T> {
    /// Build over a `[seq_len, width]` batch-head slice, covering columns
    /// `col..col + cols`
    pub(crate) fn new(
        s: *const T,
        z: *mut T,
        seq_len: usize,
        width: usize,
        col: usize,
        cols: usize,
        block_rows: usize,
    ) -> Self {
        let shape = [seq_len, width];
        let strides = [width, 1];
        let block_shape = [block_rows, cols];
        Self {
            s: TensorDescriptor::new(s.cast_mut(), shape, strides, block_shape),
            z: TensorDescriptor::new(z, shape, strides, block_shape),
            col,
            block_rows,
        }
    }
}

impl<T: Element> BlockAccess<T> for DescriptorAccess<T> {
    #[inline]
    unsafe fn load(&mut self, block: usize, tile: &mut [T::Accum], fill: T::Accum) {
        unsafe { self.s.load_box([block * self.block_rows, self.col], tile, fill) }
    }

    #[inline]
    unsafe fn store(&mut self, block: usize, tile: &[T::Accum]) {
        unsafe { self.z.store_box([block * self.block_rows, self.col], tile) }
    }
}

// ============================================================================
// Block-pointer strategy
// ============================================================================

/// Pointer to a `[rows, cols]` block inside a bounded 2-D view
#[derive(Clone, Copy, Debug)]
pub(crate) struct BlockPtr<T> {
    base: *mut T,
    shape: [usize; 2],
    strides: [usize; 2],
    offsets: [usize; 2],
    block_shape: [usize; 2],
}

impl<T: Element> BlockPtr<T> {
    pub(crate) fn new(
        base: *mut T,
        shape: [usize; 2],
        strides: [usize; 2],
        offsets: [usize; 2],
        block_shape: [usize; 2],
    ) -> Self {
        Self {
            base,
            shape,
            strides,
            offsets,
            block_shape,
        }
    }

    /// Current `[row, col]` offsets of the block
    #[inline]
    pub(crate) fn offsets(&self) -> [usize; 2] {
        self.offsets
    }

    /// Move the block by `delta` along each axis
    #[inline]
    pub(crate) fn advance(&mut self, delta: [usize; 2]) {
        self.offsets[0] += delta[0];
        self.offsets[1] += delta[1];
    }

    #[inline]
    fn in_bounds(&self, r: usize, c: usize) -> Option<usize> {
        let row = self.offsets[0] + r;
        let col = self.offsets[1] + c;
        (row < self.shape[0] && col < self.shape[1])
            .then(|| row * self.strides[0] + col * self.strides[1])
    }

    /// Load the current block, substituting `fill` for out-of-bounds slots
    ///
    /// # Safety
    /// Every in-bounds element of the view must be readable.
    pub(crate) unsafe fn load_checked(&self, tile: &mut [T::Accum], fill: T::Accum) {
        let [rows, cols] = self.block_shape;
        debug_assert_eq!(tile.len(), rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                tile[r * cols + c] = match self.in_bounds(r, c) {
                    Some(idx) => unsafe { *self.base.add(idx) }.to_accum(),
                    None => fill,
                };
            }
        }
    }

    /// Store the current block, skipping out-of-bounds slots
    ///
    /// # Safety
    /// Every in-bounds element of the view must be writable by this caller
    /// alone.
    pub(crate) unsafe fn store_checked(&self, tile: &[T::Accum]) {
        let [rows, cols] = self.block_shape;
        for r in 0..rows {
            for c in 0..cols {
                if let Some(idx) = self.in_bounds(r, c) {
                    unsafe { *self.base.add(idx) = T::from_accum(tile[r * cols + c]) };
                }
            }
        }
    }
}

/// Input and output block pointers for one column group, advanced in step
pub(crate) struct BlockPtrAccess<T> {
    s: BlockPtr<T>,
    z: BlockPtr<T>,
    block_rows: usize,
}

impl<T: Element> BlockPtrAccess<T> {
    /// Build over a `[seq_len, width]` batch-head slice, covering columns
    /// `col..col + cols`
    pub(crate) fn new(
        s: *const T,
        z: *mut T,
        seq_len: usize,
        width: usize,
        col: usize,
        cols: usize,
        block_rows: usize,
    ) -> Self {
        let shape = [seq_len, width];
        let strides = [width, 1];
        let offsets = [0, col];
        let block_shape = [block_rows, cols];
        Self {
            s: BlockPtr::new(s.cast_mut(), shape, strides, offsets, block_shape),
            z: BlockPtr::new(z, shape, strides, offsets, block_shape),
            block_rows,
        }
    }
}

impl<T: Element> BlockAccess<T> for BlockPtrAccess<T> {
    #[inline]
    unsafe fn load(&mut self, block: usize, tile: &mut [T::Accum], fill: T::Accum) {
        debug_assert_eq!(self.s.offsets()[0], block * self.block_rows);
        unsafe { self.s.load_checked(tile, fill) };
        self.s.advance([self.block_rows, 0]);
    }

    #[inline]
    unsafe fn store(&mut self, block: usize, tile: &[T::Accum]) {
        debug_assert_eq!(self.z.offsets()[0], block * self.block_rows);
        unsafe { self.z.store_checked(tile) };
        self.z.advance([self.block_rows, 0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 5 x 3 view, values = 10 * row + col
    fn view() -> Vec<f32> {
        (0..5)
            .flat_map(|r| (0..3).map(move |c| (10 * r + c) as f32))
            .collect()
    }

    #[test]
    fn test_descriptor_clips_partial_block() {
        let data = view();
        let desc = TensorDescriptor::new(data.as_ptr().cast_mut(), [5, 3], [3, 1], [4, 2]);
        let mut tile = vec![0.0f32; 8];

        unsafe { desc.load_box([4, 1], &mut tile, f32::NEG_INFINITY) };
        assert_eq!(tile[0], 41.0);
        assert_eq!(tile[1], 42.0);
        assert!(tile[2..].iter().all(|v| *v == f32::NEG_INFINITY));
    }

    #[test]
    fn test_block_ptr_matches_descriptor() {
        let data = view();
        let desc = TensorDescriptor::new(data.as_ptr().cast_mut(), [5, 3], [3, 1], [4, 2]);
        let mut ptr = BlockPtr::new(data.as_ptr().cast_mut(), [5, 3], [3, 1], [0, 1], [4, 2]);

        for block in 0..2 {
            let mut a = vec![0.0f32; 8];
            let mut b = vec![0.0f32; 8];
            unsafe {
                desc.load_box([block * 4, 1], &mut a, -1.0);
                ptr.load_checked(&mut b, -1.0);
            }
            assert_eq!(a, b);
            ptr.advance([4, 0]);
        }
        assert_eq!(ptr.offsets(), [8, 1]);
    }

    #[test]
    fn test_store_skips_out_of_bounds() {
        let mut a = vec![0.0f64; 15];
        let mut b = vec![0.0f64; 15];
        let tile: Vec<f64> = (1..=8).map(|v| v as f64).collect();

        let desc = TensorDescriptor::<f64>::new(a.as_mut_ptr(), [5, 3], [3, 1], [4, 2]);
        let ptr = BlockPtr::<f64>::new(b.as_mut_ptr(), [5, 3], [3, 1], [4, 1], [4, 2]);
        unsafe {
            desc.store_box([4, 1], &tile);
            ptr.store_checked(&tile);
        }

        assert_eq!(a, b);
        assert_eq!(&a[12..], &[0.0, 1.0, 2.0]);
        assert!(a[..12].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_accessors_step_through_blocks() {
        let data = view();
        let mut out_desc = vec![0.0f32; 15];
        let mut out_ptr = vec![0.0f32; 15];
        let mut desc = DescriptorAccess::new(data.as_ptr(), out_desc.as_mut_ptr(), 5, 3, 0, 3, 2);
        let mut ptr = BlockPtrAccess::new(data.as_ptr(), out_ptr.as_mut_ptr(), 5, 3, 0, 3, 2);

        let mut tile = vec![0.0f32; 6];
        for block in 0..3 {
            unsafe {
                BlockAccess::<f32>::load(&mut desc, block, &mut tile, 0.0);
                BlockAccess::<f32>::store(&mut desc, block, &tile);
                BlockAccess::<f32>::load(&mut ptr, block, &mut tile, 0.0);
                BlockAccess::<f32>::store(&mut ptr, block, &tile);
            }
        }
        assert_eq!(out_desc, data);
        assert_eq!(out_ptr, data);
    }
}
