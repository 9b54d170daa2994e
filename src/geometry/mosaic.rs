//! Mosaic tiling: several slices packed as a grid of tiles in one frame.
//!
//! Tiles are visited in raster order (left to right, then top to bottom).
//! Canvases are `(rows, columns)` like a DICOM pixel buffer; volume slices are
//! `(tile_width, tile_height)`, so every tile is transposed on the way through.

use crate::error::{Error, Result};
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3};

/// Tile grid of a mosaic frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MosaicLayout {
    /// Slices stored in the mosaic.
    pub slice_count: usize,
    /// Tiles per grid row and column, `ceil(sqrt(slice_count))`.
    pub block_dim: usize,
    /// Tile width in pixels.
    pub tile_width: usize,
    /// Tile height in pixels.
    pub tile_height: usize,
    /// Canvas width in pixels.
    pub columns: usize,
    /// Canvas height in pixels.
    pub rows: usize,
}

impl MosaicLayout {
    /// Layout of `slice_count` slices on a `columns` x `rows` canvas.
    pub fn new(slice_count: usize, columns: usize, rows: usize) -> Result<Self> {
        if slice_count == 0 {
            return Err(Error::ShapeMismatch("mosaic with zero slices".into()));
        }
        if columns.checked_mul(rows).map_or(false, |pixels| slice_count > pixels) {
            return Err(Error::ShapeMismatch(format!(
                "{slice_count} slices do not fit a {columns}x{rows} canvas"
            )));
        }
        let block_dim = Self::block_dim_for(slice_count);
        let (tile_width, tile_height) = (columns / block_dim, rows / block_dim);
        if tile_width == 0 || tile_height == 0 {
            return Err(Error::ShapeMismatch(format!(
                "{columns}x{rows} canvas cannot hold a {block_dim}x{block_dim} grid"
            )));
        }
        Ok(Self {
            slice_count,
            block_dim,
            tile_width,
            tile_height,
            columns,
            rows,
        })
    }

    /// Smallest `n` with `n * n >= slice_count`.
    pub fn block_dim_for(slice_count: usize) -> usize {
        let square = |n: usize| n.checked_mul(n).unwrap_or(usize::MAX);
        let mut n = (slice_count as f64).sqrt() as usize;
        while square(n) < slice_count {
            n += 1;
        }
        while n > 1 && square(n - 1) >= slice_count {
            n -= 1;
        }
        n.max(1)
    }

    /// `(row, column)` of the top-left pixel of tile `k`.
    pub fn tile_origin(&self, k: usize) -> (usize, usize) {
        (
            (k / self.block_dim) * self.tile_height,
            (k % self.block_dim) * self.tile_width,
        )
    }

    /// Half the canvas residual in pixels, `(columns - tile_width) / 2` and
    /// `(rows - tile_height) / 2`, kept fractional.
    pub fn canvas_offset(&self) -> [f64; 2] {
        [
            (self.columns - self.tile_width) as f64 / 2.0,
            (self.rows - self.tile_height) as f64 / 2.0,
        ]
    }

    /// Shape of one detiled frame: `(tile_width, tile_height, slice_count)`.
    pub fn volume_shape(&self) -> (usize, usize, usize) {
        (self.tile_width, self.tile_height, self.slice_count)
    }
}

/// Split a mosaic canvas into a `(tile_width, tile_height, slice_count)` stack.
///
/// Tiles past `slice_count` are discarded.
pub fn detile<T: Copy>(canvas: ArrayView2<'_, T>, layout: &MosaicLayout) -> Result<Array3<T>> {
    if canvas.dim() != (layout.rows, layout.columns) {
        return Err(Error::ShapeMismatch(format!(
            "canvas is {:?}, layout expects {:?}",
            canvas.dim(),
            (layout.rows, layout.columns)
        )));
    }
    Ok(Array3::from_shape_fn(
        layout.volume_shape(),
        |(i, j, k)| {
            let (row, col) = layout.tile_origin(k);
            canvas[[row + j, col + i]]
        },
    ))
}

/// Pack a `(tile_width, tile_height, slice_count)` stack into a zero-filled
/// `(rows, columns)` canvas. Unused tiles stay at `T::default()`.
pub fn tile<T: Copy + Default>(
    volume: ArrayView3<'_, T>,
    layout: &MosaicLayout,
) -> Result<Array2<T>> {
    if volume.dim() != layout.volume_shape() {
        return Err(Error::ShapeMismatch(format!(
            "volume is {:?}, layout expects {:?}",
            volume.dim(),
            layout.volume_shape()
        )));
    }
    let mut canvas = Array2::from_elem((layout.rows, layout.columns), T::default());
    for k in 0..layout.slice_count {
        let (row, col) = layout.tile_origin(k);
        canvas
            .slice_mut(s![
                row..row + layout.tile_height,
                col..col + layout.tile_width
            ])
            .assign(&volume.slice(s![.., .., k]).t());
    }
    Ok(canvas)
}
