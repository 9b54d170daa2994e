//! Stack geometry: shape, voxel sizes and the voxel-to-world affine.
//!
//! DICOM positions are in patient LPS; the resulting affine is RAS, as NIfTI
//! expects. For mosaics the DICOM position refers to the corner of the whole
//! canvas, so it is shifted to the corner of the first tile.

use super::mosaic::MosaicLayout;
use crate::dicom::{tags, ReferenceFrame};
use crate::error::{Error, Result};
use tracing::debug;

/// 4x4 homogeneous matrix, row major.
pub type Affine = [[f64; 4]; 4];

/// Identity affine.
pub const IDENTITY: Affine = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Matrix product `a · b`.
pub fn matmul(a: &Affine, b: &Affine) -> Affine {
    let mut out = [[0.0; 4]; 4];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// Upper-left 3x3 block.
pub fn rotation_block(a: &Affine) -> [[f64; 3]; 3] {
    [
        [a[0][0], a[0][1], a[0][2]],
        [a[1][0], a[1][1], a[1][2]],
        [a[2][0], a[2][1], a[2][2]],
    ]
}

/// Determinant of a 3x3 matrix.
#[allow(clippy::many_single_char_names)]
pub fn determinant3(m: &[[f64; 3]; 3]) -> f64 {
    let [[a, b, c], [d, e, f], [g, h, i]] = *m;
    a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g)
}

/// Column norms of the 3x3 block (voxel sizes).
pub fn voxel_sizes(a: &Affine) -> [f64; 3] {
    let mut sizes = [0.0; 3];
    for (j, size) in sizes.iter_mut().enumerate() {
        *size = (0..3).map(|i| a[i][j] * a[i][j]).sum::<f64>().sqrt();
    }
    sizes
}

/// Inverse of an affine whose last row is `[0, 0, 0, 1]`.
#[allow(clippy::many_single_char_names)]
pub fn invert(a: &Affine) -> Result<Affine> {
    let m = rotation_block(a);
    let det = determinant3(&m);
    if !det.is_finite() || det.abs() < 1e-12 {
        return Err(Error::InvalidAffine(format!(
            "singular rotation block (det = {det})"
        )));
    }
    let [[a00, a01, a02], [a10, a11, a12], [a20, a21, a22]] = m;
    let inv = [
        [
            (a11 * a22 - a12 * a21) / det,
            (a02 * a21 - a01 * a22) / det,
            (a01 * a12 - a02 * a11) / det,
        ],
        [
            (a12 * a20 - a10 * a22) / det,
            (a00 * a22 - a02 * a20) / det,
            (a02 * a10 - a00 * a12) / det,
        ],
        [
            (a10 * a21 - a11 * a20) / det,
            (a01 * a20 - a00 * a21) / det,
            (a00 * a11 - a01 * a10) / det,
        ],
    ];
    let mut out = IDENTITY;
    for i in 0..3 {
        out[i][..3].copy_from_slice(&inv[i]);
        out[i][3] = -(0..3).map(|k| inv[i][k] * a[k][3]).sum::<f64>();
    }
    Ok(out)
}

/// Geometry of a frame stack, derived once from its two anchor frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// `(columns, rows, frames)` or `(tile_width, tile_height, slices, frames)`.
    pub shape: Vec<usize>,
    /// Voxel sizes in mm, plus the repetition time in s for mosaics.
    pub zooms: Vec<f64>,
    /// Voxel index to RAS world coordinates.
    pub affine: Affine,
    /// Tile layout when the frames are mosaics.
    pub mosaic: Option<MosaicLayout>,
    /// Sign of the rotation-scale determinant.
    pub negative_determinant: bool,
}

impl Geometry {
    /// Number of frames in the stack (last axis of `shape`).
    pub fn frame_count(&self) -> usize {
        self.shape.last().copied().unwrap_or(0)
    }

    /// Shape of the data taken from one frame (all axes but the last).
    pub fn frame_shape(&self) -> &[usize] {
        &self.shape[..self.shape.len().saturating_sub(1)]
    }
}

fn sub3(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn norm3(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Resolve shape, zooms and affine from the first and last frame of a stack.
pub fn resolve(first: &ReferenceFrame, last: &ReferenceFrame) -> Result<Geometry> {
    let [x, y] = first.orientation;
    let mut t = first.position;
    let mut zooms = vec![first.pixel_spacing[1], first.pixel_spacing[0]];
    let delta = i64::from(last.instance_number) - i64::from(first.instance_number);
    if delta < 0 {
        return Err(Error::DegenerateGeometry(format!(
            "last instance {} precedes first instance {}",
            last.instance_number, first.instance_number
        )));
    }
    let frames = delta as usize + 1;
    let slice_count = first.mosaic_slice_count()?;

    let (shape, z, mosaic) = if slice_count > 1 {
        let layout = MosaicLayout::new(slice_count, first.columns, first.rows)?;
        zooms.push(first.slice_spacing()?);
        let tr = first
            .repetition_time
            .ok_or_else(|| Error::missing(tags::REPETITION_TIME.keyword()))?;
        zooms.push(tr / 1000.0);

        let [dx, dy] = layout.canvas_offset();
        for i in 0..3 {
            t[i] += x[i] * zooms[0] * dx + y[i] * zooms[1] * dy;
        }
        let shape = vec![layout.tile_width, layout.tile_height, slice_count, frames];
        (shape, first.slice_normal()?, Some(layout))
    } else {
        if delta == 0 {
            return Err(Error::DegenerateGeometry(format!(
                "anchors share instance number {}",
                first.instance_number
            )));
        }
        let step = sub3(last.position, first.position).map(|d| d / delta as f64);
        let spacing = norm3(step);
        if !spacing.is_finite() || spacing == 0.0 {
            return Err(Error::DegenerateGeometry(
                "anchors share the same position".into(),
            ));
        }
        zooms.push(spacing);
        let shape = vec![first.columns, first.rows, frames];
        (shape, step.map(|d| d / spacing), None)
    };

    let mut affine = IDENTITY;
    for i in 0..3 {
        affine[i][0] = x[i] * zooms[0];
        affine[i][1] = y[i] * zooms[1];
        affine[i][2] = z[i] * zooms[2];
        affine[i][3] = t[i];
    }
    // LPS -> RAS
    for row in affine.iter_mut().take(2) {
        for v in row.iter_mut() {
            *v = -*v;
        }
    }
    let negative_determinant = determinant3(&rotation_block(&affine)) < 0.0;

    debug!(?shape, ?zooms, mosaic = mosaic.is_some(), "resolved stack geometry");
    Ok(Geometry {
        shape,
        zooms,
        affine,
        mosaic,
        negative_determinant,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csa::{self, Element, HeaderBlock};

    fn frame(instance: i32, position: [f64; 3]) -> ReferenceFrame {
        ReferenceFrame {
            orientation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            position,
            pixel_spacing: [0.8, 0.5],
            instance_number: instance,
            columns: 64,
            rows: 48,
            spacing_between_slices: None,
            slice_thickness: Some(2.0),
            repetition_time: Some(2000.0),
            phase_encoding: None,
            csa: None,
        }
    }

    fn mosaic_frame(instance: i32, slices: usize) -> ReferenceFrame {
        let mut block = HeaderBlock::new();
        block.insert(
            csa::NUMBER_OF_IMAGES_IN_MOSAIC,
            Element::new(1, "US", 6).with_items([slices.to_string()]),
        );
        block.insert(
            csa::SLICE_NORMAL_VECTOR,
            Element::new(3, "FD", 4).with_items(["0", "0", "1"]),
        );
        ReferenceFrame {
            columns: 384,
            rows: 384,
            spacing_between_slices: Some(3.3),
            csa: Some(block),
            ..frame(instance, [-100.0, -90.0, 10.0])
        }
    }

    fn assert_close(a: &Affine, b: &Affine) {
        for i in 0..4 {
            for j in 0..4 {
                assert!((a[i][j] - b[i][j]).abs() < 1e-9, "{a:?} != {b:?}");
            }
        }
    }

    #[test]
    fn test_plain_stack() {
        let first = frame(1, [0.0, 0.0, 0.0]);
        let last = frame(10, [0.0, 0.0, 18.0]);
        let g = resolve(&first, &last).unwrap();
        assert_eq!(g.shape, vec![64, 48, 10]);
        assert_eq!(g.zooms, vec![0.5, 0.8, 2.0]);
        assert!(g.mosaic.is_none());
        assert_close(
            &g.affine,
            &[
                [-0.5, 0.0, 0.0, 0.0],
                [0.0, -0.8, 0.0, 0.0],
                [0.0, 0.0, 2.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        );
        assert!(!g.negative_determinant);
        assert_eq!(g.frame_count(), 10);
    }

    #[test]
    fn test_descending_positions_flip_determinant() {
        let first = frame(1, [0.0, 0.0, 18.0]);
        let last = frame(10, [0.0, 0.0, 0.0]);
        let g = resolve(&first, &last).unwrap();
        assert_eq!(g.affine[2][2], -2.0);
        assert!(g.negative_determinant);
    }

    #[test]
    fn test_degenerate_anchors() {
        let a = frame(3, [0.0; 3]);
        let b = frame(3, [0.0, 0.0, 5.0]);
        assert!(matches!(
            resolve(&a, &b),
            Err(Error::DegenerateGeometry(_))
        ));
        let c = frame(4, [0.0; 3]);
        assert!(matches!(
            resolve(&a, &c),
            Err(Error::DegenerateGeometry(_))
        ));
        assert!(matches!(
            resolve(&c, &a),
            Err(Error::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_mosaic_stack() {
        let first = mosaic_frame(1, 36);
        let last = mosaic_frame(120, 36);
        let g = resolve(&first, &last).unwrap();
        assert_eq!(g.shape, vec![64, 64, 36, 120]);
        assert_eq!(g.zooms, vec![0.5, 0.8, 3.3, 2.0]);
        let layout = g.mosaic.unwrap();
        assert_eq!(layout.block_dim, 6);
        // (384 - 64) / 2 = 160 pixels along each in-plane axis
        let t = [-100.0 + 0.5 * 160.0, -90.0 + 0.8 * 160.0, 10.0];
        assert!((g.affine[0][3] - -t[0]).abs() < 1e-9);
        assert!((g.affine[1][3] - -t[1]).abs() < 1e-9);
        assert!((g.affine[2][3] - t[2]).abs() < 1e-9);
        assert_eq!(g.affine[2][2], 3.3);
    }

    #[test]
    fn test_single_frame_mosaic() {
        let first = mosaic_frame(1, 4);
        let g = resolve(&first, &first.clone()).unwrap();
        assert_eq!(g.shape, vec![192, 192, 4, 1]);
    }

    #[test]
    fn test_mosaic_count_larger_than_canvas() {
        let mut first = mosaic_frame(1, 4);
        first
            .csa
            .as_mut()
            .unwrap()
            .get_mut(csa::NUMBER_OF_IMAGES_IN_MOSAIC)
            .unwrap()
            .items = vec![Some(usize::MAX.to_string())];
        assert!(matches!(
            resolve(&first, &first.clone()),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_mosaic_requires_repetition_time() {
        let mut first = mosaic_frame(1, 4);
        first.repetition_time = None;
        assert!(matches!(
            resolve(&first, &first.clone()),
            Err(Error::MissingAttribute(_))
        ));
    }

    #[test]
    fn test_invert() {
        let a = [
            [0.0, -2.0, 0.0, 10.0],
            [1.5, 0.0, 0.0, -4.0],
            [0.0, 0.0, 3.0, 7.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let inv = invert(&a).unwrap();
        assert_close(&matmul(&a, &inv), &IDENTITY);
        assert_close(&matmul(&inv, &a), &IDENTITY);
        let mut singular = IDENTITY;
        singular[2][2] = 0.0;
        assert!(invert(&singular).is_err());
    }

    #[test]
    fn test_voxel_sizes() {
        let first = frame(1, [0.0, 0.0, 0.0]);
        let last = frame(5, [0.0, 0.0, 12.0]);
        let g = resolve(&first, &last).unwrap();
        let sizes = voxel_sizes(&g.affine);
        assert!((sizes[0] - 0.5).abs() < 1e-12);
        assert!((sizes[1] - 0.8).abs() < 1e-12);
        assert!((sizes[2] - 3.0).abs() < 1e-12);
    }
}
