//! Axis orientation: signed axis permutations between voxel and world frames.
//!
//! An [`AxisMap`] records, for each input voxel axis, which output axis it
//! becomes and whether it is reversed. Maps are found by greedily matching
//! the columns of a direction matrix to a target basis, largest absolute
//! component first.

use crate::error::{Error, Result};
use crate::geometry::{invert, matmul, rotation_block, Affine};
use crate::nifti::NiftiImage;
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, ShapeBuilder};
use std::fmt;
use std::str::FromStr;

/// Anatomical direction a voxel axis increases towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisCode {
    /// Right
    R,
    /// Left
    L,
    /// Anterior
    A,
    /// Posterior
    P,
    /// Superior
    S,
    /// Inferior
    I,
}

impl AxisCode {
    const fn new(world_axis: usize, positive: bool) -> Self {
        match (world_axis, positive) {
            (0, true) => Self::R,
            (0, false) => Self::L,
            (1, true) => Self::A,
            (1, false) => Self::P,
            (_, true) => Self::S,
            (_, false) => Self::I,
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'R' => Some(Self::R),
            'L' => Some(Self::L),
            'A' => Some(Self::A),
            'P' => Some(Self::P),
            'S' => Some(Self::S),
            'I' => Some(Self::I),
            _ => None,
        }
    }

    const fn as_char(self) -> char {
        match self {
            Self::R => 'R',
            Self::L => 'L',
            Self::A => 'A',
            Self::P => 'P',
            Self::S => 'S',
            Self::I => 'I',
        }
    }

    /// RAS world axis this code lies on.
    pub const fn world_axis(self) -> usize {
        match self {
            Self::R | Self::L => 0,
            Self::A | Self::P => 1,
            Self::S | Self::I => 2,
        }
    }

    /// True when the code points along the positive RAS direction.
    pub const fn is_positive(self) -> bool {
        matches!(self, Self::R | Self::A | Self::S)
    }
}

/// Axis codes of the three spatial voxel axes, e.g. `RAS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Orientation(pub [AxisCode; 3]);

impl Orientation {
    /// Canonical NIfTI orientation.
    pub const RAS: Self = Self([AxisCode::R, AxisCode::A, AxisCode::S]);
    /// DICOM patient orientation.
    pub const LPS: Self = Self([AxisCode::L, AxisCode::P, AxisCode::S]);

    /// Orientation of the voxel axes of `affine`.
    pub fn from_affine(affine: &Affine) -> Result<Self> {
        let map = io_orientation(affine)?;
        Ok(Self(map.0.map(|e| AxisCode::new(e.axis, !e.flip))))
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::RAS
    }
}

impl FromStr for Orientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let codes: Vec<AxisCode> = s
            .trim()
            .chars()
            .map(|c| {
                AxisCode::from_char(c)
                    .ok_or_else(|| Error::InvalidOrientation(format!("unknown axis code '{c}' in '{s}'")))
            })
            .collect::<Result<_>>()?;
        let [a, b, c] = codes[..] else {
            return Err(Error::InvalidOrientation(format!(
                "expected 3 axis codes, got '{s}'"
            )));
        };
        let mut seen = [false; 3];
        for code in [a, b, c] {
            if std::mem::replace(&mut seen[code.world_axis()], true) {
                return Err(Error::InvalidOrientation(format!(
                    "'{s}' names a world axis twice"
                )));
            }
        }
        Ok(Self([a, b, c]))
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for code in self.0 {
            write!(f, "{}", code.as_char())?;
        }
        Ok(())
    }
}

/// Destination of one input axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisFlip {
    /// Output axis index.
    pub axis: usize,
    /// Reverse the axis.
    pub flip: bool,
}

/// Signed permutation of the three spatial axes, indexed by input axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisMap(pub [AxisFlip; 3]);

impl AxisMap {
    /// Keeps every axis in place.
    pub const IDENTITY: Self = Self([
        AxisFlip { axis: 0, flip: false },
        AxisFlip { axis: 1, flip: false },
        AxisFlip { axis: 2, flip: false },
    ]);

    /// Map undoing `self`.
    pub fn inverse(&self) -> Self {
        let mut out = Self::IDENTITY;
        for (i, e) in self.0.iter().enumerate() {
            out.0[e.axis] = AxisFlip {
                axis: i,
                flip: e.flip,
            };
        }
        out
    }

    /// Check that the target axes are 0, 1 and 2 in some order.
    pub fn validate(&self) -> Result<()> {
        let mut seen = [false; 3];
        for e in &self.0 {
            if e.axis >= 3 || std::mem::replace(&mut seen[e.axis], true) {
                return Err(Error::InvalidOrientation(format!(
                    "{:?} is not a permutation of the spatial axes",
                    self.0.map(|e| e.axis)
                )));
            }
        }
        Ok(())
    }

    /// True when applying the map changes nothing.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Shape after applying the map to an array of `shape`.
    pub fn permuted_shape(&self, shape: &[usize]) -> Vec<usize> {
        let mut out = shape.to_vec();
        for (i, e) in self.0.iter().enumerate() {
            out[e.axis] = shape[i];
        }
        out
    }

    /// Affine taking voxel indices of the mapped array back to indices of
    /// the input array of `shape`. Right-multiply a voxel-to-world affine by
    /// it to keep world coordinates fixed.
    pub fn affine_transform(&self, shape: &[usize]) -> Affine {
        let mut out = [[0.0; 4]; 4];
        out[3][3] = 1.0;
        for (i, e) in self.0.iter().enumerate() {
            if e.flip {
                out[i][e.axis] = -1.0;
                out[i][3] = shape[i].saturating_sub(1) as f64;
            } else {
                out[i][e.axis] = 1.0;
            }
        }
        out
    }

    /// Flip, then permute the spatial axes of `data`. Further axes are kept.
    ///
    /// The result is laid out in Fortran order.
    pub fn apply<T: Clone>(&self, data: ArrayViewD<'_, T>) -> Result<ArrayD<T>> {
        let ndim = data.ndim();
        if ndim < 3 {
            return Err(Error::InvalidDimensions(format!(
                "cannot reorient a {ndim}-D array"
            )));
        }
        self.validate()?;
        let mut view = data;
        for (i, e) in self.0.iter().enumerate() {
            if e.flip {
                view.invert_axis(Axis(i));
            }
        }
        let mut perm: Vec<usize> = (0..ndim).collect();
        for (i, e) in self.0.iter().enumerate() {
            perm[e.axis] = i;
        }
        let view = view.permuted_axes(perm);
        let shape = view.shape().to_vec();
        let values: Vec<T> = view.t().iter().cloned().collect();
        ArrayD::from_shape_vec(IxDyn(&shape).f(), values)
            .map_err(|e| Error::InvalidDimensions(e.to_string()))
    }
}

impl Default for AxisMap {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Signed permutation whose columns best match the standard basis.
///
/// `m[row][col]` is the component of input axis `col` along output axis
/// `row`. Pairs are picked by descending absolute value, each row and column
/// used once; the sign of the chosen component becomes the flip.
pub fn best_axis_map(m: &[[f64; 3]; 3]) -> AxisMap {
    let mut out = AxisMap::IDENTITY;
    let mut used_rows = [false; 3];
    let mut used_cols = [false; 3];
    for _ in 0..3 {
        let mut best: Option<(usize, usize, f64)> = None;
        for (r, row) in m.iter().enumerate() {
            if used_rows[r] {
                continue;
            }
            for (c, &v) in row.iter().enumerate() {
                if used_cols[c] {
                    continue;
                }
                if best.map_or(true, |(_, _, b)| v.abs() > b.abs()) {
                    best = Some((r, c, v));
                }
            }
        }
        if let Some((r, c, v)) = best {
            used_rows[r] = true;
            used_cols[c] = true;
            out.0[c] = AxisFlip {
                axis: r,
                flip: v < 0.0,
            };
        }
    }
    out
}

/// Map from the voxel axes of `affine` to RAS world axes.
pub fn io_orientation(affine: &Affine) -> Result<AxisMap> {
    let mut m = rotation_block(affine);
    for j in 0..3 {
        let norm = (0..3).map(|i| m[i][j] * m[i][j]).sum::<f64>().sqrt();
        if !norm.is_finite() || norm == 0.0 {
            return Err(Error::InvalidAffine(format!("voxel axis {j} has no extent")));
        }
        for row in &mut m {
            row[j] /= norm;
        }
    }
    Ok(best_axis_map(&m))
}

/// Map from the voxel axes of `affine` to the axis order of `target`.
pub fn axis_map_to(affine: &Affine, target: Orientation) -> Result<AxisMap> {
    let ras = io_orientation(affine)?;
    let mut out = AxisMap::IDENTITY;
    for (i, e) in ras.0.iter().enumerate() {
        let (p, code) = target
            .0
            .iter()
            .enumerate()
            .find(|(_, code)| code.world_axis() == e.axis)
            .ok_or_else(|| Error::InvalidOrientation(target.to_string()))?;
        out.0[i] = AxisFlip {
            axis: p,
            flip: e.flip ^ !code.is_positive(),
        };
    }
    Ok(out)
}

/// Map from the voxel axes of `affine` to those of `target`, i.e. the best
/// signed permutation approximating `inv(target) · affine`.
pub fn align_to_affine(affine: &Affine, target: &Affine) -> Result<AxisMap> {
    io_orientation(&matmul(&invert(target)?, affine))
}

/// Default forward-path voxel flip: keep the first axis, reverse the second,
/// and reverse the third when the source affine has a negative determinant.
pub fn voxel_flip_map(negative_determinant: bool) -> AxisMap {
    let z = if negative_determinant { -1.0 } else { 1.0 };
    best_axis_map(&[[1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, z]])
}

/// Apply `map` to `data` and compose the affine so world coordinates are kept.
pub fn apply_axis_map<T: Clone>(
    data: ArrayViewD<'_, T>,
    affine: &Affine,
    map: &AxisMap,
) -> Result<(ArrayD<T>, Affine)> {
    let shape = data.shape().to_vec();
    let out = map.apply(data)?;
    Ok((out, matmul(affine, &map.affine_transform(&shape))))
}

/// Reorder `data` so its voxel axes follow `target`.
pub fn align_to_orientation<T: Clone>(
    data: ArrayViewD<'_, T>,
    affine: &Affine,
    target: Orientation,
) -> Result<(ArrayD<T>, Affine, AxisMap)> {
    let map = axis_map_to(affine, target)?;
    let (out, affine) = apply_axis_map(data, affine, &map)?;
    Ok((out, affine, map))
}

/// Reorder `data` into RAS voxel order.
pub fn align_to_canonical<T: Clone>(
    data: ArrayViewD<'_, T>,
    affine: &Affine,
) -> Result<(ArrayD<T>, Affine, AxisMap)> {
    align_to_orientation(data, affine, Orientation::RAS)
}

/// Reorient `image` to the axis codes of `target`.
///
/// # Example
///
/// ```ignore
/// let ras = reorient(&img, "RAS".parse()?)?;
/// ```
pub fn reorient(image: &NiftiImage, target: Orientation) -> Result<NiftiImage> {
    let map = axis_map_to(&image.affine(), target)?;
    if map.is_identity() {
        return Ok(image.clone());
    }
    image.reoriented(&map)
}

/// Reorient `image` to RAS.
///
/// With `diagonal`, the result must also have its voxel axes along the world
/// axes; an oblique image is rejected with `InvalidOrientation` instead of
/// being returned with off-diagonal terms.
pub fn reorient_to_canonical(image: &NiftiImage, diagonal: bool) -> Result<NiftiImage> {
    let out = reorient(image, Orientation::RAS)?;
    if diagonal && !is_diagonal(&rotation_block(&out.affine())) {
        return Err(Error::InvalidOrientation(
            "canonical affine is not diagonal".into(),
        ));
    }
    Ok(out)
}

fn is_diagonal(m: &[[f64; 3]; 3]) -> bool {
    (0..3).all(|r| (0..3).all(|c| r == c || m[r][c].abs() <= 1e-8))
}
