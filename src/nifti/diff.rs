//! Field-by-field comparison of two NIfTI headers.
//!
//! Numeric fields are compared with a relative and absolute tolerance, NaN
//! equal to NaN. Everything else must match exactly.

use super::header::NiftiHeader;
use super::io::load_header;
use crate::error::Result;
use std::fmt;
use std::path::Path;

const RTOL: f64 = 1e-5;
const ATOL: f64 = 1e-8;

/// Value of one header field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Numeric field, scalar or array.
    Numbers(Vec<f64>),
    /// String or enumerated field.
    Text(String),
}

impl FieldValue {
    fn close_to(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Numbers(a), Self::Numbers(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| is_close(x, y))
            }
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numbers(v) if v.len() == 1 => write!(f, "{}", v[0]),
            Self::Numbers(v) => write!(f, "{v:?}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

fn is_close(a: f64, b: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return a.is_nan() && b.is_nan();
    }
    a == b || (a - b).abs() <= ATOL + RTOL * b.abs()
}

/// A header field whose values differ.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDiff {
    /// NIfTI-1 field name.
    pub name: &'static str,
    /// Value in the left header.
    pub left: FieldValue,
    /// Value in the right header.
    pub right: FieldValue,
}

impl fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "< {name}: {}\n> {name}: {}",
            self.left,
            self.right,
            name = self.name
        )
    }
}

fn numbers<I: IntoIterator<Item = f64>>(values: I) -> FieldValue {
    FieldValue::Numbers(values.into_iter().collect())
}

/// Header fields in file order.
fn fields(h: &NiftiHeader) -> Vec<(&'static str, FieldValue)> {
    let dim = std::iter::once(f64::from(h.ndim)).chain(h.dim.iter().map(|&d| d as f64));
    vec![
        ("dim_info", numbers([f64::from(h.dim_info.to_byte())])),
        ("dim", numbers(dim)),
        ("intent_code", numbers([f64::from(h.intent_code)])),
        ("datatype", FieldValue::Text(h.datatype.to_string())),
        ("bitpix", numbers([(h.datatype.byte_size() * 8) as f64])),
        ("pixdim", numbers(h.pixdim)),
        ("vox_offset", numbers([h.vox_offset as f64])),
        ("scl_slope", numbers([h.scl_slope])),
        ("scl_inter", numbers([h.scl_inter])),
        ("spatial_units", FieldValue::Text(format!("{:?}", h.spatial_units))),
        ("temporal_units", FieldValue::Text(format!("{:?}", h.temporal_units))),
        ("descrip", FieldValue::Text(h.descrip.clone())),
        ("aux_file", FieldValue::Text(h.aux_file.clone())),
        ("qform_code", numbers([f64::from(h.qform_code)])),
        ("sform_code", numbers([f64::from(h.sform_code)])),
        ("quatern", numbers(h.quatern)),
        ("qoffset", numbers(h.qoffset)),
        ("srow_x", numbers(h.srow[0])),
        ("srow_y", numbers(h.srow[1])),
        ("srow_z", numbers(h.srow[2])),
    ]
}

/// Fields that differ between two headers, in file order.
pub fn diff(left: &NiftiHeader, right: &NiftiHeader) -> Vec<FieldDiff> {
    fields(left)
        .into_iter()
        .zip(fields(right))
        .filter(|((_, l), (_, r))| !l.close_to(r))
        .map(|((name, left), (_, right))| FieldDiff { name, left, right })
        .collect()
}

/// Compare the headers of two `.nii` / `.nii.gz` files.
pub fn diff_files<P: AsRef<Path>, Q: AsRef<Path>>(left: P, right: Q) -> Result<Vec<FieldDiff>> {
    Ok(diff(&load_header(left)?, &load_header(right)?))
}
