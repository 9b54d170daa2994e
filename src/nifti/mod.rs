//! `NIfTI`-1 file format support.
//!
//! `NIfTI` (Neuroimaging Informatics Technology Initiative) is the volume
//! container produced by the forward conversion and consumed by the reverse
//! one. This module reads, writes and compares `.nii` and `.nii.gz` files.

pub(crate) mod diff;
pub(crate) mod header;
pub(crate) mod image;
pub mod io;

pub use diff::{diff, diff_files, FieldDiff, FieldValue};
pub use header::{DataType, DimInfo, NiftiHeader, SpatialUnits, TemporalUnits};
pub use image::NiftiImage;
pub use io::{load, load_header, save, save_new};
