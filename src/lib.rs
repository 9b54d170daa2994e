//! # medconv
//!
//! Conversion between DICOM frame stacks and `NIfTI` volumes, with first
//! class support for Siemens mosaic acquisitions.
//!
//! ## Building blocks
//!
//! - [`csa`]: codec for the Siemens CSA private header (`SV10`)
//! - [`dicom`]: the attribute view of a frame the converters read
//! - [`geometry`]: affine resolution from two anchor frames, mosaic tiling
//! - [`transforms`]: attribute interpolation and axis reorientation
//! - [`nifti`]: `NIfTI`-1 header, image and file I/O
//! - [`convert`]: the forward and reverse pipelines
//!
//! ## Example
//!
//! ```ignore
//! use medconv::convert::{frames_to_volume, write_volume, ConvertConfig};
//!
//! let config = ConvertConfig::default();
//! let conversion = frames_to_volume(&frames, &config)?;
//! let path = write_volume(&conversion, out_dir, &config)?;
//! ```

pub mod convert;
pub mod csa;
pub mod dicom;
pub mod error;
pub mod geometry;
pub mod nifti;
pub mod transforms;

pub use error::{Error, Result};
