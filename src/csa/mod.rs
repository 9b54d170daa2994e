//! Siemens CSA private header support.
//!
//! The CSA image header lives in DICOM element `(0029,1010)` under the private
//! creator `"SIEMENS CSA HEADER"` and carries, among others, the mosaic slice
//! count and slice normal needed to resolve mosaic geometry.

pub(crate) mod diff;
pub(crate) mod header;

pub use diff::{diff, HeaderDiff};
pub use header::{decode, encode, Element, HeaderBlock, Item, ItemLengthMode, MAGIC};

/// Element holding the number of slices packed into a mosaic frame.
pub const NUMBER_OF_IMAGES_IN_MOSAIC: &str = "NumberOfImagesInMosaic";
/// Element holding the slice normal as three direction cosines.
pub const SLICE_NORMAL_VECTOR: &str = "SliceNormalVector";
/// Element holding the acquisition time offset of a frame, in seconds.
pub const TIME_AFTER_START: &str = "TimeAfterStart";
