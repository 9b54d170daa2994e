//! Frame attribute interpolation and axis reorientation.

pub mod interpolate;
pub mod orientation;

pub use interpolate::{
    fraction, interpolate, interpolate_datetime, interpolate_scalar, interpolate_vector, Anchor,
    DateTime, Value,
};
pub use orientation::{
    align_to_affine, align_to_canonical, align_to_orientation, apply_axis_map, axis_map_to,
    best_axis_map, io_orientation, reorient, reorient_to_canonical, voxel_flip_map, AxisCode, AxisFlip, AxisMap,
    Orientation,
};
