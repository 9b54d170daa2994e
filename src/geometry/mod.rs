//! Stack geometry and mosaic tiling.

pub(crate) mod affine;
pub(crate) mod mosaic;

pub use affine::{
    determinant3, invert, matmul, resolve, rotation_block, voxel_sizes, Affine, Geometry,
    IDENTITY,
};
pub use mosaic::{detile, tile, MosaicLayout};
