//! Tests for NIfTI file I/O as used by the conversion pipelines.
//!
//! Covers error conditions on corrupted files and the metadata the
//! forward conversion relies on surviving a save/load cycle.

use medconv::geometry::IDENTITY;
use medconv::nifti::{self, DataType, DimInfo, NiftiImage, SpatialUnits, TemporalUnits};
use ndarray::ArrayD;
use ndarray::ShapeBuilder;
use tempfile::{tempdir, NamedTempFile};

/// Create a test NIfTI image from C-order values
fn create_test_image(data: Vec<f32>, shape: Vec<usize>) -> NiftiImage {
    let c_order = ArrayD::from_shape_vec(shape.clone(), data).unwrap();
    let mut f_order = ArrayD::zeros(ndarray::IxDyn(&shape).f());
    f_order.assign(&c_order);
    NiftiImage::from_array(f_order, IDENTITY).unwrap()
}

#[test]
fn test_load_invalid_magic_bytes() {
    let img = create_test_image(vec![1.0f32, 2.0, 3.0, 4.0], vec![2, 2, 1]);
    let file = NamedTempFile::new().unwrap();
    nifti::save(&img, file.path()).unwrap();

    // Corrupt magic bytes
    let mut file_data = std::fs::read(file.path()).unwrap();
    file_data[344..348].copy_from_slice(b"BAD!");
    std::fs::write(file.path(), file_data).unwrap();

    let err = nifti::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("invalid NIfTI magic"));
}

#[test]
fn test_load_unsupported_data_type() {
    let img = create_test_image(vec![1.0f32, 2.0, 3.0, 4.0], vec![2, 2, 1]);
    let file = NamedTempFile::new().unwrap();
    nifti::save(&img, file.path()).unwrap();

    let mut file_data = std::fs::read(file.path()).unwrap();
    file_data[70..72].copy_from_slice(&9999i16.to_le_bytes());
    std::fs::write(file.path(), file_data).unwrap();

    let err = nifti::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("unsupported data type"));
}

#[test]
fn test_corrupted_file_handling() {
    let img = create_test_image(vec![1.0f32, 2.0, 3.0, 4.0], vec![2, 2, 1]);
    let file = NamedTempFile::new().unwrap();
    nifti::save(&img, file.path()).unwrap();

    // Cut the file inside the header
    let original = std::fs::read(file.path()).unwrap();
    std::fs::write(file.path(), &original[..original.len() / 2]).unwrap();

    let err = nifti::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("error"));
}

#[test]
fn test_roundtrip_preserves_conversion_metadata() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bold.nii.gz");

    let img = create_test_image((0..24).map(|v| v as f32).collect(), vec![2, 3, 2, 2])
        .with_dtype(DataType::Int16)
        .with_zooms(&[3.0, 3.0, 3.6, 2.5])
        .unwrap()
        .with_units(SpatialUnits::Millimeter, TemporalUnits::Second)
        .with_dim_info(DimInfo {
            freq: Some(1),
            phase: Some(0),
            slice: Some(2),
        });
    nifti::save(&img, &path).unwrap();

    let loaded = nifti::load(&path).unwrap();
    assert_eq!(loaded.shape(), &[2, 3, 2, 2]);
    assert_eq!(loaded.dtype(), DataType::Int16);
    assert_eq!(loaded.spacing(), vec![3.0, 3.0, 3.6f32 as f64, 2.5]);
    assert_eq!(loaded.header().spatial_units, SpatialUnits::Millimeter);
    assert_eq!(loaded.header().temporal_units, TemporalUnits::Second);
    assert_eq!(loaded.header().dim_info, img.header().dim_info);
    assert_eq!(loaded.data(), img.data());
}

#[test]
fn test_header_parsing_edge_cases() {
    // Minimal valid dimensions
    let img = create_test_image(vec![1.0f32], vec![1, 1, 1]);
    let file = NamedTempFile::new().unwrap();
    nifti::save(&img, file.path()).unwrap();

    let loaded = nifti::load(file.path()).unwrap();
    assert_eq!(loaded.shape(), [1, 1, 1]);
    assert_eq!(loaded.data().len(), 1);

    let header = nifti::load_header(file.path()).unwrap();
    assert_eq!(header.shape(), vec![1, 1, 1]);
}

#[test]
fn test_different_data_types_roundtrip() {
    let data = vec![1.0f32, 2.0, 3.0, 4.0];

    for dtype in [
        DataType::Float32,
        DataType::Float64,
        DataType::UInt8,
        DataType::UInt16,
        DataType::Int16,
        DataType::Int32,
    ] {
        let img = create_test_image(data.clone(), vec![2, 2, 1]).with_dtype(dtype);

        let file = NamedTempFile::new().unwrap();
        nifti::save(&img, file.path()).unwrap();

        let loaded = nifti::load(file.path()).unwrap();
        assert_eq!(loaded.dtype(), dtype);
        assert_eq!(loaded.shape(), [2, 2, 1]);
        assert_eq!(loaded.data(), img.data());
    }
}
