//! In-memory `NIfTI` image: header plus a Fortran-order voxel buffer.

use super::header::{DataType, DimInfo, NiftiHeader, SpatialUnits, TemporalUnits};
use crate::error::{Error, Result};
use crate::geometry::Affine;
use crate::transforms::orientation::{apply_axis_map, AxisMap};
use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use ndarray::{ArrayD, IxDyn, ShapeBuilder};

/// A `NIfTI` volume.
///
/// Voxels are held as `f32` with scaling already applied; the header's
/// `datatype` decides how they are stored on disk.
#[derive(Debug, Clone)]
pub struct NiftiImage {
    header: NiftiHeader,
    data: ArrayD<f32>,
}

impl NiftiImage {
    /// Wrap `data` with a fresh header carrying `affine`.
    pub fn from_array(data: ArrayD<f32>, affine: Affine) -> Result<Self> {
        let mut header = NiftiHeader::default();
        header.set_shape(data.shape())?;
        header.set_affine(affine);
        Ok(Self { header, data })
    }

    /// Pair an existing header with `data`; shapes must agree.
    pub fn from_parts(header: NiftiHeader, data: ArrayD<f32>) -> Result<Self> {
        if header.shape() != data.shape() {
            return Err(Error::ShapeMismatch(format!(
                "header shape {:?} does not match data shape {:?}",
                header.shape(),
                data.shape()
            )));
        }
        Ok(Self { header, data })
    }

    /// Decode voxel bytes (starting at `vox_offset`) described by `header`.
    pub fn from_bytes(header: NiftiHeader, bytes: &[u8]) -> Result<Self> {
        let size = header.data_size();
        if bytes.len() < size {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("voxel data truncated: {} of {size} bytes", bytes.len()),
            )));
        }
        let bytes = &bytes[..size];
        let mut values = if header.is_little_endian() {
            decode_values::<LittleEndian>(bytes, header.datatype)
        } else {
            decode_values::<BigEndian>(bytes, header.datatype)
        };

        let (slope, inter) = (header.scl_slope, header.scl_inter);
        if slope != 0.0 && slope.is_finite() && (slope != 1.0 || inter != 0.0) {
            for v in &mut values {
                *v = (f64::from(*v) * slope + inter) as f32;
            }
        }

        let data = ArrayD::from_shape_vec(IxDyn(&header.shape()).f(), values)
            .map_err(|e| Error::InvalidDimensions(e.to_string()))?;
        Ok(Self { header, data })
    }

    /// Header.
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// Mutable header.
    pub fn header_mut(&mut self) -> &mut NiftiHeader {
        &mut self.header
    }

    /// Voxel data.
    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Take the voxel data.
    pub fn into_data(self) -> ArrayD<f32> {
        self.data
    }

    /// Image shape.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Voxel-to-world affine.
    pub fn affine(&self) -> Affine {
        self.header.affine()
    }

    /// Voxel sizes, including the time step for 4-D images.
    pub fn spacing(&self) -> Vec<f64> {
        self.header.spacing()
    }

    /// On-disk data type.
    pub fn dtype(&self) -> DataType {
        self.header.datatype
    }

    /// Set the on-disk data type.
    #[must_use]
    pub fn with_dtype(mut self, datatype: DataType) -> Self {
        self.header.datatype = datatype;
        self
    }

    /// Set pixdim from `zooms`, one entry per axis.
    pub fn with_zooms(mut self, zooms: &[f64]) -> Result<Self> {
        if zooms.len() != self.data.ndim() {
            return Err(Error::ShapeMismatch(format!(
                "{} zooms for a {}-D image",
                zooms.len(),
                self.data.ndim()
            )));
        }
        self.header.pixdim[1..=zooms.len()].copy_from_slice(zooms);
        Ok(self)
    }

    /// Set frequency, phase and slice axes.
    #[must_use]
    pub fn with_dim_info(mut self, dim_info: DimInfo) -> Self {
        self.header.dim_info = dim_info;
        self
    }

    /// Set spatial and temporal units.
    #[must_use]
    pub fn with_units(mut self, spatial: SpatialUnits, temporal: TemporalUnits) -> Self {
        self.header.spatial_units = spatial;
        self.header.temporal_units = temporal;
        self
    }

    /// Apply a signed axis permutation to the voxels and update the
    /// affine, pixdim and dim_info so world coordinates are unchanged.
    pub fn reoriented(&self, map: &AxisMap) -> Result<Self> {
        let (data, affine) = apply_axis_map(self.data.view(), &self.affine(), map)?;

        let mut header = self.header.clone();
        header.set_shape(data.shape())?;
        for (i, e) in map.0.iter().enumerate() {
            header.pixdim[1 + e.axis] = self.header.pixdim[1 + i];
        }
        header.set_affine(affine);
        header.dim_info = header.dim_info.permuted(map.0.map(|e| e.axis));
        Ok(Self { header, data })
    }

    /// Encode voxels in Fortran order as little-endian bytes of the header
    /// data type. Integer types are rounded and saturated.
    pub fn data_to_bytes(&self) -> Result<Vec<u8>> {
        let (slope, inter) = (self.header.scl_slope, self.header.scl_inter);
        let scaled = slope != 0.0 && slope.is_finite() && (slope != 1.0 || inter != 0.0);
        let dtype = self.header.datatype;

        let mut out = Vec::with_capacity(self.data.len() * dtype.byte_size());
        // the transposed view iterates the original in Fortran order
        for &v in self.data.t().iter() {
            let v = if scaled {
                (f64::from(v) - inter) / slope
            } else {
                f64::from(v)
            };
            let v = if dtype.is_integer() { v.round() } else { v };
            match dtype {
                DataType::UInt8 => out.write_u8(v as u8)?,
                DataType::Int8 => out.write_i8(v as i8)?,
                DataType::Int16 => out.write_i16::<LittleEndian>(v as i16)?,
                DataType::UInt16 => out.write_u16::<LittleEndian>(v as u16)?,
                DataType::Int32 => out.write_i32::<LittleEndian>(v as i32)?,
                DataType::Float32 => out.write_f32::<LittleEndian>(v as f32)?,
                DataType::Float64 => out.write_f64::<LittleEndian>(v)?,
            }
        }
        Ok(out)
    }
}

fn decode_values<E: ByteOrder>(bytes: &[u8], dtype: DataType) -> Vec<f32> {
    let chunks = bytes.chunks_exact(dtype.byte_size());
    match dtype {
        DataType::UInt8 => bytes.iter().map(|&b| f32::from(b)).collect(),
        DataType::Int8 => bytes.iter().map(|&b| f32::from(b as i8)).collect(),
        DataType::Int16 => chunks.map(|c| f32::from(E::read_i16(c))).collect(),
        DataType::UInt16 => chunks.map(|c| f32::from(E::read_u16(c))).collect(),
        DataType::Int32 => chunks.map(|c| E::read_i32(c) as f32).collect(),
        DataType::Float32 => chunks.map(E::read_f32).collect(),
        DataType::Float64 => chunks.map(|c| E::read_f64(c) as f32).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::orientation::AxisFlip;
    use ndarray::Array;

    fn ramp(shape: &[usize]) -> ArrayD<f32> {
        let n: usize = shape.iter().product();
        ArrayD::from_shape_vec(IxDyn(shape).f(), (0..n).map(|i| i as f32).collect()).unwrap()
    }

    #[test]
    fn test_data_to_bytes_is_fortran_order() {
        let img = NiftiImage::from_array(ramp(&[2, 3, 1]), crate::geometry::IDENTITY)
            .unwrap()
            .with_dtype(DataType::Int16);
        let bytes = img.data_to_bytes().unwrap();
        let values: Vec<i16> = bytes
            .chunks_exact(2)
            .map(LittleEndian::read_i16)
            .collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_integer_rounding_and_saturation() {
        let data = Array::from_shape_vec(IxDyn(&[4, 1, 1]), vec![1.4, 1.6, -40000.0, 40000.0])
            .unwrap();
        let img = NiftiImage::from_array(data, crate::geometry::IDENTITY)
            .unwrap()
            .with_dtype(DataType::Int16);
        let bytes = img.data_to_bytes().unwrap();
        let values: Vec<i16> = bytes.chunks_exact(2).map(LittleEndian::read_i16).collect();
        assert_eq!(values, vec![1, 2, i16::MIN, i16::MAX]);
    }

    #[test]
    fn test_from_bytes_applies_scaling() {
        let mut header = NiftiHeader::default();
        header.set_shape(&[2, 1, 1]).unwrap();
        header.datatype = DataType::UInt8;
        header.scl_slope = 2.0;
        header.scl_inter = -1.0;
        let img = NiftiImage::from_bytes(header, &[3, 10]).unwrap();
        assert_eq!(img.data().iter().copied().collect::<Vec<_>>(), vec![5.0, 19.0]);
        // writing undoes the scaling
        assert_eq!(img.data_to_bytes().unwrap(), vec![3, 10]);
    }

    #[test]
    fn test_from_bytes_truncated() {
        let mut header = NiftiHeader::default();
        header.set_shape(&[4, 4, 4]).unwrap();
        assert!(NiftiImage::from_bytes(header, &[0; 16]).is_err());
    }

    #[test]
    fn test_reoriented_updates_metadata() {
        let affine = [
            [-2.0, 0.0, 0.0, 10.0],
            [0.0, 3.0, 0.0, 0.0],
            [0.0, 0.0, 4.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let img = NiftiImage::from_array(ramp(&[2, 3, 4]), affine)
            .unwrap()
            .with_dim_info(DimInfo {
                freq: Some(0),
                phase: Some(1),
                slice: Some(2),
            });
        let map = AxisMap([
            AxisFlip { axis: 1, flip: true },
            AxisFlip { axis: 0, flip: false },
            AxisFlip { axis: 2, flip: false },
        ]);
        let out = img.reoriented(&map).unwrap();
        assert_eq!(out.shape(), &[3, 2, 4]);
        assert_eq!(&out.spacing()[..3], &[3.0, 2.0, 4.0]);
        assert_eq!(out.header().dim_info.freq, Some(1));
        assert_eq!(out.header().dim_info.phase, Some(0));
        // old voxel (1, 0, 0) is new voxel (0, 0, 0)
        assert_eq!(out.data()[[0, 0, 0]], img.data()[[1, 0, 0]]);
        assert_eq!(out.affine()[0][3], 8.0);

        let back = out.reoriented(&map.inverse()).unwrap();
        assert_eq!(back.data(), img.data());
        assert_eq!(back.affine(), img.affine());
    }

    #[test]
    fn test_from_parts_checks_shape() {
        let header = NiftiHeader::default();
        assert!(NiftiImage::from_parts(header, ramp(&[2, 2, 2])).is_err());
    }
}
