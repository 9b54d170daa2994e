//! `NIfTI`-1 header parsing and representation.
//!
//! Headers are read in either byte order and always written little-endian.

use crate::error::{Error, Result};
use crate::geometry::{voxel_sizes, Affine};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// NIfTI-1 header field byte offsets.
mod offsets {
    pub const SIZEOF_HDR: usize = 0;
    pub const DIM_INFO: usize = 39;
    pub const DIM: usize = 40;
    pub const INTENT_CODE: usize = 68;
    pub const DATATYPE: usize = 70;
    pub const BITPIX: usize = 72;
    pub const PIXDIM: usize = 76;
    pub const VOX_OFFSET: usize = 108;
    pub const SCL_SLOPE: usize = 112;
    pub const SCL_INTER: usize = 116;
    pub const XYZT_UNITS: usize = 123;
    pub const DESCRIP: usize = 148;
    pub const AUX_FILE: usize = 228;
    pub const QFORM_CODE: usize = 252;
    pub const SFORM_CODE: usize = 254;
    pub const QUATERN_B: usize = 256;
    pub const QOFFSET_X: usize = 268;
    pub const SROW_X: usize = 280;
    pub const MAGIC: usize = 344;
}

/// `NIfTI` data type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum DataType {
    /// Unsigned 8-bit integer
    UInt8 = 2,
    /// Signed 16-bit integer
    Int16 = 4,
    /// Signed 32-bit integer
    Int32 = 8,
    /// 32-bit floating point
    Float32 = 16,
    /// 64-bit floating point
    Float64 = 64,
    /// Signed 8-bit integer
    Int8 = 256,
    /// Unsigned 16-bit integer
    UInt16 = 512,
}

impl DataType {
    /// Parse from `NIfTI` datatype code.
    pub fn from_code(code: i16) -> Result<Self> {
        match code {
            2 => Ok(Self::UInt8),
            4 => Ok(Self::Int16),
            8 => Ok(Self::Int32),
            16 => Ok(Self::Float32),
            64 => Ok(Self::Float64),
            256 => Ok(Self::Int8),
            512 => Ok(Self::UInt16),
            _ => Err(Error::UnsupportedDataType(code)),
        }
    }

    /// Size of each element in bytes.
    pub const fn byte_size(self) -> usize {
        match self {
            Self::UInt8 | Self::Int8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// True for integer types, whose values are rounded on write.
    pub const fn is_integer(self) -> bool {
        !matches!(self, Self::Float32 | Self::Float64)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::UInt8 => "u8",
            Self::Int8 => "i8",
            Self::Int16 => "i16",
            Self::UInt16 => "u16",
            Self::Int32 => "i32",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
        };
        f.write_str(name)
    }
}

/// Spatial units for voxel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpatialUnits {
    #[default]
    /// Units are not specified.
    Unknown,
    /// Meters.
    Meter,
    /// Millimeters.
    Millimeter,
    /// Micrometers.
    Micrometer,
}

impl SpatialUnits {
    fn from_code(code: u8) -> Self {
        match code & 0x07 {
            1 => Self::Meter,
            2 => Self::Millimeter,
            3 => Self::Micrometer,
            _ => Self::Unknown,
        }
    }

    fn to_code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Meter => 1,
            Self::Millimeter => 2,
            Self::Micrometer => 3,
        }
    }
}

/// Temporal units for the fourth dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemporalUnits {
    #[default]
    /// Temporal spacing unspecified.
    Unknown,
    /// Seconds.
    Second,
    /// Milliseconds.
    Millisecond,
    /// Microseconds.
    Microsecond,
}

impl TemporalUnits {
    fn from_code(code: u8) -> Self {
        match code & 0x38 {
            0x08 => Self::Second,
            0x10 => Self::Millisecond,
            0x18 => Self::Microsecond,
            _ => Self::Unknown,
        }
    }

    fn to_code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Second => 0x08,
            Self::Millisecond => 0x10,
            Self::Microsecond => 0x18,
        }
    }
}

/// Acquisition axes packed in the `dim_info` byte. Axes are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DimInfo {
    /// Frequency encoding axis.
    pub freq: Option<u8>,
    /// Phase encoding axis.
    pub phase: Option<u8>,
    /// Slice axis.
    pub slice: Option<u8>,
}

impl DimInfo {
    /// Unpack from the header byte (two bits per field, axis + 1).
    pub fn from_byte(b: u8) -> Self {
        let field = |shift: u8| match (b >> shift) & 0x03 {
            0 => None,
            v => Some(v - 1),
        };
        Self {
            freq: field(0),
            phase: field(2),
            slice: field(4),
        }
    }

    /// Pack into the header byte. Axes beyond the third are dropped.
    pub fn to_byte(self) -> u8 {
        let field = |axis: Option<u8>| axis.filter(|&a| a < 3).map_or(0, |a| a + 1);
        field(self.freq) | (field(self.phase) << 2) | (field(self.slice) << 4)
    }

    /// Follow the axes through a permutation: input axis `i` becomes `perm[i]`.
    pub fn permuted(self, perm: [usize; 3]) -> Self {
        let map = |axis: Option<u8>| axis.map(|a| perm[usize::from(a).min(2)] as u8);
        Self {
            freq: map(self.freq),
            phase: map(self.phase),
            slice: map(self.slice),
        }
    }
}

/// NIfTI-1 header.
#[derive(Debug, Clone)]
pub struct NiftiHeader {
    /// Number of dimensions (1-7).
    pub ndim: u8,
    /// Size along each dimension.
    pub dim: [i64; 7],
    /// Data type.
    pub datatype: DataType,
    /// Voxel sizes (pixdim[1..=ndim]) and qfac at index 0.
    pub pixdim: [f64; 8],
    /// Data offset in file.
    pub vox_offset: i64,
    /// Data scaling slope.
    pub scl_slope: f64,
    /// Data scaling intercept.
    pub scl_inter: f64,
    /// Frequency, phase and slice axes.
    pub dim_info: DimInfo,
    /// Spatial units.
    pub spatial_units: SpatialUnits,
    /// Temporal units.
    pub temporal_units: TemporalUnits,
    /// Intent code.
    pub intent_code: i16,
    /// Description string.
    pub descrip: String,
    /// Auxiliary filename.
    pub aux_file: String,
    /// qform transform code.
    pub qform_code: i16,
    /// sform transform code.
    pub sform_code: i16,
    /// Quaternion parameters for qform.
    pub quatern: [f64; 3],
    /// Offset parameters for qform.
    pub qoffset: [f64; 3],
    /// Rows of the sform affine matrix.
    pub srow: [[f64; 4]; 3],
    /// File endianness (true = little endian).
    pub(crate) little_endian: bool,
}

impl Default for NiftiHeader {
    fn default() -> Self {
        Self {
            ndim: 3,
            dim: [1, 1, 1, 1, 1, 1, 1],
            datatype: DataType::Float32,
            pixdim: [1.0; 8],
            vox_offset: 352,
            scl_slope: 1.0,
            scl_inter: 0.0,
            dim_info: DimInfo::default(),
            spatial_units: SpatialUnits::Millimeter,
            temporal_units: TemporalUnits::Unknown,
            intent_code: 0,
            descrip: String::new(),
            aux_file: String::new(),
            qform_code: 0,
            sform_code: 1,
            quatern: [0.0; 3],
            qoffset: [0.0; 3],
            srow: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
            little_endian: true,
        }
    }
}

impl NiftiHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 348;

    /// Offset of the voxel data in single-file images written by this crate.
    pub const DEFAULT_VOX_OFFSET: i64 = 352;

    /// Read a header, detecting byte order from `sizeof_hdr`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("header too short: got {} bytes, need {}", bytes.len(), Self::SIZE),
            )));
        }

        if LittleEndian::read_i32(&bytes[0..4]) == 348 {
            Self::parse::<LittleEndian>(bytes, true)
        } else if BigEndian::read_i32(&bytes[0..4]) == 348 {
            Self::parse::<BigEndian>(bytes, false)
        } else {
            Err(Error::InvalidMagic([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
    }

    #[allow(clippy::wildcard_imports)]
    fn parse<E: ByteOrder>(bytes: &[u8], little_endian: bool) -> Result<Self> {
        use offsets::*;

        let magic = &bytes[MAGIC..MAGIC + 4];
        if magic != b"n+1\0" && magic != b"ni1\0" {
            return Err(Error::InvalidMagic([
                magic[0], magic[1], magic[2], magic[3],
            ]));
        }

        let ndim_raw = E::read_i16(&bytes[DIM..DIM + 2]);
        if !(1..=7).contains(&ndim_raw) {
            return Err(Error::InvalidDimensions(format!(
                "ndim must be 1..=7, got {ndim_raw}"
            )));
        }

        let mut dim = [0i64; 7];
        for (i, dim_val) in dim.iter_mut().enumerate() {
            let offset = DIM + 2 + i * 2;
            let dim_raw = E::read_i16(&bytes[offset..offset + 2]);
            if dim_raw < 0 {
                return Err(Error::InvalidDimensions(format!(
                    "dimension {i} has negative value: {dim_raw}"
                )));
            }
            *dim_val = i64::from(dim_raw);
        }

        let datatype = DataType::from_code(E::read_i16(&bytes[DATATYPE..DATATYPE + 2]))?;
        let bitpix = E::read_i16(&bytes[BITPIX..BITPIX + 2]);
        let expected_bitpix = (datatype.byte_size() * 8) as i16;
        if bitpix != expected_bitpix {
            return Err(Error::InvalidDimensions(format!(
                "bitpix {bitpix} does not match datatype {datatype} (expected {expected_bitpix})"
            )));
        }

        let read_f32s = |start: usize, out: &mut [f64]| {
            for (i, v) in out.iter_mut().enumerate() {
                let offset = start + i * 4;
                *v = f64::from(E::read_f32(&bytes[offset..offset + 4]));
            }
        };

        let mut pixdim = [0.0f64; 8];
        read_f32s(PIXDIM, &mut pixdim);
        let mut quatern = [0.0f64; 3];
        read_f32s(QUATERN_B, &mut quatern);
        let mut qoffset = [0.0f64; 3];
        read_f32s(QOFFSET_X, &mut qoffset);
        let mut srow = [[0.0f64; 4]; 3];
        for (r, row) in srow.iter_mut().enumerate() {
            read_f32s(SROW_X + r * 16, row);
        }

        let vox_offset_raw = E::read_f32(&bytes[VOX_OFFSET..VOX_OFFSET + 4]);
        if !vox_offset_raw.is_finite() || vox_offset_raw.fract() != 0.0 {
            return Err(Error::InvalidDimensions(format!(
                "vox_offset must be an integer, got {vox_offset_raw}"
            )));
        }

        let text = |range: std::ops::Range<usize>| {
            String::from_utf8_lossy(&bytes[range])
                .trim_end_matches('\0')
                .to_string()
        };
        let xyzt_units = bytes[XYZT_UNITS];

        let header = Self {
            ndim: ndim_raw as u8,
            dim,
            datatype,
            pixdim,
            vox_offset: vox_offset_raw as i64,
            scl_slope: f64::from(E::read_f32(&bytes[SCL_SLOPE..SCL_SLOPE + 4])),
            scl_inter: f64::from(E::read_f32(&bytes[SCL_INTER..SCL_INTER + 4])),
            dim_info: DimInfo::from_byte(bytes[DIM_INFO]),
            spatial_units: SpatialUnits::from_code(xyzt_units),
            temporal_units: TemporalUnits::from_code(xyzt_units),
            intent_code: E::read_i16(&bytes[INTENT_CODE..INTENT_CODE + 2]),
            descrip: text(DESCRIP..AUX_FILE),
            aux_file: text(AUX_FILE..QFORM_CODE),
            qform_code: E::read_i16(&bytes[QFORM_CODE..QFORM_CODE + 2]),
            sform_code: E::read_i16(&bytes[SFORM_CODE..SFORM_CODE + 2]),
            quatern,
            qoffset,
            srow,
            little_endian,
        };
        header.validate()?;
        Ok(header)
    }

    /// Write the header, little-endian.
    #[allow(clippy::wildcard_imports)]
    pub fn to_bytes(&self) -> Vec<u8> {
        use offsets::*;

        let mut buf = vec![0u8; Self::SIZE];
        LittleEndian::write_i32(&mut buf[SIZEOF_HDR..SIZEOF_HDR + 4], 348);
        buf[DIM_INFO] = self.dim_info.to_byte();

        LittleEndian::write_i16(&mut buf[DIM..DIM + 2], i16::from(self.ndim));
        for (i, &d) in self.dim.iter().enumerate() {
            let offset = DIM + 2 + i * 2;
            LittleEndian::write_i16(&mut buf[offset..offset + 2], d.min(i64::from(i16::MAX)) as i16);
        }

        LittleEndian::write_i16(&mut buf[INTENT_CODE..INTENT_CODE + 2], self.intent_code);
        LittleEndian::write_i16(&mut buf[DATATYPE..DATATYPE + 2], self.datatype as i16);
        LittleEndian::write_i16(
            &mut buf[BITPIX..BITPIX + 2],
            (self.datatype.byte_size() * 8) as i16,
        );

        let mut write_f32s = |start: usize, values: &[f64]| {
            for (i, &v) in values.iter().enumerate() {
                let offset = start + i * 4;
                LittleEndian::write_f32(&mut buf[offset..offset + 4], v as f32);
            }
        };
        write_f32s(PIXDIM, &self.pixdim);
        write_f32s(VOX_OFFSET, &[self.vox_offset as f64]);
        write_f32s(SCL_SLOPE, &[self.scl_slope, self.scl_inter]);
        write_f32s(QUATERN_B, &self.quatern);
        write_f32s(QOFFSET_X, &self.qoffset);
        for (r, row) in self.srow.iter().enumerate() {
            write_f32s(SROW_X + r * 16, row);
        }

        buf[XYZT_UNITS] = self.spatial_units.to_code() | self.temporal_units.to_code();

        let descrip = self.descrip.as_bytes();
        let len = descrip.len().min(79);
        buf[DESCRIP..DESCRIP + len].copy_from_slice(&descrip[..len]);
        let aux = self.aux_file.as_bytes();
        let len = aux.len().min(23);
        buf[AUX_FILE..AUX_FILE + len].copy_from_slice(&aux[..len]);

        LittleEndian::write_i16(&mut buf[QFORM_CODE..QFORM_CODE + 2], self.qform_code);
        LittleEndian::write_i16(&mut buf[SFORM_CODE..SFORM_CODE + 2], self.sform_code);

        buf[MAGIC..MAGIC + 4].copy_from_slice(b"n+1\0");
        buf
    }

    /// Voxel-to-world affine: sform, else qform, else scaled identity.
    pub fn affine(&self) -> Affine {
        if self.sform_code > 0 {
            [self.srow[0], self.srow[1], self.srow[2], [0.0, 0.0, 0.0, 1.0]]
        } else if self.qform_code > 0 {
            self.qform_to_affine()
        } else {
            [
                [self.pixdim[1], 0.0, 0.0, 0.0],
                [0.0, self.pixdim[2], 0.0, 0.0],
                [0.0, 0.0, self.pixdim[3], 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ]
        }
    }

    /// Store `affine` as the sform and set the spatial pixdims from its
    /// column norms.
    pub fn set_affine(&mut self, affine: Affine) {
        self.srow = [affine[0], affine[1], affine[2]];
        self.sform_code = 1;
        let sizes = voxel_sizes(&affine);
        self.pixdim[1..4].copy_from_slice(&sizes);
    }

    #[allow(clippy::many_single_char_names)]
    fn qform_to_affine(&self) -> Affine {
        let [b, c, d] = self.quatern;
        let a = (1.0 - b * b - c * c - d * d).max(0.0).sqrt();
        let qfac = if self.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        let [i, j, k] = [self.pixdim[1].abs(), self.pixdim[2], self.pixdim[3] * qfac];
        [
            [
                (a * a + b * b - c * c - d * d) * i,
                2.0 * (b * c - a * d) * j,
                2.0 * (b * d + a * c) * k,
                self.qoffset[0],
            ],
            [
                2.0 * (b * c + a * d) * i,
                (a * a - b * b + c * c - d * d) * j,
                2.0 * (c * d - a * b) * k,
                self.qoffset[1],
            ],
            [
                2.0 * (b * d - a * c) * i,
                2.0 * (c * d + a * b) * j,
                (a * a - b * b - c * c + d * d) * k,
                self.qoffset[2],
            ],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }

    /// Image shape (first `ndim` entries of `dim`).
    pub fn shape(&self) -> Vec<usize> {
        self.dim[..self.ndim as usize]
            .iter()
            .map(|&d| d as usize)
            .collect()
    }

    /// Voxel spacing (pixdim[1..=ndim]).
    pub fn spacing(&self) -> Vec<f64> {
        let end = (self.ndim as usize + 1).min(self.pixdim.len());
        self.pixdim[1..end].to_vec()
    }

    /// Set `ndim` and `dim` from an array shape.
    pub fn set_shape(&mut self, shape: &[usize]) -> Result<()> {
        if shape.is_empty() || shape.len() > 7 {
            return Err(Error::InvalidDimensions(format!(
                "ndim must be 1..=7, got {}",
                shape.len()
            )));
        }
        self.ndim = shape.len() as u8;
        self.dim = [1; 7];
        for (d, &s) in self.dim.iter_mut().zip(shape) {
            if s > i16::MAX as usize {
                return Err(Error::InvalidDimensions(format!(
                    "dimension {s} exceeds NIfTI-1 limit {}",
                    i16::MAX
                )));
            }
            *d = s as i64;
        }
        Ok(())
    }

    /// Total number of voxels.
    pub fn num_voxels(&self) -> usize {
        self.dim[..self.ndim as usize]
            .iter()
            .map(|&d| d as usize)
            .product()
    }

    /// Size of the voxel data in bytes.
    pub fn data_size(&self) -> usize {
        self.num_voxels() * self.datatype.byte_size()
    }

    /// True if the file was little endian.
    pub fn is_little_endian(&self) -> bool {
        self.little_endian
    }

    /// Check the header against basic NIfTI invariants.
    pub fn validate(&self) -> Result<()> {
        if self.ndim == 0 || self.ndim > 7 {
            return Err(Error::InvalidDimensions(format!(
                "ndim must be 1..=7, got {}",
                self.ndim
            )));
        }

        for i in 0..self.ndim as usize {
            if self.dim[i] <= 0 {
                return Err(Error::InvalidDimensions(format!("dimension {i} is zero")));
            }
            let spacing = self.pixdim[i + 1];
            if !spacing.is_finite() || spacing <= 0.0 {
                return Err(Error::InvalidDimensions(format!(
                    "pixdim[{}] must be finite and > 0, got {spacing}",
                    i + 1
                )));
            }
        }

        if self.vox_offset < Self::SIZE as i64 {
            return Err(Error::InvalidDimensions(format!(
                "vox_offset {} before header end ({})",
                self.vox_offset,
                Self::SIZE
            )));
        }

        let mut voxels: usize = 1;
        for i in 0..self.ndim as usize {
            voxels = voxels
                .checked_mul(self.dim[i] as usize)
                .ok_or_else(|| Error::InvalidDimensions("dimension product overflow".into()))?;
        }
        voxels
            .checked_mul(self.datatype.byte_size())
            .ok_or_else(|| Error::InvalidDimensions("data size overflow".into()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporal_units_from_code() {
        assert_eq!(TemporalUnits::from_code(0x08), TemporalUnits::Second);
        assert_eq!(TemporalUnits::from_code(0x10), TemporalUnits::Millisecond);
        assert_eq!(TemporalUnits::from_code(0x00), TemporalUnits::Unknown);
        assert_eq!(TemporalUnits::from_code(0x0A), TemporalUnits::Second);
    }

    #[test]
    fn test_xyzt_units_byte() {
        let header = NiftiHeader {
            spatial_units: SpatialUnits::Millimeter,
            temporal_units: TemporalUnits::Second,
            ..NiftiHeader::default()
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes[offsets::XYZT_UNITS], 0x0A);
        assert_eq!(SpatialUnits::from_code(0x0A), SpatialUnits::Millimeter);
    }

    #[test]
    fn test_dim_info_packing() {
        // freq 0, phase 1, slice 2 -> 1 | 2 << 2 | 3 << 4
        let info = DimInfo {
            freq: Some(0),
            phase: Some(1),
            slice: Some(2),
        };
        assert_eq!(info.to_byte(), 0x39);
        assert_eq!(DimInfo::from_byte(0x39), info);

        let slice_only = DimInfo {
            slice: Some(2),
            ..DimInfo::default()
        };
        assert_eq!(slice_only.to_byte(), 0x30);

        let swapped = info.permuted([1, 0, 2]);
        assert_eq!((swapped.freq, swapped.phase), (Some(1), Some(0)));
    }

    #[test]
    fn test_roundtrip() {
        let mut header = NiftiHeader::default();
        header.set_shape(&[64, 48, 30, 5]).unwrap();
        header.datatype = DataType::Int16;
        header.pixdim = [1.0, 0.5, 0.8, 3.3, 2.0, 0.0, 0.0, 0.0];
        header.dim_info = DimInfo::from_byte(0x39);
        header.descrip = "medconv".into();

        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), 348);

        let parsed = NiftiHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.shape(), vec![64, 48, 30, 5]);
        assert_eq!(parsed.datatype, DataType::Int16);
        assert_eq!(parsed.dim_info, header.dim_info);
        assert_eq!(parsed.descrip, "medconv");
        assert!((parsed.spacing()[2] - 3.3).abs() < 1e-6);
        assert!(parsed.is_little_endian());
    }

    #[test]
    fn test_big_endian() {
        let mut bytes = vec![0u8; 348];
        BigEndian::write_i32(&mut bytes[0..4], 348);
        bytes[344..348].copy_from_slice(b"n+1\0");
        BigEndian::write_i16(&mut bytes[40..42], 3);
        for (i, d) in [10i16, 12, 14].iter().enumerate() {
            BigEndian::write_i16(&mut bytes[42 + i * 2..44 + i * 2], *d);
        }
        BigEndian::write_i16(&mut bytes[70..72], 4);
        BigEndian::write_i16(&mut bytes[72..74], 16);
        for i in 1..4 {
            BigEndian::write_f32(&mut bytes[76 + i * 4..80 + i * 4], 1.5);
        }
        BigEndian::write_f32(&mut bytes[108..112], 352.0);

        let header = NiftiHeader::from_bytes(&bytes).unwrap();
        assert!(!header.is_little_endian());
        assert_eq!(header.shape(), vec![10, 12, 14]);
        assert_eq!(header.spacing(), vec![1.5, 1.5, 1.5]);
        // neither form set: scaled identity
        assert_eq!(header.affine()[1][1], 1.5);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = NiftiHeader::default().to_bytes();
        bytes[344..348].copy_from_slice(b"abcd");
        assert!(matches!(
            NiftiHeader::from_bytes(&bytes),
            Err(Error::InvalidMagic(_))
        ));
        assert!(NiftiHeader::from_bytes(&bytes[..100]).is_err());
    }

    #[test]
    fn test_set_affine_updates_pixdim() {
        let mut header = NiftiHeader::default();
        header.set_affine([
            [0.0, -2.0, 0.0, 1.0],
            [3.0, 0.0, 0.0, 2.0],
            [0.0, 0.0, -4.0, 3.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        assert_eq!(&header.pixdim[1..4], &[3.0, 2.0, 4.0]);
        assert_eq!(header.affine()[1][0], 3.0);
    }

    #[test]
    fn test_qform_fallback() {
        let header = NiftiHeader {
            sform_code: 0,
            qform_code: 1,
            // 180 degrees about z
            quatern: [0.0, 0.0, 1.0],
            qoffset: [5.0, 6.0, 7.0],
            pixdim: [1.0, 2.0, 2.0, 2.0, 1.0, 1.0, 1.0, 1.0],
            ..NiftiHeader::default()
        };
        let affine = header.affine();
        assert_eq!(affine[0][0], -2.0);
        assert_eq!(affine[1][1], -2.0);
        assert_eq!(affine[2][2], 2.0);
        assert_eq!(affine[0][3], 5.0);
    }

    #[test]
    fn test_set_shape_limits() {
        let mut header = NiftiHeader::default();
        assert!(header.set_shape(&[]).is_err());
        assert!(header.set_shape(&[40000, 2, 2]).is_err());
        header.set_shape(&[4, 5]).unwrap();
        assert_eq!(header.num_voxels(), 20);
    }
}
