//! Anchor frame metadata used to resolve stack geometry.

use super::dataset::Dataset;
use super::tags;
use crate::csa::{self, HeaderBlock};
use crate::error::{Error, Result};

/// In-plane phase encoding direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEncoding {
    /// Phase encoded along rows; frequency along columns.
    Row,
    /// Phase encoded along columns; frequency along rows.
    Col,
}

impl PhaseEncoding {
    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "ROW" => Some(Self::Row),
            "COL" => Some(Self::Col),
            _ => None,
        }
    }
}

/// Read-only geometric view of one frame of a stack.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceFrame {
    /// Row and column direction cosines (`X`, `Y`), patient LPS.
    pub orientation: [[f64; 3]; 2],
    /// Position of the first transmitted pixel, patient LPS, mm.
    pub position: [f64; 3],
    /// Pixel spacing as stored: `[row spacing, column spacing]`.
    pub pixel_spacing: [f64; 2],
    /// Ordering index within the acquisition.
    pub instance_number: i32,
    /// Frame width in pixels.
    pub columns: usize,
    /// Frame height in pixels.
    pub rows: usize,
    /// Centre-to-centre slice distance, mm.
    pub spacing_between_slices: Option<f64>,
    /// Nominal slice thickness, mm.
    pub slice_thickness: Option<f64>,
    /// Repetition time, ms.
    pub repetition_time: Option<f64>,
    /// In-plane phase encoding direction.
    pub phase_encoding: Option<PhaseEncoding>,
    /// Siemens CSA image header.
    pub csa: Option<HeaderBlock>,
}

impl ReferenceFrame {
    /// Collect the geometric attributes of `dataset`.
    pub fn from_dataset<D: Dataset + ?Sized>(dataset: &D) -> Result<Self> {
        let iop = dataset.require_floats(tags::IMAGE_ORIENTATION_PATIENT, 6)?;
        let ipp = dataset.require_floats(tags::IMAGE_POSITION_PATIENT, 3)?;
        let spacing = dataset.require_floats(tags::PIXEL_SPACING, 2)?;

        let instance_number = dataset.require_i64(tags::INSTANCE_NUMBER)?;
        let instance_number = i32::try_from(instance_number).map_err(|_| {
            Error::invalid(
                tags::INSTANCE_NUMBER.keyword(),
                format!("{instance_number} out of range"),
            )
        })?;

        Ok(Self {
            orientation: [[iop[0], iop[1], iop[2]], [iop[3], iop[4], iop[5]]],
            position: [ipp[0], ipp[1], ipp[2]],
            pixel_spacing: [spacing[0], spacing[1]],
            instance_number,
            columns: dimension(dataset, tags::COLUMNS)?,
            rows: dimension(dataset, tags::ROWS)?,
            spacing_between_slices: dataset.optional_f64(tags::SPACING_BETWEEN_SLICES)?,
            slice_thickness: dataset.optional_f64(tags::SLICE_THICKNESS)?,
            repetition_time: dataset.optional_f64(tags::REPETITION_TIME)?,
            phase_encoding: dataset
                .string(tags::IN_PLANE_PHASE_ENCODING_DIRECTION)
                .and_then(PhaseEncoding::parse),
            csa: dataset.csa_image_header()?,
        })
    }

    /// Slices packed into this frame; 1 for plain frames.
    ///
    /// A present but empty `NumberOfImagesInMosaic` counts as 1. An explicit
    /// zero is returned as is and treated as a plain frame by the resolver.
    pub fn mosaic_slice_count(&self) -> Result<usize> {
        let Some(value) = self
            .csa
            .as_ref()
            .and_then(|h| h.first_value(csa::NUMBER_OF_IMAGES_IN_MOSAIC))
        else {
            return Ok(1);
        };
        value
            .parse::<usize>()
            .or_else(|_| {
                value
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.fract() == 0.0 && *v >= 0.0)
                    .map(|v| v as usize)
                    .ok_or(())
            })
            .map_err(|()| {
                Error::invalid(csa::NUMBER_OF_IMAGES_IN_MOSAIC, format!("'{value}'"))
            })
    }

    /// Slice normal from the CSA header, used as-is.
    pub fn slice_normal(&self) -> Result<[f64; 3]> {
        let element = self
            .csa
            .as_ref()
            .and_then(|h| h.get(csa::SLICE_NORMAL_VECTOR))
            .ok_or_else(|| Error::missing(csa::SLICE_NORMAL_VECTOR))?;
        match element.values::<f64>()?.as_slice() {
            [x, y, z, ..] => Ok([*x, *y, *z]),
            other => Err(Error::invalid(
                csa::SLICE_NORMAL_VECTOR,
                format!("expected 3 values, got {}", other.len()),
            )),
        }
    }

    /// Spacing between slices, falling back to slice thickness.
    pub fn slice_spacing(&self) -> Result<f64> {
        self.spacing_between_slices
            .or(self.slice_thickness)
            .ok_or_else(|| Error::missing(tags::SLICE_THICKNESS.keyword()))
    }
}

fn dimension<D: Dataset + ?Sized>(dataset: &D, tag: tags::Tag) -> Result<usize> {
    let value = dataset.require_i64(tag)?;
    usize::try_from(value)
        .ok()
        .filter(|&v| v > 0)
        .ok_or_else(|| Error::invalid(tag.keyword(), format!("{value} is not a positive size")))
}
