//! Volume to frames.

use super::config::ConvertConfig;
use super::map_frames;
use crate::csa::{self, HeaderBlock};
use crate::dicom::{pixel_range, tags, Dataset, ReferenceFrame, Window};
use crate::error::{Error, Result};
use crate::geometry::{resolve, tile, MosaicLayout};
use crate::nifti::NiftiImage;
use crate::transforms::{
    align_to_affine, interpolate_datetime, interpolate_scalar, interpolate_vector, Anchor,
    DateTime,
};
use ndarray::{Array2, ArrayViewD, Axis, Ix2, Ix3};
use tracing::{debug, info};

/// Per-frame attributes and pixels for one output DICOM instance.
///
/// Everything not listed here is copied from the template frame by the
/// caller.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    /// Instance number of the frame.
    pub instance_number: i32,
    /// Pixel buffer as `(rows, columns)`.
    pub pixels: Array2<i16>,
    /// `ImagePositionPatient`.
    pub image_position: [f64; 3],
    /// `SliceLocation`, when both anchors carry it.
    pub slice_location: Option<f64>,
    /// `AcquisitionDate` and `AcquisitionTime`.
    pub acquisition: Option<DateTime>,
    /// `ContentDate` and `ContentTime`.
    pub content: Option<DateTime>,
    /// Re-encoded CSA image header with `TimeAfterStart` updated.
    pub csa: Option<Vec<u8>>,
    /// `SmallestImagePixelValue`.
    pub smallest_pixel_value: i16,
    /// `LargestImagePixelValue`.
    pub largest_pixel_value: i16,
    /// `WindowCenter` and `WindowWidth`.
    pub window: Window,
    /// `RescaleIntercept`, always 0.
    pub rescale_intercept: f64,
    /// `RescaleSlope`, always 1.
    pub rescale_slope: f64,
}

/// Anchor metadata that varies between frames.
struct Anchors {
    first: i32,
    last: i32,
    position: (Vec<f64>, Vec<f64>),
    slice_location: Option<(f64, f64)>,
    acquisition: Option<(DateTime, DateTime)>,
    content: Option<(DateTime, DateTime)>,
    time_after_start: Option<(f64, f64)>,
    csa: Option<HeaderBlock>,
}

fn date_time<D: Dataset + ?Sized>(ds: &D, date: tags::Tag, time: tags::Tag) -> Option<DateTime> {
    Some(DateTime::new(ds.string(date)?.trim(), ds.string(time)?.trim()))
}

fn time_after_start(frame: &ReferenceFrame) -> Result<Option<f64>> {
    let Some(value) = frame
        .csa
        .as_ref()
        .and_then(|h| h.first_value(csa::TIME_AFTER_START))
    else {
        return Ok(None);
    };
    value
        .parse()
        .map(Some)
        .map_err(|_| Error::invalid(csa::TIME_AFTER_START, format!("'{value}'")))
}

impl Anchors {
    fn collect<D: Dataset + ?Sized>(
        first_ds: &D,
        last_ds: &D,
        first: &ReferenceFrame,
        last: &ReferenceFrame,
    ) -> Result<Self> {
        let slice_location = first_ds
            .optional_f64(tags::SLICE_LOCATION)?
            .zip(last_ds.optional_f64(tags::SLICE_LOCATION)?);
        let acquisition = date_time(first_ds, tags::ACQUISITION_DATE, tags::ACQUISITION_TIME)
            .zip(date_time(last_ds, tags::ACQUISITION_DATE, tags::ACQUISITION_TIME));
        let content = date_time(first_ds, tags::CONTENT_DATE, tags::CONTENT_TIME)
            .zip(date_time(last_ds, tags::CONTENT_DATE, tags::CONTENT_TIME));

        Ok(Self {
            first: first.instance_number,
            last: last.instance_number,
            position: (first.position.to_vec(), last.position.to_vec()),
            slice_location,
            acquisition,
            content,
            time_after_start: time_after_start(first)?.zip(time_after_start(last)?),
            csa: first.csa.clone(),
        })
    }

    /// Scalar at `target`; a single-frame stack keeps the first anchor.
    fn scalar(&self, (v1, v2): (f64, f64), target: i32) -> Result<f64> {
        if self.first == self.last {
            return Ok(v1);
        }
        interpolate_scalar(
            &Anchor::new(self.first, v1),
            &Anchor::new(self.last, v2),
            target,
        )
    }

    fn date_time(&self, pair: &(DateTime, DateTime), target: i32) -> Result<DateTime> {
        if self.first == self.last {
            return Ok(pair.0.clone());
        }
        interpolate_datetime(
            &Anchor::new(self.first, pair.0.clone()),
            &Anchor::new(self.last, pair.1.clone()),
            target,
        )
    }

    fn position(&self, target: i32) -> Result<[f64; 3]> {
        let (p1, p2) = &self.position;
        let p = if self.first == self.last {
            p1.clone()
        } else {
            interpolate_vector(
                &Anchor::new(self.first, p1.clone()),
                &Anchor::new(self.last, p2.clone()),
                target,
            )?
        };
        Ok([p[0], p[1], p[2]])
    }

    fn csa(&self, target: i32, config: &ConvertConfig) -> Result<Option<Vec<u8>>> {
        let Some(block) = &self.csa else {
            return Ok(None);
        };
        let mut block = block.clone();
        if let Some(pair) = self.time_after_start {
            let value = self.scalar(pair, target)?;
            if let Some(element) = block.get_mut(csa::TIME_AFTER_START) {
                let decimals = element
                    .first()
                    .and_then(|s| s.split_once('.'))
                    .map_or(0, |(_, frac)| frac.len());
                element.items = vec![Some(format!("{value:.decimals$}"))];
            }
        }
        block.to_bytes(config.item_length_mode).map(Some)
    }
}

fn to_i16(v: f32) -> i16 {
    // float to int casts saturate
    v.round() as i16
}

/// Pixel canvas for one frame of volume data.
fn frame_pixels(
    frame: ArrayViewD<'_, f32>,
    mosaic: Option<&MosaicLayout>,
) -> Result<Array2<i16>> {
    let frame = frame.mapv(to_i16);
    match mosaic {
        Some(layout) => {
            let slices = frame
                .into_dimensionality::<Ix3>()
                .map_err(|e| Error::InvalidDimensions(e.to_string()))?;
            tile(slices.view(), layout)
        }
        None => {
            let plane = frame
                .into_dimensionality::<Ix2>()
                .map_err(|e| Error::InvalidDimensions(e.to_string()))?;
            Ok(plane.reversed_axes().as_standard_layout().into_owned())
        }
    }
}

/// Split `image` into per-frame records for the stack anchored by `first`
/// and `last`.
///
/// The volume is first reoriented onto the voxel grid resolved from the
/// anchors, whatever orientation it was saved in. Its shape must then match
/// that grid exactly.
pub fn volume_to_frames<D: Dataset + ?Sized>(
    image: &NiftiImage,
    first: &D,
    last: &D,
    config: &ConvertConfig,
) -> Result<Vec<FrameRecord>> {
    let first_frame = ReferenceFrame::from_dataset(first)?;
    let last_frame = ReferenceFrame::from_dataset(last)?;
    let geometry = resolve(&first_frame, &last_frame)?;

    let map = align_to_affine(&image.affine(), &geometry.affine)?;
    let aligned;
    let data = if map.is_identity() {
        image.data().view()
    } else {
        debug!(?map, "aligning volume to template grid");
        aligned = image.reoriented(&map)?;
        aligned.data().view()
    };
    if data.shape() != geometry.shape.as_slice() {
        return Err(Error::ShapeMismatch(format!(
            "volume shape {:?} does not match template shape {:?}",
            data.shape(),
            geometry.shape
        )));
    }

    let anchors = Anchors::collect(first, last, &first_frame, &last_frame)?;
    let time_axis = Axis(geometry.shape.len() - 1);
    let count = geometry.frame_count();

    let records = map_frames(count, config.parallel, |f| {
        let instance_number = i32::try_from(f)
            .ok()
            .and_then(|f| anchors.first.checked_add(f))
            .ok_or_else(|| Error::invalid("InstanceNumber", format!("frame {f} is out of range")))?;
        debug!("writing [{}/{}] frame", f + 1, count);

        let pixels = frame_pixels(data.index_axis(time_axis, f), geometry.mosaic.as_ref())?;
        let (smallest, largest) = pixel_range(pixels.view()).unwrap_or((0, 0));

        Ok(FrameRecord {
            instance_number,
            image_position: anchors.position(instance_number)?,
            slice_location: anchors
                .slice_location
                .map(|pair| anchors.scalar(pair, instance_number))
                .transpose()?,
            acquisition: anchors
                .acquisition
                .as_ref()
                .map(|pair| anchors.date_time(pair, instance_number))
                .transpose()?,
            content: anchors
                .content
                .as_ref()
                .map(|pair| anchors.date_time(pair, instance_number))
                .transpose()?,
            csa: anchors.csa(instance_number, config)?,
            smallest_pixel_value: smallest,
            largest_pixel_value: largest,
            window: Window::from_range(f64::from(smallest), f64::from(largest)),
            rescale_intercept: 0.0,
            rescale_slope: 1.0,
            pixels,
        })
    })?;

    info!(frames = records.len(), "split volume into frames");
    Ok(records)
}
