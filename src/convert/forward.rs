//! Frames to volume.

use super::config::ConvertConfig;
use super::map_frames;
use crate::dicom::{series_name, tags, Dataset, PhaseEncoding, ReferenceFrame};
use crate::error::{Error, Result};
use crate::geometry::{detile, resolve, Geometry};
use crate::nifti::{self, DataType, DimInfo, NiftiImage, SpatialUnits, TemporalUnits};
use crate::transforms::{reorient, voxel_flip_map};
use ndarray::{ArrayD, Axis, IxDyn, ShapeBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of a forward conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The assembled volume.
    pub image: NiftiImage,
    /// Geometry resolved from the anchor frames, before any reorientation.
    pub geometry: Geometry,
    /// Series label used for the output file name.
    pub series: String,
}

/// Order of `frames` by instance number. The numbers must be consecutive.
fn frame_order<D: Dataset>(frames: &[D]) -> Result<Vec<usize>> {
    let mut numbered = frames
        .iter()
        .enumerate()
        .map(|(i, ds)| Ok((ds.require_i64(tags::INSTANCE_NUMBER)?, i)))
        .collect::<Result<Vec<_>>>()?;
    numbered.sort_unstable();

    let first = numbered.first().map_or(0, |&(n, _)| n);
    for (k, &(n, _)) in numbered.iter().enumerate() {
        if n != first + k as i64 {
            return Err(Error::ShapeMismatch(format!(
                "{} frames do not cover instance numbers {first}..={}",
                frames.len(),
                first + frames.len() as i64 - 1
            )));
        }
    }
    Ok(numbered.into_iter().map(|(_, i)| i).collect())
}

fn dim_info(phase: Option<PhaseEncoding>) -> DimInfo {
    let (freq, phase) = match phase {
        Some(PhaseEncoding::Col) => (Some(0), Some(1)),
        Some(PhaseEncoding::Row) => (Some(1), Some(0)),
        None => (None, None),
    };
    DimInfo {
        freq,
        phase,
        slice: Some(2),
    }
}

/// Assemble a frame stack into a volume.
///
/// Frames may come in any order; they are sorted by instance number and
/// must cover a consecutive range. Mosaic frames are split into slices.
/// The result is reoriented with the default voxel flip and, when
/// configured, to the requested axis codes.
///
/// # Example
///
/// ```ignore
/// let conv = frames_to_volume(&datasets, &ConvertConfig::default())?;
/// let path = write_volume(&conv, out_dir, &ConvertConfig::default())?;
/// ```
pub fn frames_to_volume<D: Dataset + Sync>(
    frames: &[D],
    config: &ConvertConfig,
) -> Result<Conversion> {
    if frames.is_empty() {
        return Err(Error::Configuration("no frames to convert".into()));
    }
    let order = frame_order(frames)?;
    let first_ds = &frames[order[0]];
    let last_ds = &frames[order[order.len() - 1]];
    let first = ReferenceFrame::from_dataset(first_ds)?;
    let last = ReferenceFrame::from_dataset(last_ds)?;

    let geometry = resolve(&first, &last)?;
    if geometry.frame_count() != frames.len() {
        return Err(Error::ShapeMismatch(format!(
            "geometry expects {} frames, got {}",
            geometry.frame_count(),
            frames.len()
        )));
    }

    let count = order.len();
    let slices = map_frames(count, config.parallel, |f| {
        debug!("reading [{}/{}] frame", f + 1, count);
        let pixels = frames[order[f]].pixels()?;
        match &geometry.mosaic {
            Some(layout) => Ok(detile(pixels.view(), layout)?.mapv(f32::from).into_dyn()),
            None => {
                if pixels.dim() != (first.rows, first.columns) {
                    return Err(Error::ShapeMismatch(format!(
                        "frame {} is {:?}, expected {:?}",
                        f + 1,
                        pixels.dim(),
                        (first.rows, first.columns)
                    )));
                }
                Ok(pixels.t().mapv(f32::from).into_dyn())
            }
        }
    })?;

    let time_axis = Axis(geometry.shape.len() - 1);
    let mut data = ArrayD::<f32>::zeros(IxDyn(&geometry.shape).f());
    for (f, slice) in slices.iter().enumerate() {
        data.index_axis_mut(time_axis, f).assign(slice);
    }

    let image = NiftiImage::from_array(data, geometry.affine)?
        .with_dtype(DataType::Int16)
        .with_zooms(&geometry.zooms)?
        .with_units(SpatialUnits::Millimeter, TemporalUnits::Second)
        .with_dim_info(dim_info(first.phase_encoding));

    let mut image = image.reoriented(&voxel_flip_map(geometry.negative_determinant))?;
    if let Some(target) = config.orientation {
        image = reorient(&image, target)?;
    }

    let series = match series_name(first_ds) {
        Ok(series) => series,
        Err(e) => {
            warn!(error = %e, "cannot name series, using 'volume'");
            "volume".to_string()
        }
    };
    info!(series = %series, shape = ?image.shape(), "assembled volume");

    Ok(Conversion {
        image,
        geometry,
        series,
    })
}

/// Write `conversion` into `dir` as `{series}-{YYYYmmddHHMMSS}.nii[.gz]`.
///
/// Fails rather than overwrite an existing file.
pub fn write_volume(conversion: &Conversion, dir: &Path, config: &ConvertConfig) -> Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let path = dir.join(format!(
        "{}-{stamp}.{}",
        conversion.series,
        config.extension()
    ));
    info!(path = %path.display(), "writing volume");
    nifti::save_new(&conversion.image, &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dicom::InMemoryDataset;

    fn numbered(n: i32) -> InMemoryDataset {
        InMemoryDataset::new().with(tags::INSTANCE_NUMBER, n)
    }

    #[test]
    fn test_frame_order() {
        let frames = [numbered(3), numbered(1), numbered(2)];
        assert_eq!(frame_order(&frames).unwrap(), vec![1, 2, 0]);
    }

    #[test]
    fn test_frame_order_gap() {
        let frames = [numbered(1), numbered(2), numbered(4)];
        assert!(matches!(
            frame_order(&frames),
            Err(Error::ShapeMismatch(_))
        ));
        let frames = [numbered(1), numbered(1)];
        assert!(frame_order(&frames).is_err());
    }

    #[test]
    fn test_dim_info() {
        assert_eq!(dim_info(Some(PhaseEncoding::Col)).to_byte(), 0x39);
        assert_eq!(
            dim_info(Some(PhaseEncoding::Row)),
            DimInfo {
                freq: Some(1),
                phase: Some(0),
                slice: Some(2)
            }
        );
        assert_eq!(dim_info(None).to_byte(), 0x30);
    }

    #[test]
    fn test_empty_input() {
        let frames: [InMemoryDataset; 0] = [];
        assert!(matches!(
            frames_to_volume(&frames, &ConvertConfig::default()),
            Err(Error::Configuration(_))
        ));
    }
}
