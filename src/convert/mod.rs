//! DICOM frame stack to `NIfTI` volume and back.
//!
//! The forward path assembles a consecutive run of frames into one volume.
//! The reverse path splits a volume into per-frame records using the first
//! and last frame of a template stack for geometry and metadata.

pub(crate) mod config;
pub(crate) mod forward;
pub(crate) mod reverse;

pub use config::ConvertConfig;
pub use forward::{frames_to_volume, write_volume, Conversion};
pub use reverse::{volume_to_frames, FrameRecord};

use crate::error::Result;
use rayon::prelude::*;

/// Run `f` for every frame index, on the rayon pool when `parallel` is set.
/// Results keep frame order; the first error wins.
pub(crate) fn map_frames<T, F>(count: usize, parallel: bool, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Result<T> + Sync + Send,
{
    if parallel {
        (0..count).into_par_iter().map(f).collect()
    } else {
        (0..count).map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_map_frames_keeps_order() {
        let serial = map_frames(64, false, |i| Ok(i * 2)).unwrap();
        let parallel = map_frames(64, true, |i| Ok(i * 2)).unwrap();
        assert_eq!(serial, parallel);
        assert_eq!(parallel[63], 126);
    }

    #[test]
    fn test_map_frames_error() {
        let result = map_frames(8, true, |i| {
            if i == 5 {
                Err(Error::Configuration("bad frame".into()))
            } else {
                Ok(i)
            }
        });
        assert!(result.is_err());
    }
}
