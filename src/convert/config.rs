//! Conversion settings.

use crate::csa::ItemLengthMode;
use crate::transforms::Orientation;

/// Settings shared by both conversion directions.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Item length convention for re-encoded CSA headers.
    pub item_length_mode: ItemLengthMode,
    /// Process frames on the rayon pool.
    pub parallel: bool,
    /// Voxel axis order of forward output (None = default voxel flip only).
    pub orientation: Option<Orientation>,
    /// Write `.nii.gz` instead of `.nii`.
    pub compress: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            item_length_mode: ItemLengthMode::default(),
            parallel: true,
            orientation: None,
            compress: true,
        }
    }
}

impl ConvertConfig {
    /// Default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the CSA item length convention.
    pub fn item_length_mode(mut self, mode: ItemLengthMode) -> Self {
        self.item_length_mode = mode;
        self
    }

    /// Enable or disable parallel frame processing.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Reorient forward output to `orientation`.
    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    /// Choose gzip output.
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// File extension for written volumes.
    pub(crate) fn extension(&self) -> &'static str {
        if self.compress {
            "nii.gz"
        } else {
            "nii"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ConvertConfig::new()
            .parallel(false)
            .compress(false)
            .item_length_mode(ItemLengthMode::Exact)
            .orientation(Orientation::LPS);
        assert!(!config.parallel);
        assert_eq!(config.extension(), "nii");
        assert_eq!(config.item_length_mode, ItemLengthMode::Exact);
        assert_eq!(config.orientation, Some(Orientation::LPS));
        assert_eq!(ConvertConfig::default().extension(), "nii.gz");
    }
}
