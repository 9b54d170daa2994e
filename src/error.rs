//! Error types for medconv.

use thiserror::Error;

/// Errors raised while decoding headers, resolving geometry or converting volumes.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed binary data: bad magic, truncated buffer, inconsistent counts.
    #[error("format error: {0}")]
    Format(String),

    /// Magic bytes of a NIfTI file did not match any known version.
    #[error("invalid NIfTI magic: {0:?}")]
    InvalidMagic([u8; 4]),

    /// Anchor frames cannot define a slice axis (equal instance numbers, zero offset).
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Mosaic layout, canvas and volume dimensions disagree.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A required attribute is absent from a dataset.
    #[error("missing attribute: {0}")]
    MissingAttribute(String),

    /// An attribute is present but cannot be interpreted.
    #[error("invalid attribute {name}: {reason}")]
    InvalidAttribute {
        /// Attribute keyword.
        name: String,
        /// What was wrong with the value.
        reason: String,
    },

    /// Affine matrix is singular or otherwise unusable.
    #[error("invalid affine: {0}")]
    InvalidAffine(String),

    /// Image dimensions violate a NIfTI constraint.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// NIfTI datatype code not handled by this crate.
    #[error("unsupported data type code {0}")]
    UnsupportedDataType(i16),

    /// Axis codes could not be parsed.
    #[error("invalid orientation: {0}")]
    InvalidOrientation(String),

    /// Conversion settings are inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O failure while reading or writing a file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn missing(name: &str) -> Self {
        Self::MissingAttribute(name.to_string())
    }

    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
