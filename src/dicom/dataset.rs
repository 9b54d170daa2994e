//! Attribute access for DICOM datasets.
//!
//! File parsing is left to an external reader. The converter only needs
//! attribute lookup by tag and the pixel buffer of a frame, expressed by the
//! [`Dataset`] trait. [`InMemoryDataset`] is a plain map-backed
//! implementation for callers that already decoded their files.

use super::tags::{self, Tag};
use crate::csa::{self, HeaderBlock};
use crate::error::{Error, Result};
use ndarray::Array2;
use std::collections::BTreeMap;

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text, including multi-valued text joined by backslashes.
    Str(String),
    /// Integer string or binary integer.
    Int(i64),
    /// Single decimal.
    Float(f64),
    /// Multi-valued decimal (`DS` with VM > 1, `FD` arrays).
    Floats(Vec<f64>),
    /// Opaque bytes (`OB`, `UN`, private blocks).
    Bytes(Vec<u8>),
}

impl Value {
    /// Text content.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes; text is returned as its UTF-8 bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            Self::Str(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Single numeric value; multi-valued attributes yield their first value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Floats(v) => v.first().copied(),
            Self::Str(s) => s.split('\\').next()?.trim().parse().ok(),
            Self::Bytes(_) => None,
        }
    }

    /// All numeric values; text is split on backslashes.
    pub fn as_floats(&self) -> Option<Vec<f64>> {
        match self {
            Self::Floats(v) => Some(v.clone()),
            Self::Float(v) => Some(vec![*v]),
            Self::Int(v) => Some(vec![*v as f64]),
            Self::Str(s) => s.split('\\').map(|p| p.trim().parse().ok()).collect(),
            Self::Bytes(_) => None,
        }
    }

    /// Integer value. Decimals are accepted only when integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Self::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::Floats(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

/// Read access to one DICOM frame.
pub trait Dataset {
    /// Attribute value for `tag`, if present.
    fn value(&self, tag: Tag) -> Option<&Value>;

    /// Pixel buffer as `(rows, columns)`.
    fn pixels(&self) -> Result<Array2<i16>>;

    /// True when `tag` is present.
    fn contains(&self, tag: Tag) -> bool {
        self.value(tag).is_some()
    }

    /// Text attribute.
    fn string(&self, tag: Tag) -> Option<&str> {
        self.value(tag).and_then(Value::as_str)
    }

    /// Numeric attribute that may be absent.
    fn optional_f64(&self, tag: Tag) -> Result<Option<f64>> {
        self.value(tag)
            .map(|v| {
                v.as_f64()
                    .ok_or_else(|| Error::invalid(tag.keyword(), format!("not numeric: {v:?}")))
            })
            .transpose()
    }

    /// Numeric attribute that must be present.
    fn require_f64(&self, tag: Tag) -> Result<f64> {
        self.optional_f64(tag)?
            .ok_or_else(|| Error::missing(tag.keyword()))
    }

    /// Integer attribute that must be present.
    fn require_i64(&self, tag: Tag) -> Result<i64> {
        let value = self
            .value(tag)
            .ok_or_else(|| Error::missing(tag.keyword()))?;
        value
            .as_i64()
            .ok_or_else(|| Error::invalid(tag.keyword(), format!("not an integer: {value:?}")))
    }

    /// Multi-valued numeric attribute with exactly `n` values.
    fn require_floats(&self, tag: Tag, n: usize) -> Result<Vec<f64>> {
        let value = self
            .value(tag)
            .ok_or_else(|| Error::missing(tag.keyword()))?;
        let values = value
            .as_floats()
            .ok_or_else(|| Error::invalid(tag.keyword(), format!("not numeric: {value:?}")))?;
        if values.len() != n {
            return Err(Error::invalid(
                tag.keyword(),
                format!("expected {n} values, got {}", values.len()),
            ));
        }
        Ok(values)
    }

    /// Decoded Siemens CSA image header, when the private creator announces one.
    fn csa_image_header(&self) -> Result<Option<HeaderBlock>> {
        match self.string(tags::CSA_PRIVATE_CREATOR) {
            Some(creator) if creator.trim() == tags::CSA_CREATOR_ID => {}
            _ => return Ok(None),
        }
        let bytes = self
            .value(tags::CSA_IMAGE_HEADER_INFO)
            .and_then(Value::as_bytes)
            .ok_or_else(|| Error::missing(tags::CSA_IMAGE_HEADER_INFO.keyword()))?;
        csa::decode(bytes).map(Some)
    }
}

/// Map-backed [`Dataset`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    values: BTreeMap<Tag, Value>,
    pixels: Option<Array2<i16>>,
}

impl InMemoryDataset {
    /// Empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, builder style.
    #[must_use]
    pub fn with(mut self, tag: Tag, value: impl Into<Value>) -> Self {
        self.insert(tag, value);
        self
    }

    /// Set the pixel buffer, builder style.
    #[must_use]
    pub fn with_pixels(mut self, pixels: Array2<i16>) -> Self {
        self.pixels = Some(pixels);
        self
    }

    /// Set an attribute, returning the previous value.
    pub fn insert(&mut self, tag: Tag, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(tag, value.into())
    }

    /// Remove an attribute.
    pub fn remove(&mut self, tag: Tag) -> Option<Value> {
        self.values.remove(&tag)
    }

    /// Replace the pixel buffer.
    pub fn set_pixels(&mut self, pixels: Array2<i16>) {
        self.pixels = Some(pixels);
    }

    /// Attributes in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &Value)> {
        self.values.iter()
    }
}

impl Dataset for InMemoryDataset {
    fn value(&self, tag: Tag) -> Option<&Value> {
        self.values.get(&tag)
    }

    fn pixels(&self) -> Result<Array2<i16>> {
        self.pixels
            .clone()
            .ok_or_else(|| Error::missing(tags::PIXEL_DATA.keyword()))
    }
}

/// Series label `"{ProtocolName}-s{SeriesNumber:03}"` with every run of
/// non-alphanumeric characters collapsed to `-`.
pub fn series_name<D: Dataset + ?Sized>(dataset: &D) -> Result<String> {
    let protocol = dataset
        .string(tags::PROTOCOL_NAME)
        .ok_or_else(|| Error::missing(tags::PROTOCOL_NAME.keyword()))?;
    let series = dataset.require_i64(tags::SERIES_NUMBER)?;
    let raw = format!("{}-s{series:03}", protocol.trim());

    let mut name = String::with_capacity(raw.len());
    let mut in_run = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c);
            in_run = false;
        } else if !in_run {
            name.push('-');
            in_run = true;
        }
    }
    Ok(name)
}
