//! Siemens CSA header codec (`SV10` dialect).
//!
//! A CSA block is self-delimiting: a 16-byte preamble carrying the element
//! count, then per element a fixed 84-byte descriptor followed by its items.
//! Each item is a 16-byte descriptor plus an ASCII payload padded with NUL
//! bytes to a 4-byte boundary. All integers are little-endian `u32`.
//!
//! Producers disagree on whether the stored item length counts the
//! terminating NUL, so encoding takes an explicit [`ItemLengthMode`] and
//! decoding relies on NUL truncation instead of trusting the length.

use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use indexmap::IndexMap;
use std::str::FromStr;

/// Magic bytes at the start of every block.
pub const MAGIC: &[u8; 4] = b"SV10";

const NAME_LEN: usize = 64;
const VR_LEN: usize = 4;
/// magic, unused, element count, unused
const PREAMBLE_LEN: usize = 16;
/// name, vm, vr, syngo_dt, item count, unused
const ELEMENT_HEADER_LEN: usize = NAME_LEN + 20;
/// item length and three unused words
const ITEM_HEADER_LEN: usize = 16;
const SENTINEL: [u8; 4] = [0; 4];

/// A single item; `None` is written with a zero length and no payload.
pub type Item = Option<String>;

/// One named entry of a CSA block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Value multiplicity.
    pub vm: u32,
    /// Two to four character value representation (`"DS"`, `"IS"`, `"LO"`, ...).
    pub vr: String,
    /// Vendor type code.
    pub syngo_dt: u32,
    /// Items in wire order.
    pub items: Vec<Item>,
}

impl Element {
    /// Create an element without items.
    pub fn new(vm: u32, vr: impl Into<String>, syngo_dt: u32) -> Self {
        Self {
            vm,
            vr: vr.into(),
            syngo_dt,
            items: Vec::new(),
        }
    }

    /// Append non-null string items.
    #[must_use]
    pub fn with_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items.extend(items.into_iter().map(|s| Some(s.into())));
        self
    }

    /// First item that is present and not blank.
    pub fn first(&self) -> Option<&str> {
        self.items
            .iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }

    /// Parse every present, non-blank item as `T`.
    pub fn values<T: FromStr>(&self) -> Result<Vec<T>> {
        self.items
            .iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<T>()
                    .map_err(|_| Error::Format(format!("cannot parse CSA item '{s}'")))
            })
            .collect()
    }
}

/// How the item length field is written by [`encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemLengthMode {
    /// Store the string length. An empty string becomes a null item.
    Exact,
    /// Store the string length plus one for the terminating NUL.
    #[default]
    NulTerminated,
}

impl ItemLengthMode {
    fn wire_len(self, item: &str) -> usize {
        match self {
            Self::Exact => item.len(),
            Self::NulTerminated => item.len() + 1,
        }
    }
}

/// Ordered CSA element map. Element order is preserved on encode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderBlock {
    elements: IndexMap<String, Element>,
}

impl HeaderBlock {
    /// Empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode from the wire format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }

    /// Encode to the wire format.
    pub fn to_bytes(&self, mode: ItemLengthMode) -> Result<Vec<u8>> {
        encode(self, mode)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True when the block holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Look up an element by name.
    pub fn get(&self, name: &str) -> Option<&Element> {
        self.elements.get(name)
    }

    /// Mutable lookup by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements.get_mut(name)
    }

    /// Insert or replace. A replaced element keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, element: Element) -> Option<Element> {
        self.elements.insert(name.into(), element)
    }

    /// True when an element with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.elements.contains_key(name)
    }

    /// Element names in wire order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    /// `(name, element)` pairs in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Element)> {
        self.elements.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// First present, non-blank item of the named element.
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Element::first)
    }

    /// Exact size of [`encode`] output for this block.
    pub fn encoded_len(&self, mode: ItemLengthMode) -> usize {
        let items: usize = self
            .elements
            .values()
            .flat_map(|e| e.items.iter())
            .map(|item| {
                ITEM_HEADER_LEN
                    + item
                        .as_deref()
                        .map_or(0, |s| padded_len(mode.wire_len(s)))
            })
            .sum();
        PREAMBLE_LEN + self.elements.len() * ELEMENT_HEADER_LEN + items + SENTINEL.len()
    }
}

impl std::ops::Index<&str> for HeaderBlock {
    type Output = Element;

    fn index(&self, name: &str) -> &Element {
        &self.elements[name]
    }
}

impl FromIterator<(String, Element)> for HeaderBlock {
    fn from_iter<T: IntoIterator<Item = (String, Element)>>(iter: T) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

const fn padded_len(len: usize) -> usize {
    len.div_ceil(4) * 4
}

fn nul_truncated(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::Format(format!(
                "truncated CSA header: {what} needs {n} bytes at offset {}, {} available",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4, what)?))
    }
}

/// Decode a CSA block.
///
/// Bytes after the last item are ignored, which covers the zero sentinel
/// written by [`encode`] as well as vendor trailing padding.
pub fn decode(bytes: &[u8]) -> Result<HeaderBlock> {
    if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
        let found = &bytes[..bytes.len().min(MAGIC.len())];
        return Err(Error::Format(format!(
            "CSA header must start with SV10, found {found:?}"
        )));
    }

    let mut cur = Cursor { bytes, pos: 0 };
    cur.take(8, "preamble")?;
    let n_elements = cur.u32("element count")? as usize;
    cur.take(4, "preamble")?;

    let mut elements =
        IndexMap::with_capacity(n_elements.min(cur.remaining() / ELEMENT_HEADER_LEN));
    for _ in 0..n_elements {
        let name = nul_truncated(cur.take(NAME_LEN, "element name")?);
        let vm = cur.u32("vm")?;
        let vr = nul_truncated(cur.take(VR_LEN, "vr")?);
        let syngo_dt = cur.u32("syngo_dt")?;
        let n_items = cur.u32("item count")? as usize;
        cur.take(4, "element descriptor")?;

        let mut items = Vec::with_capacity(n_items.min(cur.remaining() / ITEM_HEADER_LEN));
        for _ in 0..n_items {
            let item_len = cur.u32("item length")? as usize;
            cur.take(ITEM_HEADER_LEN - 4, "item descriptor")?;
            if item_len == 0 {
                items.push(None);
                continue;
            }
            let payload = cur.take(padded_len(item_len), "item payload")?;
            items.push(Some(nul_truncated(&payload[..item_len])));
        }

        elements.insert(
            name,
            Element {
                vm,
                vr,
                syngo_dt,
                items,
            },
        );
    }

    Ok(HeaderBlock { elements })
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    let mut word = [0u8; 4];
    LittleEndian::write_u32(&mut word, value);
    buf.extend_from_slice(&word);
}

fn put_padded(buf: &mut Vec<u8>, bytes: &[u8], width: usize) {
    buf.extend_from_slice(bytes);
    buf.resize(buf.len() + width - bytes.len(), 0);
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::Format(format!("{what} {value} exceeds u32")))
}

/// Encode a CSA block, appending a four byte zero sentinel.
pub fn encode(block: &HeaderBlock, mode: ItemLengthMode) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(block.encoded_len(mode));
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&[0; 4]);
    put_u32(&mut buf, to_u32(block.len(), "element count")?);
    buf.extend_from_slice(&[0; 4]);

    for (name, element) in block.iter() {
        if name.len() > NAME_LEN {
            return Err(Error::Format(format!(
                "element name '{name}' longer than {NAME_LEN} bytes"
            )));
        }
        if element.vr.len() > VR_LEN {
            return Err(Error::Format(format!(
                "vr '{}' of '{name}' longer than {VR_LEN} bytes",
                element.vr
            )));
        }
        put_padded(&mut buf, name.as_bytes(), NAME_LEN);
        put_u32(&mut buf, element.vm);
        put_padded(&mut buf, element.vr.as_bytes(), VR_LEN);
        put_u32(&mut buf, element.syngo_dt);
        put_u32(&mut buf, to_u32(element.items.len(), "item count")?);
        buf.extend_from_slice(&[0; 4]);

        for item in &element.items {
            let wire_len = item.as_deref().map_or(0, |s| mode.wire_len(s));
            put_u32(&mut buf, to_u32(wire_len, "item length")?);
            buf.extend_from_slice(&[0; ITEM_HEADER_LEN - 4]);
            if let Some(s) = item.as_deref().filter(|_| wire_len > 0) {
                put_padded(&mut buf, s.as_bytes(), padded_len(wire_len));
            }
        }
    }

    buf.extend_from_slice(&SENTINEL);
    Ok(buf)
}
