//! DICOM side of the conversion: attribute access, anchor frames, windowing.

pub(crate) mod dataset;
pub(crate) mod frame;
pub mod tags;
pub(crate) mod window;

pub use dataset::{series_name, Dataset, InMemoryDataset, Value};
pub use frame::{PhaseEncoding, ReferenceFrame};
pub use tags::Tag;
pub use window::{auto_window, pixel_range, Window};
