//! DICOM attribute tags consumed by the converter.

use std::fmt;

/// A `(group, element)` attribute tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub u16, pub u16);

impl Tag {
    /// Group number.
    pub const fn group(self) -> u16 {
        self.0
    }

    /// Element number.
    pub const fn element(self) -> u16 {
        self.1
    }

    /// Keyword of a known tag, used in error messages.
    pub fn keyword(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(tag, _)| *tag == self)
            .map_or("Unknown", |(_, name)| name)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X}) {}", self.0, self.1, self.keyword())
    }
}

pub const ACQUISITION_DATE: Tag = Tag(0x0008, 0x0022);
pub const CONTENT_DATE: Tag = Tag(0x0008, 0x0023);
pub const ACQUISITION_TIME: Tag = Tag(0x0008, 0x0032);
pub const CONTENT_TIME: Tag = Tag(0x0008, 0x0033);
pub const SLICE_THICKNESS: Tag = Tag(0x0018, 0x0050);
pub const REPETITION_TIME: Tag = Tag(0x0018, 0x0080);
pub const SPACING_BETWEEN_SLICES: Tag = Tag(0x0018, 0x0088);
pub const PROTOCOL_NAME: Tag = Tag(0x0018, 0x1030);
pub const IN_PLANE_PHASE_ENCODING_DIRECTION: Tag = Tag(0x0018, 0x1312);
pub const SERIES_NUMBER: Tag = Tag(0x0020, 0x0011);
pub const INSTANCE_NUMBER: Tag = Tag(0x0020, 0x0013);
pub const IMAGE_POSITION_PATIENT: Tag = Tag(0x0020, 0x0032);
pub const IMAGE_ORIENTATION_PATIENT: Tag = Tag(0x0020, 0x0037);
pub const SLICE_LOCATION: Tag = Tag(0x0020, 0x1041);
pub const ROWS: Tag = Tag(0x0028, 0x0010);
pub const COLUMNS: Tag = Tag(0x0028, 0x0011);
pub const PIXEL_SPACING: Tag = Tag(0x0028, 0x0030);
pub const SMALLEST_IMAGE_PIXEL_VALUE: Tag = Tag(0x0028, 0x0106);
pub const LARGEST_IMAGE_PIXEL_VALUE: Tag = Tag(0x0028, 0x0107);
pub const WINDOW_CENTER: Tag = Tag(0x0028, 0x1050);
pub const WINDOW_WIDTH: Tag = Tag(0x0028, 0x1051);
pub const RESCALE_INTERCEPT: Tag = Tag(0x0028, 0x1052);
pub const RESCALE_SLOPE: Tag = Tag(0x0028, 0x1053);
/// Private creator of the Siemens CSA block.
pub const CSA_PRIVATE_CREATOR: Tag = Tag(0x0029, 0x0010);
/// Siemens CSA image header payload.
pub const CSA_IMAGE_HEADER_INFO: Tag = Tag(0x0029, 0x1010);
pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

/// Value of [`CSA_PRIVATE_CREATOR`] that marks a Siemens CSA block.
pub const CSA_CREATOR_ID: &str = "SIEMENS CSA HEADER";

const KEYWORDS: &[(Tag, &str)] = &[
    (ACQUISITION_DATE, "AcquisitionDate"),
    (CONTENT_DATE, "ContentDate"),
    (ACQUISITION_TIME, "AcquisitionTime"),
    (CONTENT_TIME, "ContentTime"),
    (SLICE_THICKNESS, "SliceThickness"),
    (REPETITION_TIME, "RepetitionTime"),
    (SPACING_BETWEEN_SLICES, "SpacingBetweenSlices"),
    (PROTOCOL_NAME, "ProtocolName"),
    (IN_PLANE_PHASE_ENCODING_DIRECTION, "InPlanePhaseEncodingDirection"),
    (SERIES_NUMBER, "SeriesNumber"),
    (INSTANCE_NUMBER, "InstanceNumber"),
    (IMAGE_POSITION_PATIENT, "ImagePositionPatient"),
    (IMAGE_ORIENTATION_PATIENT, "ImageOrientationPatient"),
    (SLICE_LOCATION, "SliceLocation"),
    (ROWS, "Rows"),
    (COLUMNS, "Columns"),
    (PIXEL_SPACING, "PixelSpacing"),
    (SMALLEST_IMAGE_PIXEL_VALUE, "SmallestImagePixelValue"),
    (LARGEST_IMAGE_PIXEL_VALUE, "LargestImagePixelValue"),
    (WINDOW_CENTER, "WindowCenter"),
    (WINDOW_WIDTH, "WindowWidth"),
    (RESCALE_INTERCEPT, "RescaleIntercept"),
    (RESCALE_SLOPE, "RescaleSlope"),
    (CSA_PRIVATE_CREATOR, "PrivateCreator"),
    (CSA_IMAGE_HEADER_INFO, "CSAImageHeaderInfo"),
    (PIXEL_DATA, "PixelData"),
];
