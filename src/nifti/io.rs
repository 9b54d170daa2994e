//! `NIfTI` file I/O for `.nii` and `.nii.gz`.

use super::header::NiftiHeader;
use super::image::NiftiImage;
use crate::error::{Error, Result};
use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

const GZIP_BUFFER_SIZE: usize = 256 * 1024;

fn is_gzipped(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "gz")
}

/// Load a NIfTI image from file.
///
/// Supports both `.nii` and `.nii.gz`, chosen by extension.
///
/// # Example
/// ```ignore
/// let img = medconv::nifti::load("bold.nii.gz")?;
/// println!("{:?}", img.shape());
/// ```
#[must_use = "this function returns a loaded image that should be used"]
pub fn load<P: AsRef<Path>>(path: P) -> Result<NiftiImage> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut bytes = Vec::new();
    if is_gzipped(path) {
        let reader = BufReader::with_capacity(GZIP_BUFFER_SIZE, file);
        MultiGzDecoder::new(reader).read_to_end(&mut bytes)?;
    } else {
        BufReader::new(file).read_to_end(&mut bytes)?;
    }

    let header = NiftiHeader::from_bytes(&bytes)?;
    let offset = usize::try_from(header.vox_offset)
        .map_err(|_| Error::InvalidDimensions(format!("vox_offset {}", header.vox_offset)))?;
    let data = bytes.get(offset..).ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "file ends before vox_offset",
        ))
    })?;
    debug!(path = %path.display(), shape = ?header.shape(), "loaded nifti");
    NiftiImage::from_bytes(header, data)
}

/// Load only the header from a NIfTI file.
pub fn load_header<P: AsRef<Path>>(path: P) -> Result<NiftiHeader> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut header_buf = vec![0u8; NiftiHeader::SIZE];
    if is_gzipped(path) {
        MultiGzDecoder::new(BufReader::new(file)).read_exact(&mut header_buf)?;
    } else {
        BufReader::new(file).read_exact(&mut header_buf)?;
    }
    NiftiHeader::from_bytes(&header_buf)
}

/// Save a NIfTI image. Format is determined by extension (`.nii` or `.nii.gz`).
///
/// # Example
/// ```ignore
/// medconv::nifti::save(&img, "output.nii.gz")?;
/// ```
pub fn save<P: AsRef<Path>>(image: &NiftiImage, path: P) -> Result<()> {
    let path = path.as_ref();
    write_file(image, path, File::create(path)?)
}

/// Like [`save`], but fails with `AlreadyExists` instead of replacing a file.
pub fn save_new<P: AsRef<Path>>(image: &NiftiImage, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    write_file(image, path, file)
}

fn write_file(image: &NiftiImage, path: &Path, file: File) -> Result<()> {
    let writer = BufWriter::with_capacity(1024 * 1024, file);
    if is_gzipped(path) {
        let mut encoder = GzEncoder::new(writer, Compression::fast());
        write_image(image, &mut encoder)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = writer;
        write_image(image, &mut writer)?;
        writer.flush()?;
    }
    debug!(
        path = %path.display(),
        shape = ?image.shape(),
        dtype = %image.dtype(),
        "saved nifti"
    );
    Ok(())
}

/// Write header, padding to `vox_offset`, then voxel data.
fn write_image<W: Write>(image: &NiftiImage, writer: &mut W) -> Result<()> {
    let mut header = image.header().clone();
    header.vox_offset = NiftiHeader::DEFAULT_VOX_OFFSET;
    header.validate()?;

    writer.write_all(&header.to_bytes())?;
    // empty extension block
    writer.write_all(&[0u8; 4])?;
    writer.write_all(&image.data_to_bytes()?)?;
    Ok(())
}
