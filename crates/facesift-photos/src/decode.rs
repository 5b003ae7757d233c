//! Image decoding to RGB rasters.
//!
//! Formats are sniffed from content, not trusted from the extension.

use facesift_core::CandidateError;
use image::{ImageReader, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// Decode an in-memory image (e.g. an upload) as 8-bit RGB.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, image::ImageError> {
    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    Ok(image.to_rgb8())
}

/// Read and decode an image file as 8-bit RGB.
pub fn load_rgb(path: &Path) -> Result<RgbImage, CandidateError> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(image.to_rgb8())
}
