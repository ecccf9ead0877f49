use crate::error::InputError;
use image::{self, RgbImage};
use std::path::Path;

/// Reads an image from disk as 8 bit RGB.
///
/// A missing file is reported separately from a file that exists but cannot be decoded.
pub fn read_image_as_rgb8(filepath: &Path) -> Result<RgbImage, InputError> {
    if !filepath.is_file() {
        return Err(InputError::Missing {
            path: filepath.to_path_buf(),
        });
    }
    image::open(filepath)
        .map(|img| img.into_rgb8())
        .map_err(|source| InputError::Decode {
            path: filepath.to_path_buf(),
            source,
        })
}
