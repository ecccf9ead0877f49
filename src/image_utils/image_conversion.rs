use crate::config::BlobParams;
use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::Array4;

/// Converts an image into the network's input blob.
///
/// The image is stretched to a square of `input_size` pixels (no crop, no letterbox), then laid
/// out as (image, channel, row, column) with every value mapped to
/// `(value - mean[channel]) * scale`.
pub fn image_to_blob(rgb_image: &RgbImage, params: &BlobParams) -> Array4<f32> {
    let size = params.input_size;
    let resized = imageops::resize(rgb_image, size, size, FilterType::Triangle);
    let mut blob = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let channels = if params.swap_rb { [b, g, r] } else { [r, g, b] };
        for (channel, value) in channels.into_iter().enumerate() {
            blob[[0, channel, y as usize, x as usize]] =
                (value as f32 - params.mean[channel]) * params.scale;
        }
    }
    blob
}
