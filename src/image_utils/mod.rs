pub mod annotator;
pub mod image_conversion;
pub mod image_io;
