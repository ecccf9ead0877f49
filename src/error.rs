use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors caused by a model, class file or font that do not fit together.
///
/// None of these can be fixed by trying another image, so the batch driver stops on them.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to load model from {path:?}: {source}")]
    ModelLoad { path: PathBuf, source: ort::Error },
    #[error("Model {path:?} has no input tensor.")]
    ModelHasNoInput { path: PathBuf },
    #[error("Failed to read class names from {path:?}: {source}")]
    ClassNames { path: PathBuf, source: io::Error },
    #[error(
        "Model predicted class id {class_id} but the class table only has {table_len} names, \
        the model and class file do not match."
    )]
    ClassIdOutOfRange { class_id: usize, table_len: usize },
    #[error("Class table is empty, no prediction could be named.")]
    EmptyClassTable,
    #[error(
        "Output tensor has {columns} columns, expected 4 box values, objectness and at least \
        one class score."
    )]
    MalformedOutput { columns: usize },
    #[error("Model did not produce the requested output {name:?}.")]
    MissingOutput { name: String },
    #[error("Output tensor {name:?} has unsupported shape {shape:?}.")]
    OutputShape { name: String, shape: Vec<i64> },
    #[error("Failed to read font {path:?}: {source}")]
    FontRead { path: PathBuf, source: io::Error },
    #[error("File {path:?} is not a usable font.")]
    InvalidFont { path: PathBuf },
}

/// Errors tied to one input image. The rest of a batch can still run.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Image {path:?} does not exist.")]
    Missing { path: PathBuf },
    #[error("Failed to decode image {path:?}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
}

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("Inference failed: {0}")]
    Inference(#[from] ort::Error),
}

/// Errors writing a result. They only affect the image being saved.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to create output directory for {path:?}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("Failed to write image {path:?}: {source}")]
    ImageWrite {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("Failed to append to coordinate log {path:?}: {source}")]
    CoordsLog { path: PathBuf, source: io::Error },
}

impl DetectorError {
    /// Whether the error invalidates every later detect call as well.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DetectorError::Input(_))
    }
}
