use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.1;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.4;
pub const DEFAULT_INPUT_SIZE: u32 = 608;

/// What to look for and how picky to be about it.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Class name to search for, compared exactly against the class file.
    pub target_label: String,
    /// Rows need a class score strictly above this to become candidates.
    pub confidence_threshold: f32,
    /// Candidates overlapping a more confident one by at least this IoU are dropped.
    pub nms_threshold: f32,
}

impl DetectorConfig {
    pub fn new(target_label: impl Into<String>) -> Self {
        DetectorConfig {
            target_label: target_label.into(),
            ..Default::default()
        }
    }

    pub fn with_thresholds(mut self, confidence_threshold: f32, nms_threshold: f32) -> Self {
        self.confidence_threshold = confidence_threshold;
        self.nms_threshold = nms_threshold;
        self
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            target_label: "baseball bat".to_string(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
        }
    }
}

/// How an image is turned into the network's input tensor.
///
/// The image is resized to `input_size` x `input_size` without cropping, then every channel
/// value becomes `(value - mean[c]) * scale`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct BlobParams {
    pub input_size: u32,
    pub scale: f32,
    pub mean: [f32; 3],
    /// Swap the first and third channel. Images are decoded as RGB, which is already what
    /// Darknet derived models expect, so this stays off unless the model was trained on BGR.
    pub swap_rb: bool,
}

impl Default for BlobParams {
    fn default() -> Self {
        BlobParams {
            input_size: DEFAULT_INPUT_SIZE,
            scale: 1.0 / 255.0,
            mean: [0.0; 3],
            swap_rb: false,
        }
    }
}

/// Everything a batch run needs.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct RunConfig {
    pub model_path: PathBuf,
    pub classes_path: PathBuf,
    /// Label font. The bundled DejaVu Sans is used when unset.
    pub font_path: Option<PathBuf>,
    pub input_dir: PathBuf,
    /// Only files with this extension are processed, compared case-insensitively.
    pub input_extension: String,
    pub output_dir: PathBuf,
    pub coords_log: PathBuf,
    pub detector: DetectorConfig,
    pub blob: BlobParams,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            model_path: PathBuf::from("Data/Yolo/yolov4.onnx"),
            classes_path: PathBuf::from("Data/Yolo/coco.names"),
            font_path: None,
            input_dir: PathBuf::from("Data/InputImages"),
            input_extension: "png".to_string(),
            output_dir: PathBuf::from("Output/Images"),
            coords_log: PathBuf::from("Output/coords.txt"),
            detector: DetectorConfig::default(),
            blob: BlobParams::default(),
        }
    }
}

impl RunConfig {
    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> io::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(io::Error::from)
    }
}
