mod annotations;
mod config;
mod error;
mod image_utils;
mod object_detection;
mod persistence;

use anyhow::{Context, Result};
use clap::Parser;
use config::{DetectorConfig, RunConfig};
use object_detection::detection_result::ObjectLocation;
use object_detection::object_detection_model::InferenceBackend;
use object_detection::object_detector::ObjectDetector;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Finds one kind of object in every image of a folder, saves annotated copies and logs the
/// object's centre per image.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON run configuration. Flags below override its values.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// ONNX model file
    #[arg(long, value_name = "FILE")]
    model: Option<PathBuf>,
    /// Class names file, one name per line
    #[arg(long, value_name = "FILE")]
    classes: Option<PathBuf>,
    /// TrueType font for box labels
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,
    #[arg(long, value_name = "DIR")]
    input_dir: Option<PathBuf>,
    /// Extension of the images to process, e.g. png
    #[arg(long)]
    extension: Option<String>,
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// File the coordinates are appended to
    #[arg(long, value_name = "FILE")]
    coords_log: Option<PathBuf>,
    /// Class name to look for
    #[arg(long)]
    target: Option<String>,
    #[arg(long)]
    confidence: Option<f32>,
    #[arg(long)]
    nms: Option<f32>,
    /// Side length of the square network input
    #[arg(long)]
    input_size: Option<u32>,
}

impl Args {
    fn into_run_config(self) -> Result<RunConfig> {
        let mut run_config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)
                .with_context(|| format!("Failed to read run configuration {:?}", path))?,
            None => RunConfig::default(),
        };
        if let Some(model) = self.model {
            run_config.model_path = model;
        }
        if let Some(classes) = self.classes {
            run_config.classes_path = classes;
        }
        if self.font.is_some() {
            run_config.font_path = self.font;
        }
        if let Some(input_dir) = self.input_dir {
            run_config.input_dir = input_dir;
        }
        if let Some(extension) = self.extension {
            run_config.input_extension = extension;
        }
        if let Some(output_dir) = self.output_dir {
            run_config.output_dir = output_dir;
        }
        if let Some(coords_log) = self.coords_log {
            run_config.coords_log = coords_log;
        }
        if let Some(input_size) = self.input_size {
            run_config.blob.input_size = input_size;
        }
        let current = &run_config.detector;
        run_config.detector = DetectorConfig::new(
            self.target
                .unwrap_or_else(|| current.target_label.clone()),
        )
        .with_thresholds(
            self.confidence.unwrap_or(current.confidence_threshold),
            self.nms.unwrap_or(current.nms_threshold),
        );
        Ok(run_config)
    }
}

/// Lists the images directly inside `dir` with the given extension, sorted by file name.
fn collect_input_images(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to list input directory {:?}", dir))?;
        let matches_extension = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension));
        if entry.file_type().is_file() && matches_extension {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

/// Per outcome image counts of a batch run.
#[derive(Debug, Default, PartialEq)]
struct BatchSummary {
    found: usize,
    not_found: usize,
    skipped: usize,
}

/// Runs the detector over every input and saves each result.
///
/// Images that cannot be read are skipped with a warning, as are results that cannot be saved.
/// Any other detection error stops the batch.
fn run_batch<B: InferenceBackend>(
    detector: &mut ObjectDetector<B>,
    inputs: &[PathBuf],
    run_config: &RunConfig,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    for input_path in inputs {
        let result = match detector.detect(input_path) {
            Ok(result) => result,
            Err(err) if !err.is_fatal() => {
                warn!("Skipping {:?}: {}", input_path, err);
                summary.skipped += 1;
                continue;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Detection failed on {:?}", input_path));
            }
        };
        match result.location {
            ObjectLocation::Found(_) => summary.found += 1,
            ObjectLocation::NotFound => summary.not_found += 1,
        }
        info!("{:?}: {}", input_path, result.summary());

        let output_path = match input_path.file_name() {
            Some(file_name) => run_config.output_dir.join(file_name),
            None => continue,
        };
        if let Err(err) = result.save(&output_path, &run_config.coords_log) {
            warn!("{}", err);
        }
    }
    Ok(summary)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let run_config = Args::parse().into_run_config()?;
    let mut detector = ObjectDetector::from_run_config(&run_config)
        .context("Failed to set up the object detector")?;
    let inputs = collect_input_images(&run_config.input_dir, &run_config.input_extension)?;
    info!(
        "Searching {} image(s) in {:?} for {:?}",
        inputs.len(),
        run_config.input_dir,
        detector.config().target_label
    );

    let summary = run_batch(&mut detector, &inputs, &run_config)?;
    info!(
        "Processed {} image(s): {} found, {} not found, {} skipped",
        inputs.len(),
        summary.found,
        summary.not_found,
        summary.skipped
    );
    Ok(())
}
