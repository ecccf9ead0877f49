use crate::config::{BlobParams, DetectorConfig, RunConfig};
use crate::error::{ConfigurationError, DetectorError};
use crate::image_utils::annotator::Annotator;
use crate::image_utils::image_conversion::image_to_blob;
use crate::image_utils::image_io::read_image_as_rgb8;
use crate::object_detection::candidate_extraction::extract_candidates;
use crate::object_detection::class_table::{ClassTable, TargetClassFilter};
use crate::object_detection::detection_result::{DetectionResult, ObjectLocation};
use crate::object_detection::object_detection_model::InferenceBackend;
use crate::object_detection::object_detection_utils::suppress_and_select;
use crate::object_detection::ort_inference_session::OrtInferenceSession;
use image::RgbImage;
use ndarray::Array2;
use std::path::Path;
use tracing::{debug, info, warn};

/// Finds one kind of object in images.
///
/// A detector owns its network, class table and output layer names. All of them are loaded
/// once when it is built and never change afterwards, so one detector serves any number of
/// images. Detectors with different targets share nothing and can live side by side.
pub struct ObjectDetector<B: InferenceBackend> {
    backend: B,
    classes: ClassTable,
    config: DetectorConfig,
    blob_params: BlobParams,
    annotator: Annotator,
    output_layer_names: Vec<String>,
}

impl ObjectDetector<OrtInferenceSession> {
    /// Loads the model, class names and optional font named in a run configuration.
    pub fn from_run_config(run_config: &RunConfig) -> Result<Self, ConfigurationError> {
        let backend = OrtInferenceSession::new(&run_config.model_path)?;
        let classes = ClassTable::load(&run_config.classes_path)?;
        let annotator = match &run_config.font_path {
            Some(font_path) => Annotator::from_font_file(font_path)?,
            None => Annotator::default(),
        };
        ObjectDetector::new(
            backend,
            classes,
            run_config.detector.clone(),
            run_config.blob.clone(),
            annotator,
        )
    }
}

impl<B: InferenceBackend> ObjectDetector<B> {
    /// Fails on an empty class table, which could not name any prediction of the model.
    pub fn new(
        backend: B,
        classes: ClassTable,
        config: DetectorConfig,
        blob_params: BlobParams,
        annotator: Annotator,
    ) -> Result<Self, ConfigurationError> {
        if classes.is_empty() {
            return Err(ConfigurationError::EmptyClassTable);
        }
        let output_layer_names = backend.output_layer_names();
        if output_layer_names.is_empty() {
            warn!("Model reports no output layers, no object will ever be found");
        }
        info!(
            "Detector ready: looking for {:?} with {} classes, output layers {:?}",
            config.target_label,
            classes.len(),
            output_layer_names
        );
        Ok(ObjectDetector {
            backend,
            classes,
            config,
            blob_params,
            annotator,
            output_layer_names,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Reads the image at `input_path` and looks for the target in it.
    pub fn detect(&mut self, input_path: &Path) -> Result<DetectionResult, DetectorError> {
        let image = read_image_as_rgb8(input_path)?;
        debug!(
            "Read {:?} ({}x{})",
            input_path,
            image.width(),
            image.height()
        );
        self.detect_image(image)
    }

    /// Looks for the target in an already decoded image.
    ///
    /// When the target is found the returned image carries the box, label and centre marker;
    /// otherwise it is returned untouched.
    pub fn detect_image(&mut self, mut image: RgbImage) -> Result<DetectionResult, DetectorError> {
        let blob = image_to_blob(&image, &self.blob_params);
        let net_output = self.backend.forward(blob, &self.output_layer_names)?;
        let location = self.find_and_display_object(&mut image, &net_output)?;
        Ok(DetectionResult { image, location })
    }

    fn find_and_display_object(
        &self,
        image: &mut RgbImage,
        net_output: &[Array2<f32>],
    ) -> Result<ObjectLocation, ConfigurationError> {
        let filter = TargetClassFilter::new(&self.classes, &self.config.target_label);
        let candidates = extract_candidates(
            net_output,
            image.width(),
            image.height(),
            &filter,
            self.config.confidence_threshold,
        )?;
        debug!("{} candidate(s) for {:?}", candidates.len(), self.config.target_label);

        let Some(best) = suppress_and_select(&candidates, self.config.nms_threshold) else {
            return Ok(ObjectLocation::NotFound);
        };
        let winner = &candidates[best];
        let center = self
            .annotator
            .annotate(image, self.classes.name(winner.class_id), winner);
        Ok(ObjectLocation::Found(center))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::point::Point;
    use crate::error::InputError;
    use ndarray::{Array4, array};
    use std::cell::Cell;

    /// Plays back fixed output tables and records what it was asked for.
    struct MockBackend {
        outputs: Vec<Array2<f32>>,
        name_lookups: Cell<usize>,
        forward_calls: usize,
        last_blob_dim: Option<(usize, usize, usize, usize)>,
        last_requested: Vec<String>,
    }

    impl MockBackend {
        fn new(outputs: Vec<Array2<f32>>) -> Self {
            MockBackend {
                outputs,
                name_lookups: Cell::new(0),
                forward_calls: 0,
                last_blob_dim: None,
                last_requested: Vec::new(),
            }
        }
    }

    impl InferenceBackend for MockBackend {
        fn output_layer_names(&self) -> Vec<String> {
            self.name_lookups.set(self.name_lookups.get() + 1);
            vec!["yolo_139".to_string(), "yolo_150".to_string()]
        }

        fn forward(
            &mut self,
            blob: Array4<f32>,
            output_names: &[String],
        ) -> Result<Vec<Array2<f32>>, DetectorError> {
            self.forward_calls += 1;
            self.last_blob_dim = Some(blob.dim());
            self.last_requested = output_names.to_vec();
            Ok(self.outputs.clone())
        }
    }

    fn classes() -> ClassTable {
        ClassTable::new(vec![
            "person".to_string(),
            "baseball bat".to_string(),
            "cup".to_string(),
        ])
    }

    fn detector(outputs: Vec<Array2<f32>>) -> ObjectDetector<MockBackend> {
        let blob_params = BlobParams {
            input_size: 16,
            ..Default::default()
        };
        ObjectDetector::new(
            MockBackend::new(outputs),
            classes(),
            DetectorConfig::new("baseball bat"),
            blob_params,
            Annotator::default(),
        )
        .unwrap()
    }

    #[test]
    fn found_target_is_annotated_and_centered() {
        let outputs = vec![array![[0.5_f32, 0.5, 0.1, 0.1, 0.9, 0.0, 0.8, 0.1]]];
        let mut detector = detector(outputs);
        let original = RgbImage::new(100, 100);
        let result = detector.detect_image(original.clone()).unwrap();
        // Box (45, 45, 10, 10).
        assert_eq!(result.location, ObjectLocation::Found(Point::new(49, 49)));
        assert_ne!(result.image, original);
    }

    #[test]
    fn nothing_found_leaves_image_untouched() {
        let outputs = vec![
            array![[0.5_f32, 0.5, 0.1, 0.1, 0.9, 0.9, 0.05, 0.0]],
            Array2::<f32>::zeros((0, 8)),
        ];
        let mut detector = detector(outputs);
        let original = RgbImage::from_pixel(40, 30, image::Rgb([10, 20, 30]));
        let result = detector.detect_image(original.clone()).unwrap();
        assert_eq!(result.location, ObjectLocation::NotFound);
        assert_eq!(result.location.logged_point(), Point::new(-1, -1));
        assert_eq!(result.image, original);
    }

    #[test]
    fn overlapping_boxes_collapse_to_most_confident() {
        let outputs = vec![array![
            [0.5_f32, 0.5, 0.2, 0.2, 0.9, 0.0, 0.6, 0.0],
            [0.55_f32, 0.5, 0.2, 0.2, 0.9, 0.0, 0.9, 0.0],
            [0.1_f32, 0.1, 0.1, 0.1, 0.9, 0.0, 0.3, 0.0],
        ]];
        let mut detector = detector(outputs);
        let result = detector.detect_image(RgbImage::new(100, 100)).unwrap();
        // Second row: centre (55, 50), size 20 -> box (45, 40, 20, 20).
        assert_eq!(result.location, ObjectLocation::Found(Point::new(54, 49)));
    }

    #[test]
    fn equal_confidence_goes_to_first_row() {
        let outputs = vec![array![
            [0.2_f32, 0.2, 0.1, 0.1, 0.9, 0.0, 0.9, 0.0],
            [0.8_f32, 0.8, 0.1, 0.1, 0.9, 0.0, 0.9, 0.0],
        ]];
        let mut detector = detector(outputs);
        let result = detector.detect_image(RgbImage::new(100, 100)).unwrap();
        // Box (15, 15, 10, 10).
        assert_eq!(result.location, ObjectLocation::Found(Point::new(19, 19)));
    }

    #[test]
    fn output_names_are_resolved_once_and_reused() {
        let mut detector = detector(vec![]);
        for _ in 0..3 {
            detector.detect_image(RgbImage::new(8, 8)).unwrap();
        }
        assert_eq!(detector.backend.name_lookups.get(), 1);
        assert_eq!(detector.backend.forward_calls, 3);
        assert_eq!(
            detector.backend.last_requested,
            vec!["yolo_139".to_string(), "yolo_150".to_string()]
        );
        assert_eq!(detector.backend.last_blob_dim, Some((1, 3, 16, 16)));
    }

    #[test]
    fn mismatched_class_table_is_configuration_error() {
        let outputs = vec![array![[0.5_f32, 0.5, 0.1, 0.1, 0.9, 0.0, 0.0, 0.0, 0.7]]];
        let mut detector = detector(outputs);
        let err = detector.detect_image(RgbImage::new(10, 10)).unwrap_err();
        assert!(matches!(
            err,
            DetectorError::Configuration(ConfigurationError::ClassIdOutOfRange { class_id: 3, .. })
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn empty_class_table_is_refused() {
        let result = ObjectDetector::new(
            MockBackend::new(vec![]),
            ClassTable::default(),
            DetectorConfig::new("baseball bat"),
            BlobParams::default(),
            Annotator::new(None),
        );
        assert!(matches!(result, Err(ConfigurationError::EmptyClassTable)));
    }

    #[test]
    fn missing_image_is_input_error() {
        let mut detector = detector(vec![]);
        let err = detector
            .detect(Path::new("./does/not/exist.png"))
            .unwrap_err();
        assert!(matches!(err, DetectorError::Input(InputError::Missing { .. })));
        assert!(!err.is_fatal());
        assert_eq!(detector.backend.forward_calls, 0);
    }

    #[test]
    fn detect_reads_image_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bat.png");
        RgbImage::new(200, 100).save(&path).unwrap();
        let outputs = vec![array![[0.25_f32, 0.5, 0.1, 0.2, 0.9, 0.0, 0.5, 0.0]]];
        let mut detector = detector(outputs);
        let result = detector.detect(&path).unwrap();
        // Centre (50, 50), size (20, 20) -> box (40, 40, 20, 20).
        assert_eq!(result.location, ObjectLocation::Found(Point::new(49, 49)));
        assert_eq!(result.image.dimensions(), (200, 100));
    }
}
