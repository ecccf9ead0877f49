use crate::error::DetectorError;
use ndarray::{Array2, Array4};

/// Defines what the detector needs from a loaded network.
///
/// The input is a single NCHW blob of shape (1, 3, size, size). `forward` returns one table per
/// requested output layer, in the requested order, where every row is one predicted box.
///
/// `forward` takes `&mut self` because inference engines are not guaranteed to support
/// concurrent runs on one handle; whoever holds the backend runs it alone.
pub trait InferenceBackend {
    /// Names of the layers that produce detections.
    fn output_layer_names(&self) -> Vec<String>;

    fn forward(
        &mut self,
        blob: Array4<f32>,
        output_names: &[String],
    ) -> Result<Vec<Array2<f32>>, DetectorError>;
}
