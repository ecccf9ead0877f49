use crate::error::{ConfigurationError, DetectorError};
use crate::object_detection::object_detection_model::InferenceBackend;
use ndarray::{Array2, Array4};
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use tracing::{debug, info};

/// An onnxruntime inference session.
///
/// Wraps the ONNX export of a detection network. The export carries both architecture and
/// weights, so a single file is enough to load it. Every graph output is treated as a
/// detection layer.
pub struct OrtInferenceSession {
    session: Session,
    input_name: String,
    output_names: Vec<String>,
}

impl OrtInferenceSession {
    pub fn new(model_path: &Path) -> Result<Self, ConfigurationError> {
        info!("Loading model from {:?}", model_path);
        let session = Session::builder()
            .and_then(|builder| builder.commit_from_file(model_path))
            .map_err(|source| ConfigurationError::ModelLoad {
                path: model_path.to_path_buf(),
                source,
            })?;
        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| ConfigurationError::ModelHasNoInput {
                path: model_path.to_path_buf(),
            })?;
        let output_names: Vec<String> = session
            .outputs
            .iter()
            .map(|output| output.name.clone())
            .collect();
        debug!("Model input: {}, outputs: {:?}", input_name, output_names);
        Ok(Self {
            session,
            input_name,
            output_names,
        })
    }
}

impl InferenceBackend for OrtInferenceSession {
    fn output_layer_names(&self) -> Vec<String> {
        self.output_names.clone()
    }

    fn forward(
        &mut self,
        blob: Array4<f32>,
        output_names: &[String],
    ) -> Result<Vec<Array2<f32>>, DetectorError> {
        let input = Tensor::from_array(blob)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input])?;
        let mut tables: Vec<Array2<f32>> = Vec::with_capacity(output_names.len());
        for name in output_names {
            let value = outputs
                .get(name.as_str())
                .ok_or_else(|| ConfigurationError::MissingOutput { name: name.clone() })?;
            let (shape, data) = value.try_extract_tensor::<f32>()?;
            tables.push(into_rows(name, shape, data)?);
        }
        Ok(tables)
    }
}

/// Flattens every leading dimension of an output tensor into rows, keeping the last dimension
/// as the per box values. Detection heads are exported as (rows, values) or
/// (batch, rows, values) depending on the converter.
fn into_rows(name: &str, shape: &[i64], data: &[f32]) -> Result<Array2<f32>, ConfigurationError> {
    let shape_error = || ConfigurationError::OutputShape {
        name: name.to_string(),
        shape: shape.to_vec(),
    };
    let (&columns, leading) = shape.split_last().ok_or_else(shape_error)?;
    if columns <= 0 || leading.iter().any(|&dim| dim < 0) {
        return Err(shape_error());
    }
    let columns = columns as usize;
    let rows = leading.iter().product::<i64>() as usize;
    Array2::from_shape_vec((rows, columns), data.to_vec()).map_err(|_| shape_error())
}
