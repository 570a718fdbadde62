//! ONNX Runtime (ort) backend for native platforms with XNNPACK.

use std::sync::Mutex;

use ndarray::ArrayD;
use ort::ep::XNNPACK;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use tracing::debug;

use crate::error::InferenceError;
use crate::tensor::{InputTensor, OutputTensor};
use crate::{InferenceBackend, Result};

/// Backend using ONNX Runtime for native inference.
pub struct OrtBackend {
    session: Mutex<Session>,
    input_names: Vec<String>,
}

impl OrtBackend {
    fn convert_input(tensor: &InputTensor) -> Result<ort::session::SessionInputValue<'static>> {
        match tensor {
            InputTensor::Float32(arr) => {
                let shape: Vec<i64> = arr.shape().iter().map(|&s| s as i64).collect();
                let data: Vec<f32> = arr.iter().cloned().collect();
                Tensor::from_array((shape, data))
                    .map(Into::into)
                    .map_err(|e| InferenceError::InvalidInput(e.to_string()))
            }
        }
    }
}

impl InferenceBackend for OrtBackend {
    fn from_bytes(bytes: &[u8], _input_shape: &[usize]) -> Result<Self> {
        debug!("Loading ONNX model from {} bytes", bytes.len());

        let session = Session::builder()
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .with_execution_providers([XNNPACK::default().build()])
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .with_intra_threads(1)
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .commit_from_memory(bytes)
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|i| i.name().to_string())
            .collect();

        debug!("Model inputs: {:?}", input_names);

        Ok(Self {
            session: Mutex::new(session),
            input_names,
        })
    }

    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Vec<(String, OutputTensor)>> {
        let ort_inputs: Vec<(&str, ort::session::SessionInputValue<'static>)> = inputs
            .iter()
            .map(|(name, tensor)| Ok((*name, Self::convert_input(tensor)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| InferenceError::InferenceFailed(format!("Failed to lock session: {}", e)))?;

        let outputs = session
            .run(ort_inputs)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        outputs
            .iter()
            .map(|(name, value)| -> Result<(String, OutputTensor)> {
                let (dims, scores) = value.try_extract_tensor::<f32>().map_err(|_| {
                    InferenceError::OutputExtraction(format!("output '{}' is not float32", name))
                })?;
                let dims: Vec<usize> = dims.iter().map(|&d| d as usize).collect();
                let arr = ArrayD::from_shape_vec(ndarray::IxDyn(&dims), scores.to_vec())
                    .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?;
                Ok((name.to_string(), OutputTensor::Float32(arr)))
            })
            .collect()
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }
}
