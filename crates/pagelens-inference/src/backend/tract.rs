//! Tract backend for WASM builds.

use ndarray::ArrayD;
use tract_onnx::prelude::*;
use tracing::debug;

use crate::error::InferenceError;
use crate::tensor::{InputTensor, OutputTensor};
use crate::{InferenceBackend, Result};

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Backend using Tract for pure-Rust ONNX inference.
pub struct TractBackend {
    model: Plan,
    input_names: Vec<String>,
}

impl TractBackend {
    fn convert_input(tensor: &InputTensor) -> Result<TValue> {
        match tensor {
            InputTensor::Float32(arr) => {
                let shape: TVec<usize> = arr.shape().iter().cloned().collect();
                let data: Vec<f32> = arr.iter().cloned().collect();
                tract_ndarray::ArrayD::from_shape_vec(tract_ndarray::IxDyn(shape.as_slice()), data)
                    .map(|t| t.into_tvalue())
                    .map_err(|e| InferenceError::InvalidInput(e.to_string()))
            }
        }
    }
}

impl InferenceBackend for TractBackend {
    fn from_bytes(bytes: &[u8], input_shape: &[usize]) -> Result<Self> {
        debug!(
            "Loading ONNX model with Tract from {} bytes, input shape {:?}",
            bytes.len(),
            input_shape
        );

        let mut model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(bytes))
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to load model: {}", e)))?;

        // Pin the dynamic width/height so the graph can be typed and optimized.
        model
            .set_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), input_shape))
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to set input shape: {}", e)))?;

        let model = model
            .into_typed()
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to type model: {}", e)))?
            .into_optimized()
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to optimize: {}", e)))?
            .into_runnable()
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?;

        Ok(Self {
            model,
            input_names: vec!["x".to_string()],
        })
    }

    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Vec<(String, OutputTensor)>> {
        let tract_inputs: TVec<TValue> = inputs
            .iter()
            .map(|(_, tensor)| Self::convert_input(tensor))
            .collect::<Result<TVec<_>>>()?;

        let outputs = self
            .model
            .run(tract_inputs)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        outputs
            .iter()
            .enumerate()
            .map(|(idx, output)| -> Result<(String, OutputTensor)> {
                let name = format!("output_{}", idx);
                let view = output.to_array_view::<f32>().map_err(|_| {
                    InferenceError::OutputExtraction(format!("output '{}' is not float32", name))
                })?;
                // tract links its own ndarray; copy across.
                let arr = ArrayD::from_shape_vec(ndarray::IxDyn(view.shape()), view.iter().copied().collect())
                    .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?;
                Ok((name, OutputTensor::Float32(arr)))
            })
            .collect()
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }
}
