//! Tensor types exchanged with a backend.

use ndarray::{ArrayD, IxDyn};

use crate::{InferenceError, Result};

/// Input tensor for inference.
///
/// Recognition models only consume normalized image batches, so this is
/// float-only.
#[derive(Debug, Clone)]
pub enum InputTensor {
    Float32(ArrayD<f32>),
}

impl InputTensor {
    /// Build a Float32 tensor from row-major data.
    pub fn from_f32(data: Vec<f32>, shape: &[usize]) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(InputTensor::Float32)
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))
    }

    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        match self {
            InputTensor::Float32(arr) => arr.shape(),
        }
    }
}

/// Output tensor from inference.
///
/// Recognition heads emit per-timestep class scores; backends reject any
/// other element type.
#[derive(Debug, Clone)]
pub enum OutputTensor {
    Float32(ArrayD<f32>),
}

impl OutputTensor {
    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        match self {
            OutputTensor::Float32(arr) => arr.shape(),
        }
    }

    pub fn into_f32(self) -> ArrayD<f32> {
        match self {
            OutputTensor::Float32(arr) => arr,
        }
    }
}
