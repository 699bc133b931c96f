//! Forward-inference handle
//!
//! A loaded network is anything that maps an NCHW input blob to an output
//! tensor. The OpenVINO implementation lives here; tests substitute scripted
//! networks through the same trait.

use anyhow::{Context, Result};
use ndarray::{Array4, ArrayD, IxDyn};
use openvino::{CompiledModel, ElementType, Shape, Tensor};
use parking_lot::Mutex;

/// A loaded network ready for forward passes.
pub trait Network: Send + Sync {
    fn forward(&self, input: &Array4<f32>) -> Result<ArrayD<f32>>;
}

/// OpenVINO compiled model.
///
/// The Rust bindings need `&mut CompiledModel` to create an inference
/// request, so forward passes on one model are serialized by the mutex.
pub struct OpenVinoNetwork {
    name: &'static str,
    compiled: Mutex<CompiledModel>,
}

// The compiled model is only ever touched while holding the mutex.
unsafe impl Send for OpenVinoNetwork {}
unsafe impl Sync for OpenVinoNetwork {}

impl OpenVinoNetwork {
    pub fn new(name: &'static str, compiled: CompiledModel) -> Self {
        Self {
            name,
            compiled: Mutex::new(compiled),
        }
    }
}

impl Network for OpenVinoNetwork {
    fn forward(&self, input: &Array4<f32>) -> Result<ArrayD<f32>> {
        let dims: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let input_shape = Shape::new(&dims)?;
        let mut tensor = Tensor::new(ElementType::F32, &input_shape)?;

        let input_data = input
            .as_slice()
            .context("input blob is not contiguous")?;
        let raw = tensor.get_raw_data_mut()?;
        for (dst, value) in raw.chunks_exact_mut(4).zip(input_data) {
            dst.copy_from_slice(&value.to_ne_bytes());
        }

        let mut request = self
            .compiled
            .lock()
            .create_infer_request()
            .with_context(|| format!("failed to create {} infer request", self.name))?;

        request.set_input_tensor(&tensor)?;
        request.infer()?;

        let output = request.get_output_tensor()?;
        let output_shape: Vec<usize> = output
            .get_shape()?
            .get_dimensions()
            .iter()
            .map(|&d| d as usize)
            .collect();

        let values: Vec<f32> = output
            .get_raw_data()?
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        tracing::debug!("{} output shape {:?}", self.name, output_shape);

        ArrayD::from_shape_vec(IxDyn(&output_shape), values)
            .with_context(|| format!("{} output does not match its shape", self.name))
    }
}
