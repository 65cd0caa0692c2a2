/// INT4 quantized fully-connected layer.
mod layers_i4;

pub use layers_i4::*;

use tracing::debug;

use crate::arc::mlp::{mlp, INPUT_FEATURES};
use crate::arc::quantization::quantize4;
use crate::backend::{BackendDispatcher, BackendMode, BackendState, LinkOpener, TileBackend};
use crate::config::{EngineConfig, HardwareConfig};
use crate::error::{TpuError, TpuResult};
use crate::loader::{load_model, QuantizedModel};
use crate::metrics::{argmax, Evaluation, Verification};

/// Pixel intensities in [0, 1] are spread over the int4 domain as `x * 15 - 8`.
const PIXEL_GAIN: f32 = 15.0;
const PIXEL_OFFSET: f32 = 8.0;

/// Result of classifying one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Predicted digit, the index of the largest logit.
    pub class: usize,
    pub logits: Vec<f32>,
}

/// The two-layer int4 network bound to a tile backend.
///
/// Each engine owns its backend (and so its accelerator link). Inference
/// methods take `&mut self`, so at most one inference is in flight per engine.
/// Dropping the engine closes the link.
pub struct InferenceEngine {
    hidden: QuantizedLinear,
    output: QuantizedLinear,
    backend: BackendDispatcher,
}

impl InferenceEngine {
    /// Engine that runs every tile in software.
    pub fn new(model: QuantizedModel) -> Self {
        Self::with_backend(model, BackendDispatcher::software())
    }

    /// Engine that tries the accelerator and falls back to software.
    pub fn with_hardware(model: QuantizedModel, hardware: &HardwareConfig, opener: &dyn LinkOpener) -> Self {
        Self::with_backend(model, BackendDispatcher::connect(Some(hardware), opener))
    }

    /// Load the artifacts named in `config` and connect as configured.
    pub fn from_config(config: &EngineConfig, opener: &dyn LinkOpener) -> TpuResult<Self> {
        let model = load_model(&config.weights_dir, &config.model_path)?;
        let backend = BackendDispatcher::connect(config.hardware.as_ref(), opener);
        Ok(Self::with_backend(model, backend))
    }

    fn with_backend(model: QuantizedModel, backend: BackendDispatcher) -> Self {
        let (hidden, output) = mlp(model);
        InferenceEngine { hidden, output, backend }
    }

    pub fn mode(&self) -> BackendMode {
        self.backend.mode()
    }

    pub fn state(&self) -> BackendState {
        self.backend.state()
    }

    pub fn hidden_layer(&self) -> &QuantizedLinear {
        &self.hidden
    }

    pub fn output_layer(&self) -> &QuantizedLinear {
        &self.output
    }

    /// Flatten, map `x -> x * 15 - 8` and quantize to int4.
    pub fn preprocess(image: &[f32]) -> TpuResult<Vec<f32>> {
        if image.len() != INPUT_FEATURES {
            return Err(TpuError::shape("image", vec![INPUT_FEATURES], vec![image.len()]));
        }
        Ok(image
            .iter()
            .map(|&x| quantize4(x * PIXEL_GAIN - PIXEL_OFFSET) as f32)
            .collect())
    }

    /// Logits for one image through the tiled integer path.
    pub fn forward(&mut self, image: &[f32]) -> TpuResult<Vec<f32>> {
        let x = Self::preprocess(image)?;
        debug!(mode = %self.mode(), "forward pass");
        let h = self.hidden.forward(&mut self.backend, &x)?;
        self.output.forward(&mut self.backend, &h)
    }

    /// Logits for one image through the float reference path.
    pub fn forward_reference(&self, image: &[f32]) -> TpuResult<Vec<f32>> {
        let x = Self::preprocess(image)?;
        let h = self.hidden.forward_reference(&x)?;
        self.output.forward_reference(&h)
    }

    pub fn predict(&mut self, image: &[f32]) -> TpuResult<Prediction> {
        let logits = self.forward(image)?;
        Ok(Prediction { class: argmax(&logits), logits })
    }

    /// Score the first `max_samples` aligned samples.
    ///
    /// Stops at the first failing sample instead of reporting a partial accuracy.
    pub fn evaluate<I, L>(&mut self, images: &[I], labels: &[L], max_samples: Option<usize>) -> TpuResult<Evaluation>
    where
        I: AsRef<[f32]>,
        L: Copy + Into<usize>,
    {
        let total = max_samples
            .unwrap_or(labels.len())
            .min(labels.len())
            .min(images.len());

        let mut correct = 0;
        for (image, &label) in images.iter().zip(labels).take(total) {
            let label: usize = label.into();
            if self.predict(image.as_ref())?.class == label {
                correct += 1;
            }
        }
        Ok(Evaluation::new(correct, total))
    }

    /// Compare the tiled path against the float reference on the first samples.
    pub fn verify<I>(&mut self, images: &[I], max_samples: Option<usize>) -> TpuResult<Verification>
    where
        I: AsRef<[f32]>,
    {
        let compared = max_samples.unwrap_or(images.len()).min(images.len());
        let mut prediction_matches = 0;
        let mut max_abs_diff = 0.0f32;

        for image in images.iter().take(compared) {
            let tiled = self.forward(image.as_ref())?;
            let reference = self.forward_reference(image.as_ref())?;
            for (a, b) in tiled.iter().zip(&reference) {
                max_abs_diff = max_abs_diff.max((a - b).abs());
            }
            if argmax(&tiled) == argmax(&reference) {
                prediction_matches += 1;
            }
        }
        Ok(Verification { compared, prediction_matches, max_abs_diff })
    }

    /// Release the backend, closing the accelerator link if one is open.
    pub fn shutdown(&mut self) {
        self.backend.shutdown();
    }
}
