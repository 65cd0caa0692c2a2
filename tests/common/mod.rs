#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use ndarray::Array2;
use safetensors::tensor::TensorView;
use safetensors::{serialize_to_file, Dtype};
use tracing_subscriber::EnvFilter;

use microtpu::backend::{TileLink, TileRequest};
use microtpu::config::HardwareConfig;
use microtpu::error::LinkError;
use microtpu::loader::{save_scales, LayerParams, LayerScales, QuantizedModel};
use microtpu::mlp::{HIDDEN_FEATURES, INPUT_FEATURES, OUTPUT_CLASSES};
use microtpu::tensor::MatrixI4;

/// Route library logs to the test harness; set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Deterministic int4 values spread over the whole domain.
pub fn int4_pattern(rows: usize, cols: usize, seed: usize) -> Vec<i8> {
    (0..rows * cols)
        .map(|i| (((i * 7 + seed * 13 + (i / cols.max(1)) * 3) % 16) as i8) - 8)
        .collect()
}

pub fn hidden_weights() -> MatrixI4 {
    MatrixI4::new("fc1.weight", HIDDEN_FEATURES, INPUT_FEATURES, int4_pattern(HIDDEN_FEATURES, INPUT_FEATURES, 1)).unwrap()
}

pub fn output_weights() -> MatrixI4 {
    MatrixI4::new("fc2.weight", OUTPUT_CLASSES, HIDDEN_FEATURES, int4_pattern(OUTPUT_CLASSES, HIDDEN_FEATURES, 5)).unwrap()
}

pub fn hidden_bias() -> Vec<f32> {
    (0..HIDDEN_FEATURES).map(|i| (i as f32 - 8.0) * 0.125).collect()
}

pub fn output_bias() -> Vec<f32> {
    (0..OUTPUT_CLASSES).map(|i| (i as f32) * 0.05 - 0.2).collect()
}

pub const FC1_SCALE: f32 = 0.0625;
pub const FC2_SCALE: f32 = 0.25;

pub fn test_model() -> QuantizedModel {
    let hidden = LayerParams::new("fc1", hidden_weights(), hidden_bias(), FC1_SCALE).unwrap();
    let output = LayerParams::new("fc2", output_weights(), output_bias(), FC2_SCALE).unwrap();
    QuantizedModel::new(hidden, output).unwrap()
}

/// A 14x14 image with intensities in [0, 1].
pub fn test_image(seed: usize) -> Vec<f32> {
    (0..INPUT_FEATURES)
        .map(|i| ((i * 31 + seed * 17) % 97) as f32 / 96.0)
        .collect()
}

pub fn test_images(n: usize) -> Vec<Vec<f32>> {
    (0..n).map(test_image).collect()
}

pub fn write_npy_i8(path: &Path, rows: usize, cols: usize, values: Vec<i8>) {
    let arr = Array2::from_shape_vec((rows, cols), values).unwrap();
    ndarray_npy::write_npy(path, &arr).unwrap();
}

pub fn write_npy_i64(path: &Path, rows: usize, cols: usize, values: Vec<i64>) {
    let arr = Array2::from_shape_vec((rows, cols), values).unwrap();
    ndarray_npy::write_npy(path, &arr).unwrap();
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Write a safetensors artifact holding the given f32 vectors.
pub fn write_bias_artifact(path: &Path, tensors: &[(&str, Vec<f32>)]) {
    let bytes: Vec<(String, Vec<u8>, usize)> = tensors
        .iter()
        .map(|(name, v)| (name.to_string(), f32_bytes(v), v.len()))
        .collect();
    let views: Vec<(String, TensorView<'_>)> = bytes
        .iter()
        .map(|(name, data, len)| (name.clone(), TensorView::new(Dtype::F32, vec![*len], data).unwrap()))
        .collect();
    serialize_to_file(views, &None, path).unwrap();
}

/// Write a complete artifact set for [`test_model`] into `dir`.
pub fn write_test_artifacts(dir: &Path) -> std::path::PathBuf {
    write_npy_i8(&dir.join("fc1_weight.npy"), HIDDEN_FEATURES, INPUT_FEATURES, hidden_weights().as_slice().to_vec());
    write_npy_i8(&dir.join("fc2_weight.npy"), OUTPUT_CLASSES, HIDDEN_FEATURES, output_weights().as_slice().to_vec());
    save_scales(dir, &LayerScales { fc1_scale: FC1_SCALE, fc2_scale: FC2_SCALE }).unwrap();
    let model_path = dir.join("model.safetensors");
    write_bias_artifact(&model_path, &[("fc1.bias", hidden_bias()), ("fc2.bias", output_bias())]);
    model_path
}

/// How a [`ScriptedLink`] answers tile requests.
#[derive(Debug, Clone, Copy)]
pub enum LinkScript {
    /// Compute the exact tile product.
    Exact,
    /// Answer exactly for `n` tiles, then return a single value.
    ShortAfter(usize),
    /// Fail the reset handshake.
    FailReset,
}

#[derive(Debug, Default)]
pub struct LinkLog {
    pub resets: usize,
    pub tiles: usize,
    pub closes: usize,
    pub requests: Vec<TileRequest>,
}

/// In-memory accelerator that records every call.
pub struct ScriptedLink {
    script: LinkScript,
    log: Arc<Mutex<LinkLog>>,
}

impl ScriptedLink {
    pub fn new(script: LinkScript) -> (Self, Arc<Mutex<LinkLog>>) {
        let log = Arc::new(Mutex::new(LinkLog::default()));
        (ScriptedLink { script, log: Arc::clone(&log) }, log)
    }
}

impl TileLink for ScriptedLink {
    fn reset(&mut self) -> Result<(), LinkError> {
        self.log.lock().unwrap().resets += 1;
        match self.script {
            LinkScript::FailReset => Err(LinkError::Timeout { timeout_ms: 10 }),
            _ => Ok(()),
        }
    }

    fn execute_tile(&mut self, request: &TileRequest) -> Result<Vec<i32>, LinkError> {
        let mut log = self.log.lock().unwrap();
        log.tiles += 1;
        log.requests.push(*request);
        let w: Vec<i32> = request.weights.iter().map(|&v| v as i32).collect();
        let x0 = request.inputs[0] as i32;
        let x1 = request.inputs[1] as i32;
        let exact = vec![w[0] * x0 + w[1] * x1, w[2] * x0 + w[3] * x1];
        match self.script {
            LinkScript::ShortAfter(n) if log.tiles > n => Ok(vec![exact[0]]),
            _ => Ok(exact),
        }
    }

    fn close(&mut self) {
        self.log.lock().unwrap().closes += 1;
    }
}

pub fn hardware_config() -> HardwareConfig {
    HardwareConfig::new("/dev/ttyUSB1").with_timeout_ms(50)
}
