use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use ndarray::{ArrayD, ArrayView2};
use ndarray_npy::{write_npy, ReadNpyError, ReadNpyExt, ReadableElement};
use safetensors::{Dtype, SafeTensors};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::codec::export_packed;
use crate::arc::mlp::{HIDDEN_SHAPE, OUTPUT_SHAPE};
use crate::arc::quantization::quantize_weights;
use crate::error::{TpuError, TpuResult};
use crate::tensor::MatrixI4;

/// Hidden layer weight file inside the weights directory.
pub const FC1_WEIGHT_FILE: &str = "fc1_weight.npy";
/// Output layer weight file inside the weights directory.
pub const FC2_WEIGHT_FILE: &str = "fc2_weight.npy";
/// Scale record inside the weights directory.
pub const SCALES_FILE: &str = "scales.json";

/// Key prefix left behind by data-parallel training wrappers.
const MODULE_PREFIX: &str = "module.";

/// The learned per-layer scale record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerScales {
    pub fc1_scale: f32,
    pub fc2_scale: f32,
}

/// Int4 weights and scales for both layers.
#[derive(Debug, Clone)]
pub struct QuantizedWeights {
    pub fc1_weight: MatrixI4,
    pub fc2_weight: MatrixI4,
    pub scales: LayerScales,
}

impl QuantizedWeights {
    /// Quantize trained float weights (row-major, out x in) by their learned scales.
    pub fn from_float(fc1: &[f32], fc2: &[f32], scales: LayerScales) -> TpuResult<Self> {
        check_scale("fc1", scales.fc1_scale)?;
        check_scale("fc2", scales.fc2_scale)?;
        let fc1_weight = MatrixI4::new(
            "fc1.weight",
            HIDDEN_SHAPE[0],
            HIDDEN_SHAPE[1],
            quantize_weights(fc1, scales.fc1_scale)?,
        )?;
        let fc2_weight = MatrixI4::new(
            "fc2.weight",
            OUTPUT_SHAPE[0],
            OUTPUT_SHAPE[1],
            quantize_weights(fc2, scales.fc2_scale)?,
        )?;
        Ok(QuantizedWeights { fc1_weight, fc2_weight, scales })
    }
}

/// Everything one quantized layer needs.
#[derive(Debug, Clone)]
pub struct LayerParams {
    pub weight: MatrixI4,
    pub bias: Vec<f32>,
    pub scale: f32,
}

impl LayerParams {
    pub fn new(name: &str, weight: MatrixI4, bias: Vec<f32>, scale: f32) -> TpuResult<Self> {
        if bias.len() != weight.rows() {
            return Err(TpuError::shape(format!("{}.bias", name), vec![weight.rows()], vec![bias.len()]));
        }
        check_scale(name, scale)?;
        Ok(LayerParams { weight, bias, scale })
    }
}

/// Both layers of the fixed topology.
#[derive(Debug, Clone)]
pub struct QuantizedModel {
    pub hidden: LayerParams,
    pub output: LayerParams,
}

impl QuantizedModel {
    /// Assemble the model, checking the fixed layer shapes.
    pub fn new(hidden: LayerParams, output: LayerParams) -> TpuResult<Self> {
        check_shape("fc1.weight", &hidden.weight, HIDDEN_SHAPE)?;
        check_shape("fc2.weight", &output.weight, OUTPUT_SHAPE)?;
        Ok(QuantizedModel { hidden, output })
    }

    /// Combine loaded weights with biases from the model artifact.
    pub fn from_parts(weights: QuantizedWeights, fc1_bias: Vec<f32>, fc2_bias: Vec<f32>) -> TpuResult<Self> {
        let hidden = LayerParams::new("fc1", weights.fc1_weight, fc1_bias, weights.scales.fc1_scale)?;
        let output = LayerParams::new("fc2", weights.fc2_weight, fc2_bias, weights.scales.fc2_scale)?;
        Self::new(hidden, output)
    }
}

fn check_shape(name: &str, m: &MatrixI4, expected: [usize; 2]) -> TpuResult<()> {
    if m.shape() != expected {
        return Err(TpuError::shape(name, expected.to_vec(), m.shape().to_vec()));
    }
    Ok(())
}

fn check_scale(name: &str, scale: f32) -> TpuResult<()> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(TpuError::configuration(
            SCALES_FILE,
            format!("{} scale must be positive and finite, got {}", name, scale),
        ));
    }
    Ok(())
}

fn require_file(path: &Path) -> TpuResult<()> {
    if !path.is_file() {
        return Err(TpuError::configuration(path, "file not found"));
    }
    Ok(())
}

/// Decoded integer array as `(shape, values)`.
type IntArray = (Vec<usize>, Vec<i64>);

/// Read `path` as an array of `T`. `Ok(None)` means the file holds another dtype.
fn try_read_npy<T>(path: &Path) -> TpuResult<Option<IntArray>>
where
    T: ReadableElement + Copy + Into<i64>,
{
    let file = File::open(path).map_err(|e| TpuError::io(path, e))?;
    match ArrayD::<T>::read_npy(BufReader::new(file)) {
        Ok(arr) => {
            let shape = arr.shape().to_vec();
            let values = arr.iter().map(|&v| v.into()).collect();
            Ok(Some((shape, values)))
        }
        Err(ReadNpyError::WrongDescriptor(_)) => Ok(None),
        Err(e) => Err(TpuError::Npy { path: path.to_path_buf(), message: e.to_string() }),
    }
}

/// Read an integer NPY array of any signed width.
///
/// Only a dtype mismatch moves on to the next width; a damaged file reports
/// its own decoding error.
fn read_int_npy(path: &Path) -> TpuResult<IntArray> {
    require_file(path)?;
    let readers: [fn(&Path) -> TpuResult<Option<IntArray>>; 4] =
        [try_read_npy::<i8>, try_read_npy::<i16>, try_read_npy::<i32>, try_read_npy::<i64>];
    for read in readers {
        if let Some(found) = read(path)? {
            return Ok(found);
        }
    }
    Err(TpuError::Npy {
        path: path.to_path_buf(),
        message: "expected a signed integer array (i1, i2, i4 or i8)".to_string(),
    })
}

/// Load one int4 weight matrix and validate its fixed shape and range.
pub fn load_weight_matrix(path: &Path, name: &str, expected: [usize; 2]) -> TpuResult<MatrixI4> {
    let (shape, values) = read_int_npy(path)?;
    if shape != expected {
        return Err(TpuError::shape(name, expected.to_vec(), shape));
    }
    MatrixI4::from_i64(name, expected[0], expected[1], &values)
}

/// Read the per-layer scale record.
pub fn load_scales(path: &Path) -> TpuResult<LayerScales> {
    require_file(path)?;
    let text = fs::read_to_string(path).map_err(|e| TpuError::io(path, e))?;
    let scales: LayerScales = serde_json::from_str(&text)
        .map_err(|source| TpuError::Json { path: path.to_path_buf(), source })?;
    check_scale("fc1", scales.fc1_scale)?;
    check_scale("fc2", scales.fc2_scale)?;
    Ok(scales)
}

/// Write the per-layer scale record as `scales.json` under `dir`.
pub fn save_scales(dir: &Path, scales: &LayerScales) -> TpuResult<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| TpuError::io(dir, e))?;
    let path = dir.join(SCALES_FILE);
    let text = serde_json::to_string_pretty(scales)
        .map_err(|source| TpuError::Json { path: path.clone(), source })?;
    fs::write(&path, text).map_err(|e| TpuError::io(&path, e))?;
    Ok(path)
}

/// Load both int4 weight matrices and their scales from `dir`.
pub fn load_weights(dir: impl AsRef<Path>) -> TpuResult<QuantizedWeights> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(TpuError::configuration(dir, "weights directory not found"));
    }

    let fc1_weight = load_weight_matrix(&dir.join(FC1_WEIGHT_FILE), "fc1.weight", HIDDEN_SHAPE)?;
    let fc2_weight = load_weight_matrix(&dir.join(FC2_WEIGHT_FILE), "fc2.weight", OUTPUT_SHAPE)?;
    let scales = load_scales(&dir.join(SCALES_FILE))?;

    info!(shape = %fc1_weight, min = fc1_weight.min(), max = fc1_weight.max(), scale = scales.fc1_scale, "loaded fc1 weights");
    info!(shape = %fc2_weight, min = fc2_weight.min(), max = fc2_weight.max(), scale = scales.fc2_scale, "loaded fc2 weights");

    Ok(QuantizedWeights { fc1_weight, fc2_weight, scales })
}

fn save_weight_matrix(path: &Path, matrix: &MatrixI4) -> TpuResult<()> {
    let npy_error = |message: String| TpuError::Npy { path: path.to_path_buf(), message };
    let view = ArrayView2::from_shape((matrix.rows(), matrix.cols()), matrix.as_slice())
        .map_err(|e| npy_error(e.to_string()))?;
    write_npy(path, &view).map_err(|e| npy_error(e.to_string()))
}

/// Write the full weight artifact set under `dir`: both int4 NPY matrices,
/// `scales.json` and the packed blobs. Returns every path written.
pub fn export_weights(weights: &QuantizedWeights, dir: impl AsRef<Path>) -> TpuResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| TpuError::io(dir, e))?;

    let mut written = Vec::with_capacity(5);
    for (file, matrix) in [(FC1_WEIGHT_FILE, &weights.fc1_weight), (FC2_WEIGHT_FILE, &weights.fc2_weight)] {
        let path = dir.join(file);
        save_weight_matrix(&path, matrix)?;
        written.push(path);
    }
    written.push(save_scales(dir, &weights.scales)?);
    written.extend(export_packed(weights, dir)?);

    info!(dir = %dir.display(), files = written.len(), "exported weight artifacts");
    Ok(written)
}

fn bias_tensor(tensors: &SafeTensors<'_>, path: &Path, key: &str, len: usize) -> TpuResult<Vec<f32>> {
    let prefixed = format!("{}{}", MODULE_PREFIX, key);
    let view = match tensors.tensor(key).or_else(|_| tensors.tensor(&prefixed)) {
        Ok(view) => view,
        Err(_) => {
            let mut available: Vec<String> = tensors.names().into_iter().cloned().collect();
            available.sort();
            return Err(TpuError::KeyNotFound { key: key.to_string(), available });
        }
    };

    if view.dtype() != Dtype::F32 {
        return Err(TpuError::SafeTensors {
            path: path.to_path_buf(),
            message: format!("`{}` has dtype {:?}, expected F32", key, view.dtype()),
        });
    }
    if view.shape() != [len].as_slice() {
        return Err(TpuError::shape(key, vec![len], view.shape().to_vec()));
    }

    Ok(view
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Load the float biases `(fc1, fc2)` from a safetensors model artifact.
pub fn load_bias(model_path: impl AsRef<Path>) -> TpuResult<(Vec<f32>, Vec<f32>)> {
    let path = model_path.as_ref();
    require_file(path)?;
    let bytes = fs::read(path).map_err(|e| TpuError::io(path, e))?;
    let tensors = SafeTensors::deserialize(&bytes).map_err(|e| TpuError::SafeTensors {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let fc1 = bias_tensor(&tensors, path, "fc1.bias", HIDDEN_SHAPE[0])?;
    let fc2 = bias_tensor(&tensors, path, "fc2.bias", OUTPUT_SHAPE[0])?;
    Ok((fc1, fc2))
}

/// Load weights, scales and biases into a ready-to-run model.
pub fn load_model(weights_dir: impl AsRef<Path>, model_path: impl AsRef<Path>) -> TpuResult<QuantizedModel> {
    let weights = load_weights(weights_dir)?;
    let (fc1_bias, fc2_bias) = load_bias(model_path)?;
    QuantizedModel::from_parts(weights, fc1_bias, fc2_bias)
}
