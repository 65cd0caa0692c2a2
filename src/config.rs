//! Engine configuration.
//!
//! Loaded from JSON; every field except the artifact paths has a default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{TpuError, TpuResult};

/// Where the trained artifacts live and, optionally, how to reach hardware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding `fc1_weight.npy`, `fc2_weight.npy` and `scales.json`.
    pub weights_dir: PathBuf,
    /// Safetensors artifact carrying the float biases.
    pub model_path: PathBuf,
    /// Accelerator link. `None` runs every tile in software.
    #[serde(default)]
    pub hardware: Option<HardwareConfig>,
}

/// Parameters for opening the accelerator link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareConfig {
    /// Device address, e.g. `/dev/ttyUSB1` or `COM3`.
    pub address: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Upper bound on one tile round trip.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_reset_on_connect")]
    pub reset_on_connect: bool,
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_timeout_ms() -> u64 {
    1_000
}

fn default_reset_on_connect() -> bool {
    true
}

impl HardwareConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            reset_on_connect: default_reset_on_connect(),
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

impl EngineConfig {
    /// Software-only configuration.
    pub fn new(weights_dir: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            weights_dir: weights_dir.into(),
            model_path: model_path.into(),
            hardware: None,
        }
    }

    pub fn with_hardware(mut self, hardware: HardwareConfig) -> Self {
        self.hardware = Some(hardware);
        self
    }

    /// Read and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> TpuResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| TpuError::io(path, e))?;
        let config: EngineConfig = serde_json::from_str(&text)
            .map_err(|source| TpuError::Json { path: path.to_path_buf(), source })?;
        config.validate(path)?;
        Ok(config)
    }

    /// Check field values. `origin` names the config in error messages.
    pub fn validate(&self, origin: &Path) -> TpuResult<()> {
        if let Some(hw) = &self.hardware {
            if hw.address.trim().is_empty() {
                return Err(TpuError::configuration(origin, "hardware.address must not be empty"));
            }
            if hw.baud_rate == 0 {
                return Err(TpuError::configuration(origin, "hardware.baud_rate must be positive"));
            }
            if hw.timeout_ms == 0 {
                return Err(TpuError::configuration(origin, "hardware.timeout_ms must be positive"));
            }
        }
        Ok(())
    }
}
