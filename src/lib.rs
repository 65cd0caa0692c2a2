//! Bit-exact int4 inference for a micro TPU built from 2x2 multiply-accumulate tiles.
//!
//! This crate reproduces the accelerator's arithmetic (int4 operands, 32-bit
//! accumulation, round/clamp requantization) for a fixed 196 -> 16 -> 10
//! fully-connected network, and runs each 2x2 tile either on the host or on
//! the accelerator over a link, falling back to the host once at construction
//! if the accelerator is unreachable.
//!
//! # Example
//!
//! ```no_run
//! use microtpu::config::EngineConfig;
//! use microtpu::network::InferenceEngine;
//! use microtpu::backend::TileLink;
//! use microtpu::config::HardwareConfig;
//! use microtpu::error::LinkError;
//!
//! let no_link = |cfg: &HardwareConfig| -> Result<Box<dyn TileLink>, LinkError> {
//!     Err(LinkError::Unreachable { address: cfg.address.clone(), reason: "no driver".into() })
//! };
//! let config = EngineConfig::new("weights", "weights/model.safetensors");
//! let mut engine = InferenceEngine::from_config(&config, &no_link).unwrap();
//! let image = [0.0f32; 196];
//! let prediction = engine.predict(&image).unwrap();
//! println!("digit {}", prediction.class);
//! ```

mod arc;

/// Int4 weight matrix and packed nibble blob.
pub mod tensor;
/// int4 clamp/round primitives and the leaky requantize activation.
pub use arc::quantization;
/// The fixed 196 -> 16 -> 10 topology.
pub use arc::mlp;
/// 2x2 tiled integer matrix-vector product.
pub mod tiling;
/// Software and hardware tile backends, and the one-shot dispatcher.
pub mod backend;
/// Quantized layers and the inference engine.
pub mod network;
/// Weight, scale and bias loading; nibble packing.
pub mod loader;
/// Accuracy and verification reports.
pub mod metrics;
/// Engine configuration.
pub mod config;
/// Error types.
pub mod error;

pub use backend::{BackendMode, BackendState};
pub use error::{LinkError, TpuError, TpuResult};
pub use network::{InferenceEngine, Prediction};
