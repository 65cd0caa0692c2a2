use tracing::debug;

use super::{BackendMode, TileBackend};
use crate::config::HardwareConfig;
use crate::error::{LinkError, TpuResult};
use crate::tiling::Tile;

/// One "execute 2x2 tile" request as the accelerator receives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRequest {
    /// Weights flattened row-major: `[w00, w01, w10, w11]`.
    pub weights: [i8; 4],
    pub inputs: [i8; 2],
    /// Ask for the quantized (int32 accumulator) result.
    pub quantize: bool,
    /// Ask the PE array to apply its ReLU.
    pub relu: bool,
}

impl TileRequest {
    /// Raw accumulator request: quantized, no on-chip activation.
    pub fn raw(tile: &Tile) -> Self {
        TileRequest {
            weights: tile.flat_weights(),
            inputs: tile.input,
            quantize: true,
            relu: false,
        }
    }
}

/// A blocking request/response channel to the accelerator.
///
/// Byte framing and the reset handshake belong to the implementor. A response
/// with fewer than two values means the read timed out or was corrupted.
pub trait TileLink: Send {
    /// Put the chip into a known state.
    fn reset(&mut self) -> Result<(), LinkError>;

    /// Run one tile and return the raw result values.
    fn execute_tile(&mut self, request: &TileRequest) -> Result<Vec<i32>, LinkError>;

    /// Release the underlying device. Called at most once.
    fn close(&mut self);
}

/// Opens a [`TileLink`] for a hardware config.
pub trait LinkOpener {
    fn open(&self, config: &HardwareConfig) -> Result<Box<dyn TileLink>, LinkError>;
}

impl<F> LinkOpener for F
where
    F: Fn(&HardwareConfig) -> Result<Box<dyn TileLink>, LinkError>,
{
    fn open(&self, config: &HardwareConfig) -> Result<Box<dyn TileLink>, LinkError> {
        self(config)
    }
}

/// Sends every tile over an exclusively owned link.
pub struct HardwareBackend {
    address: String,
    link: Option<Box<dyn TileLink>>,
}

impl HardwareBackend {
    pub fn new(address: impl Into<String>, link: Box<dyn TileLink>) -> Self {
        HardwareBackend { address: address.into(), link: Some(link) }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    pub fn reset(&mut self) -> Result<(), LinkError> {
        self.link.as_mut().ok_or(LinkError::Closed)?.reset()
    }

    /// Close the link. Later calls are no-ops.
    pub fn close(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
            debug!(address = %self.address, "accelerator link closed");
        }
    }
}

impl TileBackend for HardwareBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Hardware
    }

    fn execute(&mut self, tile: &Tile) -> TpuResult<[i32; 2]> {
        let link = self.link.as_mut().ok_or(LinkError::Closed)?;
        let results = link.execute_tile(&TileRequest::raw(tile))?;
        if results.len() < 2 {
            return Err(LinkError::ShortRead { expected: 2, got: results.len() }.into());
        }
        Ok([results[0], results[1]])
    }
}

impl Drop for HardwareBackend {
    fn drop(&mut self) {
        self.close();
    }
}
