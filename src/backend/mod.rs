//! Tile execution backends.
//!
//! A backend executes exactly one 2x2 tile. The tiled product and the layers
//! only see the [`TileBackend`] trait, so they are unaware of whether tiles run
//! in software or on the accelerator.

mod dispatcher;
mod hardware;
mod software;

pub use dispatcher::BackendDispatcher;
pub use hardware::{HardwareBackend, LinkOpener, TileLink, TileRequest};
pub use software::SoftwareBackend;

use std::fmt;

use crate::error::TpuResult;
use crate::tiling::Tile;

/// Where tiles are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Tiles computed on the host.
    Software,
    /// Tiles sent over the link to the accelerator.
    Hardware,
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendMode::Software => write!(f, "software"),
            BackendMode::Hardware => write!(f, "hardware"),
        }
    }
}

/// Lifecycle of an engine's backend handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    /// Construction has not finished selecting a backend.
    Uninitialized,
    /// Running every tile in software.
    Simulated,
    /// Link to the accelerator is open.
    Connected,
    /// Backend has been shut down.
    Disconnected,
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendState::Uninitialized => write!(f, "uninitialized"),
            BackendState::Simulated => write!(f, "simulated"),
            BackendState::Connected => write!(f, "connected"),
            BackendState::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Executes one 2x2 tile multiply.
pub trait TileBackend {
    fn mode(&self) -> BackendMode;

    /// Returns `[w00*x0 + w01*x1, w10*x0 + w11*x1]` for the tile.
    fn execute(&mut self, tile: &Tile) -> TpuResult<[i32; 2]>;
}
