use super::{BackendMode, TileBackend};
use crate::error::TpuResult;
use crate::tiling::Tile;

/// Computes tiles on the host. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareBackend;

impl SoftwareBackend {
    pub fn new() -> Self {
        SoftwareBackend
    }
}

impl TileBackend for SoftwareBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Software
    }

    fn execute(&mut self, tile: &Tile) -> TpuResult<[i32; 2]> {
        Ok(tile.product())
    }
}
