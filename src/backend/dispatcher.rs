use tracing::{info, warn};

use super::{BackendMode, BackendState, HardwareBackend, LinkOpener, SoftwareBackend, TileBackend};
use crate::config::HardwareConfig;
use crate::error::{LinkError, TpuResult};
use crate::tiling::Tile;

enum ActiveBackend {
    Software(SoftwareBackend),
    Hardware(HardwareBackend),
}

/// Chooses the tile backend once, at construction.
///
/// If a hardware config is given the link is opened and reset; any failure
/// selects the software backend for the rest of the dispatcher's life. There
/// is no retry and no fallback after construction: a link error during
/// inference is returned to the caller.
pub struct BackendDispatcher {
    state: BackendState,
    active: ActiveBackend,
}

impl BackendDispatcher {
    /// Software-only dispatcher.
    pub fn software() -> Self {
        BackendDispatcher {
            state: BackendState::Simulated,
            active: ActiveBackend::Software(SoftwareBackend::new()),
        }
    }

    /// Try the accelerator, else fall back to software.
    pub fn connect(hardware: Option<&HardwareConfig>, opener: &dyn LinkOpener) -> Self {
        let (state, active) = match hardware {
            None => (BackendState::Simulated, ActiveBackend::Software(SoftwareBackend::new())),
            Some(config) => match Self::open_hardware(config, opener) {
                Ok(backend) => {
                    info!(address = %config.address, "running tiles on accelerator");
                    (BackendState::Connected, ActiveBackend::Hardware(backend))
                }
                Err(e) => {
                    warn!(address = %config.address, error = %e, "could not connect to accelerator, falling back to simulation");
                    (BackendState::Simulated, ActiveBackend::Software(SoftwareBackend::new()))
                }
            },
        };

        info!(from = %BackendState::Uninitialized, to = %state, "backend selected");
        BackendDispatcher { state, active }
    }

    fn open_hardware(config: &HardwareConfig, opener: &dyn LinkOpener) -> Result<HardwareBackend, LinkError> {
        let link = opener.open(config)?;
        // A backend that fails reset is dropped here, which closes its link.
        let mut backend = HardwareBackend::new(config.address.clone(), link);
        if config.reset_on_connect {
            backend.reset()?;
        }
        Ok(backend)
    }

    pub fn state(&self) -> BackendState {
        self.state
    }

    /// Release the backend. Closes the link once; later calls are no-ops.
    pub fn shutdown(&mut self) {
        if let ActiveBackend::Hardware(hw) = &mut self.active {
            hw.close();
        }
        self.state = BackendState::Disconnected;
    }
}

impl TileBackend for BackendDispatcher {
    fn mode(&self) -> BackendMode {
        match &self.active {
            ActiveBackend::Software(sw) => sw.mode(),
            ActiveBackend::Hardware(hw) => hw.mode(),
        }
    }

    fn execute(&mut self, tile: &Tile) -> TpuResult<[i32; 2]> {
        if self.state == BackendState::Disconnected {
            return Err(LinkError::Closed.into());
        }
        match &mut self.active {
            ActiveBackend::Software(sw) => sw.execute(tile),
            ActiveBackend::Hardware(hw) => hw.execute(tile),
        }
    }
}
