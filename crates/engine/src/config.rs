//! Engine-level runtime configuration (§6). `gamehookd` loads a superset of
//! this from its own config file and constructs one of these to hand to
//! [`crate::GameHook::new`].

use driver::DriverConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub driver: DriverConfig,
    /// Tick period (§4.4, default 5ms).
    pub update_interval: Duration,
    /// Directory `ListMappers`/`LoadMapper` resolve mapper documents from.
    pub mappers_dir: PathBuf,
    /// Per-subscriber event bus buffer depth (§4.5, default 256).
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            driver: DriverConfig::default(),
            update_interval: Duration::from_millis(5),
            mappers_dir: PathBuf::from("mappers"),
            event_buffer: crate::bus::DEFAULT_BUFFER,
        }
    }
}
