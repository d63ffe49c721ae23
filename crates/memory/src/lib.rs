//! The memory manager (§4.2): snapshot cache, typed decode helpers, the
//! freeze table, and per-property last-value state.

pub mod decode;
pub mod error;
pub mod freeze;
pub mod snapshot;
pub mod state;

pub use error::MemoryError;
pub use freeze::FreezeTable;
pub use snapshot::MemoryManager as SnapshotStore;
pub use state::{PropertyState, PropertyStateStore};

use shared::{Address, MemoryBlock};
use std::collections::HashMap;

/// Bundles the snapshot cache, freeze table, and per-property state store
/// that §4.2 describes as one component. Kept as three independently
/// lockable pieces internally so a freeze lookup never blocks on a
/// snapshot update in flight.
#[derive(Debug, Default)]
pub struct Memory {
    snapshot: SnapshotStore,
    freeze: FreezeTable,
    state: PropertyStateStore,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn update(&self, blocks: &[MemoryBlock], bytes_by_block: HashMap<String, Vec<u8>>) {
        self.snapshot.update(blocks, bytes_by_block).await;
    }

    pub async fn read_bytes(&self, addr: Address, len: u32) -> Result<Vec<u8>, MemoryError> {
        self.snapshot.read_bytes(addr, len).await
    }

    pub async fn freeze_property(
        &self,
        addr: Address,
        bytes: Vec<u8>,
        freezable: bool,
    ) -> Result<(), MemoryError> {
        self.freeze.freeze(addr, bytes, freezable).await
    }

    pub async fn unfreeze_property(&self, addr: Address) {
        self.freeze.unfreeze(addr).await;
    }

    pub async fn is_frozen(&self, addr: Address) -> bool {
        self.freeze.is_frozen(addr).await
    }

    pub async fn frozen_ranges(&self) -> Vec<(Address, Vec<u8>)> {
        self.freeze.entries().await
    }

    pub async fn update_property_state(
        &self,
        name: &str,
        value: shared::PropertyValue,
        raw_bytes: Vec<u8>,
    ) {
        self.state.update(name, value, raw_bytes).await;
    }

    pub async fn property_state(&self, name: &str) -> Option<PropertyState> {
        self.state.get(name).await
    }

    pub async fn last_value(&self, name: &str) -> Option<shared::PropertyValue> {
        self.state.last_value(name).await
    }

    /// Discards per-property derived state on a mapper swap (§3 "Lifecycle":
    /// "the previous mapper's derived state (last values, freeze table) is
    /// discarded"). The snapshot cache is left alone — it holds raw bytes by
    /// block name, not anything mapper-specific, and the next tick overwrites
    /// it wholesale anyway.
    pub async fn reset_property_state(&self) {
        self.state.clear().await;
        self.freeze.clear().await;
    }
}
