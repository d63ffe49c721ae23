//! The byte snapshot cache (§4.2 "Snapshot update" / "Typed reads").

use shared::{Address, MemoryBlock};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::MemoryError;

#[derive(Debug, Clone, Default)]
struct Snapshot {
    /// One entry per mapper memory block, keyed by block name.
    blocks: Vec<(MemoryBlock, Vec<u8>)>,
}

impl Snapshot {
    fn read_bytes(&self, addr: Address, len: u32) -> Option<Vec<u8>> {
        let (block, bytes) = self
            .blocks
            .iter()
            .find(|(block, _)| block.contains_range(addr, len))?;
        let offset = (addr.get() - block.start.get()) as usize;
        Some(bytes[offset..offset + len as usize].to_vec())
    }
}

/// Holds the most recent snapshot behind a single lock so that `Update`
/// replaces it atomically and in-flight readers never observe a torn mix of
/// old and new bytes (§4.2).
#[derive(Debug, Default)]
pub struct MemoryManager {
    snapshot: RwLock<Snapshot>,
}

impl MemoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Update({block_name -> bytes})`. `blocks` carries the address ranges
    /// (from the loaded mapper's platform); `bytes_by_block` is what the
    /// driver returned for this tick (§4.4 step 1-2).
    pub async fn update(&self, blocks: &[MemoryBlock], bytes_by_block: HashMap<String, Vec<u8>>) {
        let mut next = Snapshot::default();
        for block in blocks {
            if let Some(bytes) = bytes_by_block.get(&block.name) {
                next.blocks.push((block.clone(), bytes.clone()));
            }
        }
        *self.snapshot.write().await = next;
    }

    /// `ReadBytes(addr, len)` (§4.2).
    pub async fn read_bytes(&self, addr: Address, len: u32) -> Result<Vec<u8>, MemoryError> {
        self.snapshot
            .read()
            .await
            .read_bytes(addr, len)
            .ok_or(MemoryError::Unmapped { addr, len })
    }
}
