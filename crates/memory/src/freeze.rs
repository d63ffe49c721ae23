//! The freeze table (§4.2). Keyed by the address a freeze was installed at;
//! the update loop re-writes the recorded bytes whenever the live snapshot
//! diverges from them.

use shared::Address;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::MemoryError;

#[derive(Debug, Default)]
pub struct FreezeTable {
    entries: RwLock<HashMap<Address, Vec<u8>>>,
}

impl FreezeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `FreezeProperty(addr, bytes)`. `freezable` is the mapper's per-property
    /// flag, checked here rather than duplicated by every caller.
    pub async fn freeze(
        &self,
        addr: Address,
        bytes: Vec<u8>,
        freezable: bool,
    ) -> Result<(), MemoryError> {
        if !freezable {
            return Err(MemoryError::NotFreezable);
        }
        self.entries.write().await.insert(addr, bytes);
        Ok(())
    }

    /// `UnfreezeProperty(addr)`.
    pub async fn unfreeze(&self, addr: Address) {
        self.entries.write().await.remove(&addr);
    }

    pub async fn is_frozen(&self, addr: Address) -> bool {
        self.entries.read().await.contains_key(&addr)
    }

    /// Snapshot of all frozen ranges, for the update loop's divergence check
    /// (§4.4 step 4). Returned by value so the caller isn't holding the
    /// table's lock while it talks to the driver.
    pub async fn entries(&self) -> Vec<(Address, Vec<u8>)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(addr, bytes)| (*addr, bytes.clone()))
            .collect()
    }

    /// Drops every freeze (§3 "Lifecycle": a mapper swap discards the
    /// previous mapper's freeze table along with its last-decoded values).
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn freeze_rejects_when_not_freezable() {
        let table = FreezeTable::new();
        let err = table
            .freeze(Address(0x100), vec![1, 2, 3], false)
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::NotFreezable));
        assert!(!table.is_frozen(Address(0x100)).await);
    }

    #[tokio::test]
    async fn freeze_then_unfreeze_round_trips() {
        let table = FreezeTable::new();
        table.freeze(Address(0x100), vec![9], true).await.unwrap();
        assert!(table.is_frozen(Address(0x100)).await);
        table.unfreeze(Address(0x100)).await;
        assert!(!table.is_frozen(Address(0x100)).await);
    }

    #[tokio::test]
    async fn entries_lists_every_frozen_range() {
        let table = FreezeTable::new();
        table.freeze(Address(1), vec![1], true).await.unwrap();
        table.freeze(Address(2), vec![2], true).await.unwrap();
        let mut entries = table.entries().await;
        entries.sort_by_key(|(addr, _)| addr.get());
        assert_eq!(entries, vec![(Address(1), vec![1]), (Address(2), vec![2])]);
    }

    #[tokio::test]
    async fn clear_drops_every_freeze() {
        let table = FreezeTable::new();
        table.freeze(Address(1), vec![1], true).await.unwrap();
        table.freeze(Address(2), vec![2], true).await.unwrap();
        table.clear().await;
        assert!(table.entries().await.is_empty());
    }
}
