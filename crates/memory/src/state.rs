//! Per-property last-observed state (§4.2 "Per-property observations").
//! `UpdatePropertyState` for distinct property names must never interfere,
//! and a single name's update must be atomic; one lock over the map gives
//! us both for free without a per-entry lock pool.

use shared::PropertyValue;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyState {
    pub value: PropertyValue,
    pub raw_bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct PropertyStateStore {
    states: RwLock<HashMap<String, PropertyState>>,
}

impl PropertyStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn update(&self, name: &str, value: PropertyValue, raw_bytes: Vec<u8>) {
        self.states
            .write()
            .await
            .insert(name.to_string(), PropertyState { value, raw_bytes });
    }

    pub async fn get(&self, name: &str) -> Option<PropertyState> {
        self.states.read().await.get(name).cloned()
    }

    pub async fn last_value(&self, name: &str) -> Option<PropertyValue> {
        self.get(name).await.map(|state| state.value)
    }

    pub async fn clear(&self) {
        self.states.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_then_get_round_trips() {
        let store = PropertyStateStore::new();
        store
            .update("hp", PropertyValue::Integer(300), vec![0x2C, 0x01])
            .await;
        let state = store.get("hp").await.unwrap();
        assert_eq!(state.value, PropertyValue::Integer(300));
        assert_eq!(state.raw_bytes, vec![0x2C, 0x01]);
    }

    #[tokio::test]
    async fn distinct_names_do_not_clobber_each_other() {
        let store = PropertyStateStore::new();
        store.update("hp", PropertyValue::Integer(1), vec![1]).await;
        store.update("mp", PropertyValue::Integer(2), vec![2]).await;
        assert_eq!(store.last_value("hp").await, Some(PropertyValue::Integer(1)));
        assert_eq!(store.last_value("mp").await, Some(PropertyValue::Integer(2)));
    }

    #[tokio::test]
    async fn clear_discards_all_state_for_a_mapper_swap() {
        let store = PropertyStateStore::new();
        store.update("hp", PropertyValue::Integer(1), vec![1]).await;
        store.clear().await;
        assert!(store.get("hp").await.is_none());
    }
}
