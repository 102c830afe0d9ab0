//! In-memory store.

use super::store::{BoxFuture, Store, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory store for testing and ephemeral use, with an optional byte quota.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Vec<u8>>>,
    quota: Option<usize>,
}

impl MemoryStore {
    /// Create a new empty, unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that refuses writes once the total stored bytes
    /// would exceed `quota`.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            values: RwLock::default(),
            quota: Some(quota),
        }
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> BoxFuture<'_, StoreResult<Option<Vec<u8>>>> {
        let key = key.to_string();
        Box::pin(async move {
            let values = self
                .values
                .read()
                .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))?;
            Ok(values.get(&key).cloned())
        })
    }

    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, StoreResult<()>> {
        let key = key.to_string();
        Box::pin(async move {
            let mut values = self
                .values
                .write()
                .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))?;
            if let Some(quota) = self.quota {
                let others: usize = values
                    .iter()
                    .filter(|(k, _)| **k != key)
                    .map(|(_, v)| v.len())
                    .sum();
                if others + value.len() > quota {
                    return Err(StoreError::QuotaExceeded);
                }
            }
            values.insert(key, value);
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'_, StoreResult<()>> {
        let key = key.to_string();
        Box::pin(async move {
            let mut values = self
                .values
                .write()
                .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))?;
            values.remove(&key);
            Ok(())
        })
    }
}
