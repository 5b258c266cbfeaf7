use crate::{
    error::{BoardError, Result},
    storage::LocalCache,
};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, PoisonError,
    },
};

/// In-memory local cache for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
    simulate_write_error: AtomicBool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `set` fail, as a full storage quota would
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Seeds a raw value, bypassing failure simulation
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(BoardError::PersistenceWriteFailed(
                "Simulated quota exceeded".to_string(),
            ));
        }
        self.insert_raw(key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_set() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("k").unwrap(), None);

        cache.set("k", "v1").unwrap();
        cache.set("k", "v2").unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn test_simulated_write_error_keeps_old_value() {
        let cache = MemoryCache::new();
        cache.set("k", "v1").unwrap();
        cache.set_simulate_write_error(true);

        let err = cache.set("k", "v2").unwrap_err();
        assert!(matches!(err, BoardError::PersistenceWriteFailed(_)));
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("v1"));
    }
}
