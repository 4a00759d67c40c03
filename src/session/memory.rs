use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::SessionStore;
use crate::error::{ApiError, Result};

/// Volatile store; the default for tests and for hosts without persistence.
#[derive(Default)]
pub struct MemorySessionStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.records
            .lock()
            .map_err(|e| ApiError::unexpected(format!("Session store lock poisoned: {e}")))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
