use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::client::ApiClient;
use crate::config::ApiConfig;
use crate::session::{MemorySessionStore, SessionExpiryHandler};

pub mod server;

/// Client over a fresh in-memory store, pointed at a mock backend.
pub fn client_for(base_url: &str) -> (ApiClient, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::new());
    let config = ApiConfig::new(base_url).unwrap();
    let client = ApiClient::new(config, store.clone()).unwrap();
    (client, store)
}

/// Records whether the forced sign-out notification fired.
#[derive(Default)]
pub struct FlagExpiryHandler {
    pub fired: AtomicBool,
}

#[async_trait]
impl SessionExpiryHandler for FlagExpiryHandler {
    async fn on_session_expired(&self) {
        self.fired.store(true, Ordering::SeqCst);
    }
}
