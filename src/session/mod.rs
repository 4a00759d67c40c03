use async_trait::async_trait;
use tracing::warn;

use crate::auth::types::{TokenPair, UserProfile};
use crate::error::Result;

pub mod memory;
pub mod sqlite;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

/// Storage key for the `{access, refresh}` token record.
pub const AUTH_RECORD_KEY: &str = "sanviplex_auth";
/// Storage key for the persisted user profile, decoupled from the tokens so
/// identity can render without decoding anything.
pub const USER_RECORD_KEY: &str = "sanviplex_user";

/// Key-value persistence capability. Production backs this with whatever
/// client-side storage the host offers; tests inject the in-memory store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Invoked exactly when a fatal refresh failure forces a sign-out. The
/// consuming layer decides what "go to the login screen" means.
#[async_trait]
pub trait SessionExpiryHandler: Send + Sync {
    async fn on_session_expired(&self);
}

/// Default handler for consumers that poll `is_authenticated` instead.
pub struct NoopExpiryHandler;

#[async_trait]
impl SessionExpiryHandler for NoopExpiryHandler {
    async fn on_session_expired(&self) {}
}

/// Reads the token record, failing closed: an unreadable or corrupt record
/// is dropped (both records, they live and die together) and reported as
/// absent.
pub async fn read_tokens(store: &dyn SessionStore) -> Result<Option<TokenPair>> {
    let Some(raw) = store.get(AUTH_RECORD_KEY).await? else {
        return Ok(None);
    };

    match serde_json::from_str::<TokenPair>(&raw) {
        Ok(pair) => Ok(Some(pair)),
        Err(e) => {
            warn!(error = %e, "Dropping unreadable token record");
            clear_session(store).await?;
            Ok(None)
        }
    }
}

/// Persists both tokens as one atomic record.
pub async fn write_tokens(store: &dyn SessionStore, tokens: &TokenPair) -> Result<()> {
    let raw = serde_json::to_string(tokens).map_err(|e| {
        crate::error::ApiError::unexpected(format!("Failed to serialize tokens: {e}"))
    })?;
    store.set(AUTH_RECORD_KEY, &raw).await
}

/// Replaces only the access half of the stored pair. A missing record is a
/// no-op; a refresh never creates a session.
pub async fn update_access_token(store: &dyn SessionStore, access: &str) -> Result<()> {
    if let Some(mut tokens) = read_tokens(store).await? {
        tokens.access = access.to_string();
        write_tokens(store, &tokens).await?;
    }
    Ok(())
}

pub async fn read_user(store: &dyn SessionStore) -> Result<Option<UserProfile>> {
    let Some(raw) = store.get(USER_RECORD_KEY).await? else {
        return Ok(None);
    };

    match serde_json::from_str::<UserProfile>(&raw) {
        Ok(user) => Ok(Some(user)),
        Err(e) => {
            warn!(error = %e, "Dropping unreadable user record");
            store.remove(USER_RECORD_KEY).await?;
            Ok(None)
        }
    }
}

pub async fn write_user(store: &dyn SessionStore, user: &UserProfile) -> Result<()> {
    let raw = serde_json::to_string(user).map_err(|e| {
        crate::error::ApiError::unexpected(format!("Failed to serialize user profile: {e}"))
    })?;
    store.set(USER_RECORD_KEY, &raw).await
}

/// Removes both records. Idempotent.
pub async fn clear_session(store: &dyn SessionStore) -> Result<()> {
    store.remove(AUTH_RECORD_KEY).await?;
    store.remove(USER_RECORD_KEY).await?;
    Ok(())
}
