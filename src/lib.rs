//! Authenticated API client for the Sanviplex streaming backend.
//!
//! Owns the access/refresh token lifecycle: atomic pair storage, proactive
//! expiry-based refresh with single-flight deduplication, retry-once after a
//! 401, and normalized errors at the boundary.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod session;

#[cfg(test)]
pub mod testdata;

pub use auth::{
    AuthenticatedSession, LoginOutcome, MessageResponse, ProfileChanges, SignupFields, TokenPair,
    UserProfile,
};
pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use session::{
    MemorySessionStore, NoopExpiryHandler, SessionExpiryHandler, SessionStore, SqliteSessionStore,
};
