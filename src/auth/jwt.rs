use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use serde_json::Value;

use crate::error::{ApiError, Result};

/// Decode the payload segment of an access token without verifying the
/// signature. The client never holds verification keys; it only needs to
/// peek at the claims the server put there.
pub fn decode_payload(access_token: &str) -> Result<Value> {
    let parts: Vec<&str> = access_token.split('.').collect();
    if parts.len() != 3 {
        return Err(ApiError::unexpected(format!(
            "Invalid JWT format: expected 3 parts, got {}",
            parts.len()
        )));
    }

    let decoded = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|e| ApiError::unexpected(format!("Failed to decode JWT payload: {e}")))?;

    serde_json::from_slice(&decoded)
        .map_err(|e| ApiError::unexpected(format!("Failed to parse JWT payload: {e}")))
}

/// Expiry claim in epoch milliseconds.
pub fn token_expiry_millis(access_token: &str) -> Result<i64> {
    let payload = decode_payload(access_token)?;
    let exp = payload
        .get("exp")
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::unexpected("Missing 'exp' claim in access token"))?;

    Ok(exp * 1000)
}

/// True when less than `lookahead` of validity remains, or when the token
/// cannot be decoded at all (fail closed).
pub fn is_expiring(access_token: &str, lookahead: Duration) -> bool {
    match token_expiry_millis(access_token) {
        Ok(expires_at) => expires_at - Utc::now().timestamp_millis() < lookahead.as_millis() as i64,
        Err(_) => true,
    }
}
