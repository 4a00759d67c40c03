use std::time::Duration;

use url::Url;

use crate::error::{ApiError, Result};

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// How much remaining validity still counts as "expiring".
const DEFAULT_REFRESH_LOOKAHEAD: Duration = Duration::from_secs(5 * 60);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub refresh_lookahead: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL).expect("compiled-in default URL is well-formed")
    }
}

impl ApiConfig {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let mut raw = base_url.as_ref().trim_end_matches('/').to_string();
        raw.push('/');

        let base_url = raw
            .parse::<Url>()
            .map_err(|e| ApiError::unexpected(format!("Invalid API base URL {raw}: {e}")))?;

        Ok(Self {
            base_url,
            refresh_lookahead: DEFAULT_REFRESH_LOOKAHEAD,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Reads `SANVIPLEX_API_BASE_URL`, falling back to the local backend.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let base_url = std::env::var("SANVIPLEX_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn with_refresh_lookahead(mut self, lookahead: Duration) -> Self {
        self.refresh_lookahead = lookahead;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builds the full URL for an operation path, keeping the base path
    /// segment (`/api`) intact.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::unexpected(format!("Failed to construct request URL: {e}")))
    }
}
