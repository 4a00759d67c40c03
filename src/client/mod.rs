use std::sync::Arc;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth::jwt;
use crate::auth::types::{RefreshRequest, RefreshResponse};
use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::session::{self, NoopExpiryHandler, SessionExpiryHandler, SessionStore};

pub mod account;

/// Same-origin AJAX marker attached to state-changing requests.
const XHR_MARKER_HEADER: &str = "X-Requested-With";
const XHR_MARKER_VALUE: &str = "XMLHttpRequest";
/// Request timestamp, a replay-mitigation signal for the server.
const REQUEST_TIME_HEADER: &str = "X-Request-Time";

/// Authenticated API client. Every request carries a valid bearer token when
/// one exists, refreshing proactively before expiry and reactively after a
/// 401, with at most one refresh in flight at a time.
///
/// Cloning is cheap; clones share the session store and the refresh lock.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
    store: Arc<dyn SessionStore>,
    expiry_handler: Arc<dyn SessionExpiryHandler>,
    refresh_lock: Arc<Mutex<()>>,
}

impl ApiClient {
    pub fn new(config: ApiConfig, store: Arc<dyn SessionStore>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::unexpected(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            config,
            store,
            expiry_handler: Arc::new(NoopExpiryHandler),
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Installs the handler invoked on fatal refresh failure. The consuming
    /// layer supplies whatever "route to sign-in" means for it.
    pub fn with_expiry_handler(mut self, handler: Arc<dyn SessionExpiryHandler>) -> Self {
        self.expiry_handler = handler;
        self
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, None::<&()>).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::DELETE, path, None::<&()>).await
    }

    async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let url = self.config.endpoint(path)?;
        let token = self.resolve_access_token().await?;

        debug!(%method, %url, authenticated = token.is_some(), "Sending API request");
        let response = self.send(&method, url.clone(), body, token.as_deref()).await?;

        // One retry after a refresh, and only for requests that carried a
        // token; an unauthenticated 401 (failed login, missing credentials)
        // is a plain failure. A second 401 falls through as an error.
        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(stale) = token.as_deref() {
                warn!(%url, "Request rejected with 401, refreshing and retrying once");
                let fresh = self.refresh_access_token(Some(stale)).await?;
                let retry = self.send(&method, url, body, Some(&fresh)).await?;
                return self.deserialize_response(retry).await;
            }
        }

        self.deserialize_response(response).await
    }

    async fn send<B: Serialize>(
        &self,
        method: &Method,
        url: reqwest::Url,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<Response> {
        let mut request = self.http.request(method.clone(), url);

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let mutating = [Method::POST, Method::PUT, Method::PATCH, Method::DELETE];
        if mutating.contains(method) {
            request = request.header(XHR_MARKER_HEADER, XHR_MARKER_VALUE);
        }

        request = request.header(
            REQUEST_TIME_HEADER,
            Utc::now().timestamp_millis().to_string(),
        );

        if let Some(body) = body {
            request = request.json(body);
        }

        request.send().await.map_err(ApiError::from_transport)
    }

    async fn deserialize_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ApiError::unexpected(format!("Failed to parse response body: {e}")))
        } else {
            let body = response.bytes().await.unwrap_or_default();
            Err(ApiError::from_response(status, &body))
        }
    }

    /// No stored token: proceed unauthenticated. Stored and still valid: use
    /// it. Expiring: refresh first. A failed proactive refresh has already
    /// torn the session down, so the request goes out unauthenticated, which
    /// keeps public endpoints reachable.
    async fn resolve_access_token(&self) -> Result<Option<String>> {
        let Some(tokens) = session::read_tokens(self.store()).await? else {
            return Ok(None);
        };

        if !jwt::is_expiring(&tokens.access, self.config.refresh_lookahead) {
            return Ok(Some(tokens.access));
        }

        match self.refresh_access_token(None).await {
            Ok(access) => Ok(Some(access)),
            Err(err) => {
                warn!(error = %err, "Proactive refresh failed, continuing unauthenticated");
                Ok(None)
            }
        }
    }

    /// Single-flight refresh. Callers serialize on the lock and re-check the
    /// store once inside it, so a herd of requests against an expiring token
    /// produces exactly one network call.
    ///
    /// `stale_access` carries the token a 401 was observed with; comparing
    /// against it instead of the expiry clock ensures a server-side
    /// rejection still forces one real refresh.
    pub(crate) async fn refresh_access_token(&self, stale_access: Option<&str>) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        let Some(tokens) = session::read_tokens(self.store()).await? else {
            self.force_sign_out().await;
            return Err(ApiError::SessionExpired);
        };

        let already_fresh = match stale_access {
            Some(stale) => tokens.access != stale,
            None => !jwt::is_expiring(&tokens.access, self.config.refresh_lookahead),
        };
        if already_fresh {
            return Ok(tokens.access);
        }

        match self.perform_refresh(&tokens.refresh).await {
            Ok(access) => {
                session::update_access_token(self.store(), &access).await?;
                debug!("Access token refreshed");
                Ok(access)
            }
            Err(err) => {
                warn!(error = %err, "Token refresh failed, forcing sign-out");
                self.force_sign_out().await;
                Err(ApiError::SessionExpired)
            }
        }
    }

    async fn perform_refresh(&self, refresh_token: &str) -> Result<String> {
        let url = self.config.endpoint("/token/refresh/")?;

        let response = self
            .http
            .post(url)
            .header(XHR_MARKER_HEADER, XHR_MARKER_VALUE)
            .header(
                REQUEST_TIME_HEADER,
                Utc::now().timestamp_millis().to_string(),
            )
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(ApiError::from_response(status, &body));
        }

        let reply: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ApiError::unexpected(format!("Failed to parse refresh response: {e}")))?;

        Ok(reply.access)
    }

    async fn force_sign_out(&self) {
        if let Err(err) = session::clear_session(self.store()).await {
            warn!(error = %err, "Failed to clear session while signing out");
        }
        self.expiry_handler.on_session_expired().await;
    }
}
