use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use super::fixtures;

/// Loopback stand-in for the auth backend, with call counters so tests can
/// assert how often each endpoint was actually hit.
#[derive(Default)]
pub struct BackendState {
    pub login_calls: AtomicUsize,
    pub signup_calls: AtomicUsize,
    pub otp_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    pub fail_refresh: AtomicBool,
    pub reject_all_bearers: AtomicBool,
    issued_tokens: Mutex<HashSet<String>>,
}

impl BackendState {
    fn mint_token(&self, expires_in_seconds: i64) -> String {
        let token = fixtures::access_token_expiring_in(expires_in_seconds);
        self.issued_tokens.lock().unwrap().insert(token.clone());
        token
    }

    fn knows(&self, token: &str) -> bool {
        self.issued_tokens.lock().unwrap().contains(token)
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
    server: JoinHandle<()>,
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl MockBackend {
    pub async fn spawn() -> Self {
        let state = Arc::new(BackendState::default());

        let router = Router::new()
            .route("/api/login/", post(login))
            .route("/api/signup/", post(signup))
            .route("/api/send-otp/", post(send_otp))
            .route("/api/verify-otp/", post(verify_otp))
            .route("/api/token/refresh/", post(refresh))
            .route("/api/profile/", get(profile))
            .route("/api/auth/profile/", put(update_profile))
            .route("/api/echo/", get(echo).post(echo).put(echo))
            .route("/api/slow/", get(slow))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/api"),
            state,
            server,
        }
    }

    /// Mints an access token the backend accepts as a bearer.
    pub fn issue_valid_token(&self, expires_in_seconds: i64) -> String {
        self.state.mint_token(expires_in_seconds)
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn authorize(state: &BackendState, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let Some(token) = bearer(headers) else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Authentication credentials were not provided."})),
        ));
    };

    if state.reject_all_bearers.load(Ordering::SeqCst) || !state.knows(&token) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Given token not valid for any token type"})),
        ));
    }

    Ok(())
}

fn session_body(state: &BackendState) -> Value {
    json!({
        "access": state.mint_token(3600),
        "refresh": "refresh-1",
        "user": fixtures::user_json(),
    })
}

async fn login(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.login_calls.fetch_add(1, Ordering::SeqCst);
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default();

    if email == "unverified@sanviplex.app" {
        return (
            StatusCode::OK,
            Json(json!({
                "message": "Please verify your email before logging in.",
                "email": email,
                "requires_verification": true,
            })),
        );
    }

    if email == "viewer@sanviplex.app" && password == "Secret123" {
        return (StatusCode::OK, Json(session_body(&state)));
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Invalid credentials"})),
    )
}

async fn signup(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.signup_calls.fetch_add(1, Ordering::SeqCst);
    let email = body["email"].as_str().unwrap_or_default().to_string();

    if email == "taken@sanviplex.app" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"email": ["A user with this email already exists."]})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "message": "Verification code sent to your email.",
            "email": email,
        })),
    )
}

async fn send_otp(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.otp_calls.fetch_add(1, Ordering::SeqCst);
    let email = body["email"].as_str().unwrap_or_default().to_string();

    (
        StatusCode::OK,
        Json(json!({"message": "OTP sent.", "email": email})),
    )
}

async fn verify_otp(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.otp_calls.fetch_add(1, Ordering::SeqCst);

    if body["otp"].as_str() == Some("123456") {
        return (StatusCode::OK, Json(session_body(&state)));
    }

    (
        StatusCode::BAD_REQUEST,
        Json(json!({"otp": ["Invalid or expired OTP."]})),
    )
}

async fn refresh(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    if state.fail_refresh.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Token is invalid or expired"})),
        );
    }

    if body["refresh"].as_str().unwrap_or_default().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"refresh": ["This field is required."]})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({"access": state.mint_token(3600)})),
    )
}

async fn profile(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    state.profile_calls.fetch_add(1, Ordering::SeqCst);

    match authorize(&state, &headers) {
        Ok(()) => (StatusCode::OK, Json(fixtures::user_json())),
        Err(rejection) => rejection,
    }
}

async fn update_profile(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(changes): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }

    let mut user = fixtures::user_json();
    for field in ["first_name", "last_name", "email"] {
        if let Some(value) = changes.get(field) {
            user[field] = value.clone();
        }
    }

    (StatusCode::OK, Json(json!({"user": user})))
}

async fn echo(headers: HeaderMap) -> Json<Value> {
    let mut echoed = serde_json::Map::new();
    for (name, value) in headers.iter() {
        echoed.insert(
            name.as_str().to_string(),
            Value::String(value.to_str().unwrap_or_default().to_string()),
        );
    }

    Json(json!({"headers": echoed}))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    Json(json!({}))
}
