use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Every failure crosses the client boundary as one of these shapes,
/// never as a raw transport error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server rejected a specific input field.
    #[error("{message}")]
    Field { field: String, message: String },

    /// The server answered with a `{detail: "..."}` body.
    #[error("{message}")]
    Detail { message: String },

    /// Non-2xx response with no recognizable structured body.
    #[error("Server error: {code}")]
    Status { code: u16 },

    /// The request never got a response (timeout, DNS, connection refused).
    #[error("Network error. Please check your connection.")]
    Network,

    /// A refresh failed fatally; the session has been cleared.
    #[error("Session expired. Please sign in again.")]
    SessionExpired,

    /// Anything else, including failures before the request was sent.
    #[error("{message}")]
    Unexpected { message: String },
}

impl ApiError {
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// The offending input field, when the server named one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ApiError::Field { field, .. } => Some(field),
            _ => None,
        }
    }

    /// The HTTP status, for responses that carried no structured body.
    pub fn code(&self) -> Option<u16> {
        match self {
            ApiError::Status { code } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn unexpected(message: impl Into<String>) -> Self {
        let message = message.into();
        ApiError::Unexpected {
            message: if message.is_empty() {
                UNEXPECTED_ERROR_MESSAGE.to_string()
            } else {
                message
            },
        }
    }

    /// Normalize a non-2xx response body.
    ///
    /// A `detail` key wins over field maps; otherwise the first key whose
    /// value is a non-empty array of messages becomes a field error.
    pub(crate) fn from_response(status: StatusCode, body: &[u8]) -> Self {
        if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
            if let Some(detail) = map.get("detail").and_then(Value::as_str) {
                return ApiError::Detail {
                    message: detail.to_string(),
                };
            }

            for (key, value) in &map {
                if let Some(message) = value
                    .as_array()
                    .and_then(|messages| messages.first())
                    .and_then(Value::as_str)
                {
                    return ApiError::Field {
                        field: key.clone(),
                        message: message.to_string(),
                    };
                }
            }
        }

        ApiError::Status {
            code: status.as_u16(),
        }
    }

    /// Normalize a send-phase transport failure.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            ApiError::Network
        } else {
            ApiError::unexpected(err.to_string())
        }
    }
}
