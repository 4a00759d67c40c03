use serde::{Deserialize, Serialize};
use validator::Validate;

/// Access/refresh pair, persisted together or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email_verified: bool,
}

/// Tokens plus the profile they were issued for, as returned by login and
/// OTP verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    pub tokens: TokenPair,
    pub user: UserProfile,
}

/// A login either authenticates or bounces to email verification. The
/// verification branch is never a success: no tokens exist on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(AuthenticatedSession),
    VerificationRequired { message: String, email: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct SignupFields {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
    pub confirm_password: String,
}

/// Partial profile update; unset fields are left untouched server-side.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

// Wire shapes for the auth backend.

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub(crate) struct SendOtpRequest<'a> {
    pub email: &'a str,
}

#[derive(Serialize)]
pub(crate) struct VerifyOtpRequest<'a> {
    pub email: &'a str,
    pub otp: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct RefreshResponse {
    pub access: String,
}

#[derive(Deserialize)]
pub(crate) struct SessionResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserProfile,
}

/// The login endpoint answers with one of two shapes on 2xx; the untagged
/// enum forces an explicit branch instead of duck-typing the fields.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum LoginReply {
    Authenticated(SessionResponse),
    Verification {
        message: String,
        email: String,
        requires_verification: bool,
    },
}

#[derive(Deserialize)]
pub(crate) struct ProfileResponse {
    pub user: UserProfile,
}
