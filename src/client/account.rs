use tracing::debug;

use super::ApiClient;
use crate::auth::jwt;
use crate::auth::types::{
    AuthenticatedSession, LoginOutcome, LoginReply, LoginRequest, MessageResponse, ProfileChanges,
    ProfileResponse, SendOtpRequest, SessionResponse, SignupFields, TokenPair, UserProfile,
    VerifyOtpRequest,
};
use crate::auth::validation;
use crate::error::{ApiError, Result};
use crate::session;

impl ApiClient {
    /// True iff a stored access token exists and has more than the refresh
    /// lookahead of validity left. Undecodable tokens count as expired.
    pub async fn is_authenticated(&self) -> Result<bool> {
        match session::read_tokens(self.store()).await? {
            Some(tokens) => Ok(!jwt::is_expiring(
                &tokens.access,
                self.config.refresh_lookahead,
            )),
            None => Ok(false),
        }
    }

    /// Persists both tokens as one record. Token contents are not inspected;
    /// the issuing server is the trust boundary.
    pub async fn store_tokens(&self, tokens: &TokenPair) -> Result<()> {
        session::write_tokens(self.store(), tokens).await
    }

    /// Removes all persisted session state. Idempotent.
    pub async fn clear_tokens(&self) -> Result<()> {
        session::clear_session(self.store()).await
    }

    /// The persisted profile, without touching tokens.
    pub async fn current_user(&self) -> Result<Option<UserProfile>> {
        session::read_user(self.store()).await
    }

    /// Restores a prior session at startup: the saved profile is only
    /// honored while the stored tokens still authenticate. Stale halves are
    /// dropped together.
    pub async fn restore_session(&self) -> Result<Option<UserProfile>> {
        let user = session::read_user(self.store()).await?;

        match user {
            Some(user) if self.is_authenticated().await? => Ok(Some(user)),
            _ => {
                session::clear_session(self.store()).await?;
                Ok(None)
            }
        }
    }

    pub async fn logout(&self) -> Result<()> {
        debug!("Logging out, clearing session records");
        session::clear_session(self.store()).await
    }

    /// Registers an account. Authenticates nobody; OTP verification follows.
    pub async fn signup(&self, fields: &SignupFields) -> Result<MessageResponse> {
        validation::validate_signup(fields)?;
        self.post("/signup/", fields).await
    }

    /// Either authenticates (tokens and profile persisted before returning)
    /// or reports that the account still needs email verification. The
    /// verification branch stores nothing.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        validation::validate_email(email)?;

        let reply: LoginReply = self.post("/login/", &LoginRequest { email, password }).await?;

        match reply {
            LoginReply::Authenticated(session_reply) => Ok(LoginOutcome::Authenticated(
                self.adopt_session(session_reply).await?,
            )),
            LoginReply::Verification {
                message,
                email,
                requires_verification: true,
            } => Ok(LoginOutcome::VerificationRequired { message, email }),
            LoginReply::Verification { .. } => Err(ApiError::unexpected(
                "Unrecognized login response from server",
            )),
        }
    }

    pub async fn send_otp(&self, email: &str) -> Result<MessageResponse> {
        validation::validate_email(email)?;
        self.post("/send-otp/", &SendOtpRequest { email }).await
    }

    /// Redeems a one-time code; success yields a session exactly like login.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<AuthenticatedSession> {
        let reply: SessionResponse = self
            .post("/verify-otp/", &VerifyOtpRequest { email, otp })
            .await?;
        self.adopt_session(reply).await
    }

    /// Pushes partial profile changes and rewrites the stored record with
    /// the server's view.
    pub async fn update_profile(&self, changes: &ProfileChanges) -> Result<UserProfile> {
        let reply: ProfileResponse = self.put("/auth/profile/", changes).await?;
        session::write_user(self.store(), &reply.user).await?;
        Ok(reply.user)
    }

    async fn adopt_session(&self, reply: SessionResponse) -> Result<AuthenticatedSession> {
        let tokens = TokenPair {
            access: reply.access,
            refresh: reply.refresh,
        };

        session::write_tokens(self.store(), &tokens).await?;
        session::write_user(self.store(), &reply.user).await?;
        debug!(user = %reply.user.email, "Session established");

        Ok(AuthenticatedSession {
            tokens,
            user: reply.user,
        })
    }
}
