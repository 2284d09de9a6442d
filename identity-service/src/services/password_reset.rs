//! Rate-limited password reset protocol: issue, verify, consume.
//!
//! One live token record per email. Issuance is bounded to three requests
//! per rolling 24-hour window; consumption is single-use and deletes the
//! record. The plaintext token is never persisted, only its Argon2 hash.

use dashmap::DashMap;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::PasswordResetToken;
use crate::services::{
    EmailSender, EmailToken, PasswordResetTokenRepository, ServiceError, SessionService,
    TokenCodec, UserRepository,
};
use crate::utils::{
    hash_password, validate_login_password, verify_password, Password, PasswordHashString,
    LOGIN_PASSWORD_MAX_LENGTH, LOGIN_PASSWORD_MIN_LENGTH,
};

const FORGOT_PASSWORD_EMAIL_TEMPLATE: &str = "email/forgotPasswordTemplate.html";
const FORGOT_PASSWORD_EMAIL_SUBJECT: &str = "Reset your password";

pub struct PasswordResetService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn PasswordResetTokenRepository>,
    codec: Arc<dyn TokenCodec>,
    email: Arc<dyn EmailSender>,
    sessions: Arc<dyn SessionService>,
    /// Serializes the counter read-modify-write per email key. The storage
    /// collaborator offers no compare-and-update, so concurrent issuance for
    /// one email must be fenced here.
    request_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PasswordResetService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn PasswordResetTokenRepository>,
        codec: Arc<dyn TokenCodec>,
        email: Arc<dyn EmailSender>,
        sessions: Arc<dyn SessionService>,
    ) -> Self {
        Self {
            users,
            tokens,
            codec,
            email,
            sessions,
            request_locks: DashMap::new(),
        }
    }

    /// Issue a one-time reset token for `email` and mail out the reset link.
    ///
    /// Delivery failure propagates to the caller here, unlike the welcome
    /// mail on signup.
    pub async fn request_reset(&self, email: &str, base_url: &str) -> Result<(), ServiceError> {
        if email.trim().is_empty() {
            return Err(ServiceError::InvalidParameter("email"));
        }
        if base_url.trim().is_empty() {
            return Err(ServiceError::InvalidParameter("origin"));
        }

        // Exact lookup first, case-insensitive as a fallback for user-typed
        // addresses. No user, no mail.
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => self
                .users
                .find_by_case_insensitive_email(email)
                .await?
                .ok_or_else(|| ServiceError::not_found("user", email))?,
        };

        // Fresh random token, independent of anything stored
        let token = generate_reset_token();

        {
            let lock = self
                .request_locks
                .entry(user.email.clone())
                .or_default()
                .clone();
            let _guard = lock.lock().await;

            let mut record = self
                .tokens
                .find_by_email(&user.email)
                .await?
                .unwrap_or_else(|| PasswordResetToken::new(user.email.clone()));

            if !record.register_request(chrono::Utc::now()) {
                return Err(ServiceError::RateLimited);
            }

            record.token_hash = hash_password(&Password::new(token.clone()))?.into_string();
            self.tokens.save(&record).await?;
        }

        let opaque = self.codec.encode(&EmailToken {
            email: user.email.clone(),
            token,
        })?;
        let reset_url = format!("{}/user/resetPassword?token={}", base_url, opaque);

        tracing::debug!(email = %user.email, "Issued password reset token");

        let params = HashMap::from([("resetUrl".to_string(), reset_url)]);
        self.email
            .send_mail(
                &user.email,
                FORGOT_PASSWORD_EMAIL_SUBJECT,
                FORGOT_PASSWORD_EMAIL_TEMPLATE,
                &params,
            )
            .await
    }

    /// Check whether an opaque token matches the live record for its email.
    ///
    /// Read-only: never mutates or deletes the record.
    pub async fn verify_token(&self, opaque: &str) -> Result<bool, ServiceError> {
        let payload = self.codec.decode(opaque)?;

        let record = self
            .tokens
            .find_by_email(&payload.email)
            .await?
            .ok_or(ServiceError::InvalidPasswordReset)?;

        Ok(verify_password(
            &Password::new(payload.token),
            &PasswordHashString::new(record.token_hash),
        )
        .is_ok())
    }

    /// Consume an opaque token and set the user's new password.
    ///
    /// Deletes the token record (single use), force-enables the account so
    /// invited-but-unclaimed users end up enabled, and kicks off detached
    /// invalidation of all other sessions for this email.
    pub async fn reset_password(
        &self,
        opaque: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        let payload = self.codec.decode(opaque)?;

        let record = self
            .tokens
            .find_by_email(&payload.email)
            .await?
            .ok_or_else(|| ServiceError::not_found("token", payload.email.as_str()))?;

        verify_password(
            &Password::new(payload.token),
            &PasswordHashString::new(record.token_hash),
        )
        .map_err(|_| ServiceError::BadRequest("token"))?;

        if !validate_login_password(new_password) {
            return Err(ServiceError::InvalidPasswordLength {
                min: LOGIN_PASSWORD_MIN_LENGTH,
                max: LOGIN_PASSWORD_MAX_LENGTH,
            });
        }

        let mut user = self
            .users
            .find_by_email(&payload.email)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", payload.email.as_str()))?;

        user.password_hash =
            Some(hash_password(&Password::new(new_password.to_string()))?.into_string());
        user.password_reset_initiated = false;
        // A user invited but never signed up claims the account through this
        // flow, so enable it as well
        user.enabled = true;

        if !self.tokens.delete_by_email(&user.email).await? {
            return Err(ServiceError::not_found("token", user.email.as_str()));
        }

        self.users.save(&user).await?;

        tracing::info!(email = %user.email, "Password reset completed");

        // Detached: the caller's result never waits on session invalidation
        let sessions = Arc::clone(&self.sessions);
        let email = user.email.clone();
        tokio::spawn(async move {
            if let Err(e) = sessions.invalidate_all_sessions(&email).await {
                tracing::error!(error = %e, email = %email, "Failed to invalidate sessions after password reset");
            }
        });

        Ok(())
    }
}

fn generate_reset_token() -> String {
    let mut rng = rand::thread_rng();
    let token_bytes: [u8; 32] = rng.gen();
    hex::encode(token_bytes)
}
