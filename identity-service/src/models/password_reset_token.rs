//! Password reset token record, keyed by email.
//!
//! At most one live record exists per email: a new issuance either reuses or
//! replaces the existing record. The record is deleted exactly once, at
//! successful consumption.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Maximum issuances allowed inside one rolling window.
pub const MAX_REQUESTS_PER_WINDOW: u32 = 3;

/// Length of the rolling issuance window.
pub const REQUEST_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetToken {
    pub email: String,
    /// Argon2 hash of the one-time token. The plaintext is never persisted.
    pub token_hash: String,
    pub request_count: u32,
    pub first_request_time: Option<DateTime<Utc>>,
}

impl PasswordResetToken {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            token_hash: String::new(),
            request_count: 0,
            first_request_time: None,
        }
    }

    /// Apply the rate-limit transition for one more issuance request.
    ///
    /// Returns false when the quota for the current window is exhausted; the
    /// record is left untouched in that case. Otherwise the counter advances
    /// (or resets to 1 when the window has rolled over) and true is returned.
    /// Time is taken as a parameter so the transition stays testable with an
    /// explicit clock.
    pub fn register_request(&mut self, now: DateTime<Utc>) -> bool {
        if self.request_count >= MAX_REQUESTS_PER_WINDOW {
            let window_elapsed = self
                .first_request_time
                .map(|first| now - first >= Duration::hours(REQUEST_WINDOW_HOURS))
                .unwrap_or(true);
            if window_elapsed {
                self.request_count = 1;
                self.first_request_time = Some(now);
                true
            } else {
                false
            }
        } else {
            self.request_count += 1;
            if self.first_request_time.is_none() {
                self.first_request_time = Some(now);
            }
            true
        }
    }
}
