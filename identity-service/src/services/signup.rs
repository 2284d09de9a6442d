//! Signup gate: may this email self-register, and with what privilege?
//!
//! Pure policy evaluation against the immutable configuration; no I/O.

use crate::config::IdentityConfig;
use crate::models::{email_domain, LoginSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupDecision {
    Allowed { privileged: bool },
    Denied(DenialReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Self-service signup is globally switched off.
    SignupsDisabled,
    /// The email's domain is not on the allowlist for this login source.
    DomainNotAllowed,
}

pub struct SignupGate;

impl SignupGate {
    /// Decide whether `email` may sign up via `source`.
    ///
    /// A configured admin email is always allowed and privileged, trumping
    /// the global kill switch and both allowlists. For everyone else the
    /// kill switch applies first, then the source-selected allowlist (an
    /// empty allowlist admits any domain).
    pub fn evaluate(
        config: &IdentityConfig,
        email: &str,
        source: LoginSource,
    ) -> SignupDecision {
        if config.is_admin_email(email) {
            return SignupDecision::Allowed { privileged: true };
        }

        if config.signup_disabled {
            return SignupDecision::Denied(DenialReason::SignupsDisabled);
        }

        let allowed_domains = match source {
            LoginSource::Form => &config.allowed_domains,
            LoginSource::Oauth => &config.oauth_allowed_domains,
        };

        if !allowed_domains.is_empty() {
            let permitted = email_domain(email)
                .map(|domain| allowed_domains.iter().any(|d| d == domain))
                .unwrap_or(false);
            if !permitted {
                return SignupDecision::Denied(DenialReason::DomainNotAllowed);
            }
        }

        SignupDecision::Allowed { privileged: false }
    }
}
