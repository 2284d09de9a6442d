//! User model - tenant-scoped user accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::Policy;

/// Where the account's credentials come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginSource {
    Form,
    Oauth,
}

/// User entity (tenant-scoped).
///
/// `enabled == false` means the account has been provisioned (for example by
/// an invitation) but not yet claimed by its owner. Email uniqueness is
/// enforced by the storage collaborator; the email is case-folded to
/// lowercase before it is ever persisted or looked up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    /// Argon2 hash. None for accounts that never set a password (OAuth).
    pub password_hash: Option<String>,
    pub enabled: bool,
    pub source: LoginSource,
    pub tenant_id: Option<String>,
    pub current_workspace_id: Option<String>,
    pub workspace_ids: HashSet<String>,
    pub policies: HashSet<Policy>,
    /// Informational `{role}:{uuid}` marker written for invited users. Never
    /// verified by any operation in this core.
    pub invite_marker: Option<String>,
    pub password_reset_initiated: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user. The email is folded to lowercase here so no caller
    /// can slip a mixed-case address past the uniqueness rule.
    pub fn new(email: impl Into<String>, source: LoginSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into().to_lowercase(),
            name: None,
            password_hash: None,
            enabled: true,
            source,
            tenant_id: None,
            current_workspace_id: None,
            workspace_ids: HashSet::new(),
            policies: HashSet::new(),
            invite_marker: None,
            password_reset_initiated: false,
            created_at: Utc::now(),
        }
    }

    /// Display name with the email as fallback, used in mail templates.
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) if !name.is_empty() => name,
            _ => &self.email,
        }
    }

    /// Extract the domain portion of the email (after the first `@`).
    pub fn email_domain(&self) -> Option<&str> {
        email_domain(&self.email)
    }
}

/// Domain portion of an email address, after the first `@`.
pub(crate) fn email_domain(email: &str) -> Option<&str> {
    email.split_once('@').map(|(_, domain)| domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_lowercases_email() {
        let user = User::new("Mixed.Case@Example.COM", LoginSource::Form);
        assert_eq!(user.email, "mixed.case@example.com");
        assert!(user.enabled);
        assert!(user.policies.is_empty());
    }

    #[test]
    fn test_email_domain() {
        let user = User::new("a@x.com", LoginSource::Form);
        assert_eq!(user.email_domain(), Some("x.com"));

        let odd = User::new("a@b@c", LoginSource::Form);
        assert_eq!(odd.email_domain(), Some("b@c"));
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut user = User::new("a@x.com", LoginSource::Form);
        assert_eq!(user.display_name(), "a@x.com");

        user.name = Some("Ada".to_string());
        assert_eq!(user.display_name(), "Ada");
    }
}
