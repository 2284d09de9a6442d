//! Storage seams for the identity core.
//!
//! Durable storage itself is out of scope; these traits are the surface this
//! core consumes, with in-memory implementations used by tests and local
//! development.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;

use crate::models::{PasswordResetToken, Permission, User, UserData};
use crate::services::ServiceError;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Exact-match lookup on the stored email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;

    /// Case-insensitive lookup, used as a fallback for user-typed addresses.
    async fn find_by_case_insensitive_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, ServiceError>;

    async fn find_by_email_and_tenant(
        &self,
        email: &str,
        tenant_id: &str,
    ) -> Result<Option<User>, ServiceError>;

    /// Upsert keyed by email; email uniqueness is this collaborator's job.
    async fn save(&self, user: &User) -> Result<User, ServiceError>;

    async fn find_all_by_emails(
        &self,
        emails: &HashSet<String>,
        permission: Permission,
    ) -> Result<Vec<User>, ServiceError>;

    async fn is_users_empty(&self) -> Result<bool, ServiceError>;
}

#[async_trait]
pub trait PasswordResetTokenRepository: Send + Sync {
    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<PasswordResetToken>, ServiceError>;

    async fn save(&self, token: &PasswordResetToken) -> Result<PasswordResetToken, ServiceError>;

    /// Delete the record for this email. Returns whether a record existed.
    async fn delete_by_email(&self, email: &str) -> Result<bool, ServiceError>;
}

#[async_trait]
pub trait UserDataRepository: Send + Sync {
    /// Auxiliary profile data for an email; a default record when absent.
    async fn get_for_email(&self, email: &str) -> Result<UserData, ServiceError>;
}

// ============================================================================
// In-memory implementations
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: DashMap<String, User>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.users.get(email).map(|entry| entry.clone()))
    }

    async fn find_by_case_insensitive_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, ServiceError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.key().eq_ignore_ascii_case(email))
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_email_and_tenant(
        &self,
        email: &str,
        tenant_id: &str,
    ) -> Result<Option<User>, ServiceError> {
        Ok(self
            .users
            .get(email)
            .filter(|entry| entry.tenant_id.as_deref() == Some(tenant_id))
            .map(|entry| entry.clone()))
    }

    async fn save(&self, user: &User) -> Result<User, ServiceError> {
        self.users.insert(user.email.clone(), user.clone());
        Ok(user.clone())
    }

    async fn find_all_by_emails(
        &self,
        emails: &HashSet<String>,
        _permission: Permission,
    ) -> Result<Vec<User>, ServiceError> {
        Ok(self
            .users
            .iter()
            .filter(|entry| emails.contains(entry.key()))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn is_users_empty(&self) -> Result<bool, ServiceError> {
        Ok(self.users.is_empty())
    }
}

#[derive(Default)]
pub struct InMemoryPasswordResetTokenRepository {
    tokens: DashMap<String, PasswordResetToken>,
}

impl InMemoryPasswordResetTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PasswordResetTokenRepository for InMemoryPasswordResetTokenRepository {
    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<PasswordResetToken>, ServiceError> {
        Ok(self.tokens.get(email).map(|entry| entry.clone()))
    }

    async fn save(&self, token: &PasswordResetToken) -> Result<PasswordResetToken, ServiceError> {
        self.tokens.insert(token.email.clone(), token.clone());
        Ok(token.clone())
    }

    async fn delete_by_email(&self, email: &str) -> Result<bool, ServiceError> {
        Ok(self.tokens.remove(email).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryUserDataRepository {
    data: DashMap<String, UserData>,
}

impl InMemoryUserDataRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, email: &str, data: UserData) {
        self.data.insert(email.to_string(), data);
    }
}

#[async_trait]
impl UserDataRepository for InMemoryUserDataRepository {
    async fn get_for_email(&self, email: &str) -> Result<UserData, ServiceError> {
        Ok(self
            .data
            .get(email)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LoginSource;

    #[tokio::test]
    async fn test_case_insensitive_lookup() {
        let repo = InMemoryUserRepository::new();
        repo.save(&User::new("a@x.com", LoginSource::Form))
            .await
            .unwrap();

        assert!(repo.find_by_email("A@X.com").await.unwrap().is_none());
        assert!(repo
            .find_by_case_insensitive_email("A@X.com")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_reset_token_delete_reports_absence() {
        let repo = InMemoryPasswordResetTokenRepository::new();
        repo.save(&PasswordResetToken::new("a@x.com")).await.unwrap();

        assert!(repo.delete_by_email("a@x.com").await.unwrap());
        assert!(!repo.delete_by_email("a@x.com").await.unwrap());
    }
}
