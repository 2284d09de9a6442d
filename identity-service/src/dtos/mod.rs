//! Request/result shapes crossing the boundary with the request-handling
//! layer.

use serde::{Deserialize, Serialize};

use crate::models::{LoginSource, User};

/// Self-service signup input. Carries the plaintext password; the flow
/// hashes it before any lookup or persistence.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub name: Option<String>,
    pub password: Option<String>,
    pub source: LoginSource,
}

/// Signup outcome: the persisted user, plus the id of the freshly
/// provisioned default workspace when one was created.
#[derive(Debug, Clone, Serialize)]
pub struct SignupResult {
    pub user: User,
    pub default_workspace_id: Option<String>,
}

/// Bulk workspace invitation input.
#[derive(Debug, Clone, Deserialize)]
pub struct InviteUsersRequest {
    pub usernames: Vec<String>,
    pub permission_group_id: String,
}
