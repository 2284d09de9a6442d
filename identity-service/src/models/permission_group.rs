//! Permission group domain object, owned by the authorization collaborator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGroup {
    pub id: String,
    pub name: String,
    /// Set when this group is a workspace's default group. Invitations may
    /// only target default groups.
    pub default_workspace_id: Option<String>,
}

impl PermissionGroup {
    pub fn new(name: impl Into<String>, default_workspace_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            default_workspace_id,
        }
    }

    pub fn is_workspace_default(&self) -> bool {
        self.default_workspace_id
            .as_deref()
            .is_some_and(|id| !id.is_empty())
    }
}
