//! Authorization policy grants attached to users at creation time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Permissions this core knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    /// Manage one's own user record.
    ManageOwnAccount,
    /// Manage the workspaces one belongs to.
    ManageOwnWorkspaces,
    /// Instance-level administration, granted only to configured admins.
    ManageInstance,
    /// Required of an actor assigning permission groups to other users.
    AssignPermissionGroups,
    /// Scopes reads of user records by the storage collaborator.
    ReadUsers,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageOwnAccount => "manage-own-account",
            Permission::ManageOwnWorkspaces => "manage-own-workspaces",
            Permission::ManageInstance => "manage-instance",
            Permission::AssignPermissionGroups => "assign-permission-groups",
            Permission::ReadUsers => "read-users",
        }
    }
}

/// A permission bound to a subject (the user's email).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Policy {
    pub permission: Permission,
    pub subject: String,
}

impl Policy {
    pub fn new(permission: Permission, subject: impl Into<String>) -> Self {
        Self {
            permission,
            subject: subject.into(),
        }
    }
}

/// The base grant set every user receives at creation.
pub fn base_user_policies(email: &str) -> HashSet<Policy> {
    [
        Permission::ManageOwnAccount,
        Permission::ManageOwnWorkspaces,
    ]
    .into_iter()
    .map(|permission| Policy::new(permission, email))
    .collect()
}

/// The additional grant set for users created in a privileged context.
pub fn instance_admin_policies(email: &str) -> HashSet<Policy> {
    HashSet::from([Policy::new(Permission::ManageInstance, email)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_policies_bound_to_subject() {
        let policies = base_user_policies("a@x.com");
        assert_eq!(policies.len(), 2);
        assert!(policies.iter().all(|p| p.subject == "a@x.com"));
        assert!(policies.contains(&Policy::new(Permission::ManageOwnAccount, "a@x.com")));
        assert!(policies.contains(&Policy::new(Permission::ManageOwnWorkspaces, "a@x.com")));
    }

    #[test]
    fn test_admin_policies() {
        let policies = instance_admin_policies("root@x.com");
        assert_eq!(policies.len(), 1);
        assert!(policies.contains(&Policy::new(Permission::ManageInstance, "root@x.com")));
    }
}
