//! Collaborator seams consumed by the identity flows: workspace lifecycle,
//! permission-group authorization, session management, and analytics.
//!
//! Each trait ships with an in-memory/recording implementation in the same
//! style as the mail sender mock; the real services live elsewhere.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Mutex;

use crate::models::{Permission, PermissionGroup, User, UserData, Workspace};
use crate::services::ServiceError;

#[async_trait]
pub trait WorkspaceService: Send + Sync {
    /// Provision the default workspace owned by a freshly created user.
    async fn create_default(&self, owner: &User) -> Result<Workspace, ServiceError>;

    async fn get_by_id(&self, id: &str) -> Result<Workspace, ServiceError>;
}

#[async_trait]
pub trait PermissionGroupService: Send + Sync {
    /// Resolve a group by id under the given capability check. `None` when
    /// the group does not exist; `Unauthorized` when the actor lacks the
    /// capability.
    async fn get_by_id(
        &self,
        id: &str,
        permission: Permission,
    ) -> Result<Option<PermissionGroup>, ServiceError>;

    /// Assign the group to every user in one bulk operation.
    async fn bulk_assign(
        &self,
        group: &PermissionGroup,
        users: &[User],
    ) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait SessionService: Send + Sync {
    /// The actor on whose behalf the current operation runs.
    async fn current_user(&self) -> Result<User, ServiceError>;

    async fn invalidate_all_sessions(&self, email: &str) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn identify(&self, user: &User, data: &UserData) -> Result<(), ServiceError>;

    async fn record_event(
        &self,
        name: &str,
        actor_email: &str,
        properties: serde_json::Value,
    ) -> Result<(), ServiceError>;
}

// ============================================================================
// In-memory implementations
// ============================================================================

#[derive(Default)]
pub struct InMemoryWorkspaceService {
    workspaces: DashMap<String, Workspace>,
}

impl InMemoryWorkspaceService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, workspace: Workspace) {
        self.workspaces.insert(workspace.id.clone(), workspace);
    }
}

#[async_trait]
impl WorkspaceService for InMemoryWorkspaceService {
    async fn create_default(&self, owner: &User) -> Result<Workspace, ServiceError> {
        let workspace = Workspace::new(format!("{}'s apps", owner.display_name()));
        self.workspaces
            .insert(workspace.id.clone(), workspace.clone());
        Ok(workspace)
    }

    async fn get_by_id(&self, id: &str) -> Result<Workspace, ServiceError> {
        self.workspaces
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| ServiceError::not_found("workspace", id))
    }
}

#[derive(Default)]
pub struct InMemoryPermissionGroupService {
    groups: DashMap<String, PermissionGroup>,
    bulk_assignments: Mutex<Vec<(String, Vec<String>)>>,
}

impl InMemoryPermissionGroupService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, group: PermissionGroup) {
        self.groups.insert(group.id.clone(), group);
    }

    /// Recorded bulk assignments: (group id, member emails) per call.
    pub fn bulk_assignments(&self) -> Vec<(String, Vec<String>)> {
        self.bulk_assignments.lock().unwrap().clone()
    }
}

#[async_trait]
impl PermissionGroupService for InMemoryPermissionGroupService {
    async fn get_by_id(
        &self,
        id: &str,
        _permission: Permission,
    ) -> Result<Option<PermissionGroup>, ServiceError> {
        Ok(self.groups.get(id).map(|entry| entry.clone()))
    }

    async fn bulk_assign(
        &self,
        group: &PermissionGroup,
        users: &[User],
    ) -> Result<(), ServiceError> {
        let emails = users.iter().map(|u| u.email.clone()).collect();
        self.bulk_assignments
            .lock()
            .unwrap()
            .push((group.id.clone(), emails));
        Ok(())
    }
}

/// Session service backed by a fixed actor, recording invalidations.
#[derive(Default)]
pub struct StaticSessionService {
    current: Mutex<Option<User>>,
    invalidated: Mutex<Vec<String>>,
}

impl StaticSessionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_current_user(user: User) -> Self {
        Self {
            current: Mutex::new(Some(user)),
            invalidated: Mutex::new(Vec::new()),
        }
    }

    pub fn set_current_user(&self, user: User) {
        *self.current.lock().unwrap() = Some(user);
    }

    pub fn invalidated(&self) -> Vec<String> {
        self.invalidated.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionService for StaticSessionService {
    async fn current_user(&self) -> Result<User, ServiceError> {
        self.current
            .lock()
            .unwrap()
            .clone()
            .ok_or(ServiceError::Unauthorized("no active session"))
    }

    async fn invalidate_all_sessions(&self, email: &str) -> Result<(), ServiceError> {
        self.invalidated.lock().unwrap().push(email.to_string());
        Ok(())
    }
}

/// Recording analytics sink, with a failure toggle to exercise the
/// non-fatal paths.
#[derive(Default)]
pub struct RecordingAnalyticsSink {
    identified: Mutex<Vec<String>>,
    events: Mutex<Vec<(String, String, serde_json::Value)>>,
    failing: Mutex<bool>,
}

impl RecordingAnalyticsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn identified(&self) -> Vec<String> {
        self.identified.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<(String, String, serde_json::Value)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalyticsSink for RecordingAnalyticsSink {
    async fn identify(&self, user: &User, _data: &UserData) -> Result<(), ServiceError> {
        if *self.failing.lock().unwrap() {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "simulated analytics failure"
            )));
        }
        self.identified.lock().unwrap().push(user.email.clone());
        Ok(())
    }

    async fn record_event(
        &self,
        name: &str,
        actor_email: &str,
        properties: serde_json::Value,
    ) -> Result<(), ServiceError> {
        if *self.failing.lock().unwrap() {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "simulated analytics failure"
            )));
        }
        self.events.lock().unwrap().push((
            name.to_string(),
            actor_email.to_string(),
            properties,
        ));
        Ok(())
    }
}
