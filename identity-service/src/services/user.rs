//! User lifecycle flows: creation, self-service signup, and bulk workspace
//! invitations.

use futures::future::try_join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{IdentityConfig, DEFAULT_ORIGIN_HEADER};
use crate::dtos::{InviteUsersRequest, SignupRequest, SignupResult};
use crate::models::{
    base_user_policies, instance_admin_policies, LoginSource, Permission, PermissionGroup, User,
    Workspace,
};
use crate::services::{
    AnalyticsSink, EmailSender, PermissionGroupService, ServiceError, SessionService, SignupDecision,
    SignupGate, UserDataRepository, UserRepository, WorkspaceService,
};
use crate::utils::{hash_password, Password};

const WELCOME_USER_EMAIL_TEMPLATE: &str = "email/welcomeUserTemplate.html";
const WELCOME_USER_EMAIL_SUBJECT: &str = "Welcome aboard";
const INVITE_USER_EMAIL_TEMPLATE: &str = "email/inviteUserCreatorTemplate.html";
const INVITE_USER_EMAIL_SUBJECT: &str = "You have been invited";
const USER_ADDED_TO_WORKSPACE_EMAIL_TEMPLATE: &str =
    "email/inviteExistingUserToWorkspaceTemplate.html";
const USER_ADDED_TO_WORKSPACE_EMAIL_SUBJECT: &str = "You have been added to a new workspace";

const INVITE_USERS_EVENT: &str = "execute_INVITE_USERS";

pub struct UserService {
    config: Arc<IdentityConfig>,
    users: Arc<dyn UserRepository>,
    user_data: Arc<dyn UserDataRepository>,
    workspaces: Arc<dyn WorkspaceService>,
    permission_groups: Arc<dyn PermissionGroupService>,
    email: Arc<dyn EmailSender>,
    analytics: Arc<dyn AnalyticsSink>,
    sessions: Arc<dyn SessionService>,
}

impl UserService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<IdentityConfig>,
        users: Arc<dyn UserRepository>,
        user_data: Arc<dyn UserDataRepository>,
        workspaces: Arc<dyn WorkspaceService>,
        permission_groups: Arc<dyn PermissionGroupService>,
        email: Arc<dyn EmailSender>,
        analytics: Arc<dyn AnalyticsSink>,
        sessions: Arc<dyn SessionService>,
    ) -> Self {
        Self {
            config,
            users,
            user_data,
            workspaces,
            permission_groups,
            email,
            analytics,
            sessions,
        }
    }

    /// Lookup within the default tenant.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        self.find_by_email_and_tenant(email, &self.config.default_tenant_id)
            .await
    }

    pub async fn find_by_email_and_tenant(
        &self,
        email: &str,
        tenant_id: &str,
    ) -> Result<Option<User>, ServiceError> {
        self.users.find_by_email_and_tenant(email, tenant_id).await
    }

    /// Normalize and persist a new user with its computed policy grants.
    ///
    /// The caller has already hashed any password; no hashing happens here.
    /// The persisted record is re-read together with its profile data and
    /// forwarded to analytics; an identify failure is logged, not fatal.
    pub async fn create_user(&self, mut user: User, privileged: bool) -> Result<User, ServiceError> {
        user.email = user.email.to_lowercase();

        user.policies.extend(base_user_policies(&user.email));
        if privileged {
            user.policies.extend(instance_admin_policies(&user.email));
        }

        if user.tenant_id.is_none() {
            user.tenant_id = Some(self.config.default_tenant_id.clone());
        }

        self.users.save(&user).await?;

        let persisted = self
            .users
            .find_by_email(&user.email)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", user.email.as_str()))?;

        let profile = self.user_data.get_for_email(&persisted.email).await?;
        if let Err(e) = self.analytics.identify(&persisted, &profile).await {
            tracing::warn!(error = %e, email = %persisted.email, "Analytics identify failed during user creation");
        }

        Ok(persisted)
    }

    /// Self-service signup: claim a pre-provisioned account or create a new
    /// one behind the signup gate.
    pub async fn signup(
        &self,
        request: SignupRequest,
        origin_header: &str,
    ) -> Result<SignupResult, ServiceError> {
        let origin = if origin_header.trim().is_empty() {
            DEFAULT_ORIGIN_HEADER
        } else {
            origin_header
        };

        // Form signups must carry a password, hashed before any lookup
        let password_hash = match request.source {
            LoginSource::Form => {
                let password = request
                    .password
                    .as_deref()
                    .filter(|p| !p.trim().is_empty())
                    .ok_or(ServiceError::InvalidCredentials)?;
                Some(hash_password(&Password::new(password.to_string()))?.into_string())
            }
            LoginSource::Oauth => None,
        };

        let result = match self
            .users
            .find_by_case_insensitive_email(&request.email)
            .await?
        {
            Some(mut saved) => {
                if saved.enabled {
                    return Err(ServiceError::UserAlreadyExists(saved.email));
                }
                // A provisioned-but-unclaimed account: enable it and take the
                // new credentials. Its workspace already exists, so none is
                // provisioned here.
                saved.enabled = true;
                saved.password_hash = password_hash;
                let claimed = self.users.save(&saved).await?;
                SignupResult {
                    user: claimed,
                    default_workspace_id: None,
                }
            }
            None => {
                let email = request.email.to_lowercase();
                let privileged =
                    match SignupGate::evaluate(&self.config, &email, request.source) {
                        SignupDecision::Allowed { privileged } => privileged,
                        SignupDecision::Denied(reason) => {
                            tracing::info!(email = %email, ?reason, "Signup denied");
                            return Err(ServiceError::SignupDisabled);
                        }
                    };

                let mut user = User::new(email, request.source);
                user.name = request.name.clone();
                user.password_hash = password_hash;

                let created = self.create_user(user, privileged).await?;

                tracing::debug!(email = %created.email, "Creating blank default workspace for user");
                let workspace = self.workspaces.create_default(&created).await?;

                // Re-read so workspace-side updates to the record are visible
                let user = self
                    .find_by_email(&created.email)
                    .await?
                    .unwrap_or(created);
                SignupResult {
                    user,
                    default_workspace_id: Some(workspace.id),
                }
            }
        };

        if self.config.mail.welcome_email_enabled {
            self.send_welcome_email(&result.user, origin).await;
        }

        Ok(result)
    }

    /// Welcome mail after signup. Delivery failure is swallowed and logged;
    /// signup success never depends on it.
    async fn send_welcome_email(&self, user: &User, origin: &str) {
        let params = HashMap::from([
            ("firstName".to_string(), user.display_name().to_string()),
            ("inviteUrl".to_string(), origin.to_string()),
        ]);
        if let Err(e) = self
            .email
            .send_mail(
                &user.email,
                WELCOME_USER_EMAIL_SUBJECT,
                WELCOME_USER_EMAIL_TEMPLATE,
                &params,
            )
            .await
        {
            tracing::error!(error = %e, email = %user.email, "Ignoring error: unable to send welcome email");
        }
    }

    /// Invite a batch of emails into a workspace's default permission group.
    ///
    /// Shared inputs (actor, group, workspace) are resolved once. Per-email
    /// branches run concurrently with no ordering guarantee; the first
    /// failure aborts the whole batch. Exactly one bulk grant covers the
    /// complete user list before it is returned.
    pub async fn invite_users(
        &self,
        request: InviteUsersRequest,
        origin_header: &str,
    ) -> Result<Vec<User>, ServiceError> {
        if origin_header.trim().is_empty() {
            return Err(ServiceError::InvalidParameter("origin"));
        }
        if request.usernames.is_empty() {
            return Err(ServiceError::InvalidParameter("usernames"));
        }
        if request.permission_group_id.trim().is_empty() {
            return Err(ServiceError::InvalidParameter("permissionGroupId"));
        }

        let emails: Vec<String> = request
            .usernames
            .iter()
            .map(|username| username.to_lowercase())
            .collect();

        let actor = self.sessions.current_user().await?;

        // The actor needs the assign capability, and invitations only target
        // a workspace's default group
        let group = self
            .permission_groups
            .get_by_id(
                &request.permission_group_id,
                Permission::AssignPermissionGroups,
            )
            .await?
            .filter(PermissionGroup::is_workspace_default)
            .ok_or_else(|| {
                ServiceError::not_found("permission group", request.permission_group_id.as_str())
            })?;

        let workspace_id = group.default_workspace_id.clone().ok_or_else(|| {
            ServiceError::not_found("workspace", request.permission_group_id.as_str())
        })?;
        let workspace = self.workspaces.get_by_id(&workspace_id).await?;

        let invited = try_join_all(emails.iter().map(|email| {
            self.invite_one(email, origin_header, &workspace, &actor, &group)
        }))
        .await?;

        self.permission_groups.bulk_assign(&group, &invited).await?;

        // Detached analytics event; its outcome never reaches the caller
        let analytics = Arc::clone(&self.analytics);
        let actor_email = actor.email.clone();
        let properties = serde_json::json!({
            "numberOfUsersInvited": invited.len(),
            "userEmails": invited.iter().map(|u| u.email.clone()).collect::<Vec<_>>(),
        });
        tokio::spawn(async move {
            if let Err(e) = analytics
                .record_event(INVITE_USERS_EVENT, &actor_email, properties)
                .await
            {
                tracing::warn!(error = %e, "Failed to record invite analytics event");
            }
        });

        Ok(invited)
    }

    async fn invite_one(
        &self,
        email: &str,
        origin: &str,
        workspace: &Workspace,
        actor: &User,
        group: &PermissionGroup,
    ) -> Result<User, ServiceError> {
        if let Some(existing) = self.users.find_by_email(email).await? {
            tracing::debug!(email = %existing.email, workspace = %workspace.name,
                "Notifying existing user of workspace membership");

            let params = email_params(workspace, actor, origin, false);
            self.email
                .send_mail(
                    &existing.email,
                    USER_ADDED_TO_WORKSPACE_EMAIL_SUBJECT,
                    USER_ADDED_TO_WORKSPACE_EMAIL_TEMPLATE,
                    &params,
                )
                .await?;

            return Ok(existing);
        }

        self.create_invited_user(email, origin, workspace, actor, &group.name)
            .await
    }

    async fn create_invited_user(
        &self,
        email: &str,
        origin: &str,
        workspace: &Workspace,
        inviter: &User,
        role: &str,
    ) -> Result<User, ServiceError> {
        let mut user = User::new(email, LoginSource::Form);

        // Disabled until the invitee signs up and claims the account
        user.enabled = false;

        // Informational persona marker; nothing in this core verifies it
        user.invite_marker = Some(format!("{}:{}", role, Uuid::new_v4()));

        let privileged = self.config.is_admin_email(&user.email);
        let created = self.create_user(user, privileged).await?;

        let invite_url = format!(
            "{}/user/signup?email={}",
            origin,
            urlencoding::encode(&created.email)
        );
        tracing::debug!(email = %created.email, "Sending invite email to new user");

        let params = email_params(workspace, inviter, &invite_url, true);
        self.email
            .send_mail(
                &created.email,
                INVITE_USER_EMAIL_SUBJECT,
                INVITE_USER_EMAIL_TEMPLATE,
                &params,
            )
            .await?;

        Ok(created)
    }

    /// Switch the actor's current workspace, validated against membership.
    pub async fn switch_current_workspace(
        &self,
        workspace_id: &str,
    ) -> Result<User, ServiceError> {
        if workspace_id.trim().is_empty() {
            return Err(ServiceError::InvalidParameter("workspaceId"));
        }

        let actor = self.sessions.current_user().await?;
        let mut user = self
            .users
            .find_by_email(&actor.email)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", actor.email.as_str()))?;

        if user.current_workspace_id.as_deref() == Some(workspace_id) {
            return Ok(user);
        }

        if user.workspace_ids.is_empty() {
            return Err(ServiceError::BadRequest(
                "user does not belong to any workspace",
            ));
        }

        if !user.workspace_ids.contains(workspace_id) {
            return Err(ServiceError::BadRequest(
                "user does not belong to this workspace",
            ));
        }

        user.current_workspace_id = Some(workspace_id.to_string());
        self.users.save(&user).await
    }

    pub async fn get_all_by_emails(
        &self,
        emails: &HashSet<String>,
    ) -> Result<Vec<User>, ServiceError> {
        self.users
            .find_all_by_emails(emails, Permission::ReadUsers)
            .await
    }

    pub async fn is_users_empty(&self) -> Result<bool, ServiceError> {
        self.users.is_users_empty().await
    }

    /// Enumerating every user is intentionally disabled.
    pub async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        Err(ServiceError::UnsupportedOperation)
    }
}

/// Mail template parameters shared by the invitation branches.
fn email_params(
    workspace: &Workspace,
    inviter: &User,
    invite_url: &str,
    is_new_user: bool,
) -> HashMap<String, String> {
    let mut params = HashMap::new();
    params.insert(
        "Inviter_First_Name".to_string(),
        inviter.display_name().to_string(),
    );
    params.insert("inviter_org_name".to_string(), workspace.name.clone());
    if is_new_user {
        params.insert("inviteUrl".to_string(), invite_url.to_string());
    } else {
        params.insert(
            "inviteUrl".to_string(),
            format!("{}/applications#{}", invite_url, workspace.id),
        );
    }
    params
}
