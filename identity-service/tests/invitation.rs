//! Bulk workspace invitation: fan-out branching, the single bulk grant, and
//! the detached analytics event.

mod common;

use std::time::Duration;

use common::{harness, test_config, Harness};
use identity_service::dtos::InviteUsersRequest;
use identity_service::models::{
    LoginSource, Permission, PermissionGroup, Policy, User, Workspace,
};
use identity_service::services::{ServiceError, UserRepository};

struct InviteSetup {
    h: Harness,
    group_id: String,
}

/// Actor with a session, one workspace, and its default permission group.
fn invite_setup(config: identity_service::config::IdentityConfig) -> InviteSetup {
    let h = harness(config);

    let mut actor = User::new("boss@x.com", LoginSource::Form);
    actor.name = Some("Boss".to_string());
    h.sessions.set_current_user(actor);

    let workspace = Workspace::new("Team");
    let group = PermissionGroup::new("Developer", Some(workspace.id.clone()));
    let group_id = group.id.clone();
    h.workspaces.put(workspace);
    h.groups.put(group);

    InviteSetup { h, group_id }
}

fn request(emails: &[&str], group_id: &str) -> InviteUsersRequest {
    InviteUsersRequest {
        usernames: emails.iter().map(|e| e.to_string()).collect(),
        permission_group_id: group_id.to_string(),
    }
}

#[tokio::test]
async fn invite_mixed_batch_returns_all_users_and_one_bulk_grant() {
    let InviteSetup { h, group_id } = invite_setup(test_config());

    let existing = User::new("old@x.com", LoginSource::Form);
    h.users.save(&existing).await.unwrap();

    let invited = h
        .user_service
        .invite_users(
            request(&["old@x.com", "new1@x.com", "new2@x.com"], &group_id),
            "https://app.x",
        )
        .await
        .unwrap();

    assert_eq!(invited.len(), 3);

    // Exactly one bulk grant covering every invited user
    let grants = h.groups.bulk_assignments();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].0, group_id);
    assert_eq!(grants[0].1.len(), 3);
    for email in ["old@x.com", "new1@x.com", "new2@x.com"] {
        assert!(grants[0].1.contains(&email.to_string()));
    }

    // Existing user kept as-is; new users provisioned disabled with markers
    let old = h.users.find_by_email("old@x.com").await.unwrap().unwrap();
    assert!(old.enabled);
    for email in ["new1@x.com", "new2@x.com"] {
        let user = h.users.find_by_email(email).await.unwrap().unwrap();
        assert!(!user.enabled);
        assert!(user.invite_marker.as_deref().unwrap().starts_with("Developer:"));
    }

    // One notification per invitee, branch-dependent template
    let sent = h.email.sent();
    assert_eq!(sent.len(), 3);
    let to_existing = sent.iter().find(|m| m.to == "old@x.com").unwrap();
    assert!(to_existing.params["inviteUrl"].contains("/applications#"));
    let to_new = sent.iter().find(|m| m.to == "new1@x.com").unwrap();
    assert!(to_new.params["inviteUrl"].contains("/user/signup?email="));
}

#[tokio::test]
async fn invite_link_url_encodes_the_email() {
    let InviteSetup { h, group_id } = invite_setup(test_config());

    let invited = h
        .user_service
        .invite_users(request(&["B@Y.com"], &group_id), "https://app.example")
        .await
        .unwrap();

    assert_eq!(invited.len(), 1);
    let user = h.users.find_by_email("b@y.com").await.unwrap().unwrap();
    assert_eq!(user.email, "b@y.com");
    assert!(!user.enabled);

    let sent = h.email.sent();
    assert_eq!(
        sent[0].params["inviteUrl"],
        "https://app.example/user/signup?email=b%40y.com"
    );
}

#[tokio::test]
async fn invite_rejects_missing_parameters() {
    let InviteSetup { h, group_id } = invite_setup(test_config());

    assert!(matches!(
        h.user_service
            .invite_users(request(&["a@x.com"], &group_id), "  ")
            .await,
        Err(ServiceError::InvalidParameter("origin"))
    ));
    assert!(matches!(
        h.user_service
            .invite_users(request(&[], &group_id), "https://app.x")
            .await,
        Err(ServiceError::InvalidParameter("usernames"))
    ));
    assert!(matches!(
        h.user_service
            .invite_users(request(&["a@x.com"], ""), "https://app.x")
            .await,
        Err(ServiceError::InvalidParameter("permissionGroupId"))
    ));
}

#[tokio::test]
async fn invite_requires_an_existing_default_group() {
    let InviteSetup { h, .. } = invite_setup(test_config());

    assert!(matches!(
        h.user_service
            .invite_users(request(&["a@x.com"], "no-such-group"), "https://app.x")
            .await,
        Err(ServiceError::NotFound { .. })
    ));

    // A group that is not a workspace default is treated as absent
    let non_default = PermissionGroup::new("Ad-hoc", None);
    let id = non_default.id.clone();
    h.groups.put(non_default);
    assert!(matches!(
        h.user_service
            .invite_users(request(&["a@x.com"], &id), "https://app.x")
            .await,
        Err(ServiceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn invite_requires_a_session_actor() {
    let h = harness(test_config());
    let workspace = Workspace::new("Team");
    let group = PermissionGroup::new("Developer", Some(workspace.id.clone()));
    let group_id = group.id.clone();
    h.workspaces.put(workspace);
    h.groups.put(group);

    assert!(matches!(
        h.user_service
            .invite_users(request(&["a@x.com"], &group_id), "https://app.x")
            .await,
        Err(ServiceError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn invite_branch_failure_aborts_the_batch_before_any_grant() {
    let InviteSetup { h, group_id } = invite_setup(test_config());
    h.email.fail_next_send();

    let result = h
        .user_service
        .invite_users(
            request(&["new1@x.com", "new2@x.com"], &group_id),
            "https://app.x",
        )
        .await;

    assert!(result.is_err());
    assert!(h.groups.bulk_assignments().is_empty());
}

#[tokio::test]
async fn invite_emits_detached_analytics_event() {
    let InviteSetup { h, group_id } = invite_setup(test_config());

    h.user_service
        .invite_users(
            request(&["new1@x.com", "new2@x.com"], &group_id),
            "https://app.x",
        )
        .await
        .unwrap();

    // The event is spawned off the caller's path
    tokio::time::sleep(Duration::from_millis(20)).await;
    let events = h.analytics.events();
    assert_eq!(events.len(), 1);
    let (name, actor, properties) = &events[0];
    assert_eq!(name, "execute_INVITE_USERS");
    assert_eq!(actor, "boss@x.com");
    assert_eq!(properties["numberOfUsersInvited"], 2);
    assert_eq!(properties["userEmails"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn invite_analytics_failure_does_not_affect_result() {
    let InviteSetup { h, group_id } = invite_setup(test_config());
    h.analytics.set_failing(true);

    let invited = h
        .user_service
        .invite_users(request(&["new1@x.com"], &group_id), "https://app.x")
        .await
        .unwrap();
    assert_eq!(invited.len(), 1);
}

#[tokio::test]
async fn invited_admin_email_receives_instance_admin_grant() {
    let mut config = test_config();
    config.admin_emails.insert("root@x.com".to_string());
    let InviteSetup { h, group_id } = invite_setup(config);

    h.user_service
        .invite_users(request(&["Root@X.com"], &group_id), "https://app.x")
        .await
        .unwrap();

    let user = h.users.find_by_email("root@x.com").await.unwrap().unwrap();
    assert!(user
        .policies
        .contains(&Policy::new(Permission::ManageInstance, "root@x.com")));
}

#[tokio::test]
async fn invite_duplicates_are_not_deduplicated() {
    let InviteSetup { h, group_id } = invite_setup(test_config());
    let existing = User::new("old@x.com", LoginSource::Form);
    h.users.save(&existing).await.unwrap();

    let invited = h
        .user_service
        .invite_users(
            request(&["old@x.com", "OLD@X.COM"], &group_id),
            "https://app.x",
        )
        .await
        .unwrap();

    // Both entries resolve to the same user; the caller asked twice
    assert_eq!(invited.len(), 2);
    assert_eq!(h.groups.bulk_assignments()[0].1.len(), 2);
}
