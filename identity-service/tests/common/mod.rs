//! Shared test harness: the identity services wired to in-memory
//! collaborators.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Once};

use identity_service::config::{Environment, IdentityConfig, MailConfig};
use identity_service::services::{
    InMemoryPasswordResetTokenRepository, InMemoryPermissionGroupService,
    InMemoryUserDataRepository, InMemoryUserRepository, InMemoryWorkspaceService,
    PasswordResetService, RecordingAnalyticsSink, RecordingEmailSender, StaticSessionService,
    UrlTokenCodec, UserService,
};

pub struct Harness {
    pub config: Arc<IdentityConfig>,
    pub users: Arc<InMemoryUserRepository>,
    pub tokens: Arc<InMemoryPasswordResetTokenRepository>,
    pub user_data: Arc<InMemoryUserDataRepository>,
    pub workspaces: Arc<InMemoryWorkspaceService>,
    pub groups: Arc<InMemoryPermissionGroupService>,
    pub email: Arc<RecordingEmailSender>,
    pub analytics: Arc<RecordingAnalyticsSink>,
    pub sessions: Arc<StaticSessionService>,
    pub user_service: UserService,
    pub reset_service: PasswordResetService,
}

pub fn test_config() -> IdentityConfig {
    IdentityConfig {
        environment: Environment::Dev,
        service_name: "identity-service".to_string(),
        log_level: "info".to_string(),
        admin_emails: HashSet::new(),
        signup_disabled: false,
        allowed_domains: Vec::new(),
        oauth_allowed_domains: Vec::new(),
        default_tenant_id: "default".to_string(),
        mail: MailConfig {
            welcome_email_enabled: true,
            smtp_user: String::new(),
            smtp_app_password: String::new(),
        },
    }
}

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn harness(config: IdentityConfig) -> Harness {
    init_tracing();
    let config = Arc::new(config);
    let users = Arc::new(InMemoryUserRepository::new());
    let tokens = Arc::new(InMemoryPasswordResetTokenRepository::new());
    let user_data = Arc::new(InMemoryUserDataRepository::new());
    let workspaces = Arc::new(InMemoryWorkspaceService::new());
    let groups = Arc::new(InMemoryPermissionGroupService::new());
    let email = Arc::new(RecordingEmailSender::new());
    let analytics = Arc::new(RecordingAnalyticsSink::new());
    let sessions = Arc::new(StaticSessionService::new());

    let user_service = UserService::new(
        config.clone(),
        users.clone(),
        user_data.clone(),
        workspaces.clone(),
        groups.clone(),
        email.clone(),
        analytics.clone(),
        sessions.clone(),
    );
    let reset_service = PasswordResetService::new(
        users.clone(),
        tokens.clone(),
        Arc::new(UrlTokenCodec::new()),
        email.clone(),
        sessions.clone(),
    );

    Harness {
        config,
        users,
        tokens,
        user_data,
        workspaces,
        groups,
        email,
        analytics,
        sessions,
        user_service,
        reset_service,
    }
}
