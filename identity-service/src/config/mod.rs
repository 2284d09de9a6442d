use serde::Deserialize;
use std::collections::HashSet;
use std::env;

use crate::services::ServiceError;

/// Origin used for signup links when the caller supplies none.
pub const DEFAULT_ORIGIN_HEADER: &str = "https://app.micros.dev";

/// Immutable configuration for the identity core.
///
/// Loaded once at startup and passed by reference into the services; none of
/// the flows read ambient global state.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    /// Emails that may always sign up, bypass allowlists, and receive the
    /// instance-admin grant. Stored lowercase.
    pub admin_emails: HashSet<String>,
    /// Global self-service signup kill switch.
    pub signup_disabled: bool,
    /// Domain allowlist for form signups. Empty means any domain.
    pub allowed_domains: Vec<String>,
    /// Domain allowlist for OAuth signups. Empty means any domain.
    pub oauth_allowed_domains: Vec<String>,
    /// Tenant assigned to users created without an explicit tenant.
    pub default_tenant_id: String,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub welcome_email_enabled: bool,
    pub smtp_user: String,
    pub smtp_app_password: String,
}

impl IdentityConfig {
    pub fn from_env() -> Result<Self, ServiceError> {
        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| ServiceError::Config(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = IdentityConfig {
            environment,
            service_name: get_env("SERVICE_NAME", Some("identity-service"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            admin_emails: get_env("ADMIN_EMAILS", Some(""), is_prod)?
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            signup_disabled: get_env("SIGNUP_DISABLED", Some("false"), is_prod)?
                .parse()
                .unwrap_or(false),
            allowed_domains: parse_domains(&get_env("SIGNUP_ALLOWED_DOMAINS", Some(""), is_prod)?),
            oauth_allowed_domains: parse_domains(&get_env(
                "OAUTH_SIGNUP_ALLOWED_DOMAINS",
                Some(""),
                is_prod,
            )?),
            default_tenant_id: get_env("DEFAULT_TENANT_ID", Some("default"), is_prod)?,
            mail: MailConfig {
                welcome_email_enabled: get_env("WELCOME_EMAIL_ENABLED", Some("true"), is_prod)?
                    .parse()
                    .unwrap_or(true),
                smtp_user: get_env("SMTP_USER", Some(""), is_prod)?,
                smtp_app_password: get_env("SMTP_APP_PASSWORD", Some(""), is_prod)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ServiceError> {
        if self.default_tenant_id.is_empty() {
            return Err(ServiceError::Config(anyhow::anyhow!(
                "DEFAULT_TENANT_ID must not be empty"
            )));
        }

        for domain in self
            .allowed_domains
            .iter()
            .chain(self.oauth_allowed_domains.iter())
        {
            if domain.contains('@') {
                return Err(ServiceError::Config(anyhow::anyhow!(
                    "allowlist entries must be bare domains, got '{}'",
                    domain
                )));
            }
        }

        if self.environment == Environment::Prod && !self.signup_disabled {
            if self.allowed_domains.is_empty() && self.oauth_allowed_domains.is_empty() {
                tracing::warn!("Signup is open to any email domain in production");
            }
        }

        Ok(())
    }

    /// Whether this email belongs to a configured instance admin.
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.contains(&email.to_lowercase())
    }
}

fn parse_domains(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, ServiceError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(ServiceError::Config(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(ServiceError::Config(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
