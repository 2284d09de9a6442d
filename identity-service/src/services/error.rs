use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("No resource found: {kind} {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("Too many requests")]
    RateLimited,

    #[error("User {0} already exists")]
    UserAlreadyExists(String),

    #[error("Signup is disabled")]
    SignupDisabled,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password length must be between {min} and {max} characters")]
    InvalidPasswordLength { min: usize, max: usize },

    #[error("No password reset is in progress for this email")]
    InvalidPasswordReset,

    #[error("Bad request: {0}")]
    BadRequest(&'static str),

    #[error("Unsupported operation")]
    UnsupportedOperation,

    #[error("Email error: {0}")]
    Email(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            kind,
            id: id.into(),
        }
    }
}
