//! Login password policy bounds.

pub const LOGIN_PASSWORD_MIN_LENGTH: usize = 8;
pub const LOGIN_PASSWORD_MAX_LENGTH: usize = 48;

/// Check a candidate login password against the length policy.
pub fn validate_login_password(password: &str) -> bool {
    let len = password.chars().count();
    (LOGIN_PASSWORD_MIN_LENGTH..=LOGIN_PASSWORD_MAX_LENGTH).contains(&len)
}
