mod password;
mod validation;

pub use password::{hash_password, verify_password, Password, PasswordHashString};
pub use validation::{
    validate_login_password, LOGIN_PASSWORD_MAX_LENGTH, LOGIN_PASSWORD_MIN_LENGTH,
};
