mod password_reset_token;
mod permission_group;
mod policy;
mod user;
mod user_data;
mod workspace;

pub use password_reset_token::PasswordResetToken;
pub use permission_group::PermissionGroup;
pub use policy::{base_user_policies, instance_admin_policies, Permission, Policy};
pub use user::{LoginSource, User};
pub(crate) use user::email_domain;
pub use user_data::UserData;
pub use workspace::Workspace;
