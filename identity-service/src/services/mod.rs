//! Services layer for the identity core.
//!
//! Business logic for signup gating, password reset, and invitations, plus
//! the collaborator seams they consume.

mod email;
pub mod error;
mod password_reset;
mod repository;
mod signup;
mod token_codec;
mod user;
mod workspace;

pub use email::{EmailSender, RecordingEmailSender, SentMail, SmtpEmailSender};
pub use error::ServiceError;
pub use password_reset::PasswordResetService;
pub use repository::{
    InMemoryPasswordResetTokenRepository, InMemoryUserDataRepository, InMemoryUserRepository,
    PasswordResetTokenRepository, UserDataRepository, UserRepository,
};
pub use signup::{DenialReason, SignupDecision, SignupGate};
pub use token_codec::{EmailToken, TokenCodec, UrlTokenCodec};
pub use user::UserService;
pub use workspace::{
    AnalyticsSink, InMemoryPermissionGroupService, InMemoryWorkspaceService,
    PermissionGroupService, RecordingAnalyticsSink, SessionService, StaticSessionService,
    WorkspaceService,
};
