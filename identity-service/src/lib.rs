//! Identity lifecycle core for a multi-tenant application.
//!
//! Covers self-service signup gating, rate-limited password-reset token
//! issuance/verification/consumption, and bulk workspace invitations with
//! existing/new-user branching. Storage, mail transport, sessions,
//! workspaces, permission groups, and analytics are collaborator traits; an
//! outer request-handling layer wires real implementations in.

pub mod config;
pub mod dtos;
pub mod models;
pub mod services;
pub mod utils;
