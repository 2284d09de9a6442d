//! Auxiliary per-user profile data forwarded to the analytics sink.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserData {
    pub role: Option<String>,
    pub use_case: Option<String>,
}
