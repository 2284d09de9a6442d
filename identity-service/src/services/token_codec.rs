//! Opaque token codec seam.
//!
//! The reset link carries a single opaque string that round-trips an
//! (email, token) pair. Callers other than the codec treat the string as
//! unstructured. A production deployment plugs in its own sealed codec; the
//! `UrlTokenCodec` here is the reversible url-encoded/base64url form used in
//! development and tests.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

use crate::services::ServiceError;

/// The structured payload behind the opaque reset string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailToken {
    pub email: String,
    pub token: String,
}

pub trait TokenCodec: Send + Sync {
    fn encode(&self, payload: &EmailToken) -> Result<String, ServiceError>;

    /// Fails with `InvalidParameter("token")` on any malformed input.
    fn decode(&self, opaque: &str) -> Result<EmailToken, ServiceError>;
}

#[derive(Debug, Clone, Default)]
pub struct UrlTokenCodec;

impl UrlTokenCodec {
    pub fn new() -> Self {
        Self
    }
}

impl TokenCodec for UrlTokenCodec {
    fn encode(&self, payload: &EmailToken) -> Result<String, ServiceError> {
        let pairs = serde_urlencoded::to_string(payload)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Token encode failed: {}", e)))?;
        Ok(URL_SAFE_NO_PAD.encode(pairs.as_bytes()))
    }

    fn decode(&self, opaque: &str) -> Result<EmailToken, ServiceError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(opaque.as_bytes())
            .map_err(|_| ServiceError::InvalidParameter("token"))?;
        let pairs =
            String::from_utf8(bytes).map_err(|_| ServiceError::InvalidParameter("token"))?;
        serde_urlencoded::from_str(&pairs).map_err(|_| ServiceError::InvalidParameter("token"))
    }
}
