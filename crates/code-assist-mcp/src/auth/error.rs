//! Authentication failure taxonomy.

use jsonwebtoken::errors::{Error as JwtError, ErrorKind};

/// Why a bearer token was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("no signing key matches kid '{0}'")]
    UnknownKey(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("claim mismatch: {0}")]
    ClaimMismatch(String),

    #[error("token missing required scopes or roles")]
    InsufficientScope,

    #[error("signing keys unavailable: {0}")]
    KeyUnavailable(String),
}

impl AuthError {
    /// Stable machine-readable reason, safe to return to callers.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Malformed(_) => "malformed",
            AuthError::UnknownKey(_) => "unknown_key",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "expired",
            AuthError::ClaimMismatch(_) => "claim_mismatch",
            AuthError::InsufficientScope => "insufficient_scope",
            AuthError::KeyUnavailable(_) => "key_unavailable",
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => {
                AuthError::InvalidSignature
            }
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::ImmatureSignature => AuthError::ClaimMismatch("token not yet valid".to_string()),
            ErrorKind::InvalidIssuer => AuthError::ClaimMismatch("issuer".to_string()),
            ErrorKind::InvalidAudience => AuthError::ClaimMismatch("audience".to_string()),
            ErrorKind::InvalidSubject => AuthError::ClaimMismatch("subject".to_string()),
            ErrorKind::MissingRequiredClaim(claim) => {
                AuthError::ClaimMismatch(format!("missing claim '{claim}'"))
            }
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidEcdsaKey | ErrorKind::InvalidKeyFormat => {
                AuthError::KeyUnavailable("unusable signing key".to_string())
            }
            _ => AuthError::Malformed(e.to_string()),
        }
    }
}
