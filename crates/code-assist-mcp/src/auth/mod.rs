//! Bearer-token authentication: JWKS key discovery, caching, and JWT verification.

pub mod claims;
pub mod error;
pub mod keys;
pub mod validator;

pub use claims::Claims;
pub use error::AuthError;
pub use keys::{CachedKeys, HttpKeySource, KeyCache, KeySource, StaticKeySource};
pub use validator::TokenValidator;

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    header
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::Malformed("missing or invalid authorization header".to_string()))
}
