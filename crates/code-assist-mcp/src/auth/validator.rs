//! Bearer-token verification against the cached signing keys.

use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use super::claims::{Claims, RawClaims};
use super::error::AuthError;
use super::keys::{KeyCache, KeySource};
use crate::config::AuthConfig;

/// Verifies RS256 bearer tokens and produces [`Claims`].
pub struct TokenValidator {
    keys: KeyCache,
    validation: Validation,
    leeway: i64,
}

impl TokenValidator {
    pub fn new(config: &AuthConfig, source: Arc<dyn KeySource>) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&config.audiences);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "nbf", "aud", "iss", "sub"]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = config.leeway_secs;

        Self {
            keys: KeyCache::new(source, config.key_ttl, config.refresh_cooldown),
            validation,
            leeway: i64::try_from(config.leeway_secs).unwrap_or(i64::MAX),
        }
    }

    pub fn key_cache(&self) -> &KeyCache {
        &self.keys
    }

    /// Verify a compact JWT and return its claims.
    pub async fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::Malformed(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::Malformed("token header has no kid".to_string()))?;

        let key = self.decoding_key(&kid).await?;
        let data = decode::<RawClaims>(token, &key, &self.validation)?;
        let raw = data.claims;

        let issued_at = raw
            .iat
            .ok_or_else(|| AuthError::ClaimMismatch("missing claim 'iat'".to_string()))?;
        if issued_at > chrono::Utc::now().timestamp().saturating_add(self.leeway) {
            return Err(AuthError::ClaimMismatch("token issued in the future".to_string()));
        }

        if raw.scp.is_none() && raw.roles.is_none() {
            return Err(AuthError::InsufficientScope);
        }

        Ok(Claims::from_verified(raw, issued_at))
    }

    /// Look up `kid`, forcing one refresh on a miss to pick up rotated keys.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let cached = self.keys.get().await?;
        if let Some(jwk) = cached.find(kid) {
            return Ok(DecodingKey::from_jwk(jwk)?);
        }

        tracing::debug!(kid, "Unknown signing key, refreshing key set");
        let refreshed = self.keys.refresh(true).await?;
        match refreshed.find(kid) {
            Some(jwk) => Ok(DecodingKey::from_jwk(jwk)?),
            None => Err(AuthError::UnknownKey(kid.to_string())),
        }
    }
}
