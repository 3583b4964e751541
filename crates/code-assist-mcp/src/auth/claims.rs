//! Verified token claims.

use serde::Deserialize;

/// `aud` may be a single string or an array.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
pub(crate) enum Audience {
    One(String),
    Many(Vec<String>),
    #[default]
    None,
}

impl Audience {
    fn into_vec(self) -> Vec<String> {
        match self {
            Audience::One(a) => vec![a],
            Audience::Many(v) => v,
            Audience::None => Vec::new(),
        }
    }
}

/// Wire shape of the token payload. Only deserialized by the validator,
/// after the signature has been checked. Registered claims are optional
/// here so that their absence is reported by claim validation rather than
/// as a decoding failure.
#[derive(Debug, Deserialize)]
pub(crate) struct RawClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub aud: Audience,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    /// Delegated scopes, space separated.
    #[serde(default)]
    pub scp: Option<String>,
    /// Application roles.
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    #[serde(default)]
    pub name: Option<String>,
}

/// The verified payload of a bearer token.
///
/// There is no public constructor: a `Claims` value only exists after
/// [`crate::auth::TokenValidator::validate`] has checked signature and claims.
#[derive(Debug, Clone)]
pub struct Claims {
    subject: String,
    audiences: Vec<String>,
    issuer: String,
    expires_at: i64,
    not_before: i64,
    issued_at: i64,
    scopes: Vec<String>,
    roles: Vec<String>,
    name: Option<String>,
}

impl Claims {
    pub(crate) fn from_verified(raw: RawClaims, issued_at: i64) -> Self {
        let scopes = raw
            .scp
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Self {
            subject: raw.sub.unwrap_or_default(),
            audiences: raw.aud.into_vec(),
            issuer: raw.iss.unwrap_or_default(),
            expires_at: raw.exp.unwrap_or_default(),
            not_before: raw.nbf.unwrap_or_default(),
            issued_at,
            scopes,
            roles: raw.roles.unwrap_or_default(),
            name: raw.name,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn audiences(&self) -> &[String] {
        &self.audiences
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Expiry as a unix timestamp (seconds).
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Scopes and roles together.
    pub fn grants(&self) -> Vec<String> {
        self.scopes.iter().chain(self.roles.iter()).cloned().collect()
    }
}
