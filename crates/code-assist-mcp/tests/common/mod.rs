//! Shared fixtures: test signing keys, token minting, and key sources.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use code_assist_mcp::auth::{AuthError, Claims, KeySource, StaticKeySource, TokenValidator};
use code_assist_mcp::config::{AuthConfig, ServerConfig};

pub const ISSUER: &str = "https://issuer.test/tenant/";
pub const AUDIENCE: &str = "api://code-assist-test";
pub const KID_1: &str = "key-1";
pub const KID_2: &str = "key-2";

pub const SIGNING_KEY: &str = include_str!("../fixtures/signing_key.pem");
pub const ROTATED_KEY: &str = include_str!("../fixtures/rotated_key.pem");
const SIGNING_JWKS: &str = include_str!("../fixtures/signing_key.jwks.json");
const ROTATED_JWKS: &str = include_str!("../fixtures/rotated_key.jwks.json");

// ─────────────────────── keys ───────────────────────

/// The public half of the primary test key, under `KID_1`.
pub fn primary_keys() -> JwkSet {
    serde_json::from_str(SIGNING_JWKS).unwrap()
}

/// The public half of the rotated test key, under `KID_2`.
pub fn rotated_keys() -> JwkSet {
    serde_json::from_str(ROTATED_JWKS).unwrap()
}

pub fn both_keys() -> JwkSet {
    let mut keys = primary_keys();
    keys.keys.extend(rotated_keys().keys);
    keys
}

/// Key source whose contents can be swapped and whose fetches are counted.
pub struct CountingSource {
    keys: Mutex<Option<JwkSet>>,
    fetches: AtomicUsize,
}

impl CountingSource {
    pub fn new(keys: JwkSet) -> Arc<Self> {
        Arc::new(Self {
            keys: Mutex::new(Some(keys)),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self {
            keys: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        })
    }

    /// Replace the served keys; `None` makes every fetch fail.
    pub fn set(&self, keys: Option<JwkSet>) {
        *self.keys.lock().unwrap() = keys;
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySource for CountingSource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.keys
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AuthError::KeyUnavailable("source offline".to_string()))
    }

    fn describe(&self) -> String {
        "counting".to_string()
    }
}

// ─────────────────────── config ───────────────────────

/// Auth settings for the test issuer, with no refresh cooldown.
pub fn auth_config() -> AuthConfig {
    let mut config = AuthConfig::new(ISSUER, vec![AUDIENCE.to_string()]);
    config.refresh_cooldown = Duration::ZERO;
    config
}

pub fn server_config() -> ServerConfig {
    ServerConfig::new(auth_config())
}

pub fn static_source() -> Arc<dyn KeySource> {
    Arc::new(StaticKeySource::new(primary_keys()))
}

pub fn validator() -> TokenValidator {
    TokenValidator::new(&auth_config(), static_source())
}

// ─────────────────────── tokens ───────────────────────

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Claims that pass every check, for `subject`.
pub fn valid_claims(subject: &str) -> Value {
    let now = now();
    json!({
        "sub": subject,
        "aud": AUDIENCE,
        "iss": ISSUER,
        "exp": now + 3600,
        "nbf": now - 60,
        "iat": now - 60,
        "scp": "user_impersonation code.read",
        "name": "Test User",
    })
}

/// Sign `claims` with the PEM key, advertising `kid` in the header.
pub fn mint(kid: Option<&str>, pem: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// A valid token for `subject`, signed with the primary key.
pub fn token_for(subject: &str) -> String {
    mint(Some(KID_1), SIGNING_KEY, &valid_claims(subject))
}

/// Verified claims for `subject`. `Claims` can only be obtained this way.
pub async fn claims_for(subject: &str) -> Claims {
    validator().validate(&token_for(subject)).await.unwrap()
}

// ─────────────────────── JSON-RPC ───────────────────────

pub fn mcp_request(id: i64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

pub fn init_request() -> Value {
    mcp_request(
        0,
        "initialize",
        json!({
            "protocolVersion": "1.0",
            "capabilities": {},
            "clientInfo": { "name": "test-client", "version": "1.0" }
        }),
    )
}
