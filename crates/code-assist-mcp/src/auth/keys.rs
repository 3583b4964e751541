//! Signing-key discovery and the shared key-set cache.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use tokio::sync::{Mutex, RwLock};

use super::error::AuthError;

/// Somewhere a JSON Web Key Set can be loaded from.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, AuthError>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// Fetches the key set from an HTTP discovery endpoint.
pub struct HttpKeySource {
    client: reqwest::Client,
    uri: String,
}

impl HttpKeySource {
    pub fn new(uri: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::KeyUnavailable(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            client,
            uri: uri.into(),
        })
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.uri)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AuthError::KeyUnavailable(format!("fetch {} failed: {e}", self.uri)))?;

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeyUnavailable(format!("invalid key set from {}: {e}", self.uri)))
    }

    fn describe(&self) -> String {
        self.uri.clone()
    }
}

/// A fixed key set, for offline deployments and tests.
pub struct StaticKeySource {
    keys: JwkSet,
    origin: String,
}

impl StaticKeySource {
    pub fn new(keys: JwkSet) -> Self {
        Self {
            keys,
            origin: "static".to_string(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let keys: JwkSet = serde_json::from_str(json)
            .map_err(|e| AuthError::KeyUnavailable(format!("invalid key set: {e}")))?;
        Ok(Self::new(keys))
    }

    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AuthError::KeyUnavailable(format!("read {} failed: {e}", path.display()))
        })?;
        let mut source = Self::from_json(&json)?;
        source.origin = path.display().to_string();
        Ok(source)
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        Ok(self.keys.clone())
    }

    fn describe(&self) -> String {
        self.origin.clone()
    }
}

/// A key set together with the moment it was fetched.
#[derive(Debug)]
pub struct CachedKeys {
    pub keys: JwkSet,
    pub fetched_at: Instant,
}

impl CachedKeys {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }

    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.find(kid)
    }
}

/// Process-wide key-set cache with lazy, time-boxed refresh.
///
/// Readers clone an `Arc` snapshot, so a refresh swaps the whole set at
/// once and nobody observes a partial update. Refreshes are serialized;
/// a fetch failure keeps serving the previous set if there is one.
pub struct KeyCache {
    source: Arc<dyn KeySource>,
    ttl: Duration,
    cooldown: Duration,
    current: RwLock<Option<Arc<CachedKeys>>>,
    /// Held for the duration of a refresh; stores the last fetch attempt.
    refresh: Mutex<Option<Instant>>,
}

impl KeyCache {
    pub fn new(source: Arc<dyn KeySource>, ttl: Duration, cooldown: Duration) -> Self {
        Self {
            source,
            ttl,
            cooldown,
            current: RwLock::new(None),
            refresh: Mutex::new(None),
        }
    }

    /// The cached set if still fresh, otherwise a refreshed one.
    pub async fn get(&self) -> Result<Arc<CachedKeys>, AuthError> {
        if let Some(cached) = self.snapshot().await {
            if cached.is_fresh(self.ttl) {
                return Ok(cached);
            }
        }
        self.refresh(false).await
    }

    /// Refresh from the source. With `force`, a fresh cache is refetched
    /// too, but at most once per cooldown period.
    pub async fn refresh(&self, force: bool) -> Result<Arc<CachedKeys>, AuthError> {
        let mut last_attempt = self.refresh.lock().await;

        let existing = self.snapshot().await;
        if let Some(cached) = &existing {
            if !force && cached.is_fresh(self.ttl) {
                return Ok(cached.clone());
            }
            if last_attempt.is_some_and(|at| at.elapsed() < self.cooldown) {
                return Ok(cached.clone());
            }
        }

        *last_attempt = Some(Instant::now());
        match self.source.fetch().await {
            Ok(keys) => {
                tracing::info!(
                    source = %self.source.describe(),
                    keys = keys.keys.len(),
                    "Signing key set refreshed"
                );
                let fresh = Arc::new(CachedKeys {
                    keys,
                    fetched_at: Instant::now(),
                });
                *self.current.write().await = Some(fresh.clone());
                Ok(fresh)
            }
            Err(e) => match existing {
                Some(stale) => {
                    tracing::warn!("Key set refresh failed, serving cached keys: {e}");
                    Ok(stale)
                }
                None => {
                    tracing::error!("Key set unavailable: {e}");
                    Err(e)
                }
            },
        }
    }

    pub async fn snapshot(&self) -> Option<Arc<CachedKeys>> {
        self.current.read().await.clone()
    }
}
