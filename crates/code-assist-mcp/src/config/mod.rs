//! Configuration loading and resolution.
//!
//! Every value resolves as CLI flag, then environment variable, then default.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{HttpKeySource, KeySource, StaticKeySource};
use crate::types::{McpError, McpResult};

pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const ENV_JWKS_URI: &str = "MCP_JWKS_URI";
pub const ENV_ISSUER: &str = "MCP_ISSUER";
pub const ENV_AUDIENCES: &str = "MCP_AUDIENCES";
pub const ENV_JWKS_FILE: &str = "MCP_JWKS_FILE";
pub const ENV_ADDR: &str = "MCP_ADDR";

pub const DEFAULT_ADDR: &str = "127.0.0.1:8000";

const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_secs(60);
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_LEEWAY_SECS: u64 = 60;

const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_QUEUE_CAPACITY: usize = 256;

const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Token verification settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwks_uri: Option<String>,
    /// Load keys from this file instead of fetching them.
    pub jwks_file: Option<PathBuf>,
    pub issuer: String,
    pub audiences: Vec<String>,
    pub key_ttl: Duration,
    pub refresh_cooldown: Duration,
    pub fetch_timeout: Duration,
    pub leeway_secs: u64,
}

impl AuthConfig {
    /// Settings for an Azure AD tenant and application registration.
    pub fn azure_ad(tenant_id: &str, client_id: &str) -> Self {
        Self {
            jwks_uri: Some(format!(
                "https://login.microsoftonline.com/{tenant_id}/discovery/v2.0/keys"
            )),
            jwks_file: None,
            issuer: format!("https://sts.windows.net/{tenant_id}/"),
            audiences: vec![client_id.to_string(), format!("api://{client_id}")],
            key_ttl: DEFAULT_KEY_TTL,
            refresh_cooldown: DEFAULT_REFRESH_COOLDOWN,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            leeway_secs: DEFAULT_LEEWAY_SECS,
        }
    }

    /// Settings with an explicit issuer and audience list and no key location.
    pub fn new(issuer: impl Into<String>, audiences: Vec<String>) -> Self {
        Self {
            jwks_uri: None,
            jwks_file: None,
            issuer: issuer.into(),
            audiences,
            key_ttl: DEFAULT_KEY_TTL,
            refresh_cooldown: DEFAULT_REFRESH_COOLDOWN,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            leeway_secs: DEFAULT_LEEWAY_SECS,
        }
    }

    /// Build the key source this configuration points at. A key file wins
    /// over a discovery URI.
    pub fn key_source(&self) -> McpResult<Arc<dyn KeySource>> {
        if let Some(path) = &self.jwks_file {
            let source = StaticKeySource::from_file(path)
                .map_err(|e| McpError::Config(format!("JWKS file: {e}")))?;
            return Ok(Arc::new(source));
        }
        let uri = self
            .jwks_uri
            .as_deref()
            .ok_or_else(|| McpError::Config("no JWKS URI or JWKS file configured".to_string()))?;
        let source = HttpKeySource::new(uri, self.fetch_timeout)
            .map_err(|e| McpError::Config(e.to_string()))?;
        Ok(Arc::new(source))
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle time after which a session expires.
    pub ttl: Duration,
    pub sweep_interval: Duration,
    /// Capacity of each session's outbound queue.
    pub queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_SESSION_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Period of the heartbeat producer.
    pub heartbeat_interval: Duration,
    /// How long the stream waits for a message before emitting a heartbeat.
    pub receive_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Reject capability methods until `initialize` has succeeded.
    pub require_initialize: bool,
    pub tool_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            require_initialize: true,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

/// Values given on the command line. `None` falls through to the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub addr: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub jwks_uri: Option<String>,
    pub jwks_file: Option<PathBuf>,
    pub issuer: Option<String>,
    pub audiences: Option<Vec<String>>,
    pub allow_uninitialized: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub auth: AuthConfig,
    pub session: SessionConfig,
    pub stream: StreamConfig,
    pub dispatch: DispatchConfig,
}

impl ServerConfig {
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            auth,
            session: SessionConfig::default(),
            stream: StreamConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }

    /// Resolve the full configuration from flags and the environment.
    pub fn resolve(overrides: ConfigOverrides) -> McpResult<Self> {
        let tenant_id = overrides.tenant_id.or_else(|| env_var(ENV_TENANT_ID));
        let client_id = overrides.client_id.or_else(|| env_var(ENV_CLIENT_ID));

        let mut auth = match (&tenant_id, &client_id) {
            (Some(tenant), Some(client)) => AuthConfig::azure_ad(tenant, client),
            _ => AuthConfig::new(String::new(), Vec::new()),
        };

        if let Some(uri) = overrides.jwks_uri.or_else(|| env_var(ENV_JWKS_URI)) {
            auth.jwks_uri = Some(uri);
        }
        auth.jwks_file = overrides
            .jwks_file
            .or_else(|| env_var(ENV_JWKS_FILE).map(PathBuf::from));
        if let Some(issuer) = overrides.issuer.or_else(|| env_var(ENV_ISSUER)) {
            auth.issuer = issuer;
        }
        if let Some(audiences) = overrides
            .audiences
            .or_else(|| env_var(ENV_AUDIENCES).map(|v| split_list(&v)))
        {
            auth.audiences = audiences;
        }

        if auth.jwks_uri.is_none() && auth.jwks_file.is_none() {
            return Err(McpError::Config(format!(
                "no signing keys configured: set {ENV_TENANT_ID}, {ENV_JWKS_URI} or {ENV_JWKS_FILE}"
            )));
        }
        if auth.issuer.trim().is_empty() || auth.audiences.is_empty() {
            return Err(McpError::Config(format!(
                "token issuer and audience unknown: set {ENV_TENANT_ID} and {ENV_CLIENT_ID}, \
                 or {ENV_ISSUER} and {ENV_AUDIENCES}"
            )));
        }

        let mut config = ServerConfig::new(auth);
        config.addr = overrides
            .addr
            .or_else(|| env_var(ENV_ADDR))
            .unwrap_or_else(|| DEFAULT_ADDR.to_string());
        config.dispatch.require_initialize = !overrides.allow_uninitialized;
        Ok(config)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
