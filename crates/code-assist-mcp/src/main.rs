//! code-assist MCP server: entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tokio_util::sync::CancellationToken;

use code_assist_mcp::auth::TokenValidator;
use code_assist_mcp::config::{ConfigOverrides, ServerConfig};
use code_assist_mcp::registry::CapabilityRegistry;
use code_assist_mcp::session::join_sweeper;
use code_assist_mcp::transport::{ServerState, SseTransport};
use code_assist_mcp::types::InitializeResult;

#[derive(Parser)]
#[command(
    name = "code-assist-mcp",
    about = "MCP server for code analysis and generation over authenticated HTTP",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(flatten)]
    auth: AuthArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Token verification settings. Each falls back to its environment variable.
#[derive(Args, Clone, Default)]
struct AuthArgs {
    /// Azure AD tenant id [env: AZURE_TENANT_ID].
    #[arg(long, global = true)]
    tenant_id: Option<String>,

    /// Application (client) id tokens are issued for [env: AZURE_CLIENT_ID].
    #[arg(long, global = true)]
    client_id: Option<String>,

    /// JWKS discovery URI [env: MCP_JWKS_URI].
    #[arg(long, global = true)]
    jwks_uri: Option<String>,

    /// Read signing keys from a JWKS file instead of fetching them [env: MCP_JWKS_FILE].
    #[arg(long, global = true)]
    jwks_file: Option<PathBuf>,

    /// Expected token issuer [env: MCP_ISSUER].
    #[arg(long, global = true)]
    issuer: Option<String>,

    /// Accepted audiences, comma separated [env: MCP_AUDIENCES].
    #[arg(long, global = true, value_delimiter = ',')]
    audience: Option<Vec<String>>,
}

impl AuthArgs {
    fn into_overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            tenant_id: self.tenant_id,
            client_id: self.client_id,
            jwks_uri: self.jwks_uri,
            jwks_file: self.jwks_file,
            issuer: self.issuer,
            audiences: self.audience,
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default).
    Serve {
        /// Listen address (host:port) [env: MCP_ADDR].
        #[arg(long)]
        addr: Option<String>,

        /// Accept capability calls before `initialize`.
        #[arg(long)]
        allow_uninitialized: bool,
    },

    /// Print server capabilities as JSON.
    Info,

    /// Verify a bearer token and print its claims.
    CheckToken {
        /// The encoded JWT.
        token: String,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   code-assist-mcp completions bash > ~/.local/share/bash-completion/completions/code-assist-mcp
    ///   code-assist-mcp completions zsh > ~/.zfunc/_code-assist-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let overrides = cli.auth.into_overrides();

    match cli.command.unwrap_or(Commands::Serve {
        addr: None,
        allow_uninitialized: false,
    }) {
        Commands::Serve {
            addr,
            allow_uninitialized,
        } => {
            let config = ServerConfig::resolve(ConfigOverrides {
                addr,
                allow_uninitialized,
                ..overrides
            })?;
            serve(config).await?;
        }

        Commands::Info => {
            let registry = CapabilityRegistry::with_defaults();
            let init = InitializeResult::new(registry.server_capabilities());
            let tools = registry.tools.list_tools();
            let info = serde_json::json!({
                "server": init.server_info,
                "protocol_version": init.protocol_version,
                "capabilities": init.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
                "resources": registry.resources.list_resources().iter().map(|r| r.uri.clone()).collect::<Vec<_>>(),
                "prompts": registry.prompts.list_prompts().iter().map(|p| p.name.clone()).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::CheckToken { token } => {
            let config = ServerConfig::resolve(overrides)?;
            let validator = TokenValidator::new(&config.auth, config.auth.key_source()?);
            match validator.validate(token.trim()).await {
                Ok(claims) => {
                    let summary = serde_json::json!({
                        "subject": claims.subject(),
                        "name": claims.name(),
                        "issuer": claims.issuer(),
                        "audiences": claims.audiences(),
                        "expires_at": claims.expires_at(),
                        "not_before": claims.not_before(),
                        "issued_at": claims.issued_at(),
                        "scopes": claims.scopes(),
                        "roles": claims.roles(),
                    });
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                Err(e) => {
                    eprintln!("Invalid token ({}): {e}", e.reason());
                    std::process::exit(1);
                }
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "code-assist-mcp", &mut std::io::stdout());
        }
    }

    Ok(())
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let keys = config.auth.key_source()?;
    tracing::info!("code-assist MCP server");
    tracing::info!("Issuer: {}", config.auth.issuer);
    tracing::info!("Signing keys: {}", keys.describe());

    let state = Arc::new(ServerState::new(
        &config,
        keys,
        CapabilityRegistry::with_defaults(),
    ));

    tracing::info!(
        "Session TTL: {}s, sweep every {}s",
        state.sessions.ttl().as_secs(),
        config.session.sweep_interval.as_secs()
    );

    let shutdown = CancellationToken::new();
    let sweeper = state
        .sessions
        .spawn_sweeper(config.session.sweep_interval, shutdown.child_token());

    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received");
                signal.cancel();
            }
            Err(e) => tracing::warn!("Cannot listen for interrupt signal: {e}"),
        }
    });

    let transport = SseTransport::new(state);
    let served = transport.run(&config.addr, shutdown.clone()).await;
    shutdown.cancel();
    join_sweeper(sweeper).await;
    served?;
    Ok(())
}
