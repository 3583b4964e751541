//! The `initialize` handshake.

use crate::session::Session;
use crate::types::{InitializeParams, InitializeResult, ServerCapabilities, MCP_VERSION};

/// Record what the client reported on the session and build the reply.
pub fn negotiate(
    session: &Session,
    params: InitializeParams,
    capabilities: ServerCapabilities,
) -> InitializeResult {
    if let Some(requested) = params.protocol_version.as_deref() {
        if requested != MCP_VERSION {
            tracing::warn!(
                "Client requested protocol version {requested}, server supports {MCP_VERSION}. \
                 Proceeding with server version."
            );
        }
    }

    match &params.client_info {
        Some(client) => tracing::info!(
            session = %session.id(),
            "Initialized with client: {} v{}",
            client.name,
            client.version
        ),
        None => tracing::info!(session = %session.id(), "Initialized with unnamed client"),
    }

    session.mark_initialized(params.client_info, params.capabilities);
    InitializeResult::new(capabilities)
}
