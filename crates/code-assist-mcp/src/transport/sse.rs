//! HTTP transport: bearer auth, session routing, SSE push, and /health.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware::{self, Next},
    response::{
        sse::{Event, Sse},
        IntoResponse, Json as AxumJson, Response,
    },
    routing::{get, post},
    Extension, Router,
};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use super::framing::{parse_message, request_id_hint};
use crate::auth::{bearer_token, Claims, KeySource, TokenValidator};
use crate::config::{ServerConfig, StreamConfig};
use crate::protocol::ProtocolHandler;
use crate::registry::CapabilityRegistry;
use crate::session::{Session, SessionStore};
use crate::stream;
use crate::types::{JsonRpcMessage, McpError, McpResult, RequestId};

/// Request and response header carrying the session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Shared server state passed to all handlers via axum State.
pub struct ServerState {
    pub validator: TokenValidator,
    pub sessions: Arc<SessionStore>,
    pub handler: ProtocolHandler,
    pub stream: StreamConfig,
}

impl ServerState {
    pub fn new(
        config: &ServerConfig,
        keys: Arc<dyn KeySource>,
        registry: CapabilityRegistry,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(&config.session));
        let handler = ProtocolHandler::new(
            Arc::new(registry),
            sessions.clone(),
            config.dispatch.clone(),
        );
        Self {
            validator: TokenValidator::new(&config.auth, keys),
            sessions,
            handler,
            stream: config.stream.clone(),
        }
    }
}

/// HTTP transport for MCP clients: JSON-RPC commands in, SSE events out.
pub struct SseTransport {
    state: Arc<ServerState>,
}

impl SseTransport {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// All routes. `/health` bypasses authentication; CORS wraps everything
    /// so preflight requests never reach the auth layer.
    pub fn router(&self) -> Router {
        let state = self.state.clone();
        let session_header = HeaderName::from_static(SESSION_HEADER);

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE, session_header.clone()])
            .expose_headers([session_header]);

        Router::new()
            .route("/mcp/command", post(handle_command))
            .route("/mcp/stream", get(handle_stream))
            .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
            .route("/health", get(handle_health))
            .layer(cors)
            .with_state(state)
    }

    /// Serve on `addr` until `shutdown` is cancelled. Open sessions are
    /// closed on shutdown so attached streams end.
    pub async fn run(&self, addr: &str, shutdown: CancellationToken) -> McpResult<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(McpError::Io)?;

        tracing::info!("HTTP transport listening on {addr}");

        let sessions = self.state.sessions.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("Shutting down HTTP transport");
                sessions.shutdown().await;
            })
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Auth middleware: verifies the bearer token and stores its claims in the
/// request extensions for the handlers.
async fn auth_layer(
    State(state): State<Arc<ServerState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let verified = {
        let header = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        match bearer_token(header.as_deref()) {
            Ok(token) => state.validator.validate(token).await,
            Err(e) => Err(e),
        }
    };

    match verified {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(reason = e.reason(), "Rejected bearer token: {e}");
            error_response(McpError::Auth(e), RequestId::Null)
        }
    }
}

/// Handle one JSON-RPC message. Only `initialize` may arrive without a
/// session; it creates one and returns its id in the session header.
async fn handle_command(
    State(state): State<Arc<ServerState>>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let message = match parse_message(&body) {
        Ok(message) => message,
        Err(e) => return error_response(e, request_id_hint(&body)),
    };

    let (session, created) = match session_id(&headers) {
        Some(id) => match state.sessions.resolve(id, &claims).await {
            Ok(session) => (session, false),
            Err(e) => return error_response(e, message.request_id()),
        },
        None if is_initialize(&message) => (state.sessions.create(&claims).await, true),
        None => return error_response(McpError::SessionRequired, message.request_id()),
    };

    let Some(reply) = state.handler.handle_message(&session, message).await else {
        return with_session(StatusCode::ACCEPTED.into_response(), &session);
    };

    if created && reply.error().is_some() {
        state.sessions.invalidate(session.id()).await;
        return json_response(reply.http_status(), reply.into_value());
    }

    let status = reply.http_status();
    with_session(json_response(status, reply.into_value()), &session)
}

/// Open the event stream. Without a session header a new session is created.
async fn handle_stream(
    State(state): State<Arc<ServerState>>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
) -> Response {
    let session = match session_id(&headers) {
        Some(id) => match state.sessions.resolve(id, &claims).await {
            Ok(session) => session,
            Err(e) => return error_response(e, RequestId::Null),
        },
        None => state.sessions.create(&claims).await,
    };
    state.sessions.touch(&session);

    match stream::open(session.clone(), &state.stream) {
        Ok(events) => {
            let events = events.map(|event| {
                Ok::<_, Infallible>(Event::default().event(event.name()).data(event.data.to_string()))
            });
            with_session(Sse::new(events).into_response(), &session)
        }
        Err(e) => error_response(e, RequestId::Null),
    }
}

/// Health check endpoint, no auth required.
async fn handle_health(State(state): State<Arc<ServerState>>) -> AxumJson<serde_json::Value> {
    AxumJson(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.len().await,
    }))
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

fn is_initialize(message: &JsonRpcMessage) -> bool {
    matches!(message, JsonRpcMessage::Request(r) if r.method == "initialize")
}

fn json_response(status: u16, body: serde_json::Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, AxumJson(body)).into_response()
}

fn error_response(error: McpError, id: RequestId) -> Response {
    let body = serde_json::to_value(error.to_json_rpc_error(id)).unwrap_or_default();
    json_response(error.http_status(), body)
}

fn with_session(mut response: Response, session: &Session) -> Response {
    if let Ok(value) = HeaderValue::from_str(session.id()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(SESSION_HEADER), value);
    }
    response
}
