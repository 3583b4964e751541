//! Main request dispatcher: receives JSON-RPC messages for a session and
//! routes them to capability handlers.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::DispatchConfig;
use crate::registry::CapabilityRegistry;
use crate::session::{Session, SessionPhase, SessionStore};
use crate::types::*;

use super::negotiation::negotiate;
use super::validator::{validate_envelope, validate_request};

/// Methods a session may call before `initialize`.
const PRE_INIT_METHODS: &[&str] = &["initialize", "ping", "shutdown"];

/// Outcome of a request, ready for the transport.
#[derive(Debug)]
pub enum Reply {
    Success(JsonRpcResponse),
    /// The response was queued on the session's event stream; the id is
    /// echoed in the acknowledgment envelope.
    Accepted(RequestId),
    Failure {
        error: McpError,
        response: JsonRpcError,
    },
}

impl Reply {
    pub fn http_status(&self) -> u16 {
        match self {
            Reply::Success(_) => 200,
            Reply::Accepted(_) => 202,
            Reply::Failure { error, .. } => error.http_status(),
        }
    }

    pub fn error(&self) -> Option<&McpError> {
        match self {
            Reply::Failure { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Reply::Success(response) => serde_json::to_value(response).unwrap_or_default(),
            Reply::Accepted(id) => {
                serde_json::to_value(JsonRpcResponse::new(id, accepted_ack())).unwrap_or_default()
            }
            Reply::Failure { response, .. } => serde_json::to_value(response).unwrap_or_default(),
        }
    }
}

/// Dispatches JSON-RPC messages against a frozen capability registry.
pub struct ProtocolHandler {
    registry: Arc<CapabilityRegistry>,
    sessions: Arc<SessionStore>,
    options: DispatchConfig,
}

impl ProtocolHandler {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        sessions: Arc<SessionStore>,
        options: DispatchConfig,
    ) -> Self {
        Self {
            registry,
            sessions,
            options,
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Handle one inbound message. Notifications and stray responses
    /// produce no reply.
    pub async fn handle_message(&self, session: &Arc<Session>, msg: JsonRpcMessage) -> Option<Reply> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(session, req).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(session, notif);
                None
            }
            _ => {
                tracing::warn!(session = %session.id(), "Received unexpected message type from client");
                None
            }
        }
    }

    pub async fn handle_request(&self, session: &Arc<Session>, request: JsonRpcRequest) -> Reply {
        let id = request.id.clone();
        if let Err(e) = validate_request(&request) {
            return failure(id, e, &request.method);
        }

        self.sessions.touch(session);
        tracing::debug!(session = %session.id(), method = %request.method, "Handling request");

        if let Err(e) = self.check_phase(session, &request.method) {
            return failure(id, e, &request.method);
        }

        let result = self.dispatch_request(session, &request).await;

        if request.method == "shutdown" && result.is_ok() {
            self.sessions.invalidate(session.id()).await;
        }

        match result {
            Ok(value) => {
                let response = JsonRpcResponse::new(id, value);
                if is_deferred(&response.result) {
                    match session.enqueue(OutboundMessage::Response(response.clone())) {
                        Ok(()) => return Reply::Accepted(response.id),
                        Err(e) => tracing::warn!(
                            session = %session.id(),
                            method = %request.method,
                            "Could not queue deferred result, replying directly: {e}"
                        ),
                    }
                }
                Reply::Success(response)
            }
            Err(e) => failure(id, e, &request.method),
        }
    }

    fn check_phase(&self, session: &Session, method: &str) -> McpResult<()> {
        match session.phase() {
            SessionPhase::Closed => Err(McpError::SessionInvalid),
            SessionPhase::ShuttingDown => Err(McpError::InvalidRequest(
                "Session is shutting down".to_string(),
            )),
            SessionPhase::Uninitialized
                if self.options.require_initialize && !PRE_INIT_METHODS.contains(&method) =>
            {
                Err(McpError::NotInitialized(method.to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn dispatch_request(&self, session: &Session, request: &JsonRpcRequest) -> McpResult<Value> {
        let params = request.params.clone();
        match request.method.as_str() {
            "initialize" => self.handle_initialize(session, params),
            "shutdown" => {
                tracing::info!(session = %session.id(), "Shutdown requested");
                session.set_phase(SessionPhase::ShuttingDown);
                Ok(json!({}))
            }
            "ping" => Ok(json!({})),

            "tools/list" => to_result(ToolListResult {
                tools: self.registry.tools.list_tools(),
                next_cursor: None,
            }),
            "tools/call" => self.handle_tools_call(params).await,

            "resources/list" => to_result(ResourceListResult {
                resources: self.registry.resources.list_resources(),
                next_cursor: None,
            }),
            "resources/read" => self.handle_resources_read(params).await,

            "prompts/list" => to_result(PromptListResult {
                prompts: self.registry.prompts.list_prompts(),
                next_cursor: None,
            }),
            "prompts/get" => self.handle_prompts_get(params).await,

            _ => Err(McpError::MethodNotFound(request.method.clone())),
        }
    }

    fn handle_notification(&self, session: &Session, notification: JsonRpcNotification) {
        if let Err(e) = validate_envelope(
            &notification.jsonrpc,
            &notification.method,
            notification.params.as_ref(),
        ) {
            tracing::debug!(session = %session.id(), "Ignoring malformed notification: {e}");
            return;
        }
        self.sessions.touch(session);

        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                tracing::info!(session = %session.id(), "MCP handshake complete");
            }
            "notifications/cancelled" | "$/cancelRequest" => {
                let params: Option<CancelRequestParams> = notification
                    .params
                    .and_then(|p| serde_json::from_value(p).ok());
                match params {
                    Some(p) => tracing::info!(
                        session = %session.id(),
                        request = %p.request_id,
                        "Received cancellation notification"
                    ),
                    None => tracing::info!(session = %session.id(), "Received cancellation notification"),
                }
            }
            other => {
                tracing::debug!(session = %session.id(), "Unknown notification: {other}");
            }
        }
    }

    fn handle_initialize(&self, session: &Session, params: Option<Value>) -> McpResult<Value> {
        let init_params: InitializeParams = parse_params(params)?.unwrap_or_default();
        let result = negotiate(session, init_params, self.registry.server_capabilities());
        to_result(result)
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> McpResult<Value> {
        let call: ToolCallParams = parse_params(params)?
            .ok_or_else(|| McpError::InvalidParams("Tool call params required".to_string()))?;

        let result = self
            .guarded(&call.name, self.registry.tools.call(&call.name, call.arguments))
            .await?;
        to_result(result)
    }

    async fn handle_resources_read(&self, params: Option<Value>) -> McpResult<Value> {
        let read: ResourceReadParams = parse_params(params)?
            .ok_or_else(|| McpError::InvalidParams("Resource read params required".to_string()))?;

        let result = self
            .guarded(&read.uri, self.registry.resources.read(&read.uri))
            .await?;
        to_result(result)
    }

    async fn handle_prompts_get(&self, params: Option<Value>) -> McpResult<Value> {
        let get: PromptGetParams = parse_params(params)?
            .ok_or_else(|| McpError::InvalidParams("Prompt get params required".to_string()))?;

        let prompts = &self.registry.prompts;
        let result = self
            .guarded(&get.name, async { prompts.get(&get.name, get.arguments) })
            .await?;
        to_result(result)
    }

    /// Run a handler future with a deadline, converting panics into
    /// internal errors so one handler cannot take the server down.
    async fn guarded<T, F>(&self, name: &str, fut: F) -> McpResult<T>
    where
        F: Future<Output = McpResult<T>>,
    {
        let limit = self.options.tool_timeout;
        match tokio::time::timeout(limit, AssertUnwindSafe(fut).catch_unwind()).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(McpError::InternalError(format!(
                "{name} panicked: {}",
                panic_message(panic.as_ref())
            ))),
            Err(_) => Err(McpError::InternalError(format!(
                "{name} timed out after {}s",
                limit.as_secs_f32()
            ))),
        }
    }
}

fn failure(id: RequestId, error: McpError, method: &str) -> Reply {
    if error.is_internal() {
        tracing::error!(method, "Request failed: {error}");
    } else {
        tracing::debug!(method, "Request rejected: {error}");
    }
    let response = error.to_json_rpc_error(id);
    Reply::Failure { error, response }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> McpResult<Option<T>> {
    params
        .filter(|p| !p.is_null())
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::InvalidParams(e.to_string()))
}

fn to_result<T: Serialize>(value: T) -> McpResult<Value> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError(e.to_string()))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
