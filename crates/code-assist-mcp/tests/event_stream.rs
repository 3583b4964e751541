//! Push stream: ordering, heartbeats, exclusivity, and teardown.

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::json;

use code_assist_mcp::config::{DispatchConfig, SessionConfig, StreamConfig};
use code_assist_mcp::protocol::{ProtocolHandler, Reply};
use code_assist_mcp::registry::CapabilityRegistry;
use code_assist_mcp::session::{Session, SessionStore};
use code_assist_mcp::stream::{self, EventKind, EventStream, StreamEvent};
use code_assist_mcp::types::*;
use common::*;

/// Stream settings that never emit a heartbeat during a test.
fn quiet() -> StreamConfig {
    StreamConfig {
        heartbeat_interval: Duration::from_secs(3600),
        receive_timeout: Duration::from_secs(3600),
    }
}

async fn session() -> (Arc<SessionStore>, Arc<Session>) {
    let store = Arc::new(SessionStore::new(&SessionConfig::default()));
    let session = store.create(&claims_for("user-a").await).await;
    (store, session)
}

async fn next(events: &mut EventStream) -> Option<StreamEvent> {
    tokio::time::timeout(Duration::from_secs(2), events.next())
        .await
        .expect("stream produced nothing within 2s")
}

// ═══════════════════════════════════════════════════════
// DELIVERY
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_01_connected_first() {
    let (_store, session) = session().await;
    let mut events = stream::open(session.clone(), &quiet()).unwrap();

    let first = next(&mut events).await.unwrap();
    assert_eq!(first.kind, EventKind::Connected);
    assert_eq!(first.data["session_id"], session.id());
    assert!(first.to_frame().starts_with("event: connected\n"));

    println!("TEST 01 — Connected First: PASS");
}

#[tokio::test]
async fn test_02_messages_in_order() {
    let (_store, session) = session().await;
    let mut events = stream::open(session.clone(), &quiet()).unwrap();
    next(&mut events).await.unwrap();

    for i in 1..=3 {
        session
            .enqueue(OutboundMessage::Response(JsonRpcResponse::new(
                RequestId::from(i),
                json!({ "n": i }),
            )))
            .unwrap();
    }

    for i in 1..=3 {
        let event = next(&mut events).await.unwrap();
        assert_eq!(event.kind, EventKind::Message);
        assert_eq!(event.data["jsonrpc"], "2.0");
        assert_eq!(event.data["id"], i);
        assert_eq!(event.data["result"]["n"], i);
    }

    println!("TEST 02 — Ordered Delivery: PASS");
}

#[tokio::test]
async fn test_03_queued_before_attach_is_delivered() {
    let (_store, session) = session().await;
    session
        .enqueue(OutboundMessage::Notification(JsonRpcNotification::new(
            "notifications/progress".to_string(),
            Some(json!({ "progress": 50 })),
        )))
        .unwrap();

    let mut events = stream::open(session.clone(), &quiet()).unwrap();
    assert_eq!(next(&mut events).await.unwrap().kind, EventKind::Connected);

    let event = next(&mut events).await.unwrap();
    assert_eq!(event.kind, EventKind::Message);
    assert_eq!(event.data["method"], "notifications/progress");
    assert_eq!(event.data["params"]["progress"], 50);

    println!("TEST 03 — Queued Before Attach: PASS");
}

// ═══════════════════════════════════════════════════════
// HEARTBEATS
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_04_idle_heartbeat() {
    let (_store, session) = session().await;
    let config = StreamConfig {
        heartbeat_interval: Duration::from_secs(3600),
        receive_timeout: Duration::from_millis(50),
    };
    let mut events = stream::open(session.clone(), &config).unwrap();
    next(&mut events).await.unwrap();

    let beat = next(&mut events).await.unwrap();
    assert_eq!(beat.kind, EventKind::Heartbeat);
    assert!(beat.data["timestamp"].is_string());

    println!("TEST 04 — Idle Heartbeat: PASS");
}

#[tokio::test]
async fn test_05_periodic_heartbeat() {
    let (_store, session) = session().await;
    let config = StreamConfig {
        heartbeat_interval: Duration::from_millis(30),
        receive_timeout: Duration::from_secs(3600),
    };
    let mut events = stream::open(session.clone(), &config).unwrap();
    next(&mut events).await.unwrap();

    for _ in 0..2 {
        let beat = next(&mut events).await.unwrap();
        assert_eq!(beat.kind, EventKind::Heartbeat);
        assert!(beat.data["timestamp"].is_string());
    }

    println!("TEST 05 — Periodic Heartbeat: PASS");
}

// ═══════════════════════════════════════════════════════
// LIFECYCLE
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_06_invalidate_ends_stream() {
    let (store, session) = session().await;
    let mut events = stream::open(session.clone(), &quiet()).unwrap();
    next(&mut events).await.unwrap();

    store.invalidate(session.id()).await;
    assert!(next(&mut events).await.is_none());

    let err = stream::open(session.clone(), &quiet()).err().unwrap();
    assert!(matches!(err, McpError::SessionInvalid));

    println!("TEST 06 — Invalidate Ends Stream: PASS");
}

#[tokio::test]
async fn test_07_one_stream_per_session() {
    let (_store, session) = session().await;
    let events = stream::open(session.clone(), &quiet()).unwrap();

    let err = stream::open(session.clone(), &quiet()).err().unwrap();
    assert!(matches!(err, McpError::StreamBusy));
    assert_eq!(err.http_status(), 409);

    drop(events);
    assert!(!session.has_stream());
    assert!(session.is_active(), "session outlives its stream");

    session.enqueue(OutboundMessage::heartbeat()).unwrap();
    let mut reopened = stream::open(session.clone(), &quiet()).unwrap();
    assert_eq!(next(&mut reopened).await.unwrap().kind, EventKind::Connected);
    assert_eq!(next(&mut reopened).await.unwrap().kind, EventKind::Heartbeat);

    println!("TEST 07 — One Stream Per Session: PASS");
}

#[tokio::test]
async fn test_08_deferred_tool_result_arrives_on_stream() {
    use async_trait::async_trait;
    use code_assist_mcp::tools::ToolHandler;
    use serde_json::Value;

    struct Background;

    #[async_trait]
    impl ToolHandler for Background {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "background".to_string(),
                description: None,
                input_schema: json!({ "type": "object" }),
            }
        }

        async fn invoke(&self, _arguments: Value) -> Result<Value, HandlerError> {
            Ok(json!({ "async": true, "status": "done" }))
        }
    }

    let (store, session) = session().await;
    let registry = CapabilityRegistry::builder().tool(Background).build();
    let handler = ProtocolHandler::new(
        Arc::new(registry),
        store.clone(),
        DispatchConfig {
            require_initialize: false,
            ..DispatchConfig::default()
        },
    );

    let mut events = stream::open(session.clone(), &quiet()).unwrap();
    next(&mut events).await.unwrap();

    let call: JsonRpcMessage =
        serde_json::from_value(mcp_request(21, "tools/call", json!({ "name": "background" })))
            .unwrap();
    let reply = handler.handle_message(&session, call).await.unwrap();
    assert!(matches!(&reply, Reply::Accepted(id) if *id == RequestId::from(21)));
    assert_eq!(reply.into_value()["result"]["status"], "accepted");

    let event = next(&mut events).await.unwrap();
    assert_eq!(event.kind, EventKind::Message);
    assert_eq!(event.data["id"], 21);
    assert_eq!(event.data["result"]["toolResult"]["status"], "done");

    println!("TEST 08 — Deferred Result On Stream: PASS");
}

#[tokio::test]
async fn test_09_listening_stream_keeps_session_alive() {
    let store = Arc::new(SessionStore::new(&SessionConfig {
        ttl: Duration::from_millis(100),
        ..SessionConfig::default()
    }));
    let session = store.create(&claims_for("user-a").await).await;
    let config = StreamConfig {
        heartbeat_interval: Duration::from_secs(3600),
        receive_timeout: Duration::from_millis(25),
    };

    let mut events = stream::open(session.clone(), &config).unwrap();
    next(&mut events).await.unwrap();
    for _ in 0..12 {
        assert_eq!(next(&mut events).await.unwrap().kind, EventKind::Heartbeat);
    }

    assert!(session.idle_for(std::time::Instant::now()) < store.ttl());
    assert!(store.get(session.id()).await.is_some());

    println!("TEST 09 — Listening Stream Keeps Session Alive: PASS");
}
