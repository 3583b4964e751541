//! Attaching a push stream to a session's outbound queue.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::event::StreamEvent;
use crate::config::StreamConfig;
use crate::session::Session;
use crate::types::{McpError, McpResult, OutboundMessage};

pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1);

enum Step {
    Deliver(OutboundMessage),
    Idle,
    Stop,
}

/// Detaches the stream from its session when dropped, whether the stream
/// finished or the client went away.
struct StreamGuard {
    session: Arc<Session>,
    receiver: Option<mpsc::Receiver<OutboundMessage>>,
    cancel: CancellationToken,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(receiver) = self.receiver.take() {
            self.session.restore_receiver(receiver);
        }
        tracing::info!(session = %self.session.id(), "Event stream detached");
    }
}

/// Open the event stream for a session.
///
/// Emits `connected` first, then queued messages. When nothing arrives
/// within the receive timeout a `heartbeat` is emitted instead. A separate
/// producer also enqueues heartbeats on a fixed period while attached.
/// Every delivered event counts as session activity.
/// Only one stream may be attached to a session at a time.
pub fn open(session: Arc<Session>, config: &StreamConfig) -> McpResult<EventStream> {
    if !session.is_active() {
        return Err(McpError::SessionInvalid);
    }
    let receiver = session.take_receiver().ok_or(McpError::StreamBusy)?;
    let cancel = session.cancel_token().child_token();

    spawn_heartbeat(session.clone(), config.heartbeat_interval, cancel.clone());
    tracing::info!(session = %session.id(), "Event stream opened");

    let receive_timeout = config.receive_timeout;
    let mut guard = StreamGuard {
        session,
        receiver: Some(receiver),
        cancel,
    };

    let stream = async_stream::stream! {
        yield StreamEvent::connected(guard.session.id());

        loop {
            let step = {
                let Some(receiver) = guard.receiver.as_mut() else {
                    break;
                };
                tokio::select! {
                    _ = guard.cancel.cancelled() => Step::Stop,
                    received = tokio::time::timeout(receive_timeout, receiver.recv()) => match received {
                        Ok(Some(message)) => Step::Deliver(message),
                        Ok(None) => Step::Stop,
                        Err(_) => Step::Idle,
                    },
                }
            };

            // An attached stream keeps its session alive.
            if !matches!(step, Step::Stop) {
                guard.session.touch();
            }

            match step {
                Step::Deliver(message) => match StreamEvent::from_outbound(&message) {
                    Ok(event) => yield event,
                    Err(e) => {
                        tracing::error!(session = %guard.session.id(), "Failed to encode event: {e}");
                        yield StreamEvent::error("failed to encode event");
                        break;
                    }
                },
                Step::Idle => yield StreamEvent::heartbeat(),
                Step::Stop => break,
            }
        }
    };

    Ok(Box::pin(stream))
}

/// Enqueue a heartbeat notification every `period` until cancelled or the
/// queue closes. A full queue skips the beat rather than waiting.
fn spawn_heartbeat(session: Arc<Session>, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period.max(MIN_HEARTBEAT_INTERVAL));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => match session.enqueue(OutboundMessage::heartbeat()) {
                    Ok(()) => {}
                    Err(McpError::QueueFull) => {
                        tracing::debug!(session = %session.id(), "Queue full, heartbeat skipped");
                    }
                    Err(_) => break,
                },
            }
        }
    })
}
