//! Per-client session state: identity binding, protocol phase, outbound queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::types::{Implementation, McpError, McpResult, OutboundMessage};

/// Protocol phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Initialized,
    ShuttingDown,
    Closed,
}

impl SessionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Uninitialized => "uninitialized",
            SessionPhase::Initialized => "initialized",
            SessionPhase::ShuttingDown => "shutting_down",
            SessionPhase::Closed => "closed",
        }
    }
}

#[derive(Debug)]
struct SessionState {
    phase: SessionPhase,
    last_activity: Instant,
    client_info: Option<Implementation>,
    client_capabilities: Option<Value>,
}

/// One authenticated client session.
///
/// The session owns the only sender of its outbound queue. Dropping that
/// sender on [`Session::deactivate`] is what wakes an attached stream.
pub struct Session {
    id: String,
    subject: String,
    grants: Vec<String>,
    created_at: DateTime<Utc>,
    state: Mutex<SessionState>,
    outbound: Mutex<Option<mpsc::Sender<OutboundMessage>>>,
    inbound: Mutex<Option<mpsc::Receiver<OutboundMessage>>>,
    active: AtomicBool,
    cancel: CancellationToken,
}

impl Session {
    pub(crate) fn new(id: String, subject: String, grants: Vec<String>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            id,
            subject,
            grants,
            created_at: Utc::now(),
            state: Mutex::new(SessionState {
                phase: SessionPhase::Uninitialized,
                last_activity: Instant::now(),
                client_info: None,
                client_capabilities: None,
            }),
            outbound: Mutex::new(Some(tx)),
            inbound: Mutex::new(Some(rx)),
            active: AtomicBool::new(true),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn grants(&self) -> &[String] {
        &self.grants
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> SessionPhase {
        self.state().phase
    }

    pub fn set_phase(&self, phase: SessionPhase) {
        let mut state = self.state();
        if state.phase != phase {
            tracing::debug!(
                session = %self.id,
                from = state.phase.as_str(),
                to = phase.as_str(),
                "Session phase change"
            );
            state.phase = phase;
        }
    }

    pub fn last_activity(&self) -> Instant {
        self.state().last_activity
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity())
    }

    pub fn touch(&self) {
        self.state().last_activity = Instant::now();
    }

    /// Record what the client reported in `initialize` and enter the
    /// initialized phase.
    pub fn mark_initialized(&self, client_info: Option<Implementation>, capabilities: Option<Value>) {
        {
            let mut state = self.state();
            state.client_info = client_info;
            state.client_capabilities = capabilities;
        }
        self.set_phase(SessionPhase::Initialized);
    }

    pub fn client_info(&self) -> Option<Implementation> {
        self.state().client_info.clone()
    }

    pub fn client_capabilities(&self) -> Option<Value> {
        self.state().client_capabilities.clone()
    }

    /// Queue a message for the event stream without waiting.
    pub fn enqueue(&self, message: OutboundMessage) -> McpResult<()> {
        if !self.is_active() {
            return Err(McpError::QueueClosed);
        }
        let sender = lock(&self.outbound).clone().ok_or(McpError::QueueClosed)?;
        sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => McpError::QueueFull,
            TrySendError::Closed(_) => McpError::QueueClosed,
        })
    }

    /// Claim the receiving end of the queue. `None` while a stream holds it.
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<OutboundMessage>> {
        lock(&self.inbound).take()
    }

    /// Give the receiver back after a stream detaches. Dropped if the
    /// session has been deactivated meanwhile.
    pub fn restore_receiver(&self, receiver: mpsc::Receiver<OutboundMessage>) {
        if self.is_active() {
            *lock(&self.inbound) = Some(receiver);
        }
    }

    pub fn has_stream(&self) -> bool {
        lock(&self.inbound).is_none()
    }

    /// Token cancelled when the session is deactivated.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Mark inactive, close the outbound queue and cancel session tasks.
    /// Idempotent.
    pub fn deactivate(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        lock(&self.outbound).take();
        lock(&self.inbound).take();
        self.cancel.cancel();
        self.set_phase(SessionPhase::Closed);
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("subject", &self.subject)
            .field("phase", &self.phase())
            .field("active", &self.is_active())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
