//! Events delivered to the UI layer.
//!
//! All sessions and the control plane share one sink. Each event is a
//! self-contained message tagged with its session id, so emissions from
//! many threads never interleave within a message.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

/// Event emitted by the session manager or the control plane.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Raw PTY output, unmodified.
    #[serde(rename_all = "camelCase")]
    Output { session_id: String, data: Vec<u8> },
    /// The foreground process of a session changed. `None` means the shell is idle.
    #[serde(rename_all = "camelCase")]
    ForegroundProcessChanged {
        session_id: String,
        name: Option<String>,
    },
    /// The session's output stream ended (shell exited or session destroyed).
    #[serde(rename_all = "camelCase")]
    Exited { session_id: String },
    /// An external caller asked for review tabs on these files, in order.
    ReviewRequested { files: Vec<String> },
}

impl SessionEvent {
    /// Session this event belongs to, if any.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            SessionEvent::Output { session_id, .. }
            | SessionEvent::ForegroundProcessChanged { session_id, .. }
            | SessionEvent::Exited { session_id } => Some(session_id),
            SessionEvent::ReviewRequested { .. } => None,
        }
    }

    /// Routing name for the UI. Uses the same session id as the tab and the
    /// session's environment.
    pub fn event_name(&self) -> String {
        match self {
            SessionEvent::Output { session_id, .. } => format!("terminal-output-{session_id}"),
            SessionEvent::ForegroundProcessChanged { session_id, .. } => {
                format!("terminal-process-{session_id}")
            }
            SessionEvent::Exited { session_id } => format!("terminal-exit-{session_id}"),
            SessionEvent::ReviewRequested { .. } => "review-requested".to_string(),
        }
    }
}

/// Destination for [`SessionEvent`]s. Implementations must accept events
/// from any thread.
pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, event: SessionEvent);
}

/// Sink shared between every producer.
pub type SharedSink = Arc<dyn EventSink>;

impl EventSink for mpsc::UnboundedSender<SessionEvent> {
    fn emit(&self, event: SessionEvent) {
        if self.send(event).is_err() {
            log::debug!("event receiver dropped; discarding event");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Sink that records every event it receives.
    #[derive(Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<SessionEvent>>,
    }

    impl RecordingSink {
        pub fn events(&self) -> Vec<SessionEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: SessionEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}
