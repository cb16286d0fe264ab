//! Startup and shutdown wiring for the session manager and control plane.

use std::sync::Arc;

use anyhow::Context;
use hegel_control::ControlPlane;
use hegel_pty::{
    ForegroundProbe, ManagerConfig, SessionError, SessionInfo, SessionManager, SharedSink,
};

/// Id of the terminal opened at startup.
pub const PRIMARY_SESSION_ID: &str = "primary";

/// Owns the session manager and the control plane for the lifetime of the app.
///
/// The control plane is bound before any session exists because every
/// session's environment carries its URL.
pub struct Orchestrator {
    sessions: SessionManager,
    control: ControlPlane,
    port: u16,
}

impl Orchestrator {
    /// Bind the control plane, then open the primary session. Both report to
    /// `sink`.
    pub async fn start(
        config: ManagerConfig,
        sink: SharedSink,
        probe: Arc<dyn ForegroundProbe>,
    ) -> anyhow::Result<Self> {
        let mut control = ControlPlane::new();
        let port = control
            .bind(Arc::clone(&sink))
            .await
            .context("failed to start control plane")?;

        let sessions = SessionManager::new(config, sink, probe);
        if let Err(e) = sessions.create(PRIMARY_SESSION_ID, port) {
            control.close().await;
            return Err(e).context("failed to start primary terminal");
        }

        Ok(Self {
            sessions,
            control,
            port,
        })
    }

    /// Port the control plane listens on. Fixed for the life of the process.
    pub fn control_plane_port(&self) -> u16 {
        self.port
    }

    pub fn create_session(&self, id: &str) -> Result<SessionInfo, SessionError> {
        self.sessions.create(id, self.port)
    }

    pub fn destroy_session(&self, id: &str) -> bool {
        self.sessions.destroy(id)
    }

    pub fn write_input(&self, id: &str, data: &[u8]) -> Result<(), SessionError> {
        self.sessions.write(id, data)
    }

    pub fn resize(&self, id: &str, cols: u16, rows: u16) -> Result<(), SessionError> {
        self.sessions.resize(id, cols, rows)
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Kill every session, then close the control plane.
    pub async fn shutdown(&mut self) {
        self.sessions.shutdown();
        self.control.close().await;
    }
}
