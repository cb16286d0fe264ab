//! Session lifecycle: spawn, route input and resizes, destroy, shut down.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::env::build_env;
use crate::events::SharedSink;
use crate::io_thread::start_io_thread;
use crate::probe::ForegroundProbe;
use crate::pty::{default_shell, PtyError, PtyHandle, SpawnOptions};
use crate::registry::{lock_entry, SessionRegistry};
use crate::session::{Geometry, Session};

/// Overrides the working directory of every session.
pub const CWD_ENV_VAR: &str = "HEGEL_IDE_CWD";

/// Errors from session lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The PTY or the shell could not be started. The registry is unchanged.
    #[error("failed to start session: {0}")]
    Spawn(#[source] PtyError),
    /// A live session already uses this id.
    #[error("session {0} already exists")]
    DuplicateSession(String),
    #[error(transparent)]
    Pty(#[from] PtyError),
}

/// Settings resolved once at startup and shared by every session.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub shell: String,
    pub working_dir: PathBuf,
    /// Environment every session starts from, before the control-plane URL
    /// is added.
    pub base_env: HashMap<String, String>,
}

impl ManagerConfig {
    /// Resolve shell, working directory, and base environment from the
    /// current process.
    pub fn from_env() -> Self {
        Self {
            shell: default_shell(),
            working_dir: resolve_working_dir(
                std::env::var_os(CWD_ENV_VAR),
                std::env::current_dir().ok(),
                std::env::var_os("HOME"),
            ),
            base_env: std::env::vars().collect(),
        }
    }
}

/// Pick the session working directory: explicit override, then the process
/// working directory, then home, then `.`.
fn resolve_working_dir(
    override_dir: Option<OsString>,
    current_dir: Option<PathBuf>,
    home: Option<OsString>,
) -> PathBuf {
    override_dir
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or(current_dir)
        .or_else(|| home.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Snapshot of a freshly created session.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub pid: Option<u32>,
    pub geometry: Geometry,
}

/// Owns every terminal session and the threads that forward their output.
///
/// Unknown ids are tolerated everywhere: the UI can close a tab and send a
/// keystroke to it before the close lands, so `write`, `resize`, and
/// `destroy` on a missing session quietly do nothing.
pub struct SessionManager {
    config: ManagerConfig,
    registry: SessionRegistry<Session>,
    sink: SharedSink,
    probe: Arc<dyn ForegroundProbe>,
}

impl SessionManager {
    pub fn new(config: ManagerConfig, sink: SharedSink, probe: Arc<dyn ForegroundProbe>) -> Self {
        Self {
            config,
            registry: SessionRegistry::new(),
            sink,
            probe,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Spawn a shell for `id` whose environment points at the control plane
    /// on `port`, register it, and start forwarding its output.
    ///
    /// Fails with [`SessionError::DuplicateSession`] if `id` is live and with
    /// [`SessionError::Spawn`] if the PTY or shell cannot be started. On
    /// failure nothing is registered, so the caller can retry.
    pub fn create(&self, id: &str, port: u16) -> Result<SessionInfo, SessionError> {
        if self.registry.contains(id) {
            return Err(SessionError::DuplicateSession(id.to_string()));
        }

        let geometry = Geometry::default();
        let options = SpawnOptions {
            shell: self.config.shell.clone(),
            cols: geometry.cols,
            rows: geometry.rows,
            cwd: self.config.working_dir.clone(),
            env: build_env(&self.config.base_env, port),
        };

        let mut pty = PtyHandle::spawn(&options).map_err(SessionError::Spawn)?;
        let reader = pty.take_reader().ok_or_else(|| {
            SessionError::Spawn(PtyError::SpawnFailed("PTY reader unavailable".to_string()))
        })?;
        let pid = pty.process_id();

        // A racing create for the same id may have won since the check above.
        // The losing PTY is killed when `Session` drops.
        if self
            .registry
            .insert_if_absent(id, Session::new(pty, geometry))
            .is_err()
        {
            return Err(SessionError::DuplicateSession(id.to_string()));
        }

        if let Err(e) = start_io_thread(
            id.to_string(),
            reader,
            pid,
            Arc::clone(&self.sink),
            Arc::clone(&self.probe),
        ) {
            self.destroy(id);
            return Err(SessionError::Spawn(PtyError::Io(e)));
        }

        log::info!(
            "session {id} started: shell={} pid={pid:?} cwd={}",
            self.config.shell,
            self.config.working_dir.display()
        );

        Ok(SessionInfo {
            id: id.to_string(),
            pid,
            geometry,
        })
    }

    /// Remove a session and kill its shell. Returns whether the id was live.
    pub fn destroy(&self, id: &str) -> bool {
        let Some(entry) = self.registry.remove(id) else {
            log::debug!("destroy for unknown session {id}");
            return false;
        };
        if let Err(e) = lock_entry(&entry).terminate() {
            log::warn!("failed to terminate session {id}: {e}");
        }
        log::info!("session {id} destroyed");
        true
    }

    /// Send raw input bytes to a session.
    pub fn write(&self, id: &str, data: &[u8]) -> Result<(), SessionError> {
        let Some(entry) = self.registry.get(id) else {
            log::debug!("dropping {} input bytes for unknown session {id}", data.len());
            return Ok(());
        };
        let mut session = lock_entry(&entry);
        session.write_input(data)?;
        Ok(())
    }

    /// Apply a new geometry to a session.
    pub fn resize(&self, id: &str, cols: u16, rows: u16) -> Result<(), SessionError> {
        let Some(entry) = self.registry.get(id) else {
            log::debug!("ignoring resize for unknown session {id}");
            return Ok(());
        };
        let mut session = lock_entry(&entry);
        session.resize(Geometry { cols, rows })?;
        Ok(())
    }

    /// Last geometry applied to a session.
    pub fn geometry(&self, id: &str) -> Option<Geometry> {
        self.registry
            .get(id)
            .map(|entry| lock_entry(&entry).geometry())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    /// Whether a session's shell is still running. `None` for unknown ids.
    ///
    /// A shell that exited stays registered until `destroy`.
    pub fn is_alive(&self, id: &str) -> Option<bool> {
        self.registry
            .get(id)
            .map(|entry| lock_entry(&entry).is_alive())
    }

    /// Ids of all registered sessions, sorted.
    pub fn list(&self) -> Vec<String> {
        self.registry.ids()
    }

    /// Kill every session and empty the registry. Returns how many sessions
    /// were terminated; a second call finds nothing left and returns 0.
    pub fn shutdown(&self) -> usize {
        let drained = self.registry.drain();
        let count = drained.len();
        for (id, entry) in drained {
            if let Err(e) = lock_entry(&entry).terminate() {
                log::warn!("failed to terminate session {id} during shutdown: {e}");
            }
        }
        if count > 0 {
            log::info!("terminated {count} session(s)");
        }
        count
    }
}
