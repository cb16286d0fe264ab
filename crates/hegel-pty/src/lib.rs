//! hegel-pty: terminal session management for Hegel IDE.
//!
//! This crate owns every shell the IDE runs. It spawns PTYs, forwards their
//! output to the UI as tagged events, routes input and resizes back, and
//! reports which program is in the foreground of each shell.
//!
//! # Architecture
//!
//! - [`PtyHandle`] — Low-level PTY process management (spawn, write, resize, kill).
//! - [`SessionRegistry`] — Lock-protected map from session id to session.
//! - [`SessionManager`] — Session lifecycle: create, destroy, input, resize, shutdown.
//! - [`ForegroundProbe`] — Platform query for the foreground process of a shell.
//! - [`build_env`] — Session environment carrying the control-plane URL.
//! - [`SessionEvent`] / [`EventSink`] — The event stream consumed by the UI.

pub mod env;
pub mod events;
pub mod io_thread;
pub mod manager;
pub mod probe;
pub mod pty;
pub mod registry;
pub mod session;

pub use env::{build_env, control_plane_url, URL_ENV_VAR};
pub use events::{EventSink, SessionEvent, SharedSink};
pub use manager::{ManagerConfig, SessionError, SessionInfo, SessionManager, CWD_ENV_VAR};
pub use probe::{default_probe, ForegroundProbe, ForegroundTracker, NullProbe, ProcfsProbe, PsProbe};
pub use pty::{PtyError, PtyHandle, SpawnOptions};
pub use registry::SessionRegistry;
pub use session::{Geometry, Session};
