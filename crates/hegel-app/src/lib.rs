//! hegel-app: process wiring for Hegel IDE.
//!
//! [`Orchestrator`] brings up the control plane and the primary terminal in
//! the required order and tears them down in reverse. [`host`] drives it
//! headlessly from stdin/stdout.

pub mod host;
pub mod orchestrator;

pub use orchestrator::{Orchestrator, PRIMARY_SESSION_ID};
