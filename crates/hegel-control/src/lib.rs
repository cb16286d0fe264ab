//! hegel-control: the local control plane for Hegel IDE.
//!
//! A single-route HTTP server on an OS-assigned loopback port. Tools running
//! inside an IDE terminal find it through `HEGEL_IDE_URL` and call
//! `POST /review` to open review tabs; accepted requests become
//! [`hegel_pty::SessionEvent::ReviewRequested`] on the shared event sink.

pub mod review;
pub mod server;

pub use review::{find_missing, parse_review_request, router, ReviewError};
pub use server::{ControlPlane, ControlPlaneError, ControlPlaneState};
