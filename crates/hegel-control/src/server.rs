//! Control-plane listener lifecycle.
//!
//! The server moves through three states: `Unbound`, then `Listening` once
//! the OS has assigned a loopback port, then `Closed` at shutdown. The port
//! never changes after binding and stays readable after close.
//!
//! Shells are told `http://localhost:<port>`, and `localhost` may resolve to
//! `::1` before `127.0.0.1`, so the same port is also served on the IPv6
//! loopback whenever the host has one.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use axum::Router;
use hegel_pty::SharedSink;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::review::router;

/// How long `close` waits for in-flight requests before dropping them.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPlaneState {
    Unbound,
    Listening(u16),
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum ControlPlaneError {
    #[error("failed to bind control plane: {0}")]
    Bind(#[from] std::io::Error),
    #[error("control plane already listening on port {0}")]
    AlreadyBound(u16),
    #[error("control plane is closed")]
    Closed,
}

/// The local HTTP endpoint external tools use to drive the UI.
pub struct ControlPlane {
    state: ControlPlaneState,
    port: Option<u16>,
    shutdown_tx: Option<watch::Sender<bool>>,
    servers: Vec<JoinHandle<()>>,
}

impl ControlPlane {
    pub fn new() -> Self {
        Self {
            state: ControlPlaneState::Unbound,
            port: None,
            shutdown_tx: None,
            servers: Vec::new(),
        }
    }

    pub fn state(&self) -> ControlPlaneState {
        self.state
    }

    /// The assigned port, once bound. Still reported after close.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Bind an OS-assigned port on `127.0.0.1` (and the same port on `::1`
    /// when available) and start serving. Review notifications go to `sink`.
    /// Only valid in the `Unbound` state.
    pub async fn bind(&mut self, sink: SharedSink) -> Result<u16, ControlPlaneError> {
        match self.state {
            ControlPlaneState::Unbound => {}
            ControlPlaneState::Listening(port) => return Err(ControlPlaneError::AlreadyBound(port)),
            ControlPlaneState::Closed => return Err(ControlPlaneError::Closed),
        }

        let v4 = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).await?;
        let port = v4.local_addr()?.port();
        let v6 = match TcpListener::bind(SocketAddr::from((Ipv6Addr::LOCALHOST, port))).await {
            Ok(listener) => Some(listener),
            Err(e) => {
                log::debug!("control plane not listening on [::1]:{port}: {e}");
                None
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let app = router(sink);
        let mut servers = vec![spawn_server(v4, app.clone(), shutdown_rx.clone())];
        if let Some(v6) = v6 {
            servers.push(spawn_server(v6, app, shutdown_rx));
        }

        self.state = ControlPlaneState::Listening(port);
        self.port = Some(port);
        self.shutdown_tx = Some(shutdown_tx);
        self.servers = servers;
        log::info!("control plane listening on http://localhost:{port}");
        Ok(port)
    }

    /// Stop accepting requests. Connections still open after a short grace
    /// period are dropped. Closing twice, or closing an unbound server, only
    /// moves the state to `Closed`.
    pub async fn close(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        let mut servers = std::mem::take(&mut self.servers);
        let drained = tokio::time::timeout(
            CLOSE_GRACE,
            futures::future::join_all(servers.iter_mut()),
        )
        .await;
        if drained.is_err() {
            log::warn!("control plane connections still open after {CLOSE_GRACE:?}; aborting");
            for server in &servers {
                server.abort();
            }
        }
        if self.state != ControlPlaneState::Closed {
            log::info!("control plane closed");
        }
        self.state = ControlPlaneState::Closed;
    }
}

fn spawn_server(
    listener: TcpListener,
    app: Router,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async move {
                // A dropped sender also counts as shutdown.
                let _ = shutdown_rx.wait_for(|closed| *closed).await;
            })
            .await;
        if let Err(e) = result {
            log::error!("control plane server error: {e}");
        }
    })
}

impl Default for ControlPlane {
    fn default() -> Self {
        Self::new()
    }
}
