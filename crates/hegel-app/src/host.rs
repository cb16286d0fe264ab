//! Headless stand-in for the UI layer.
//!
//! Bridges the primary session to this process's stdin and stdout and logs
//! everything a graphical front end would turn into tab updates. Ctrl-C or
//! the primary shell exiting plays the part of closing the window.

use std::io::{Read, Write};

use hegel_pty::SessionEvent;
use tokio::sync::mpsc;

use crate::orchestrator::{Orchestrator, PRIMARY_SESSION_ID};

/// What the host loop should do after an event.
#[derive(Debug, PartialEq, Eq)]
pub enum HostAction {
    Continue,
    Quit,
}

/// Apply one event: primary output goes to `out`, everything else is logged
/// under the channel name a front end would listen on.
pub fn handle_event(event: SessionEvent, out: &mut impl Write) -> std::io::Result<HostAction> {
    let primary = event.session_id() == Some(PRIMARY_SESSION_ID);
    log::trace!("event {}", event.event_name());

    match event {
        SessionEvent::Output { data, .. } if primary => {
            out.write_all(&data)?;
            out.flush()?;
        }
        SessionEvent::Output { session_id, data } => {
            log::debug!("{} bytes from background session {session_id}", data.len());
        }
        SessionEvent::ForegroundProcessChanged { session_id, name } => {
            log::info!(
                "session {session_id} foreground: {}",
                name.as_deref().unwrap_or("none")
            );
        }
        SessionEvent::Exited { session_id } => {
            log::info!("session {session_id} exited");
            if primary {
                return Ok(HostAction::Quit);
            }
        }
        SessionEvent::ReviewRequested { files } => {
            for file in &files {
                log::info!("review requested: {file}");
            }
        }
    }
    Ok(HostAction::Continue)
}

/// Forward stdin to the channel on a dedicated thread until EOF.
fn spawn_stdin_reader() -> std::io::Result<mpsc::Receiver<Vec<u8>>> {
    let (tx, rx) = mpsc::channel::<Vec<u8>>(64);
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let mut stdin = std::io::stdin().lock();
            let mut buf = [0u8; 4096];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) | Err(_) => return,
                    Ok(n) => {
                        if tx.blocking_send(buf[..n].to_vec()).is_err() {
                            return;
                        }
                    }
                }
            }
        })?;
    Ok(rx)
}

/// Run until Ctrl-C or the primary shell exits, then shut everything down.
pub async fn run(
    mut orchestrator: Orchestrator,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
) -> anyhow::Result<()> {
    let mut input = Some(spawn_stdin_reader()?);
    let mut stdout = std::io::stdout();

    eprintln!(
        "hegel-ide: control plane at http://localhost:{}",
        orchestrator.control_plane_port()
    );

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if handle_event(event, &mut stdout)? == HostAction::Quit {
                    break;
                }
            }
            data = async { input.as_mut()?.recv().await }, if input.is_some() => {
                match data {
                    Some(data) => {
                        if let Err(e) = orchestrator.write_input(PRIMARY_SESSION_ID, &data) {
                            log::warn!("failed to write to primary session: {e}");
                        }
                    }
                    None => {
                        log::debug!("stdin closed");
                        input = None;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupt received");
                break;
            }
        }
    }

    log::info!(
        "closing {} session(s)",
        orchestrator.sessions().list().len()
    );
    orchestrator.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_output_is_written_verbatim() {
        let mut out = Vec::new();
        let action = handle_event(
            SessionEvent::Output {
                session_id: PRIMARY_SESSION_ID.to_string(),
                data: b"\x1b[1mhi\x1b[0m\r\n".to_vec(),
            },
            &mut out,
        )
        .unwrap();
        assert_eq!(action, HostAction::Continue);
        assert_eq!(out, b"\x1b[1mhi\x1b[0m\r\n");
    }

    #[test]
    fn test_background_output_is_not_written() {
        let mut out = Vec::new();
        handle_event(
            SessionEvent::Output {
                session_id: "tab-2".to_string(),
                data: b"hidden".to_vec(),
            },
            &mut out,
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_primary_exit_quits() {
        let mut out = Vec::new();
        let primary = handle_event(
            SessionEvent::Exited {
                session_id: PRIMARY_SESSION_ID.to_string(),
            },
            &mut out,
        )
        .unwrap();
        let other = handle_event(
            SessionEvent::Exited {
                session_id: "tab-2".to_string(),
            },
            &mut out,
        )
        .unwrap();
        assert_eq!(primary, HostAction::Quit);
        assert_eq!(other, HostAction::Continue);
    }

    #[test]
    fn test_review_and_foreground_events_continue() {
        let mut out = Vec::new();
        let review = handle_event(
            SessionEvent::ReviewRequested {
                files: vec!["/tmp/a.md".to_string()],
            },
            &mut out,
        )
        .unwrap();
        let process = handle_event(
            SessionEvent::ForegroundProcessChanged {
                session_id: PRIMARY_SESSION_ID.to_string(),
                name: Some("vim".to_string()),
            },
            &mut out,
        )
        .unwrap();
        assert_eq!(review, HostAction::Continue);
        assert_eq!(process, HostAction::Continue);
        assert!(out.is_empty());
    }

    #[test]
    fn test_session_named_like_primary_prefix_is_background() {
        let mut out = Vec::new();
        let action = handle_event(
            SessionEvent::Exited {
                session_id: format!("{PRIMARY_SESSION_ID}-2"),
            },
            &mut out,
        )
        .unwrap();
        handle_event(
            SessionEvent::Output {
                session_id: format!("{PRIMARY_SESSION_ID}-2"),
                data: b"hidden".to_vec(),
            },
            &mut out,
        )
        .unwrap();
        assert_eq!(action, HostAction::Continue);
        assert!(out.is_empty());
    }
}
