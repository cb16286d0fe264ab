//! Per-session output forwarding.
//!
//! Each session gets two dedicated OS threads. The reader thread blocks on
//! PTY output and forwards every chunk to the event sink as soon as it
//! arrives. It then nudges the probe thread, which asks the foreground
//! probe what is running and emits a change event when the answer moves.
//! Probing never runs on the reader thread, so a slow process-table query
//! cannot delay output for this session or any other.

use std::io::Read;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

use crate::events::{EventSink, SessionEvent, SharedSink};
use crate::probe::{ForegroundProbe, ForegroundTracker};

const READ_BUFFER_SIZE: usize = 65536;

/// Forward one chunk of PTY output, unmodified and tagged with its session.
pub fn forward_output(session_id: &str, data: &[u8], sink: &dyn EventSink) {
    sink.emit(SessionEvent::Output {
        session_id: session_id.to_string(),
        data: data.to_vec(),
    });
}

/// Probe the shell once and emit a change event if the foreground process
/// differs from the last one seen.
pub fn check_foreground(
    tracker: &mut ForegroundTracker,
    probe: &dyn ForegroundProbe,
    pid: u32,
    sink: &dyn EventSink,
) {
    if let Some(event) = tracker.observe(probe.foreground_process(pid)) {
        sink.emit(event);
    }
}

/// Start the reader thread (and, when the shell has a pid, the probe thread)
/// for a session.
pub fn start_io_thread(
    session_id: String,
    reader: Box<dyn Read + Send>,
    pid: Option<u32>,
    sink: SharedSink,
    probe: Arc<dyn ForegroundProbe>,
) -> std::io::Result<()> {
    let probe_tx = match pid {
        Some(pid) => {
            // Capacity 1: a pending nudge already guarantees a probe after the
            // latest chunk, so extra nudges are dropped.
            let (tx, rx) = mpsc::sync_channel::<()>(1);
            let tracker = ForegroundTracker::new(session_id.clone());
            let probe_sink = Arc::clone(&sink);
            std::thread::Builder::new()
                .name(format!("pty-probe-{session_id}"))
                .spawn(move || probe_loop(pid, rx, tracker, probe, probe_sink))?;
            Some(tx)
        }
        None => None,
    };

    std::thread::Builder::new()
        .name(format!("pty-io-{session_id}"))
        .spawn(move || io_loop(session_id, reader, sink, probe_tx))?;
    Ok(())
}

fn io_loop(
    session_id: String,
    mut reader: Box<dyn Read + Send>,
    sink: SharedSink,
    mut probe_tx: Option<SyncSender<()>>,
) {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        // Blocks until the shell writes or every handle to the PTY slave closes.
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::debug!("PTY read for session {session_id} ended: {e}");
                break;
            }
        };

        forward_output(&session_id, &buf[..n], sink.as_ref());

        if let Some(tx) = &probe_tx {
            if let Err(TrySendError::Disconnected(())) = tx.try_send(()) {
                probe_tx = None;
            }
        }
    }

    log::info!("session {session_id} output closed");
    sink.emit(SessionEvent::Exited { session_id });
}

fn probe_loop(
    pid: u32,
    rx: Receiver<()>,
    mut tracker: ForegroundTracker,
    probe: Arc<dyn ForegroundProbe>,
    sink: SharedSink,
) {
    // Ends when the reader thread drops its sender.
    while rx.recv().is_ok() {
        check_foreground(&mut tracker, probe.as_ref(), pid, sink.as_ref());
    }
}
