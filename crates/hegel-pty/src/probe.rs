//! Foreground process detection for PTY sessions.
//!
//! The probe runs only when a session produces output, never on a timer.
//! Every failure (process gone, permission denied, missing tooling) reads
//! as "no foreground process" because the result only labels a tab.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use crate::events::SessionEvent;

/// Answers "what is running in the foreground of this shell?".
pub trait ForegroundProbe: Send + Sync + 'static {
    /// Name of the foreground process of the PTY whose shell has `pid`,
    /// without directory components. `None` when the shell is idle or the
    /// query fails.
    fn foreground_process(&self, pid: u32) -> Option<String>;
}

/// Reads the terminal's foreground process group from procfs.
///
/// `/proc/<shell>/stat` carries both the shell's own process group and the
/// foreground process group of its controlling terminal (`tpgid`). When they
/// differ, a job owns the terminal and its leader's `comm` is the answer.
#[derive(Debug, Clone)]
pub struct ProcfsProbe {
    root: PathBuf,
}

impl ProcfsProbe {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Use an alternate procfs mount point.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ProcfsProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ForegroundProbe for ProcfsProbe {
    fn foreground_process(&self, pid: u32) -> Option<String> {
        let stat = fs::read_to_string(self.root.join(pid.to_string()).join("stat")).ok()?;
        let (pgrp, tpgid) = parse_stat_groups(&stat)?;
        if tpgid <= 0 || tpgid == pgrp {
            return None;
        }
        let comm = fs::read_to_string(self.root.join(tpgid.to_string()).join("comm")).ok()?;
        process_basename(comm.trim())
    }
}

/// Extract `(pgrp, tpgid)` from the contents of `/proc/<pid>/stat`.
///
/// The command name in field 2 may contain spaces and parentheses, so
/// fields are counted from the last `)`.
fn parse_stat_groups(stat: &str) -> Option<(i64, i64)> {
    let end = stat.rfind(')')?;
    let mut fields = stat.get(end + 1..)?.split_whitespace();
    // state, ppid, pgrp, session, tty_nr, tpgid
    let pgrp = fields.nth(2)?.parse().ok()?;
    let tpgid = fields.nth(2)?.parse().ok()?;
    Some((pgrp, tpgid))
}

/// Queries the process table through `ps` and reports the newest direct
/// child of the shell.
#[derive(Debug, Clone, Default)]
pub struct PsProbe;

impl ForegroundProbe for PsProbe {
    fn foreground_process(&self, pid: u32) -> Option<String> {
        let output = Command::new("ps")
            .args(["-A", "-o", "pid=,ppid=,comm="])
            .output()
            .ok()?;
        if !output.status.success() {
            log::debug!("ps exited with {}", output.status);
            return None;
        }
        newest_child(&String::from_utf8_lossy(&output.stdout), pid)
    }
}

/// Pick the highest-pid child of `parent` from `pid ppid comm` lines.
fn newest_child(table: &str, parent: u32) -> Option<String> {
    table
        .lines()
        .filter_map(|line| {
            let line = line.trim_start();
            let (pid, rest) = line.split_once(char::is_whitespace)?;
            let rest = rest.trim_start();
            let (ppid, comm) = rest.split_once(char::is_whitespace)?;
            let pid: u32 = pid.parse().ok()?;
            let ppid: u32 = ppid.parse().ok()?;
            (ppid == parent).then(|| (pid, comm.trim()))
        })
        .max_by_key(|(pid, _)| *pid)
        .and_then(|(_, comm)| process_basename(comm))
}

/// Never reports a foreground process. Used where no process table is
/// available.
#[derive(Debug, Clone, Default)]
pub struct NullProbe;

impl ForegroundProbe for NullProbe {
    fn foreground_process(&self, _pid: u32) -> Option<String> {
        None
    }
}

/// The probe for the current platform.
pub fn default_probe() -> Arc<dyn ForegroundProbe> {
    if cfg!(target_os = "linux") {
        Arc::new(ProcfsProbe::new())
    } else if cfg!(unix) {
        Arc::new(PsProbe)
    } else {
        Arc::new(NullProbe)
    }
}

/// Strip directory components (`/bin/zsh` -> `zsh`) and the login-shell
/// dash (`-zsh` -> `zsh`).
pub fn process_basename(path: &str) -> Option<String> {
    let name = Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path);
    let name = name.trim_start_matches('-').trim();
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

/// Last observed foreground process for one session.
///
/// Starts at `None` (idle shell) and turns each probe result into a
/// change event only when the name differs from the cached one.
#[derive(Debug)]
pub struct ForegroundTracker {
    session_id: String,
    last: Option<String>,
}

impl ForegroundTracker {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            last: None,
        }
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }

    /// Record a probe result. Returns the change event to emit, if any.
    pub fn observe(&mut self, name: Option<String>) -> Option<SessionEvent> {
        if name == self.last {
            return None;
        }
        self.last = name.clone();
        Some(SessionEvent::ForegroundProcessChanged {
            session_id: self.session_id.clone(),
            name,
        })
    }
}
