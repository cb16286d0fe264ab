use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};

/// Errors from PTY operations.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("PTY spawn failed: {0}")]
    SpawnFailed(String),
    #[error("PTY I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PTY resize failed: {0}")]
    ResizeFailed(String),
}

/// Everything needed to start a shell inside a new pseudo-terminal.
#[derive(Debug, Clone)]
pub struct SpawnOptions {
    pub shell: String,
    pub cols: u16,
    pub rows: u16,
    pub cwd: PathBuf,
    /// Complete environment for the child. The parent environment is not
    /// inherited beyond what this map contains.
    pub env: HashMap<String, String>,
}

/// Owns a portable-pty child process, master side, and writer.
///
/// The reader is handed out once through [`PtyHandle::take_reader`] so a
/// dedicated thread can block on it without holding any lock on the handle.
pub struct PtyHandle {
    master: Box<dyn MasterPty + Send>,
    reader: Option<Box<dyn Read + Send>>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
    terminated: bool,
}

impl PtyHandle {
    /// Spawn `options.shell` in a new PTY with the given geometry, working
    /// directory, and environment.
    pub fn spawn(options: &SpawnOptions) -> Result<Self, PtyError> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(PtySize {
                rows: options.rows,
                cols: options.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::SpawnFailed(format!("failed to open PTY: {e}")))?;

        let mut cmd = CommandBuilder::new(&options.shell);
        cmd.cwd(&options.cwd);
        cmd.env_clear();
        for (key, value) in &options.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| {
                PtyError::SpawnFailed(format!("failed to spawn {}: {e}", options.shell))
            })?;

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::SpawnFailed(format!("failed to clone reader: {e}")))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::SpawnFailed(format!("failed to take writer: {e}")))?;

        Ok(Self {
            master: pair.master,
            reader: Some(reader),
            writer,
            child,
            terminated: false,
        })
    }

    /// Resize the PTY to new dimensions.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), PtyError> {
        self.master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::ResizeFailed(format!("{e}")))
    }

    /// Write bytes to the PTY master (user input -> shell).
    pub fn write(&mut self, data: &[u8]) -> Result<(), PtyError> {
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Extract the blocking output reader. Returns `None` after the first call.
    pub fn take_reader(&mut self) -> Option<Box<dyn Read + Send>> {
        self.reader.take()
    }

    /// OS process id of the shell, if the platform reports one.
    pub fn process_id(&self) -> Option<u32> {
        self.child.process_id()
    }

    /// Check if the child process is still alive.
    pub fn is_alive(&mut self) -> bool {
        self.try_wait().is_none()
    }

    /// Get the child process exit status if it has exited.
    ///
    /// Returns `None` if the process is still running.
    pub fn try_wait(&mut self) -> Option<u32> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.exit_code()),
            _ => None,
        }
    }

    /// Kill the shell and reap it. Calling this more than once is a no-op.
    pub fn terminate(&mut self) -> Result<(), PtyError> {
        if self.terminated {
            return Ok(());
        }
        self.terminated = true;

        if self.try_wait().is_some() {
            return Ok(());
        }
        self.child.kill()?;
        let _ = self.child.wait();
        Ok(())
    }
}

impl Drop for PtyHandle {
    fn drop(&mut self) {
        if let Err(e) = self.terminate() {
            log::warn!("failed to kill PTY child on drop: {e}");
        }
    }
}

/// Returns the user's default shell for this platform.
pub fn default_shell() -> String {
    if cfg!(windows) {
        return "powershell.exe".to_string();
    }
    std::env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/bin/sh".to_string())
}
