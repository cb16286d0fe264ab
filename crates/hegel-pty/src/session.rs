use serde::Serialize;

use crate::pty::{PtyError, PtyHandle};

/// Terminal dimensions in character cells.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub cols: u16,
    pub rows: u16,
}

impl Default for Geometry {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

/// One live shell: the PTY it runs in plus the geometry last applied to it.
///
/// Sessions are owned by the registry. Output is read on a separate thread
/// from a reader taken out of the PTY before the session was registered, so
/// holding the session lock never waits on shell output.
pub struct Session {
    pty: PtyHandle,
    geometry: Geometry,
}

impl Session {
    pub(crate) fn new(pty: PtyHandle, geometry: Geometry) -> Self {
        Self { pty, geometry }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Write user input to the PTY.
    pub fn write_input(&mut self, data: &[u8]) -> Result<(), PtyError> {
        self.pty.write(data)
    }

    /// Resize the PTY and remember the new geometry.
    pub fn resize(&mut self, geometry: Geometry) -> Result<(), PtyError> {
        self.pty.resize(geometry.cols, geometry.rows)?;
        self.geometry = geometry;
        Ok(())
    }

    /// Check if the shell is still running.
    pub fn is_alive(&mut self) -> bool {
        self.pty.is_alive()
    }

    /// Kill the shell. Safe to call on a shell that already exited.
    pub fn terminate(&mut self) -> Result<(), PtyError> {
        self.pty.terminate()
    }
}
