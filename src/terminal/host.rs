//! Terminal emulator backed by the host process's stdout
//!
//! The real terminal the binary runs in does the rendering; this type only
//! forwards display bytes to stdout and hands encoded key events to the session.

use super::{CellSize, DataHandler, GridSize, TerminalEmulator, Viewport};
use parking_lot::Mutex;
use std::io::Write;
use tracing::{trace, warn};

pub struct HostTerminal {
    handler: Mutex<Option<DataHandler>>,
    size: Mutex<GridSize>,
    cell: CellSize,
}

impl HostTerminal {
    pub fn new(cell: CellSize) -> Self {
        Self {
            handler: Mutex::new(None),
            size: Mutex::new(GridSize::default()),
            cell,
        }
    }

    /// Deliver encoded key or paste bytes as a keystroke event
    pub fn feed_input(&self, data: &[u8]) {
        let handler = self.handler.lock().clone();
        match handler {
            Some(handler) => handler(data),
            None => trace!("No data handler registered, dropping {} bytes", data.len()),
        }
    }

    pub fn size(&self) -> GridSize {
        *self.size.lock()
    }
}

impl TerminalEmulator for HostTerminal {
    fn open(&self, container: Viewport) -> GridSize {
        self.fit(container)
    }

    fn write(&self, data: &[u8]) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = out.write_all(data).and_then(|_| out.flush()) {
            warn!("Failed to write to stdout: {}", e);
        }
    }

    fn on_data(&self, handler: DataHandler) {
        *self.handler.lock() = Some(handler);
    }

    fn fit(&self, container: Viewport) -> GridSize {
        let size = GridSize::fit(container, self.cell);
        *self.size.lock() = size;
        size
    }

    fn dispose(&self) {
        self.handler.lock().take();
    }
}
