//! Terminal module - Terminal emulator boundary
//!
//! This module provides:
//! - `TerminalEmulator`: what a session needs from an emulator (render into a
//!   container, append raw bytes, report keystrokes, fit the grid)
//! - `Screen`: headless emulator keeping the raw display buffer and a parsed grid
//! - `HostTerminal`: emulator that renders to the process stdout
//! - `key_bytes`: host key events encoded as PTY input

mod host;
mod keys;
mod screen;

pub use host::HostTerminal;
pub use keys::key_bytes;
pub use screen::Screen;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Callback receiving keystroke/paste bytes from the emulator
pub type DataHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Pixel size of the container an emulator renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel area covered by `grid` cells of size `cell`
    pub fn from_grid(grid: GridSize, cell: CellSize) -> Self {
        Self {
            width: u32::from(grid.cols).saturating_mul(cell.width),
            height: u32::from(grid.rows).saturating_mul(cell.height),
        }
    }
}

/// Pixel size of one character cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSize {
    pub width: u32,
    pub height: u32,
}

impl CellSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for CellSize {
    fn default() -> Self {
        Self::new(9, 17)
    }
}

/// Character grid dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub cols: u16,
    pub rows: u16,
}

impl GridSize {
    pub const MIN_COLS: u16 = 2;
    pub const MIN_ROWS: u16 = 1;

    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Largest grid of `cell`-sized characters fitting in `viewport`
    pub fn fit(viewport: Viewport, cell: CellSize) -> Self {
        let cols = viewport.width / cell.width.max(1);
        let rows = viewport.height / cell.height.max(1);
        Self {
            cols: clamp_dim(cols, Self::MIN_COLS),
            rows: clamp_dim(rows, Self::MIN_ROWS),
        }
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

fn clamp_dim(value: u32, min: u16) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX).max(min)
}

/// Terminal emulator consumed by a session.
///
/// Rendering, scrollback and escape-sequence interpretation are entirely the
/// emulator's business; the session only appends bytes and listens for input.
pub trait TerminalEmulator: Send + Sync + 'static {
    /// Render into a container of the given size and fit the grid to it
    fn open(&self, container: Viewport) -> GridSize;

    /// Append raw bytes to the display, verbatim
    fn write(&self, data: &[u8]);

    /// Register the keystroke callback, replacing any previous one
    fn on_data(&self, handler: DataHandler);

    /// Recompute the character grid for the container
    fn fit(&self, container: Viewport) -> GridSize;

    /// Drop the keystroke callback and stop rendering
    fn dispose(&self);
}
