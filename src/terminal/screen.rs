//! Headless terminal emulator
//!
//! Keeps two views of everything written to the display: the verbatim byte
//! buffer, and a character grid driven by a VTE parser. The grid handles the
//! subset of control sequences a shell prompt needs (CR, LF, BS, TAB, cursor
//! positioning, erase in display/line); colors are ignored.

use super::{CellSize, DataHandler, GridSize, TerminalEmulator, Viewport};
use parking_lot::Mutex;
use tracing::trace;
use vte::{Params, Parser, Perform};

/// Headless terminal emulator.
pub struct Screen {
    inner: Mutex<ScreenInner>,
    cell: CellSize,
}

struct ScreenInner {
    parser: Parser,
    grid: Grid,
    raw: Vec<u8>,
    handler: Option<DataHandler>,
    open: bool,
    disposed: bool,
}

impl Screen {
    pub fn new(cell: CellSize) -> Self {
        Self {
            inner: Mutex::new(ScreenInner {
                parser: Parser::new(),
                grid: Grid::new(GridSize::default()),
                raw: Vec::new(),
                handler: None,
                open: false,
                disposed: false,
            }),
            cell,
        }
    }

    /// Simulate a keystroke or paste event
    pub fn input(&self, data: &[u8]) {
        // Call outside the lock; the handler may write back to the display
        let handler = self.inner.lock().handler.clone();
        match handler {
            Some(handler) => handler(data),
            None => trace!("No data handler registered, dropping {} bytes", data.len()),
        }
    }

    /// Every byte written to the display, in arrival order
    pub fn raw_output(&self) -> Vec<u8> {
        self.inner.lock().raw.clone()
    }

    /// Visible grid text, one line per row, trailing blanks trimmed
    pub fn contents(&self) -> String {
        self.inner.lock().grid.contents()
    }

    pub fn size(&self) -> GridSize {
        self.inner.lock().grid.size
    }

    /// Cursor position as (row, col), zero-based
    pub fn cursor(&self) -> (u16, u16) {
        let inner = self.inner.lock();
        (inner.grid.cursor_row, inner.grid.cursor_col)
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().open
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    pub fn has_data_handler(&self) -> bool {
        self.inner.lock().handler.is_some()
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new(CellSize::default())
    }
}

impl TerminalEmulator for Screen {
    fn open(&self, container: Viewport) -> GridSize {
        let size = self.fit(container);
        self.inner.lock().open = true;
        size
    }

    fn write(&self, data: &[u8]) {
        let mut inner = self.inner.lock();
        if inner.disposed {
            trace!("Screen disposed, ignoring {} bytes", data.len());
            return;
        }
        inner.raw.extend_from_slice(data);
        let ScreenInner { parser, grid, .. } = &mut *inner;
        for byte in data {
            parser.advance(grid, *byte);
        }
    }

    fn on_data(&self, handler: DataHandler) {
        self.inner.lock().handler = Some(handler);
    }

    fn fit(&self, container: Viewport) -> GridSize {
        let size = GridSize::fit(container, self.cell);
        self.inner.lock().grid.resize(size);
        size
    }

    fn dispose(&self) {
        let mut inner = self.inner.lock();
        inner.handler = None;
        inner.open = false;
        inner.disposed = true;
    }
}

/// Character grid with a cursor
struct Grid {
    size: GridSize,
    cells: Vec<Vec<char>>,
    cursor_row: u16,
    cursor_col: u16,
}

impl Grid {
    fn new(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![blank_row(size.cols); size.rows as usize],
            cursor_row: 0,
            cursor_col: 0,
        }
    }

    fn contents(&self) -> String {
        let mut lines: Vec<String> = self
            .cells
            .iter()
            .map(|row| row.iter().collect::<String>().trim_end().to_string())
            .collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }

    fn resize(&mut self, size: GridSize) {
        // Keep the cursor row on screen by dropping lines from the top
        if self.cursor_row >= size.rows {
            let excess = (self.cursor_row - size.rows + 1) as usize;
            self.cells.drain(..excess.min(self.cells.len()));
            self.cursor_row = size.rows - 1;
        }
        self.cells.resize(size.rows as usize, blank_row(size.cols));
        for row in &mut self.cells {
            row.resize(size.cols as usize, ' ');
        }
        self.cursor_col = self.cursor_col.min(size.cols);
        self.size = size;
    }

    fn line_feed(&mut self) {
        if self.cursor_row + 1 >= self.size.rows {
            self.cells.remove(0);
            self.cells.push(blank_row(self.size.cols));
        } else {
            self.cursor_row += 1;
        }
    }

    fn clear_row(&mut self, row: u16, from: u16, to: u16) {
        if let Some(cells) = self.cells.get_mut(row as usize) {
            let end = (to as usize).min(cells.len());
            let start = (from as usize).min(end);
            for cell in &mut cells[start..end] {
                *cell = ' ';
            }
        }
    }
}

fn blank_row(cols: u16) -> Vec<char> {
    vec![' '; cols as usize]
}

/// First value of parameter `index`, treating 0 as "use the default"
fn param_or(params: &Params, index: usize, default: u16) -> u16 {
    params
        .iter()
        .nth(index)
        .and_then(|p| p.first().copied())
        .filter(|v| *v != 0)
        .unwrap_or(default)
}

/// First value of parameter `index`, 0 when absent
fn mode_param(params: &Params) -> u16 {
    params.iter().next().and_then(|p| p.first().copied()).unwrap_or(0)
}

impl Perform for Grid {
    fn print(&mut self, c: char) {
        if self.cursor_col >= self.size.cols {
            self.cursor_col = 0;
            self.line_feed();
        }
        if let Some(cell) = self
            .cells
            .get_mut(self.cursor_row as usize)
            .and_then(|row| row.get_mut(self.cursor_col as usize))
        {
            *cell = c;
        }
        self.cursor_col += 1;
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            // Backspace
            0x08 => self.cursor_col = self.cursor_col.saturating_sub(1),
            // Tab
            0x09 => {
                let next = (self.cursor_col / 8).saturating_add(1).saturating_mul(8);
                self.cursor_col = next.min(self.size.cols.saturating_sub(1));
            }
            // LF, VT, FF
            0x0A..=0x0C => self.line_feed(),
            // Carriage return
            0x0D => self.cursor_col = 0,
            _ => {}
        }
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {}

    fn put(&mut self, _byte: u8) {}

    fn unhook(&mut self) {}

    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {
        // Window title and friends have nowhere to go
    }

    fn csi_dispatch(&mut self, params: &Params, _intermediates: &[u8], _ignore: bool, action: char) {
        let max_row = self.size.rows.saturating_sub(1);
        let max_col = self.size.cols.saturating_sub(1);

        match action {
            'H' | 'f' => {
                self.cursor_row = (param_or(params, 0, 1) - 1).min(max_row);
                self.cursor_col = (param_or(params, 1, 1) - 1).min(max_col);
            }
            'A' => self.cursor_row = self.cursor_row.saturating_sub(param_or(params, 0, 1)),
            'B' => {
                self.cursor_row = self.cursor_row.saturating_add(param_or(params, 0, 1)).min(max_row)
            }
            'C' => {
                self.cursor_col = self.cursor_col.saturating_add(param_or(params, 0, 1)).min(max_col)
            }
            'D' => self.cursor_col = self.cursor_col.saturating_sub(param_or(params, 0, 1)),
            'J' => {
                let (row, col, rows, cols) =
                    (self.cursor_row, self.cursor_col, self.size.rows, self.size.cols);
                match mode_param(params) {
                    0 => {
                        self.clear_row(row, col, cols);
                        for r in row + 1..rows {
                            self.clear_row(r, 0, cols);
                        }
                    }
                    1 => {
                        for r in 0..row {
                            self.clear_row(r, 0, cols);
                        }
                        self.clear_row(row, 0, col.saturating_add(1));
                    }
                    2 | 3 => {
                        for r in 0..rows {
                            self.clear_row(r, 0, cols);
                        }
                    }
                    _ => {}
                }
            }
            'K' => {
                let (row, col, cols) = (self.cursor_row, self.cursor_col, self.size.cols);
                match mode_param(params) {
                    0 => self.clear_row(row, col, cols),
                    1 => self.clear_row(row, 0, col.saturating_add(1)),
                    2 => self.clear_row(row, 0, cols),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {}
}
