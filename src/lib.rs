//! WebOS
//!
//! Core of the WebOS desktop shell: sandboxed terminal sessions and the
//! desktop card model.
//!
//! # Features
//! - Boots a sandbox container, mounts a file tree and spawns a shell in it
//! - Bridges keystrokes and shell output between the shell and a terminal emulator
//! - Releases the shell's input writer exactly once, on exit or unmount
//! - Re-fits the terminal grid when the host window resizes
//! - Tracks open application cards on the desktop

pub mod core;
pub mod sandbox;
pub mod session;
pub mod terminal;

pub use crate::core::config::Config;
pub use crate::core::desktop::Desktop;
pub use crate::core::events::{EventSender, SessionEvent};
pub use sandbox::{PtyRuntime, SandboxError, SandboxRuntime};
pub use session::{HostWindow, SessionId, SessionOptions, SessionState, TerminalSession};
pub use terminal::{HostTerminal, Screen, TerminalEmulator};
