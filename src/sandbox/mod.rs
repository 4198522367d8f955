//! Sandbox module - Runtime boundary for sandboxed shell processes
//!
//! A runtime boots a container, the container mounts a file tree and spawns
//! processes, and a spawned process exposes an input stream, an ordered output
//! stream and an exit signal. The traits are object safe so sessions can hold
//! any runtime behind an `Arc<dyn SandboxRuntime>`.

mod image;
mod pty;

pub use image::{default_image, FileNode, FileTree};
pub use pty::PtyRuntime;

use crate::terminal::GridSize;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Errors raised across the sandbox boundary
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox runtime failed to boot: {0}")]
    Boot(String),

    #[error("mount rejected: {0}")]
    Mount(String),

    #[error("failed to spawn `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("process input already has a writer")]
    WriterLocked,

    #[error("write to process input failed: {0}")]
    Write(String),

    #[error("process input writer was released")]
    Released,

    #[error("resize failed: {0}")]
    Resize(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type SandboxResult<T> = Result<T, SandboxError>;

/// Boots containers
pub trait SandboxRuntime: Send + Sync + 'static {
    fn boot(&self) -> BoxFuture<'_, SandboxResult<Box<dyn Container>>>;
}

/// A booted sandbox instance
pub trait Container: Send + Sync + 'static {
    /// Write `tree` into the container's filesystem root
    fn mount<'a>(&'a self, tree: &'a FileTree) -> BoxFuture<'a, SandboxResult<()>>;

    /// Start `command` with `args` inside the container
    fn spawn<'a>(&'a self, command: &'a str, args: &'a [String]) -> BoxFuture<'a, SandboxResult<ShellProcess>>;

    /// Stop everything the container started and release its resources.
    /// Calling it more than once is harmless.
    fn teardown(&self);
}

/// Writable side of a process's standard input
pub trait InputStream: Send + Sync + 'static {
    /// Acquire the exclusive writer. Fails with `WriterLocked` while another
    /// writer is outstanding.
    fn get_writer(&self) -> SandboxResult<Box<dyn StreamWriter>>;
}

/// Exclusive writer acquired from an `InputStream`
pub trait StreamWriter: Send + Sync + 'static {
    fn write(&self, data: Vec<u8>) -> BoxFuture<'_, SandboxResult<()>>;

    /// Give the stream back so another writer could be acquired
    fn release_lock(&self);
}

/// Terminal size control for processes attached to a PTY
pub trait ProcessResize: Send + Sync + 'static {
    fn resize(&self, size: GridSize) -> SandboxResult<()>;
}

/// Ordered chunks of process output (stdout and stderr interleaved)
pub type OutputStream = mpsc::UnboundedReceiver<Vec<u8>>;

/// Resolves with the exit code once the process has exited
pub type ExitSignal = oneshot::Receiver<i32>;

/// A spawned process
pub struct ShellProcess {
    pub input: Box<dyn InputStream>,
    pub output: OutputStream,
    pub exit: ExitSignal,
    pub resize: Option<Arc<dyn ProcessResize>>,
}
