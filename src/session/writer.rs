//! Exclusive input-writer handle
//!
//! Wraps the writer acquired from a process's input stream. Release is a
//! one-shot: the first `release` reaches the underlying stream, every later
//! call is a logged no-op, and writes after release are rejected.

use crate::sandbox::{InputStream, SandboxError, SandboxResult, StreamWriter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Why a writer was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    /// The shell process exited
    ProcessExit,
    /// The hosting view unmounted
    Unmount,
}

pub struct InputWriter {
    inner: Box<dyn StreamWriter>,
    released: AtomicBool,
}

impl InputWriter {
    /// Acquire the writer of `stream`
    pub fn acquire(stream: &dyn InputStream) -> SandboxResult<Arc<Self>> {
        let inner = stream.get_writer()?;
        Ok(Arc::new(Self {
            inner,
            released: AtomicBool::new(false),
        }))
    }

    pub async fn write(&self, data: Vec<u8>) -> SandboxResult<()> {
        if self.is_released() {
            return Err(SandboxError::Released);
        }
        self.inner.write(data).await
    }

    /// Release the underlying stream lock. Returns false if it was already
    /// released.
    pub fn release(&self, reason: ReleaseReason) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            debug!("Input writer already released, ignoring release on {:?}", reason);
            return false;
        }
        self.inner.release_lock();
        debug!("Input writer released on {:?}", reason);
        true
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}
