//! PTY-backed sandbox runtime
//!
//! Each container is a private scratch directory; processes run in a PTY with
//! their working directory at the container root.

use super::image::write_tree;
use super::{
    Container, FileTree, InputStream, ProcessResize, SandboxError, SandboxResult, SandboxRuntime,
    ShellProcess, StreamWriter,
};
use crate::core::config::SandboxConfig;
use crate::terminal::GridSize;
use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use portable_pty::{native_pty_system, ChildKiller, CommandBuilder, MasterPty, PtySize};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Runtime spawning processes in PTYs inside scratch directories
pub struct PtyRuntime {
    config: SandboxConfig,
    base_dir: PathBuf,
    initial_size: GridSize,
}

impl PtyRuntime {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            base_dir: std::env::temp_dir(),
            initial_size: GridSize::default(),
        }
    }

    /// Create container roots under `base_dir` instead of the system temp dir
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// PTY size used until the first resize
    pub fn with_initial_size(mut self, size: GridSize) -> Self {
        self.initial_size = size;
        self
    }
}

impl SandboxRuntime for PtyRuntime {
    fn boot(&self) -> BoxFuture<'_, SandboxResult<Box<dyn Container>>> {
        let root = self
            .base_dir
            .join(format!("{}-{}", self.config.scratch_prefix, uuid::Uuid::new_v4()));
        let initial_size = self.initial_size;

        async move {
            let dir = root.clone();
            tokio::task::spawn_blocking(move || std::fs::create_dir_all(&dir))
                .await
                .map_err(|e| SandboxError::Boot(e.to_string()))?
                .map_err(|e| SandboxError::Boot(format!("cannot create {:?}: {}", root, e)))?;

            info!("Booted PTY container at {:?}", root);
            Ok(Box::new(PtyContainer::new(root, initial_size)) as Box<dyn Container>)
        }
        .boxed()
    }
}

/// A scratch directory plus the processes spawned in it
struct PtyContainer {
    root: PathBuf,
    initial_size: GridSize,
    killers: Mutex<Vec<Box<dyn ChildKiller + Send + Sync>>>,
    torn_down: AtomicBool,
}

impl PtyContainer {
    fn new(root: PathBuf, initial_size: GridSize) -> Self {
        Self {
            root,
            initial_size,
            killers: Mutex::new(Vec::new()),
            torn_down: AtomicBool::new(false),
        }
    }

    fn check_live(&self) -> SandboxResult<()> {
        if self.torn_down.load(Ordering::SeqCst) {
            return Err(SandboxError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "container was torn down",
            )));
        }
        Ok(())
    }

    fn open_process(&self, command: &str, args: &[String]) -> Result<ShellProcess, String> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(pty_size(self.initial_size))
            .map_err(|e| format!("failed to create PTY: {}", e))?;

        let mut cmd = CommandBuilder::new(command);
        for arg in args {
            cmd.arg(arg);
        }
        cmd.cwd(&self.root);
        cmd.env("HOME", &self.root);
        cmd.env("TERM", "xterm-256color");
        cmd.env("COLORTERM", "truecolor");

        let child = pair.slave.spawn_command(cmd).map_err(|e| e.to_string())?;
        // The slave side must close in this process or the reader never sees EOF
        drop(pair.slave);

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| format!("failed to get PTY writer: {}", e))?;
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| format!("failed to get PTY reader: {}", e))?;

        self.killers.lock().push(child.clone_killer());

        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        start_reader_thread(command.to_string(), reader, child, output_tx, exit_tx);

        Ok(ShellProcess {
            input: Box::new(PtyInput {
                writer: Arc::new(Mutex::new(writer)),
                locked: Arc::new(AtomicBool::new(false)),
            }),
            output: output_rx,
            exit: exit_rx,
            resize: Some(Arc::new(PtyResizer {
                master: Mutex::new(pair.master),
            })),
        })
    }
}

impl Container for PtyContainer {
    fn mount<'a>(&'a self, tree: &'a FileTree) -> BoxFuture<'a, SandboxResult<()>> {
        async move {
            self.check_live()?;
            let root = self.root.clone();
            let tree = tree.clone();
            let entries = tree.len();
            tokio::task::spawn_blocking(move || write_tree(&root, &tree))
                .await
                .map_err(|e| SandboxError::Mount(e.to_string()))?
                .map_err(|e| match e {
                    SandboxError::Io(io) => SandboxError::Mount(io.to_string()),
                    other => other,
                })?;
            debug!("Mounted {} top-level entries into {:?}", entries, self.root);
            Ok(())
        }
        .boxed()
    }

    fn spawn<'a>(&'a self, command: &'a str, args: &'a [String]) -> BoxFuture<'a, SandboxResult<ShellProcess>> {
        async move {
            self.check_live()?;
            info!("Spawning {} {:?} in {:?}", command, args, self.root);
            self.open_process(command, args).map_err(|reason| SandboxError::Spawn {
                command: command.to_string(),
                reason,
            })
        }
        .boxed()
    }

    fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }

        for mut killer in self.killers.lock().drain(..) {
            if let Err(e) = killer.kill() {
                debug!("Kill on teardown failed (process likely gone): {}", e);
            }
        }

        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            warn!("Failed to remove container root {:?}: {}", self.root, e);
        } else {
            info!("Tore down PTY container at {:?}", self.root);
        }
    }
}

impl Drop for PtyContainer {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Read PTY output until EOF, then wait for the child and report its exit code
fn start_reader_thread(
    command: String,
    mut reader: Box<dyn Read + Send>,
    mut child: Box<dyn portable_pty::Child + Send + Sync>,
    output_tx: mpsc::UnboundedSender<Vec<u8>>,
    exit_tx: oneshot::Sender<i32>,
) {
    std::thread::spawn(move || {
        let mut buffer = [0u8; 4096];

        loop {
            match reader.read(&mut buffer) {
                Ok(0) => {
                    debug!("PTY EOF");
                    break;
                }
                Ok(n) => {
                    // Receiver gone means the session stopped listening; keep
                    // draining so the child never blocks on a full PTY buffer
                    let _ = output_tx.send(buffer[..n].to_vec());
                }
                Err(e) => {
                    if e.kind() != std::io::ErrorKind::Interrupted {
                        // EIO is how Linux reports a closed slave side
                        debug!("PTY read ended: {}", e);
                        break;
                    }
                }
            }
        }
        drop(output_tx);

        match child.wait() {
            Ok(status) => {
                info!("{} exited with status: {:?}", command, status);
                let _ = exit_tx.send(status.exit_code() as i32);
            }
            Err(e) => {
                // Dropping the sender tells the session the code is unknown
                error!("Failed to wait for {}: {}", command, e);
            }
        }
    });
}

fn pty_size(size: GridSize) -> PtySize {
    PtySize {
        rows: size.rows,
        cols: size.cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

struct PtyInput {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    locked: Arc<AtomicBool>,
}

impl InputStream for PtyInput {
    fn get_writer(&self) -> SandboxResult<Box<dyn StreamWriter>> {
        if self.locked.swap(true, Ordering::SeqCst) {
            return Err(SandboxError::WriterLocked);
        }
        Ok(Box::new(PtyWriter {
            writer: Arc::clone(&self.writer),
            locked: Arc::clone(&self.locked),
        }))
    }
}

struct PtyWriter {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    locked: Arc<AtomicBool>,
}

impl StreamWriter for PtyWriter {
    fn write(&self, data: Vec<u8>) -> BoxFuture<'_, SandboxResult<()>> {
        let writer = Arc::clone(&self.writer);
        async move {
            tokio::task::spawn_blocking(move || {
                let mut writer = writer.lock();
                writer.write_all(&data)?;
                writer.flush()
            })
            .await
            .map_err(|e| SandboxError::Write(e.to_string()))?
            .map_err(|e| SandboxError::Write(e.to_string()))
        }
        .boxed()
    }

    fn release_lock(&self) {
        self.locked.store(false, Ordering::SeqCst);
    }
}

struct PtyResizer {
    master: Mutex<Box<dyn MasterPty + Send>>,
}

impl ProcessResize for PtyResizer {
    fn resize(&self, size: GridSize) -> SandboxResult<()> {
        self.master
            .lock()
            .resize(pty_size(size))
            .map_err(|e| SandboxError::Resize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::default_image;
    use std::path::Path;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn runtime(base: &Path) -> PtyRuntime {
        PtyRuntime::new(SandboxConfig::default()).with_base_dir(base)
    }

    async fn mounted(base: &Path) -> Box<dyn Container> {
        let container = runtime(base).boot().await.unwrap();
        container.mount(&default_image()).await.unwrap();
        container
    }

    /// Collect output until the reader thread closes the channel
    async fn read_to_end(output: &mut mpsc::UnboundedReceiver<Vec<u8>>) -> String {
        let mut collected = Vec::new();
        tokio::time::timeout(TIMEOUT, async {
            while let Some(chunk) = output.recv().await {
                collected.extend_from_slice(&chunk);
            }
        })
        .await
        .expect("PTY output never closed");
        String::from_utf8_lossy(&collected).into_owned()
    }

    /// Collect output until it contains `needle`
    async fn read_until(output: &mut mpsc::UnboundedReceiver<Vec<u8>>, needle: &str) -> String {
        let mut collected = String::new();
        tokio::time::timeout(TIMEOUT, async {
            while !collected.contains(needle) {
                let chunk = output.recv().await.expect("PTY output closed early");
                collected.push_str(&String::from_utf8_lossy(&chunk));
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {:?}, got {:?}", needle, collected));
        collected
    }

    #[tokio::test]
    async fn test_boot_creates_scratch_root() {
        let base = tempfile::tempdir().unwrap();
        let container = runtime(base.path()).boot().await.unwrap();

        let roots: Vec<_> = std::fs::read_dir(base.path()).unwrap().collect();
        assert_eq!(roots.len(), 1);
        let name = roots[0].as_ref().unwrap().file_name();
        assert!(name.to_string_lossy().starts_with("webos-sandbox-"));

        container.teardown();
        assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_mount_writes_image() {
        let base = tempfile::tempdir().unwrap();
        let container = runtime(base.path()).boot().await.unwrap();
        tokio_test::assert_ok!(container.mount(&default_image()).await);

        let root = std::fs::read_dir(base.path()).unwrap().next().unwrap().unwrap().path();
        assert!(root.join("hello.sh").is_file());
        assert!(root.join("manifest.json").is_file());
        container.teardown();
    }

    #[tokio::test]
    async fn test_mount_after_teardown_fails() {
        let base = tempfile::tempdir().unwrap();
        let container = runtime(base.path()).boot().await.unwrap();
        container.teardown();
        container.teardown();

        let result = container.mount(&default_image()).await;
        tokio_test::assert_err!(result);
    }

    #[tokio::test]
    async fn test_boot_fails_on_unusable_base_dir() {
        let base = tempfile::tempdir().unwrap();
        let file = base.path().join("not-a-dir");
        std::fs::write(&file, b"").unwrap();

        let err = runtime(&file).boot().await.err().unwrap();
        assert!(matches!(err, SandboxError::Boot(_)));
    }

    #[tokio::test]
    async fn test_spawn_runs_in_root_and_reports_exit() {
        let base = tempfile::tempdir().unwrap();
        let container = mounted(base.path()).await;
        let args = vec!["-c".to_string(), "cat hello.sh; exit 3".to_string()];

        let ShellProcess { mut output, exit, .. } = container.spawn("sh", &args).await.unwrap();

        let text = read_to_end(&mut output).await;
        assert!(text.starts_with("#!/bin/sh\r\n"), "got {:?}", text);
        assert!(text.contains("echo \"Hello from the WebOS sandbox!\""));
        let code = tokio::time::timeout(TIMEOUT, exit).await.unwrap();
        assert_eq!(code, Ok(3));
        container.teardown();
    }

    #[tokio::test]
    async fn test_writer_is_exclusive_until_released() {
        let base = tempfile::tempdir().unwrap();
        let container = mounted(base.path()).await;
        let mut process = container.spawn("cat", &[]).await.unwrap();

        let writer = process.input.get_writer().unwrap();
        assert!(matches!(process.input.get_writer(), Err(SandboxError::WriterLocked)));

        tokio_test::assert_ok!(writer.write(b"ping\n".to_vec()).await);
        read_until(&mut process.output, "ping").await;

        writer.release_lock();
        let second = process.input.get_writer().unwrap();
        tokio_test::assert_ok!(second.write(b"pong\n".to_vec()).await);
        read_until(&mut process.output, "pong").await;

        container.teardown();
        assert!(tokio::time::timeout(TIMEOUT, process.exit).await.is_ok());
    }

    #[tokio::test]
    async fn test_resize_reaches_process() {
        let base = tempfile::tempdir().unwrap();
        let container = mounted(base.path()).await;
        let args = vec!["-c".to_string(), "read -r line; stty size".to_string()];
        let mut process = container.spawn("sh", &args).await.unwrap();

        let resize = process.resize.clone().unwrap();
        resize.resize(GridSize::new(100, 30)).unwrap();

        let writer = process.input.get_writer().unwrap();
        writer.write(b"\n".to_vec()).await.unwrap();
        let text = read_until(&mut process.output, "30 100").await;
        assert!(!text.contains("24 80"));

        let code = tokio::time::timeout(TIMEOUT, process.exit).await.unwrap();
        assert_eq!(code, Ok(0));
        container.teardown();
    }

    #[tokio::test]
    async fn test_spawn_after_teardown_fails() {
        let base = tempfile::tempdir().unwrap();
        let container = mounted(base.path()).await;
        container.teardown();

        let result = container.spawn("sh", &[]).await;
        assert!(matches!(result, Err(SandboxError::Io(_))));
    }
}
