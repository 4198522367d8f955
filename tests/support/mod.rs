//! Scriptable sandbox runtime for session tests

#![allow(dead_code)]

use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use webos::core::events::{EventSender, SessionEvent};
use webos::sandbox::{
    Container, FileTree, InputStream, ProcessResize, SandboxError, SandboxResult, SandboxRuntime,
    ShellProcess, StreamWriter,
};
use webos::session::{HostWindow, SessionOptions, TerminalSession};
use webos::terminal::{CellSize, GridSize, Screen, Viewport};

pub const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default, Clone)]
pub struct Counters {
    pub boots: usize,
    pub mounts: usize,
    pub spawns: usize,
    pub teardowns: usize,
    pub acquires: usize,
    pub releases: usize,
    pub writes: Vec<Vec<u8>>,
    pub resizes: Vec<GridSize>,
}

struct ProcessHandle {
    output_tx: mpsc::UnboundedSender<Vec<u8>>,
    exit_tx: Option<oneshot::Sender<i32>>,
}

/// Shared switchboard between a test and the mock sandbox
#[derive(Default)]
pub struct Control {
    counters: Mutex<Counters>,
    pub fail_boot: AtomicBool,
    pub fail_mount: AtomicBool,
    pub fail_spawn: AtomicBool,
    pub fail_writes: AtomicBool,
    boot_gate: Mutex<Option<oneshot::Receiver<()>>>,
    process: Mutex<Option<ProcessHandle>>,
}

impl Control {
    pub fn counters(&self) -> Counters {
        self.counters.lock().clone()
    }

    /// Hold the next boot until the returned sender fires or is dropped
    pub fn gate_boot(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.boot_gate.lock() = Some(rx);
        tx
    }

    /// Emit bytes on the running shell's output
    pub fn emit(&self, data: &[u8]) {
        if let Some(process) = self.process.lock().as_ref() {
            let _ = process.output_tx.send(data.to_vec());
        }
    }

    /// Make the running shell exit with `code`
    pub fn exit(&self, code: i32) {
        if let Some(process) = self.process.lock().as_mut() {
            if let Some(tx) = process.exit_tx.take() {
                let _ = tx.send(code);
            }
        }
    }

    /// Drop the exit signal without a code
    pub fn drop_exit(&self) {
        if let Some(process) = self.process.lock().as_mut() {
            process.exit_tx.take();
        }
    }
}

pub struct MockRuntime {
    control: Arc<Control>,
}

impl MockRuntime {
    pub fn new(control: Arc<Control>) -> Self {
        Self { control }
    }
}

impl SandboxRuntime for MockRuntime {
    fn boot(&self) -> BoxFuture<'_, SandboxResult<Box<dyn Container>>> {
        async move {
            self.control.counters.lock().boots += 1;
            let gate = self.control.boot_gate.lock().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            if self.control.fail_boot.load(Ordering::SeqCst) {
                return Err(SandboxError::Boot("no isolation available".to_string()));
            }
            Ok(Box::new(MockContainer {
                control: Arc::clone(&self.control),
            }) as Box<dyn Container>)
        }
        .boxed()
    }
}

struct MockContainer {
    control: Arc<Control>,
}

impl Container for MockContainer {
    fn mount<'a>(&'a self, _tree: &'a FileTree) -> BoxFuture<'a, SandboxResult<()>> {
        async move {
            self.control.counters.lock().mounts += 1;
            if self.control.fail_mount.load(Ordering::SeqCst) {
                return Err(SandboxError::Mount("read-only filesystem".to_string()));
            }
            Ok(())
        }
        .boxed()
    }

    fn spawn<'a>(&'a self, command: &'a str, _args: &'a [String]) -> BoxFuture<'a, SandboxResult<ShellProcess>> {
        async move {
            self.control.counters.lock().spawns += 1;
            if self.control.fail_spawn.load(Ordering::SeqCst) {
                return Err(SandboxError::Spawn {
                    command: command.to_string(),
                    reason: "not found".to_string(),
                });
            }

            let (output_tx, output_rx) = mpsc::unbounded_channel();
            let (exit_tx, exit_rx) = oneshot::channel();
            *self.control.process.lock() = Some(ProcessHandle {
                output_tx,
                exit_tx: Some(exit_tx),
            });

            Ok(ShellProcess {
                input: Box::new(MockInput {
                    control: Arc::clone(&self.control),
                    locked: Arc::new(AtomicBool::new(false)),
                }),
                output: output_rx,
                exit: exit_rx,
                resize: Some(Arc::new(MockResize {
                    control: Arc::clone(&self.control),
                })),
            })
        }
        .boxed()
    }

    fn teardown(&self) {
        self.control.counters.lock().teardowns += 1;
    }
}

struct MockInput {
    control: Arc<Control>,
    locked: Arc<AtomicBool>,
}

impl InputStream for MockInput {
    fn get_writer(&self) -> SandboxResult<Box<dyn StreamWriter>> {
        if self.locked.swap(true, Ordering::SeqCst) {
            return Err(SandboxError::WriterLocked);
        }
        self.control.counters.lock().acquires += 1;
        Ok(Box::new(MockWriter {
            control: Arc::clone(&self.control),
            locked: Arc::clone(&self.locked),
        }))
    }
}

struct MockWriter {
    control: Arc<Control>,
    locked: Arc<AtomicBool>,
}

impl StreamWriter for MockWriter {
    fn write(&self, data: Vec<u8>) -> BoxFuture<'_, SandboxResult<()>> {
        async move {
            if self.control.fail_writes.load(Ordering::SeqCst) {
                return Err(SandboxError::Write("broken pipe".to_string()));
            }
            self.control.counters.lock().writes.push(data);
            Ok(())
        }
        .boxed()
    }

    fn release_lock(&self) {
        self.locked.store(false, Ordering::SeqCst);
        self.control.counters.lock().releases += 1;
    }
}

struct MockResize {
    control: Arc<Control>,
}

impl ProcessResize for MockResize {
    fn resize(&self, size: GridSize) -> SandboxResult<()> {
        self.control.counters.lock().resizes.push(size);
        Ok(())
    }
}

/// A session wired to a mock sandbox and a headless screen
pub struct Harness {
    pub control: Arc<Control>,
    pub screen: Arc<Screen>,
    pub window: Arc<HostWindow>,
    pub session: Arc<TerminalSession>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Harness {
    pub fn new() -> Self {
        let control = Arc::new(Control::default());
        let screen = Arc::new(Screen::new(CellSize::new(9, 17)));
        let window = Arc::new(HostWindow::new(Viewport::new(600, 400)));
        let (sender, events) = EventSender::channel();
        let session = TerminalSession::new(
            1,
            Arc::new(MockRuntime::new(Arc::clone(&control))),
            screen.clone(),
            Arc::clone(&window),
            SessionOptions::default(),
            sender,
        );
        Self {
            control,
            screen,
            window,
            session,
            events,
        }
    }

    /// Wait for the first event matching `pred`, skipping others
    pub async fn next_event(&mut self, pred: impl Fn(&SessionEvent) -> bool) -> SessionEvent {
        let events = &mut self.events;
        tokio::time::timeout(TIMEOUT, async move {
            loop {
                match events.recv().await {
                    Some(event) if pred(&event) => return event,
                    Some(_) => continue,
                    None => panic!("event channel closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for session event")
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.screen.raw_output()).into_owned()
    }
}

/// Poll `condition` until it holds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for condition");
}
