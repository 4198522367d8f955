//! Session module - A sandboxed shell attached to a terminal emulator
//!
//! A `TerminalSession` lives from view mount to view unmount. It boots a
//! container, mounts the initial image, spawns the shell and then bridges
//! keystrokes to the shell's input and shell output to the emulator.
//!
//! Lifecycle: `Uninitialized -> Booting -> Running -> Exited`, with
//! `TornDown` reachable from any non-final state through `unmount`. Unmount
//! never cancels an in-flight boot step; the boot task notices the teardown
//! at its next checkpoint and discards what it produced.

mod window;
mod writer;

pub use window::{HostWindow, ListenerId};
pub use writer::{InputWriter, ReleaseReason};

use crate::core::config::SandboxConfig;
use crate::core::events::{EventSender, SessionEvent};
use crate::sandbox::{
    default_image, Container, ExitSignal, FileTree, OutputStream, ProcessResize, SandboxError,
    SandboxRuntime, ShellProcess,
};
use crate::terminal::{GridSize, TerminalEmulator, Viewport};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Unique identifier for a session
pub type SessionId = usize;

pub const BOOTING_MESSAGE: &str = "Booting sandbox...\r\n";
pub const BOOTED_MESSAGE: &str = "Sandbox booted successfully!\r\n";
pub const STARTED_MESSAGE: &str = "Shell process started.\r\n";

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, view not rendered yet
    Uninitialized,
    /// Runtime boot, mount or spawn in flight
    Booting,
    /// Shell running with I/O wired
    Running,
    /// Shell exited, or boot failed (`code: None`)
    Exited { code: Option<i32> },
    /// View unmounted before the shell exited
    TornDown,
}

impl SessionState {
    /// No further transitions happen from this state
    pub fn is_final(&self) -> bool {
        matches!(self, SessionState::Exited { .. } | SessionState::TornDown)
    }
}

/// What a session boots
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Command spawned inside the container
    pub shell: String,
    /// Arguments for the shell
    pub args: Vec<String>,
    /// File tree mounted before the shell starts
    pub image: FileTree,
}

impl SessionOptions {
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self {
            shell: config.shell.clone(),
            args: config.args.clone(),
            image: default_image(),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&SandboxConfig::default())
    }
}

struct Lifecycle {
    state: SessionState,
    /// Exclusive input writer; taken out exactly once on release
    writer: Option<Arc<InputWriter>>,
    container: Option<Arc<dyn Container>>,
    process_resize: Option<Arc<dyn ProcessResize>>,
    resize_listener: Option<ListenerId>,
    grid: Option<GridSize>,
    view_open: bool,
    unmounted: bool,
    tasks: Vec<JoinHandle<()>>,
}

/// State shared with the bridge tasks
struct Shared {
    id: SessionId,
    lifecycle: Mutex<Lifecycle>,
    events: EventSender,
}

impl Shared {
    fn state_changed(&self, state: SessionState) {
        self.events.send(SessionEvent::StateChanged { session_id: self.id, state });
    }
}

/// A terminal application instance
pub struct TerminalSession {
    shared: Arc<Shared>,
    runtime: Arc<dyn SandboxRuntime>,
    terminal: Arc<dyn TerminalEmulator>,
    window: Arc<HostWindow>,
    options: SessionOptions,
}

impl TerminalSession {
    pub fn new(
        id: SessionId,
        runtime: Arc<dyn SandboxRuntime>,
        terminal: Arc<dyn TerminalEmulator>,
        window: Arc<HostWindow>,
        options: SessionOptions,
        events: EventSender,
    ) -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::new(Shared {
                id,
                lifecycle: Mutex::new(Lifecycle {
                    state: SessionState::Uninitialized,
                    writer: None,
                    container: None,
                    process_resize: None,
                    resize_listener: None,
                    grid: None,
                    view_open: false,
                    unmounted: false,
                    tasks: Vec::new(),
                }),
                events,
            }),
            runtime,
            terminal,
            window,
            options,
        })
    }

    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    pub fn state(&self) -> SessionState {
        self.shared.lifecycle.lock().state
    }

    /// Whether an input writer is currently held
    pub fn has_writer(&self) -> bool {
        self.shared.lifecycle.lock().writer.is_some()
    }

    pub fn terminal(&self) -> &Arc<dyn TerminalEmulator> {
        &self.terminal
    }

    /// First render of the view: open the emulator, subscribe to host
    /// resizes and start booting in the background.
    ///
    /// Returns `None` if the session was already mounted or torn down.
    /// Must be called from within a tokio runtime.
    pub fn mount(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.open_view() || !self.begin_boot() {
            return None;
        }
        let session = Arc::clone(self);
        Some(tokio::spawn(async move { session.bootstrap().await }))
    }

    /// Run the bootstrap sequence in the current task.
    ///
    /// Does nothing unless the session is `Uninitialized`.
    pub async fn boot(&self) {
        if self.begin_boot() {
            self.bootstrap().await;
        }
    }

    /// Tear the session down: release the input writer, unsubscribe from the
    /// host window, stop the bridge, dispose the emulator and the container.
    /// Safe to call at any point and more than once.
    pub fn unmount(&self) {
        let (previous, writer, container, listener, tasks) = {
            let mut lc = self.shared.lifecycle.lock();
            if lc.unmounted {
                debug!("Session {} already unmounted", self.shared.id);
                return;
            }
            lc.unmounted = true;
            lc.view_open = false;

            let previous = lc.state;
            if !previous.is_final() {
                lc.state = SessionState::TornDown;
            }
            lc.process_resize = None;
            (
                previous,
                lc.writer.take(),
                lc.container.take(),
                lc.resize_listener.take(),
                std::mem::take(&mut lc.tasks),
            )
        };

        if let Some(id) = listener {
            self.window.remove_resize_listener(id);
        }
        if let Some(writer) = writer {
            writer.release(ReleaseReason::Unmount);
        }
        for task in tasks {
            task.abort();
        }
        self.terminal.dispose();
        if let Some(container) = container {
            container.teardown();
        }

        info!("Session {} unmounted (was {:?})", self.shared.id, previous);
        if !previous.is_final() {
            self.shared.state_changed(SessionState::TornDown);
        }
    }

    fn open_view(self: &Arc<Self>) -> bool {
        {
            let lc = self.shared.lifecycle.lock();
            if lc.unmounted || lc.resize_listener.is_some() {
                return false;
            }
        }

        let grid = self.terminal.open(self.window.viewport());
        let weak = Arc::downgrade(self);
        let listener = self.window.add_resize_listener(move |viewport| {
            if let Some(session) = weak.upgrade() {
                session.handle_resize(viewport);
            }
        });

        let mut lc = self.shared.lifecycle.lock();
        lc.grid = Some(grid);
        lc.view_open = true;
        lc.resize_listener = Some(listener);
        true
    }

    fn begin_boot(&self) -> bool {
        {
            let mut lc = self.shared.lifecycle.lock();
            if lc.state != SessionState::Uninitialized {
                warn!("Session {} cannot boot from {:?}", self.shared.id, lc.state);
                return false;
            }
            lc.state = SessionState::Booting;
        }
        self.shared.state_changed(SessionState::Booting);
        true
    }

    fn is_torn_down(&self) -> bool {
        self.shared.lifecycle.lock().state == SessionState::TornDown
    }

    /// Boot, mount, spawn, then wire I/O. Every await is followed by a
    /// teardown check.
    async fn bootstrap(&self) {
        let id = self.shared.id;
        self.terminal.write(BOOTING_MESSAGE.as_bytes());
        info!("Session {} booting sandbox", id);

        let container: Arc<dyn Container> = match self.runtime.boot().await {
            Ok(container) => Arc::from(container),
            Err(e) => return self.fail(e, None),
        };
        if self.discard(&container, "boot") {
            return;
        }
        self.terminal.write(BOOTED_MESSAGE.as_bytes());

        if let Err(e) = container.mount(&self.options.image).await {
            return self.fail(e, Some(&container));
        }
        if self.discard(&container, "mount") {
            return;
        }

        let process = match container.spawn(&self.options.shell, &self.options.args).await {
            Ok(process) => process,
            Err(e) => return self.fail(e, Some(&container)),
        };
        if self.discard(&container, "spawn") {
            return;
        }
        self.terminal.write(STARTED_MESSAGE.as_bytes());

        self.attach(container, process);
    }

    /// Tear down `container` if the session was unmounted during `step`
    fn discard(&self, container: &Arc<dyn Container>, step: &str) -> bool {
        if !self.is_torn_down() {
            return false;
        }
        info!("Session {} unmounted during {}, discarding container", self.shared.id, step);
        container.teardown();
        true
    }

    /// Report a bootstrap failure. The session ends in `Exited` without a process.
    fn fail(&self, error: SandboxError, container: Option<&Arc<dyn Container>>) {
        if let Some(container) = container {
            container.teardown();
        }

        {
            let mut lc = self.shared.lifecycle.lock();
            if lc.state == SessionState::TornDown {
                debug!("Session {} boot failed after unmount: {}", self.shared.id, error);
                return;
            }
            lc.state = SessionState::Exited { code: None };
        }

        warn!("Session {} failed to boot: {}", self.shared.id, error);
        self.terminal
            .write(format!("Error booting sandbox: {}\r\n", error).as_bytes());
        self.shared.state_changed(SessionState::Exited { code: None });
        self.shared.events.send(SessionEvent::BootFailed {
            session_id: self.shared.id,
            error: error.to_string(),
        });
    }

    /// Acquire the input writer and start the bridge tasks
    fn attach(&self, container: Arc<dyn Container>, process: ShellProcess) {
        let ShellProcess { input, output, exit, resize } = process;
        let (input_tx, input_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        let grid = {
            let mut lc = self.shared.lifecycle.lock();
            if lc.state == SessionState::TornDown {
                drop(lc);
                self.discard(&container, "attach");
                return;
            }

            let writer = match InputWriter::acquire(input.as_ref()) {
                Ok(writer) => writer,
                Err(e) => {
                    drop(lc);
                    return self.fail(e, Some(&container));
                }
            };

            // Registered under the lock so a racing unmount disposes after it
            self.terminal.on_data(Arc::new(move |data: &[u8]| {
                // Fails only once the forwarder is gone, i.e. after teardown
                let _ = input_tx.send(data.to_vec());
            }));

            lc.state = SessionState::Running;
            lc.writer = Some(writer);
            lc.container = Some(container);
            lc.process_resize = resize.clone();
            lc.tasks = vec![
                tokio::spawn(forward_input(Arc::clone(&self.shared), input_rx)),
                tokio::spawn(pump_process(
                    Arc::clone(&self.shared),
                    Arc::clone(&self.terminal),
                    output,
                    exit,
                )),
            ];
            lc.grid
        };

        if let (Some(resize), Some(grid)) = (resize, grid) {
            if let Err(e) = resize.resize(grid) {
                warn!("Session {} initial resize failed: {}", self.shared.id, e);
            }
        }

        info!("Session {} running", self.shared.id);
        self.shared.state_changed(SessionState::Running);
    }

    /// Re-fit the emulator to the host window and propagate the grid to the PTY
    fn handle_resize(&self, viewport: Viewport) {
        let process_resize = {
            let lc = self.shared.lifecycle.lock();
            if !lc.view_open {
                trace!("Session {} has no open view, ignoring resize", self.shared.id);
                return;
            }
            lc.process_resize.clone()
        };

        let size = self.terminal.fit(viewport);
        self.shared.lifecycle.lock().grid = Some(size);

        if let Some(resize) = process_resize {
            if let Err(e) = resize.resize(size) {
                warn!("Session {} failed to resize process: {}", self.shared.id, e);
            }
        }
        self.shared.events.send(SessionEvent::Resized {
            session_id: self.shared.id,
            size,
        });
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Forward keystrokes to the shell input, in order, while a writer is held
async fn forward_input(shared: Arc<Shared>, mut input_rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(data) = input_rx.recv().await {
        let writer = shared.lifecycle.lock().writer.clone();
        let Some(writer) = writer else {
            trace!("Session {} has no input writer, dropping {} bytes", shared.id, data.len());
            continue;
        };

        match writer.write(data).await {
            Ok(()) => {}
            Err(SandboxError::Released) => {
                debug!("Session {} input released mid-write", shared.id);
            }
            Err(e) => warn!("Session {} failed to write to shell input: {}", shared.id, e),
        }
    }
}

/// Append process output to the emulator until the process exits, then
/// report the exit code and release the writer.
///
/// Output that is already queued when the exit signal fires is written
/// first, so the exit line always comes after the last chunk.
async fn pump_process(
    shared: Arc<Shared>,
    terminal: Arc<dyn TerminalEmulator>,
    mut output: OutputStream,
    mut exit: ExitSignal,
) {
    let mut output_open = true;
    let code = loop {
        tokio::select! {
            biased;
            chunk = output.recv(), if output_open => match chunk {
                Some(chunk) => terminal.write(&chunk),
                None => {
                    debug!("Session {} output stream closed", shared.id);
                    output_open = false;
                }
            },
            code = &mut exit => break code.ok(),
        }
    };
    while let Ok(chunk) = output.try_recv() {
        terminal.write(&chunk);
    }

    let writer = {
        let mut lc = shared.lifecycle.lock();
        if lc.state != SessionState::Running {
            return;
        }
        lc.state = SessionState::Exited { code };
        lc.process_resize = None;
        lc.writer.take()
    };

    let code_text = code.map_or_else(|| "unknown".to_string(), |c| c.to_string());
    terminal.write(format!("Shell process exited with code {}\r\n", code_text).as_bytes());
    if let Some(writer) = writer {
        writer.release(ReleaseReason::ProcessExit);
    }

    info!("Session {} shell exited with code {}", shared.id, code_text);
    shared.state_changed(SessionState::Exited { code });
    shared.events.send(SessionEvent::Exited {
        session_id: shared.id,
        code,
    });
}
