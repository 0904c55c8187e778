//! GTP session - command queue, dispatcher and handshake state machine
//!
//! A [`Session`] owns one engine process at a time. Commands are queued in
//! submission order and written to the engine; each framed response completes
//! the oldest queued command. The protocol's optional response ids are not
//! used for matching, so the transport must preserve write-then-respond order.
//!
//! # Lifecycle
//!
//! 1. [`Session::start`] launches the engine and queues the handshake probes
//!    (`protocol_version`, `name`, `version`, `list_commands`).
//! 2. A successful `list_commands` fills the supported-command set, marks the
//!    session ready and notifies listeners of a reset. Any failed probe kills
//!    the process and fails every queued command.
//! 3. Once ready, acknowledged commands keep [`GameMemory`] current.
//! 4. If the process dies, [`Session::restore`] relaunches it and replays
//!    board size, handicap stones and move history.
//!
//! # Locking
//!
//! One mutex guards the queue, framer, metadata, supported set and game
//! memory. It is held while a command is queued and written, and while a
//! chunk of output is framed and its commands are popped; it is released
//! before result observers and completion handlers run, so handlers may
//! submit further commands.

use std::collections::{HashSet, VecDeque};
use std::sync::mpsc::{sync_channel, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::command::{Command, CommandKind, Handler, HANDSHAKE};
use crate::config::SessionConfig;
use crate::error::{GtpError, GtpResult, NOT_ACTIVE};
use crate::framer::{Response, ResponseFramer};
use crate::memory::{GameMemory, MemoryUpdate};
use crate::transport::{ByteSink, LaunchConfig, Launcher, Transport};
use crate::types::{Color, Move, PlayedMove, Point};
use crate::wire_log::{Direction, WireLog};

/// First wait slice of the synchronous wrapper.
const SYNC_POLL_START: Duration = Duration::from_micros(10);
/// Longest wait slice of the synchronous wrapper.
const SYNC_POLL_MAX: Duration = Duration::from_millis(100);
/// How often readiness waits re-check that the process is still alive.
const READY_POLL: Duration = Duration::from_millis(100);

/// Engine identity reported during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineMetadata {
    pub protocol_version: String,
    pub name: String,
    pub version: String,
}

/// Observer of session activity.
///
/// `on_input`, `on_output` and `on_unexpected_output` run while the session
/// lock is held and must not call back into the session. The other hooks run
/// outside the lock.
pub trait SessionListener: Send + Sync {
    /// Every response, whether or not its command had a handler.
    fn on_result(&self, _id: Option<u32>, _success: bool, _command: &CommandKind, _payload: &str) {}

    /// Handshake completed or `clear_board` acknowledged.
    fn on_reset(&self) {}

    /// A new engine process is about to be launched.
    fn on_relaunch(&self) {}

    /// A command line was written.
    fn on_input(&self, _line: &str) {}

    /// Raw engine output after the handshake.
    fn on_output(&self, _text: &str) {}

    /// Output that was not part of any response.
    fn on_unexpected_output(&self, _text: &str) {}

    fn on_stderr(&self, _text: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Readiness {
    Pending,
    Ready,
    Failed(GtpError),
}

struct Inner {
    transport: Option<Arc<dyn Transport>>,
    /// Bumped on every launch and kill; output tagged with an older value is dropped.
    generation: u64,
    queue: VecDeque<Command>,
    framer: ResponseFramer,
    metadata: EngineMetadata,
    supported: HashSet<String>,
    memory: GameMemory,
    handshake_done: bool,
}

impl Inner {
    fn new() -> Self {
        Self {
            transport: None,
            generation: 0,
            queue: VecDeque::new(),
            framer: ResponseFramer::new(),
            metadata: EngineMetadata::default(),
            supported: HashSet::new(),
            memory: GameMemory::new(),
            handshake_done: false,
        }
    }

    fn is_alive(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_alive())
    }

    /// Kill the process and take every queued command.
    fn shut_down(&mut self) -> Vec<Command> {
        if let Some(t) = self.transport.as_ref() {
            t.kill();
        }
        self.generation += 1;
        self.framer.clear();
        self.queue.drain(..).collect()
    }
}

/// A response matched to its command, ready to be delivered.
struct Completion {
    command: Command,
    response: Response,
    reset: bool,
}

/// Synthetic failure for commands that will never get a response.
struct Abandoned(Command);

pub struct Session {
    launcher: Arc<dyn Launcher>,
    config: SessionConfig,
    inner: Mutex<Inner>,
    ready: Mutex<Readiness>,
    ready_cv: Condvar,
    listeners: RwLock<Vec<Arc<dyn SessionListener>>>,
    wire_log: Option<WireLog>,
    this: Weak<Session>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    /// Create a session. Nothing is launched until [`Session::start`].
    pub fn new(launcher: Arc<dyn Launcher>, config: SessionConfig) -> Arc<Self> {
        let wire_log = config
            .log_path
            .as_deref()
            .and_then(|path| match WireLog::open(path) {
                Ok(log) => Some(log),
                Err(e) => {
                    warn!(error = %format!("{:#}", e), "wire log disabled");
                    None
                }
            });

        Arc::new_cyclic(|this| Self {
            launcher,
            config,
            inner: Mutex::new(Inner::new()),
            ready: Mutex::new(Readiness::Pending),
            ready_cv: Condvar::new(),
            listeners: RwLock::new(Vec::new()),
            wire_log,
            this: this.clone(),
        })
    }

    pub fn add_listener(&self, listener: Arc<dyn SessionListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn launch_config(&self) -> &LaunchConfig {
        &self.config.launch
    }

    /// Launch the engine and queue the handshake.
    pub fn start(&self) -> GtpResult<()> {
        self.execute()
    }

    fn execute(&self) -> GtpResult<()> {
        let (generation, stale) = {
            let mut inner = lock(&self.inner);
            let stale = inner.shut_down();
            inner.transport = None;
            inner.metadata = EngineMetadata::default();
            inner.supported.clear();
            inner.memory = GameMemory::new();
            inner.handshake_done = false;
            (inner.generation, stale)
        };
        self.set_readiness(Readiness::Pending);
        abandon(stale.into_iter().map(Abandoned));

        self.each_listener(|l| l.on_relaunch());

        let launch = &self.config.launch;
        info!(command = %launch.command_line, dir = %launch.working_dir.display(), "launching engine");

        let stdout: ByteSink = {
            let this = self.this.clone();
            Box::new(move |bytes: &[u8]| {
                if let Some(session) = this.upgrade() {
                    session.handle_stdout(generation, bytes);
                }
            })
        };
        let stderr: ByteSink = {
            let this = self.this.clone();
            Box::new(move |bytes: &[u8]| {
                if let Some(session) = this.upgrade() {
                    session.handle_stderr(generation, bytes);
                }
            })
        };

        let transport = match self.launcher.launch(launch, stdout, stderr) {
            Ok(t) => t,
            Err(e) => {
                let err = GtpError::Launch(format!("{:#}", e));
                error!(error = %err, "engine launch failed");
                self.set_readiness(Readiness::Failed(err.clone()));
                return Err(err);
            }
        };

        {
            let mut inner = lock(&self.inner);
            if inner.generation != generation {
                // Killed or relaunched concurrently.
                transport.kill();
                return Err(GtpError::NotActive);
            }
            inner.transport = Some(transport);
        }

        for probe in HANDSHAKE {
            self.submit(probe, None);
        }
        Ok(())
    }

    /// True while the engine process is running.
    pub fn alive(&self) -> bool {
        lock(&self.inner).is_alive()
    }

    /// True once the handshake of the current process has succeeded.
    pub fn is_ready(&self) -> bool {
        *lock(&self.ready) == Readiness::Ready
    }

    /// Queue a command without a completion handler.
    pub fn send(&self, kind: CommandKind) {
        self.submit(kind, None);
    }

    /// Queue a command; `handler` receives `(success, payload)`.
    ///
    /// When the engine is not running the handler is called immediately with
    /// `(false, "not active")` and nothing is written.
    pub fn send_with<F>(&self, kind: CommandKind, handler: F)
    where
        F: FnOnce(bool, &str) + Send + 'static,
    {
        self.submit(kind, Some(Box::new(handler)));
    }

    /// Queue a command typed as text. Unrecognised commands are sent verbatim.
    pub fn send_raw<F>(&self, text: &str, handler: F)
    where
        F: FnOnce(bool, &str) + Send + 'static,
    {
        self.send_with(CommandKind::parse(text), handler);
    }

    fn submit(&self, kind: CommandKind, handler: Option<Handler>) {
        let mut inner = lock(&self.inner);
        let live = inner.transport.as_ref().filter(|t| t.is_alive()).cloned();
        let Some(transport) = live else {
            drop(inner);
            debug!(command = %kind, "engine not active; command rejected");
            if let Some(handler) = handler {
                handler(false, NOT_ACTIVE);
            }
            return;
        };

        let line = kind.line();
        inner.queue.push_back(Command::new(kind, handler));

        if let Err(e) = transport.write(&format!("{}\n", line)) {
            error!(command = %line, error = %format!("{:#}", e), "write to engine failed");
            let abandoned = inner.shut_down();
            drop(inner);
            self.fail_readiness_if_pending(GtpError::NotActive);
            abandon(abandoned.into_iter().map(Abandoned));
            return;
        }

        if let Some(log) = self.wire_log.as_ref() {
            log.record(Direction::In, &line);
        }
        self.each_listener(|l| l.on_input(&line));
    }

    /// Kind of the oldest command still awaiting a response.
    pub fn pending_command(&self) -> Option<CommandKind> {
        lock(&self.inner).queue.front().map(|c| c.kind.clone())
    }

    /// Number of commands awaiting a response.
    pub fn pending_len(&self) -> usize {
        lock(&self.inner).queue.len()
    }

    /// Whether the engine listed `command` in its `list_commands` reply.
    /// Always false before the handshake completes.
    pub fn support(&self, command: &str) -> bool {
        lock(&self.inner).supported.contains(command)
    }

    pub fn metadata(&self) -> EngineMetadata {
        lock(&self.inner).metadata.clone()
    }

    /// Snapshot of the tracked game.
    pub fn memory(&self) -> GameMemory {
        lock(&self.inner).memory.clone()
    }

    pub fn board_size(&self) -> u8 {
        lock(&self.inner).memory.board_size()
    }

    pub fn handicaps(&self) -> Vec<Point> {
        lock(&self.inner).memory.handicaps().to_vec()
    }

    pub fn history(&self) -> Vec<PlayedMove> {
        lock(&self.inner).memory.history().to_vec()
    }

    pub fn next_to_move(&self) -> Color {
        lock(&self.inner).memory.next_to_move()
    }

    /// Decode a vertex reply against the tracked board size.
    pub fn decode_move(&self, text: &str) -> GtpResult<Move> {
        Ok(Move::from_vertex(text, self.board_size())?)
    }

    /// Kill the engine; every queued command fails with `not active`.
    pub fn kill(&self) {
        let abandoned = {
            let mut inner = lock(&self.inner);
            if !inner.is_alive() && inner.queue.is_empty() {
                return;
            }
            info!(pending = inner.queue.len(), "killing engine");
            inner.shut_down()
        };
        self.fail_readiness_if_pending(GtpError::NotActive);
        abandon(abandoned.into_iter().map(Abandoned));
    }

    /// Ask the engine to exit.
    pub fn quit(&self) {
        self.send(CommandKind::Quit);
    }

    /// Send `quit`, wait up to `timeout` for the process to exit, then kill it.
    pub fn quit_and_wait(&self, timeout: Duration) -> GtpResult<()> {
        let deadline = Instant::now() + timeout;
        let reply = self.send_command_sync(CommandKind::Quit, Some(timeout));
        while self.alive() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        if self.alive() {
            warn!("engine still running after quit; killing");
            self.kill();
        }
        match reply {
            Ok(_) | Err(GtpError::NotActive) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Block until the handshake succeeds, fails, the process dies, or
    /// `timeout` elapses.
    pub fn wait_till_ready(&self, timeout: Duration) -> GtpResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let guard = lock(&self.ready);
                let slice = deadline
                    .saturating_duration_since(Instant::now())
                    .min(READY_POLL);
                let (guard, _) = self
                    .ready_cv
                    .wait_timeout_while(guard, slice, |r| *r == Readiness::Pending)
                    .unwrap_or_else(PoisonError::into_inner);
                match &*guard {
                    Readiness::Ready => return Ok(()),
                    Readiness::Failed(e) => return Err(e.clone()),
                    Readiness::Pending => {}
                }
            }
            if Instant::now() >= deadline {
                return Err(GtpError::NotReady);
            }
            if !self.alive() {
                return Err(GtpError::NotActive);
            }
        }
    }

    /// Relaunch a dead engine and replay the tracked game onto it.
    ///
    /// Does nothing if the engine is alive. Otherwise the board size,
    /// handicap stones and moves recorded so far are replayed once the new
    /// process is ready. Replayed commands are not individually confirmed.
    /// If the new process fails to launch or get ready it is killed and the
    /// tracked game is kept, so a later call replays the same moves.
    pub fn restore(&self, timeout: Duration) -> GtpResult<()> {
        if self.alive() {
            return Ok(());
        }

        let snapshot = self.memory();
        warn!(
            board_size = snapshot.board_size(),
            handicaps = snapshot.handicaps().len(),
            moves = snapshot.history().len(),
            "engine not running; restoring"
        );

        if let Err(e) = self.execute().and_then(|()| self.wait_till_ready(timeout)) {
            error!(error = %e, "restored engine did not become ready");
            // Leave the session dead with the game intact for the next attempt.
            self.kill();
            lock(&self.inner).memory = snapshot;
            return Err(e);
        }

        self.send(CommandKind::BoardSize(snapshot.board_size()));
        for p in snapshot.handicaps() {
            self.send(CommandKind::SetFreeHandicap(vec![*p]));
        }
        for m in snapshot.history() {
            self.send(CommandKind::Play(m.color, m.mv));
        }

        info!(moves = snapshot.history().len(), "engine restored");
        Ok(())
    }

    /// [`Session::restore`] with the configured readiness bound.
    pub fn restore_default(&self) -> GtpResult<()> {
        self.restore(self.config.restore_timeout)
    }

    /// Send a command and block the calling thread until it completes.
    ///
    /// `timeout` of `None` (or zero) waits indefinitely. Returns
    /// [`GtpError::NotActive`] if the engine is or becomes unavailable,
    /// [`GtpError::Timeout`] if the bound elapses, and
    /// [`GtpError::Protocol`] for a `?` reply.
    pub fn send_command_sync(&self, kind: CommandKind, timeout: Option<Duration>) -> GtpResult<String> {
        // The flag tells a dropped command apart from an engine `?` reply.
        let (tx, rx) = sync_channel::<(bool, bool, String)>(1);
        let this = self.this.clone();
        self.send_with(kind, move |success, payload| {
            let reached = this.upgrade().is_some_and(|s| s.alive());
            let _ = tx.send((success, reached, payload.to_string()));
        });

        let limit = timeout.filter(|d| !d.is_zero());
        let start = Instant::now();
        let mut interval = SYNC_POLL_START;

        loop {
            let wait = match limit {
                Some(limit) => interval.min(limit.saturating_sub(start.elapsed())),
                None => interval,
            };
            match rx.recv_timeout(wait) {
                Ok((true, _, payload)) => return Ok(payload),
                Ok((false, false, _)) => return Err(GtpError::NotActive),
                Ok((false, true, payload)) => return Err(GtpError::Protocol(payload)),
                Err(RecvTimeoutError::Disconnected) => return Err(GtpError::NotActive),
                Err(RecvTimeoutError::Timeout) => {}
            }

            if !self.alive() {
                return Err(GtpError::NotActive);
            }
            if limit.is_some_and(|limit| start.elapsed() >= limit) {
                return Err(GtpError::Timeout);
            }
            interval = (interval * 10).min(SYNC_POLL_MAX);
        }
    }

    /// [`Session::send_command_sync`] for a command typed as text.
    pub fn send_raw_sync(&self, text: &str, timeout: Option<Duration>) -> GtpResult<String> {
        self.send_command_sync(CommandKind::parse(text), timeout)
    }

    fn handle_stdout(&self, generation: u64, bytes: &[u8]) {
        let mut completions = Vec::new();
        let mut abandoned = Vec::new();
        let mut handshake_error = None;
        let mut became_ready = false;

        {
            let mut inner = lock(&self.inner);
            if inner.generation != generation {
                debug!(bytes = bytes.len(), "dropping output from replaced engine");
                return;
            }

            if inner.handshake_done {
                let text = String::from_utf8_lossy(bytes);
                self.each_listener(|l| l.on_output(&text));
            }

            let framed = inner.framer.push(bytes);
            if let Some(text) = framed.unexpected.as_deref() {
                if let Some(log) = self.wire_log.as_ref() {
                    log.record(Direction::Unexpected, text);
                }
                self.each_listener(|l| l.on_unexpected_output(text));
            }

            for response in framed.responses {
                if let Some(log) = self.wire_log.as_ref() {
                    let status = if response.success { '=' } else { '?' };
                    log.record(Direction::Out, &format!("{} {}", status, response.payload));
                }

                let Some(command) = inner.queue.pop_front() else {
                    warn!(payload = %response.payload, "response with no pending command");
                    continue;
                };

                let mut reset = false;
                if !inner.handshake_done {
                    if command.kind.is_handshake() && !response.success {
                        error!(command = %command.kind, message = %response.payload, "handshake failed");
                        handshake_error = Some(GtpError::HandshakeFailed {
                            command: command.kind.line(),
                            message: response.payload.clone(),
                        });
                        abandoned = inner.shut_down();
                        completions.push(Completion {
                            command,
                            response,
                            reset,
                        });
                        break;
                    }
                    if response.success {
                        let payload = response.payload.clone();
                        match command.kind {
                            CommandKind::ProtocolVersion => inner.metadata.protocol_version = payload,
                            CommandKind::Name => inner.metadata.name = payload,
                            CommandKind::Version => inner.metadata.version = payload,
                            CommandKind::ListCommands => {
                                inner.supported = payload
                                    .lines()
                                    .map(str::trim)
                                    .filter(|s| !s.is_empty())
                                    .map(str::to_string)
                                    .collect();
                                inner.handshake_done = true;
                                became_ready = true;
                                reset = true;
                                info!(
                                    name = %inner.metadata.name,
                                    version = %inner.metadata.version,
                                    commands = inner.supported.len(),
                                    "engine ready"
                                );
                            }
                            _ => {}
                        }
                    }
                } else if response.success {
                    reset = inner.memory.apply(&command.kind, &response.payload) == MemoryUpdate::Cleared;
                }

                completions.push(Completion {
                    command,
                    response,
                    reset,
                });
            }

            // Under the lock: a dead process never has pending readiness.
            if let Some(err) = handshake_error {
                self.set_readiness(Readiness::Failed(err));
            }
        }

        for Completion {
            command,
            response,
            reset,
        } in completions
        {
            self.each_listener(|l| {
                l.on_result(response.id, response.success, &command.kind, &response.payload)
            });
            if reset {
                self.each_listener(|l| l.on_reset());
            }
            command.complete(response.success, &response.payload);
        }

        // Reset observers have run by the time readiness is visible.
        if became_ready {
            let inner = lock(&self.inner);
            if inner.generation == generation {
                self.set_readiness(Readiness::Ready);
            }
        }

        abandon(abandoned.into_iter().map(Abandoned));
    }

    fn handle_stderr(&self, generation: u64, bytes: &[u8]) {
        if lock(&self.inner).generation != generation {
            return;
        }
        let text = String::from_utf8_lossy(bytes);
        self.each_listener(|l| l.on_stderr(&text));
    }

    fn set_readiness(&self, state: Readiness) {
        *lock(&self.ready) = state;
        self.ready_cv.notify_all();
    }

    fn fail_readiness_if_pending(&self, err: GtpError) {
        let mut ready = lock(&self.ready);
        if *ready == Readiness::Pending {
            *ready = Readiness::Failed(err);
            self.ready_cv.notify_all();
        }
    }

    fn each_listener(&self, f: impl Fn(&dyn SessionListener)) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for l in listeners.iter() {
            f(l.as_ref());
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(t) = inner.transport.take() {
            t.kill();
        }
    }
}

fn abandon(commands: impl Iterator<Item = Abandoned>) {
    for Abandoned(command) in commands {
        command.complete(false, NOT_ACTIVE);
    }
}
