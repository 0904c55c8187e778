//! Scripted in-process engine for integration tests.
//!
//! The launcher hands out transports that answer each written line on their
//! own worker thread, the way a real engine's stdout reader would.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::anyhow;

use gtp_advisor::core::{ByteSink, LaunchConfig, Launcher, Transport};

/// What the scripted engine does with one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Success(String),
    Failure(String),
    /// Written verbatim.
    Raw(String),
    /// No response at all.
    Silent,
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Success(String::new())
    }

    pub fn ok_with(payload: &str) -> Self {
        Reply::Success(payload.to_string())
    }

    fn render(&self) -> Option<String> {
        match self {
            Reply::Success(p) if p.is_empty() => Some("=\n\n".to_string()),
            Reply::Success(p) => Some(format!("= {}\n\n", p)),
            Reply::Failure(m) => Some(format!("? {}\n\n", m)),
            Reply::Raw(text) => Some(text.clone()),
            Reply::Silent => None,
        }
    }
}

pub type Script = Arc<dyn Fn(&str) -> Reply + Send + Sync>;

pub const LIST_COMMANDS: &str = "protocol_version\nname\nversion\nlist_commands\nboardsize\nclear_board\nplay\ngenmove\nundo\nquit";

/// Handshake answers, then `rest` for everything else.
pub fn engine(rest: impl Fn(&str) -> Reply + Send + Sync + 'static) -> Script {
    Arc::new(move |line: &str| match line {
        "protocol_version" => Reply::ok_with("2"),
        "name" => Reply::ok_with("Scripted"),
        "version" => Reply::ok_with("0.3"),
        "list_commands" => Reply::ok_with(LIST_COMMANDS),
        other => rest(other),
    })
}

/// Handshake answers and `=` for every other command; `genmove` plays `vertex`.
pub fn obliging(vertex: &'static str) -> Script {
    engine(move |line| {
        if line.starts_with("genmove") {
            Reply::ok_with(vertex)
        } else {
            Reply::ok()
        }
    })
}

pub struct ScriptedTransport {
    writes: Mutex<Vec<String>>,
    input: Mutex<Option<Sender<String>>>,
    exited: Arc<AtomicBool>,
    stdout: Arc<ByteSink>,
    stderr: Arc<ByteSink>,
}

impl ScriptedTransport {
    fn spawn(script: Script, stdout: ByteSink, stderr: ByteSink) -> Arc<Self> {
        let (tx, rx) = channel::<String>();
        let exited = Arc::new(AtomicBool::new(false));
        let stdout = Arc::new(stdout);

        let worker_out = Arc::clone(&stdout);
        let worker_exited = Arc::clone(&exited);
        thread::spawn(move || {
            while let Ok(line) = rx.recv() {
                let reply = script(&line);
                if worker_exited.load(Ordering::SeqCst) {
                    break;
                }
                if let Some(text) = reply.render() {
                    worker_out(text.as_bytes());
                }
                if line == "quit" {
                    worker_exited.store(true, Ordering::SeqCst);
                    break;
                }
            }
        });

        Arc::new(Self {
            writes: Mutex::new(Vec::new()),
            input: Mutex::new(Some(tx)),
            exited,
            stdout,
            stderr: Arc::new(stderr),
        })
    }

    /// Every line written so far, without the trailing newline.
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    /// Simulate the process dying.
    pub fn crash(&self) {
        self.exited.store(true, Ordering::SeqCst);
        self.input.lock().unwrap().take();
    }

    /// Push unsolicited bytes to stdout from the calling thread.
    pub fn emit(&self, text: &str) {
        (self.stdout)(text.as_bytes());
    }

    pub fn emit_stderr(&self, text: &str) {
        (self.stderr)(text.as_bytes());
    }
}

impl Transport for ScriptedTransport {
    fn write(&self, text: &str) -> anyhow::Result<()> {
        if self.exited.load(Ordering::SeqCst) {
            return Err(anyhow!("broken pipe"));
        }
        let line = text.trim_end().to_string();
        self.writes.lock().unwrap().push(line.clone());
        let input = self.input.lock().unwrap();
        let tx = input.as_ref().ok_or_else(|| anyhow!("broken pipe"))?;
        tx.send(line).map_err(|_| anyhow!("broken pipe"))
    }

    fn kill(&self) {
        self.crash();
    }

    fn try_exit_status(&self) -> Option<i32> {
        if self.exited.load(Ordering::SeqCst) {
            Some(-9)
        } else {
            None
        }
    }
}

pub struct ScriptedLauncher {
    script: Script,
    launches: Mutex<Vec<(LaunchConfig, Arc<ScriptedTransport>)>>,
    refuse: AtomicBool,
}

impl ScriptedLauncher {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            launches: Mutex::new(Vec::new()),
            refuse: AtomicBool::new(false),
        })
    }

    /// Make subsequent launches fail.
    pub fn refuse_launches(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    pub fn last(&self) -> Arc<ScriptedTransport> {
        let launches = self.launches.lock().unwrap();
        Arc::clone(&launches.last().expect("nothing launched").1)
    }

    pub fn config(&self, i: usize) -> LaunchConfig {
        self.launches.lock().unwrap()[i].0.clone()
    }
}

impl Launcher for ScriptedLauncher {
    fn launch(
        &self,
        config: &LaunchConfig,
        stdout: ByteSink,
        stderr: ByteSink,
    ) -> anyhow::Result<Arc<dyn Transport>> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(anyhow!("spawn {}: No such file or directory", config.command_line));
        }
        let transport = ScriptedTransport::spawn(Arc::clone(&self.script), stdout, stderr);
        self.launches
            .lock()
            .unwrap()
            .push((config.clone(), Arc::clone(&transport)));
        Ok(transport)
    }
}

/// Poll `cond` until it holds or two seconds pass.
pub fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

pub const READY: Duration = Duration::from_secs(2);

/// Handshake answers and `=` for everything, except that `genmove` blocks
/// until the returned sender fires (or two seconds pass) and then plays
/// `vertex`.
pub fn gated_genmove(vertex: &'static str) -> (Script, Sender<()>) {
    let (tx, rx) = channel::<()>();
    let gate = Mutex::new(rx);
    let script = engine(move |line| {
        if line.starts_with("genmove") {
            let _ = gate.lock().unwrap().recv_timeout(Duration::from_secs(2));
            Reply::ok_with(vertex)
        } else {
            Reply::ok()
        }
    });
    (script, tx)
}
