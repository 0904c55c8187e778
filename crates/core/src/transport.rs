//! Transport seam - the engine process as seen by the session
//!
//! Spawning the process and pumping its pipes is not done here. A
//! [`Launcher`] starts the engine and hands back a [`Transport`]; engine
//! output is delivered to the byte sinks given at launch, from the launcher's
//! own reader threads.

use std::path::PathBuf;
use std::sync::Arc;

/// Receiver for raw output chunks.
pub type ByteSink = Box<dyn Fn(&[u8]) + Send + Sync + 'static>;

/// How to start the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Full command line, program first.
    pub command_line: String,
    pub working_dir: PathBuf,
    /// Route stderr into the stdout sink.
    pub merge_stderr: bool,
}

impl LaunchConfig {
    pub fn new(command_line: impl Into<String>) -> Self {
        Self {
            command_line: command_line.into(),
            working_dir: PathBuf::from("."),
            merge_stderr: false,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_merged_stderr(mut self, merge: bool) -> Self {
        self.merge_stderr = merge;
        self
    }
}

/// A running engine process.
///
/// `write` is called while the session lock is held, so implementations must
/// not deliver output synchronously from inside `write`.
pub trait Transport: Send + Sync {
    fn write(&self, text: &str) -> anyhow::Result<()>;

    /// Forcibly terminate the process. Must be idempotent.
    fn kill(&self);

    /// `Some(code)` once the process has exited, `None` while it runs.
    fn try_exit_status(&self) -> Option<i32>;

    fn is_alive(&self) -> bool {
        self.try_exit_status().is_none()
    }
}

/// Starts engine processes.
pub trait Launcher: Send + Sync {
    fn launch(
        &self,
        config: &LaunchConfig,
        stdout: ByteSink,
        stderr: ByteSink,
    ) -> anyhow::Result<Arc<dyn Transport>>;
}
