//! JSON-lines transcript of everything exchanged with the engine.
//!
//! Records are queued on an unbounded channel and written by a background
//! thread, so logging never blocks the protocol path.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Command line written to the engine.
    In,
    /// Framed response read from the engine.
    Out,
    /// Output that was not part of any response.
    Unexpected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRecord {
    pub dir: Direction,
    pub ts: u64,
    pub text: String,
}

impl WireRecord {
    pub fn new(dir: Direction, text: impl Into<String>) -> Self {
        Self {
            dir,
            ts: timestamp_ms(),
            text: text.into(),
        }
    }
}

/// Handle to the transcript writer. Dropping every handle stops the writer.
#[derive(Debug, Clone)]
pub struct WireLog {
    tx: mpsc::UnboundedSender<WireRecord>,
}

impl WireLog {
    /// Open (append) the transcript file and start the writer thread.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open wire log {}", path.display()))?;

        let (tx, mut rx) = mpsc::unbounded_channel::<WireRecord>();
        std::thread::Builder::new()
            .name("gtp-wire-log".into())
            .spawn(move || {
                let mut out = BufWriter::new(file);
                while let Some(rec) = rx.blocking_recv() {
                    if serde_json::to_writer(&mut out, &rec).is_err() {
                        continue;
                    }
                    if out.write_all(b"\n").is_err() {
                        break;
                    }
                    if rx.is_empty() && out.flush().is_err() {
                        break;
                    }
                }
                let _ = out.flush();
            })
            .context("spawn wire log writer")?;

        Ok(Self { tx })
    }

    pub fn record(&self, dir: Direction, text: &str) {
        let _ = self.tx.send(WireRecord::new(dir, text));
    }
}

fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
