//! GTP session core - talks to one Go engine over the Go Text Protocol
//!
//! This crate owns everything between "a line of text to the engine" and "a
//! typed answer back": command queueing, response framing, the startup
//! handshake, and the game memory used to rebuild an engine after a crash.
//! It does not spawn processes itself; the [`Launcher`]/[`Transport`] seam
//! is supplied by the embedder.
//!
//! # Module Structure
//!
//! - [`command`]: closed set of command kinds and their wire lines
//! - [`framer`]: reassembles output chunks into `=`/`?` response blocks
//! - [`memory`]: board size, handicap stones and move history
//! - [`session`]: queue, dispatcher, handshake, restore and sync wrapper
//! - [`transport`]: launcher and process traits
//! - [`config`]: environment-driven session configuration
//! - [`wire_log`]: optional JSON-lines transcript
//!
//! # Ordering
//!
//! Responses are matched to commands strictly first-in first-out. A command
//! submitted while the engine is down completes immediately with
//! `(false, "not active")`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use gtp_advisor_core::{CommandKind, Launcher, Session, SessionConfig};
//! use gtp_advisor_core::types::Color;
//!
//! fn run(launcher: Arc<dyn Launcher>) -> anyhow::Result<()> {
//!     let session = Session::new(launcher, SessionConfig::from_env());
//!     session.start()?;
//!     session.wait_till_ready(Duration::from_secs(10))?;
//!     let reply = session.send_command_sync(CommandKind::GenMove(Color::Black), None)?;
//!     println!("engine plays {}", reply);
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod framer;
pub mod memory;
pub mod session;
pub mod transport;
pub mod wire_log;

pub use gtp_advisor_types as types;

pub use command::{Command, CommandKind, Handler, HANDSHAKE};
pub use config::SessionConfig;
pub use error::{GtpError, GtpResult, NOT_ACTIVE};
pub use framer::{Framed, Response, ResponseFramer};
pub use memory::{GameMemory, MemoryUpdate};
pub use session::{EngineMetadata, Session, SessionListener};
pub use transport::{ByteSink, LaunchConfig, Launcher, Transport};
pub use wire_log::{Direction, WireLog, WireRecord};
