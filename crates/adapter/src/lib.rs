//! Advisor layer - turn reconciliation and the outward event stream
//!
//! Sits on a [`Session`](gtp_advisor_core::Session) and turns it into a move
//! advisor: ask the engine to think, feed it the real moves, and get a
//! single ordered stream of events back.
//!
//! # Event Flow
//!
//! 1. Engine I/O threads push [`Event`](gtp_advisor_types::Event)s as
//!    responses arrive (think started/ended, move decided, reset, raw I/O).
//! 2. The consumer calls [`Advisor::drain_events`] from its own loop; each
//!    event goes to the matching handler in [`EventHandlers`].
//! 3. Handlers may call back into the advisor, typically
//!    [`Advisor::place`] from `on_move`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gtp_advisor_adapter::{Advisor, EventHandlers};
//! use gtp_advisor_adapter::core::{Launcher, SessionConfig};
//! use gtp_advisor_adapter::types::{Color, Move};
//!
//! fn run(launcher: Arc<dyn Launcher>) -> anyhow::Result<()> {
//!     let advisor = Advisor::launch(launcher, SessionConfig::from_env())?;
//!     let placer = Arc::clone(&advisor);
//!     advisor.set_handlers(EventHandlers::new().on_move(move |color, point| {
//!         placer.place(color, Move::Point(point));
//!     }));
//!     advisor.reset(Color::Black);
//!     loop {
//!         advisor.drain_events();
//!         std::thread::sleep(std::time::Duration::from_millis(16));
//!     }
//! }
//! ```

pub mod events;
pub mod reconciler;

pub use gtp_advisor_core as core;
pub use gtp_advisor_types as types;

pub use events::{EventHandlers, EventQueue};
pub use reconciler::Advisor;
