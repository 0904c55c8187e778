//! Turn reconciler - keeps engine suggestions and real moves in one sequence
//!
//! The advisor asks the engine for a move (`genmove`), which the engine also
//! plays on its own board. The real game then supplies the authoritative move
//! through [`Advisor::place`]:
//!
//! - same move as suggested: nothing to send, the engine already has it;
//! - different move: `undo` the suggestion, then `play` the real move;
//! - suggestion arrived while the real move was in flight: `undo` both and
//!   replay the real move.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};

use tracing::{debug, info, warn};

use crate::core::{CommandKind, GtpResult, Launcher, Session, SessionConfig, SessionListener};
use crate::events::{EventHandlers, EventQueue};
use crate::types::{Color, Event, Move, PlayedMove};

#[derive(Debug, Clone, PartialEq, Eq)]
struct ReconcilerState {
    /// `clear_board` sent, not yet acknowledged.
    pending_reset: bool,
    /// Engine suggestion already on the engine's board.
    commit: Option<PlayedMove>,
    /// Side the advisor plays for.
    local_side: Color,
    /// Side requested by an in-flight `reset`.
    requested_side: Option<Color>,
}

impl Default for ReconcilerState {
    fn default() -> Self {
        Self {
            pending_reset: false,
            commit: None,
            local_side: Color::Black,
            requested_side: None,
        }
    }
}

impl ReconcilerState {
    fn forget_pending(&mut self) {
        self.pending_reset = false;
        self.commit = None;
        self.requested_side = None;
    }
}

pub struct Advisor {
    session: Arc<Session>,
    state: Mutex<ReconcilerState>,
    events: EventQueue,
    handlers: Mutex<EventHandlers>,
    this: Weak<Advisor>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Advisor {
    /// Attach an advisor to `session`. The session is not started.
    pub fn new(session: Arc<Session>) -> Arc<Self> {
        let advisor = Arc::new_cyclic(|this| Self {
            session: Arc::clone(&session),
            state: Mutex::new(ReconcilerState::default()),
            events: EventQueue::new(),
            handlers: Mutex::new(EventHandlers::new()),
            this: this.clone(),
        });
        session.add_listener(Arc::new(Hook {
            advisor: Arc::downgrade(&advisor),
        }));
        advisor
    }

    /// Create a session and an advisor on it, and launch the engine.
    pub fn launch(launcher: Arc<dyn Launcher>, config: SessionConfig) -> GtpResult<Arc<Self>> {
        let advisor = Self::new(Session::new(launcher, config));
        advisor.session.start()?;
        Ok(advisor)
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn set_handlers(&self, handlers: EventHandlers) {
        *lock(&self.handlers) = handlers;
    }

    /// Side the advisor plays for.
    pub fn local_side(&self) -> Color {
        lock(&self.state).local_side
    }

    /// Outstanding engine suggestion, if any.
    pub fn pending_commit(&self) -> Option<PlayedMove> {
        lock(&self.state).commit
    }

    pub fn is_reset_pending(&self) -> bool {
        lock(&self.state).pending_reset
    }

    /// Ask the engine for a move for `color`.
    ///
    /// Ignored while a suggestion is outstanding or a `genmove`/`play` is at
    /// the head of the queue. A suggested resignation is reported but not
    /// held as a suggestion, so a later `place` of that resignation is sent
    /// to the engine as `play <color> resign`.
    pub fn think(&self, color: Color) {
        if lock(&self.state).commit.is_some() {
            debug!(color = color.as_str(), "think skipped; suggestion outstanding");
            return;
        }
        if let Some(head) = self.session.pending_command() {
            if head.is_genmove() || head.is_play() {
                debug!(color = color.as_str(), pending = %head, "think skipped; engine busy");
                return;
            }
        }

        self.events.push(Event::ThinkStarted);
        let this = self.this.clone();
        self.session
            .send_with(CommandKind::GenMove(color), move |success, payload| {
                if let Some(advisor) = this.upgrade() {
                    advisor.on_think_reply(color, success, payload);
                }
            });
    }

    /// Adopt the side to move as the local side and think for it.
    pub fn hint(&self) {
        let side = self.session.next_to_move();
        lock(&self.state).local_side = side;
        self.think(side);
    }

    fn on_think_reply(&self, color: Color, success: bool, payload: &str) {
        if !success {
            warn!(color = color.as_str(), reason = %payload, "genmove failed");
            self.events.push(Event::ThinkFailed(payload.to_string()));
            return;
        }

        let mv = match self.session.decode_move(payload) {
            Ok(mv) => mv,
            Err(e) => {
                warn!(color = color.as_str(), error = %e, "genmove reply not understood");
                self.events.push(Event::ThinkFailed(e.to_string()));
                return;
            }
        };

        let mut state = lock(&self.state);
        if state.pending_reset {
            debug!(color = color.as_str(), %mv, "genmove reply discarded; reset pending");
            return;
        }
        // A resignation is not on the engine's board, so there is nothing to undo.
        if !mv.is_resign() {
            state.commit = Some(PlayedMove::new(color, mv));
        }
        // Pushed under the same lock as the commit.
        self.events.push(Event::ThinkEnded);
        self.events.push(match mv {
            Move::Point(p) => Event::MoveDecided(color, p),
            Move::Pass => Event::PassDecided(color),
            Move::Resign => Event::ResignDecided(color),
        });
    }

    /// Apply the authoritative move `color` `mv` to the engine.
    pub fn place(&self, color: Color, mv: Move) {
        self.events.push(Event::BoardChanged);

        let commit = lock(&self.state).commit.take();
        match commit {
            Some(c) if c == PlayedMove::new(color, mv) => {
                debug!(color = color.as_str(), %mv, "suggestion confirmed");
                return;
            }
            Some(c) => {
                info!(suggested = %c.mv, played = %mv, "suggestion superseded; undoing");
                self.session.send(CommandKind::Undo);
            }
            None => {}
        }

        self.put_stone(color, mv);
    }

    fn put_stone(&self, color: Color, mv: Move) {
        let this = self.this.clone();
        self.session
            .send_with(CommandKind::Play(color, mv), move |success, _| {
                if let Some(advisor) = this.upgrade() {
                    advisor.on_play_ack(color, mv, success);
                }
            });
    }

    fn on_play_ack(&self, color: Color, mv: Move, success: bool) {
        if !success {
            return;
        }

        let next = {
            let mut state = lock(&self.state);
            if state.pending_reset {
                return;
            }
            if let Some(raced) = state.commit.take() {
                drop(state);
                // The suggestion landed on top of the real move.
                warn!(suggested = %raced.mv, played = %mv, "suggestion raced a placed move; replaying");
                self.session.send(CommandKind::Undo);
                self.session.send(CommandKind::Undo);
                self.put_stone(color, mv);
                return;
            }
            state.local_side
        };

        if next == color.opponent() {
            self.think(next);
        }
    }

    /// Clear the board and play for `own` from now on.
    ///
    /// The engine's reply to any genmove already in flight is discarded. If
    /// `own` is to move after the clear, thinking starts immediately.
    pub fn reset(&self, own: Color) {
        {
            let mut state = lock(&self.state);
            state.pending_reset = true;
            state.requested_side = Some(own);
        }

        let this = self.this.clone();
        self.session.send_with(CommandKind::ClearBoard, move |success, payload| {
            if success {
                return;
            }
            if let Some(advisor) = this.upgrade() {
                warn!(reason = %payload, "clear_board failed");
                let mut state = lock(&advisor.state);
                state.pending_reset = false;
                state.requested_side = None;
            }
        });
    }

    fn on_session_reset(&self) {
        let requested = {
            let mut state = lock(&self.state);
            let requested = state.requested_side.take();
            state.forget_pending();
            if let Some(side) = requested {
                state.local_side = side;
            }
            self.events.push(Event::Reset);
            requested
        };

        if let Some(side) = requested {
            if self.session.next_to_move() == side {
                self.think(side);
            }
        }
    }

    fn on_relaunch(&self) {
        lock(&self.state).forget_pending();
    }

    /// Deliver every queued event to the registered handlers.
    ///
    /// Returns the number of events delivered; 0 if another drain is running.
    pub fn drain_events(&self) -> usize {
        let mut handlers = match self.handlers.try_lock() {
            Ok(h) => h,
            Err(TryLockError::WouldBlock) => return 0,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
        };
        self.events.drain(|event| handlers.dispatch(event))
    }

    /// Remove every queued event without dispatching it.
    pub fn take_events(&self) -> Vec<Event> {
        self.events.take()
    }
}

/// Session listener feeding the advisor. Holds a weak reference so the
/// session does not keep the advisor alive.
struct Hook {
    advisor: Weak<Advisor>,
}

impl SessionListener for Hook {
    fn on_reset(&self) {
        if let Some(advisor) = self.advisor.upgrade() {
            advisor.on_session_reset();
        }
    }

    fn on_relaunch(&self) {
        if let Some(advisor) = self.advisor.upgrade() {
            advisor.on_relaunch();
        }
    }

    fn on_input(&self, line: &str) {
        if let Some(advisor) = self.advisor.upgrade() {
            advisor.events.push(Event::RawInput(line.to_string()));
        }
    }

    fn on_output(&self, text: &str) {
        if let Some(advisor) = self.advisor.upgrade() {
            advisor.events.push(Event::RawOutput(text.to_string()));
        }
    }
}
