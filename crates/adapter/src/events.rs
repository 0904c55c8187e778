//! Advisor event queue and per-kind handlers.
//!
//! Events are produced on the engine's I/O threads and consumed on whatever
//! thread calls `drain`. The queue is a tokio unbounded channel; only one
//! drain runs at a time.

use std::sync::{Mutex, PoisonError, TryLockError};

use tokio::sync::mpsc;

use crate::types::{Color, Event, Point};

/// Ordered, unbounded event buffer.
pub struct EventQueue {
    tx: mpsc::UnboundedSender<Event>,
    rx: Mutex<mpsc::UnboundedReceiver<Event>>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    pub fn push(&self, event: Event) {
        // The receiver lives as long as the queue, so send cannot fail.
        let _ = self.tx.send(event);
    }

    /// Remove every queued event and hand each to `f`, in order.
    ///
    /// Events pushed by `f` itself are delivered in the same drain. Returns
    /// the number of events delivered, or 0 without touching the queue if
    /// another drain is in progress.
    pub fn drain(&self, mut f: impl FnMut(Event)) -> usize {
        let mut rx = match self.rx.try_lock() {
            Ok(rx) => rx,
            Err(TryLockError::WouldBlock) => return 0,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
        };
        let mut n = 0;
        while let Ok(event) = rx.try_recv() {
            f(event);
            n += 1;
        }
        n
    }

    /// Drain into a vector.
    pub fn take(&self) -> Vec<Event> {
        let mut out = Vec::new();
        self.drain(|e| out.push(e));
        out
    }

    pub fn is_empty(&self) -> bool {
        self.rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

type Callback0 = Box<dyn FnMut() + Send>;
type Callback1<T> = Box<dyn FnMut(T) + Send>;

/// Per-kind consumers for drained events. Unset kinds are dropped.
///
/// Handlers may call back into the advisor (`place` from `on_move` is the
/// usual loop) but must not replace the handler set while it is running.
#[derive(Default)]
pub struct EventHandlers {
    on_move: Option<Box<dyn FnMut(Color, Point) + Send>>,
    on_pass: Option<Callback1<Color>>,
    on_resign: Option<Callback1<Color>>,
    on_think_begin: Option<Callback0>,
    on_think_end: Option<Callback0>,
    on_think_failed: Option<Callback1<String>>,
    on_reset: Option<Callback0>,
    on_input: Option<Callback1<String>>,
    on_output: Option<Callback1<String>>,
    on_board_changed: Option<Callback0>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_move(mut self, f: impl FnMut(Color, Point) + Send + 'static) -> Self {
        self.on_move = Some(Box::new(f));
        self
    }

    pub fn on_pass(mut self, f: impl FnMut(Color) + Send + 'static) -> Self {
        self.on_pass = Some(Box::new(f));
        self
    }

    pub fn on_resign(mut self, f: impl FnMut(Color) + Send + 'static) -> Self {
        self.on_resign = Some(Box::new(f));
        self
    }

    pub fn on_think_begin(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_think_begin = Some(Box::new(f));
        self
    }

    pub fn on_think_end(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_think_end = Some(Box::new(f));
        self
    }

    pub fn on_think_failed(mut self, f: impl FnMut(String) + Send + 'static) -> Self {
        self.on_think_failed = Some(Box::new(f));
        self
    }

    pub fn on_reset(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_reset = Some(Box::new(f));
        self
    }

    pub fn on_input(mut self, f: impl FnMut(String) + Send + 'static) -> Self {
        self.on_input = Some(Box::new(f));
        self
    }

    pub fn on_output(mut self, f: impl FnMut(String) + Send + 'static) -> Self {
        self.on_output = Some(Box::new(f));
        self
    }

    pub fn on_board_changed(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_board_changed = Some(Box::new(f));
        self
    }

    pub fn dispatch(&mut self, event: Event) {
        match event {
            Event::MoveDecided(color, point) => call2(&mut self.on_move, color, point),
            Event::PassDecided(color) => call1(&mut self.on_pass, color),
            Event::ResignDecided(color) => call1(&mut self.on_resign, color),
            Event::ThinkStarted => call0(&mut self.on_think_begin),
            Event::ThinkEnded => call0(&mut self.on_think_end),
            Event::ThinkFailed(reason) => call1(&mut self.on_think_failed, reason),
            Event::Reset => call0(&mut self.on_reset),
            Event::RawInput(line) => call1(&mut self.on_input, line),
            Event::RawOutput(text) => call1(&mut self.on_output, text),
            Event::BoardChanged => call0(&mut self.on_board_changed),
        }
    }
}

fn call0(f: &mut Option<Callback0>) {
    if let Some(f) = f.as_mut() {
        f();
    }
}

fn call1<T>(f: &mut Option<Callback1<T>>, arg: T) {
    if let Some(f) = f.as_mut() {
        f(arg);
    }
}

fn call2(f: &mut Option<Box<dyn FnMut(Color, Point) + Send>>, color: Color, point: Point) {
    if let Some(f) = f.as_mut() {
        f(color, point);
    }
}
