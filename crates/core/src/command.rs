//! Command kinds - the GTP vocabulary this layer understands
//!
//! Every submitted command carries a [`CommandKind`] decided at submission
//! time. The kind renders its own wire line and tells the session which part
//! of the game memory a successful response updates, so nothing re-parses
//! the command text after the fact.

use std::fmt;

use crate::types::{Color, Move, Point, MAX_BOARD_SIZE};

/// Completion handler: `(success, payload)`.
pub type Handler = Box<dyn FnOnce(bool, &str) + Send + 'static>;

/// The four startup probes, in the order they are issued.
pub const HANDSHAKE: [CommandKind; 4] = [
    CommandKind::ProtocolVersion,
    CommandKind::Name,
    CommandKind::Version,
    CommandKind::ListCommands,
];

/// Closed set of commands known to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    ProtocolVersion,
    Name,
    Version,
    ListCommands,
    BoardSize(u8),
    ClearBoard,
    Play(Color, Move),
    GenMove(Color),
    /// `kgs-genmove_cleanup`
    CleanupGenMove(Color),
    Undo,
    SetFreeHandicap(Vec<Point>),
    FixedHandicap(u8),
    PlaceFreeHandicap(u8),
    Quit,
    FinalScore,
    /// Anything else, written verbatim.
    Raw(String),
}

impl CommandKind {
    /// Classify a command line typed by a user or another tool.
    ///
    /// Lines whose arguments do not decode (unknown color, bad vertex) fall
    /// back to [`CommandKind::Raw`] so they still reach the engine unchanged.
    /// Vertices are decoded against the largest board; the engine is the
    /// authority on whether they fit the current one.
    ///
    /// # Examples
    ///
    /// ```
    /// use gtp_advisor_core::command::CommandKind;
    /// use gtp_advisor_core::types::{Color, Move, Point};
    ///
    /// assert_eq!(
    ///     CommandKind::parse("play B D4"),
    ///     CommandKind::Play(Color::Black, Move::Point(Point::new(3, 3)))
    /// );
    /// assert_eq!(CommandKind::parse("genmove w"), CommandKind::GenMove(Color::White));
    /// assert_eq!(CommandKind::parse("showboard"), CommandKind::Raw("showboard".into()));
    /// ```
    pub fn parse(line: &str) -> Self {
        Self::parse_known(line).unwrap_or_else(|| CommandKind::Raw(line.trim().to_string()))
    }

    fn parse_known(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let name = words.next()?;
        let args: Vec<&str> = words.collect();
        let size = MAX_BOARD_SIZE;

        let kind = match (name, args.as_slice()) {
            ("protocol_version", []) => CommandKind::ProtocolVersion,
            ("name", []) => CommandKind::Name,
            ("version", []) => CommandKind::Version,
            ("list_commands", []) => CommandKind::ListCommands,
            ("boardsize", [n]) => CommandKind::BoardSize(n.parse().ok().filter(|n| *n > 0)?),
            ("clear_board", []) => CommandKind::ClearBoard,
            ("play", [color, vertex]) => CommandKind::Play(
                Color::from_str(color)?,
                Move::from_vertex(vertex, size).ok()?,
            ),
            ("genmove", [color]) => CommandKind::GenMove(Color::from_str(color)?),
            ("kgs-genmove_cleanup", [color]) => {
                CommandKind::CleanupGenMove(Color::from_str(color)?)
            }
            ("undo", []) => CommandKind::Undo,
            ("set_free_handicap", vertices) if !vertices.is_empty() => {
                let points = vertices
                    .iter()
                    .map(|v| Move::from_vertex(v, size).ok()?.point())
                    .collect::<Option<Vec<_>>>()?;
                CommandKind::SetFreeHandicap(points)
            }
            ("fixed_handicap", [n]) => CommandKind::FixedHandicap(n.parse().ok()?),
            ("place_free_handicap", [n]) => CommandKind::PlaceFreeHandicap(n.parse().ok()?),
            ("quit", []) => CommandKind::Quit,
            ("final_score", []) => CommandKind::FinalScore,
            _ => return None,
        };
        Some(kind)
    }

    /// Command name as sent on the wire.
    pub fn name(&self) -> &str {
        match self {
            CommandKind::ProtocolVersion => "protocol_version",
            CommandKind::Name => "name",
            CommandKind::Version => "version",
            CommandKind::ListCommands => "list_commands",
            CommandKind::BoardSize(_) => "boardsize",
            CommandKind::ClearBoard => "clear_board",
            CommandKind::Play(..) => "play",
            CommandKind::GenMove(_) => "genmove",
            CommandKind::CleanupGenMove(_) => "kgs-genmove_cleanup",
            CommandKind::Undo => "undo",
            CommandKind::SetFreeHandicap(_) => "set_free_handicap",
            CommandKind::FixedHandicap(_) => "fixed_handicap",
            CommandKind::PlaceFreeHandicap(_) => "place_free_handicap",
            CommandKind::Quit => "quit",
            CommandKind::FinalScore => "final_score",
            CommandKind::Raw(line) => line.split_whitespace().next().unwrap_or(""),
        }
    }

    /// Wire line, without the trailing newline.
    pub fn line(&self) -> String {
        self.to_string()
    }

    pub fn is_handshake(&self) -> bool {
        HANDSHAKE.contains(self)
    }

    /// Move generation (`genmove` or `kgs-genmove_cleanup`).
    pub fn is_genmove(&self) -> bool {
        matches!(self, CommandKind::GenMove(_) | CommandKind::CleanupGenMove(_))
    }

    pub fn is_play(&self) -> bool {
        matches!(self, CommandKind::Play(..))
    }

    /// Handicap placement whose vertices come back in the response.
    pub fn reports_handicap(&self) -> bool {
        matches!(
            self,
            CommandKind::FixedHandicap(_) | CommandKind::PlaceFreeHandicap(_)
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::BoardSize(n) => write!(f, "boardsize {}", n),
            CommandKind::Play(color, mv) => write!(f, "play {} {}", color, mv),
            CommandKind::GenMove(color) | CommandKind::CleanupGenMove(color) => {
                write!(f, "{} {}", self.name(), color)
            }
            CommandKind::SetFreeHandicap(points) => {
                f.write_str(self.name())?;
                for p in points {
                    write!(f, " {}", p)?;
                }
                Ok(())
            }
            CommandKind::FixedHandicap(n) | CommandKind::PlaceFreeHandicap(n) => {
                write!(f, "{} {}", self.name(), n)
            }
            CommandKind::Raw(line) => f.write_str(line),
            _ => f.write_str(self.name()),
        }
    }
}

/// A queued command awaiting its response.
pub struct Command {
    pub kind: CommandKind,
    pub handler: Option<Handler>,
}

impl Command {
    pub fn new(kind: CommandKind, handler: Option<Handler>) -> Self {
        Self { kind, handler }
    }

    /// Run the handler, if any, consuming the command.
    pub fn complete(self, success: bool, payload: &str) {
        if let Some(handler) = self.handler {
            handler(success, payload);
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("kind", &self.kind)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_wire_lines() {
        assert_eq!(CommandKind::ProtocolVersion.line(), "protocol_version");
        assert_eq!(CommandKind::BoardSize(13).line(), "boardsize 13");
        assert_eq!(
            CommandKind::Play(Color::Black, Move::Point(Point::new(15, 15))).line(),
            "play b Q16"
        );
        assert_eq!(CommandKind::Play(Color::White, Move::Pass).line(), "play w pass");
        assert_eq!(CommandKind::GenMove(Color::White).line(), "genmove w");
        assert_eq!(
            CommandKind::CleanupGenMove(Color::Black).line(),
            "kgs-genmove_cleanup b"
        );
        assert_eq!(
            CommandKind::SetFreeHandicap(vec![Point::new(3, 3), Point::new(15, 15)]).line(),
            "set_free_handicap D4 Q16"
        );
        assert_eq!(CommandKind::FixedHandicap(4).line(), "fixed_handicap 4");
        assert_eq!(CommandKind::Raw("showboard".into()).line(), "showboard");
    }

    #[test]
    fn parse_recognizes_vocabulary() {
        assert_eq!(CommandKind::parse("list_commands"), CommandKind::ListCommands);
        assert_eq!(CommandKind::parse("boardsize 9"), CommandKind::BoardSize(9));
        assert_eq!(CommandKind::parse("  undo "), CommandKind::Undo);
        assert_eq!(
            CommandKind::parse("kgs-genmove_cleanup white"),
            CommandKind::CleanupGenMove(Color::White)
        );
        assert_eq!(
            CommandKind::parse("set_free_handicap D4 Q16"),
            CommandKind::SetFreeHandicap(vec![Point::new(3, 3), Point::new(15, 15)])
        );
        assert_eq!(CommandKind::parse("quit"), CommandKind::Quit);
    }

    #[test]
    fn parse_falls_back_to_raw() {
        assert_eq!(
            CommandKind::parse("play x D4"),
            CommandKind::Raw("play x D4".into())
        );
        assert_eq!(
            CommandKind::parse("play b I4"),
            CommandKind::Raw("play b I4".into())
        );
        assert_eq!(
            CommandKind::parse("boardsize 0"),
            CommandKind::Raw("boardsize 0".into())
        );
        assert_eq!(CommandKind::parse("time_left b 30 0").name(), "time_left");
    }

    #[test]
    fn classification_helpers() {
        assert!(CommandKind::GenMove(Color::Black).is_genmove());
        assert!(CommandKind::CleanupGenMove(Color::Black).is_genmove());
        assert!(CommandKind::Play(Color::Black, Move::Pass).is_play());
        assert!(CommandKind::ListCommands.is_handshake());
        assert!(!CommandKind::Undo.is_handshake());
        assert!(CommandKind::PlaceFreeHandicap(3).reports_handicap());
        assert!(!CommandKind::SetFreeHandicap(vec![]).reports_handicap());
    }

    #[test]
    fn complete_runs_handler_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let cmd = Command::new(
            CommandKind::Undo,
            Some(Box::new(move |ok, payload| {
                assert!(!ok);
                assert_eq!(payload, "not active");
                h.fetch_add(1, Ordering::SeqCst);
            })),
        );
        cmd.complete(false, "not active");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
