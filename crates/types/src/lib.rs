//! Core types module - shared value types for the GTP advisor
//!
//! This crate defines the fundamental types used throughout the workspace.
//! All types are plain data with no external dependencies, so they can be used
//! by the protocol session, the turn reconciler and any consumer of events.
//!
//! # Coordinates
//!
//! Board points are addressed by zero-based `(row, col)` where row 0 is the
//! first line from the bottom (GTP row `1`) and col 0 is column `A`.
//! GTP vertex text uses a column letter followed by a 1-based row number.
//! The letter `I` is skipped, so the 9th column is `J`:
//!
//! | col | 0 | 1 | ... | 7 | 8 | ... | 24 |
//! |-----|---|---|-----|---|---|-----|----|
//! | letter | A | B | ... | H | J | ... | Z |
//!
//! # Board Dimensions
//!
//! - **Default**: 19x19
//! - **Maximum**: 25x25 (the number of usable column letters)
//!
//! # Examples
//!
//! ```
//! use gtp_advisor_types::{Color, Move, Point};
//!
//! let mv = Move::from_vertex("D4", 19).unwrap();
//! assert_eq!(mv, Move::Point(Point::new(3, 3)));
//! assert_eq!(mv.to_string(), "D4");
//!
//! assert_eq!(Move::from_vertex("PASS", 19).unwrap(), Move::Pass);
//! assert!(Move::from_vertex("I5", 19).is_err());
//!
//! assert_eq!(Color::from_str("black"), Some(Color::Black));
//! assert_eq!(Color::Black.opponent(), Color::White);
//! ```

use std::fmt;

/// Default board size (19x19)
pub const DEFAULT_BOARD_SIZE: u8 = 19;

/// Largest board addressable with single column letters (A-Z without I)
pub const MAX_BOARD_SIZE: u8 = 25;

/// Column letters in order, `I` omitted.
const COLUMN_LETTERS: &[u8; 25] = b"ABCDEFGHJKLMNOPQRSTUVWXYZ";

/// Stone color / side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
}

impl Color {
    /// Parse color from string (case-insensitive)
    ///
    /// Accepts `b`, `black`, `w`, `white`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gtp_advisor_types::Color;
    ///
    /// assert_eq!(Color::from_str("B"), Some(Color::Black));
    /// assert_eq!(Color::from_str("white"), Some(Color::White));
    /// assert_eq!(Color::from_str("red"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "b" | "black" => Some(Color::Black),
            "w" | "white" => Some(Color::White),
            _ => None,
        }
    }

    /// Short GTP form (`b` / `w`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Black => "b",
            Color::White => "w",
        }
    }

    pub fn opponent(&self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    pub fn is_black(&self) -> bool {
        matches!(self, Color::Black)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point on the board, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub row: u8,
    pub col: u8,
}

impl Point {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Flat index `row * board_size + col`.
    pub fn index(&self, board_size: u8) -> usize {
        self.row as usize * board_size as usize + self.col as usize
    }

    /// Inverse of [`Point::index`]. Returns `None` when out of range.
    pub fn from_index(index: usize, board_size: u8) -> Option<Self> {
        let size = board_size as usize;
        if size == 0 || index >= size * size {
            return None;
        }
        Some(Self::new((index / size) as u8, (index % size) as u8))
    }

    pub fn is_on_board(&self, board_size: u8) -> bool {
        self.row < board_size && self.col < board_size
    }

    /// Column letter (skipping `I`), or `None` past column `Z`.
    pub fn column_letter(&self) -> Option<char> {
        COLUMN_LETTERS.get(self.col as usize).map(|&b| b as char)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column_letter() {
            Some(letter) => write!(f, "{}{}", letter, self.row as u32 + 1),
            None => f.write_str("error"),
        }
    }
}

/// A move: a stone on a point, a pass or a resignation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Point(Point),
    Pass,
    Resign,
}

impl Move {
    /// Decode GTP vertex text against a board size.
    ///
    /// `pass` / `resign` are accepted in any case. Points are a column letter
    /// (never `I`) followed by a 1-based row. Anything else, including points
    /// outside the board, is a [`VertexError`].
    ///
    /// # Examples
    ///
    /// ```
    /// use gtp_advisor_types::{Move, Point};
    ///
    /// assert_eq!(Move::from_vertex("q16", 19), Ok(Move::Point(Point::new(15, 15))));
    /// assert_eq!(Move::from_vertex("Resign", 19), Ok(Move::Resign));
    /// assert!(Move::from_vertex("T20", 19).is_err());
    /// ```
    pub fn from_vertex(text: &str, board_size: u8) -> Result<Self, VertexError> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("pass") {
            return Ok(Move::Pass);
        }
        if text.eq_ignore_ascii_case("resign") {
            return Ok(Move::Resign);
        }

        let invalid = || VertexError::new(text, board_size);

        let mut chars = text.chars();
        let letter = chars.next().ok_or_else(invalid)?.to_ascii_uppercase();
        let digits = chars.as_str();
        if !letter.is_ascii_alphabetic() || letter == 'I' {
            return Err(invalid());
        }
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let col = COLUMN_LETTERS
            .iter()
            .position(|&b| b as char == letter)
            .ok_or_else(invalid)? as u8;
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 || row > board_size as u32 || col >= board_size {
            return Err(invalid());
        }

        Ok(Move::Point(Point::new((row - 1) as u8, col)))
    }

    pub fn point(&self) -> Option<Point> {
        match self {
            Move::Point(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Move::Pass)
    }

    pub fn is_resign(&self) -> bool {
        matches!(self, Move::Resign)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Point(p) => p.fmt(f),
            Move::Pass => f.write_str("pass"),
            Move::Resign => f.write_str("resign"),
        }
    }
}

/// Vertex text that does not name a move on the current board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexError {
    pub text: String,
    pub board_size: u8,
}

impl VertexError {
    fn new(text: &str, board_size: u8) -> Self {
        Self {
            text: text.to_string(),
            board_size,
        }
    }
}

impl fmt::Display for VertexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid vertex {:?} for a {}x{} board",
            self.text, self.board_size, self.board_size
        )
    }
}

impl std::error::Error for VertexError {}

/// A move as recorded in game history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayedMove {
    pub color: Color,
    pub mv: Move,
}

impl PlayedMove {
    pub fn new(color: Color, mv: Move) -> Self {
        Self { color, mv }
    }
}

/// Outward advisor event, produced in protocol order and drained by the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The engine proposed a stone.
    MoveDecided(Color, Point),
    /// The engine proposed to pass.
    PassDecided(Color),
    /// The engine resigned.
    ResignDecided(Color),
    ThinkStarted,
    ThinkEnded,
    /// Move generation failed or produced an unusable reply.
    ThinkFailed(String),
    /// The game was cleared (handshake completion or `clear_board` ack).
    Reset,
    /// A command line written to the engine.
    RawInput(String),
    /// A chunk of engine output, as received.
    RawOutput(String),
    /// An authoritative move was placed.
    BoardChanged,
}

impl Event {
    /// Stable lowercase name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::MoveDecided(..) => "move",
            Event::PassDecided(_) => "pass",
            Event::ResignDecided(_) => "resign",
            Event::ThinkStarted => "think",
            Event::ThinkEnded => "think_end",
            Event::ThinkFailed(_) => "think_failed",
            Event::Reset => "reset",
            Event::RawInput(_) => "input",
            Event::RawOutput(_) => "output",
            Event::BoardChanged => "update_board",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_roundtrip_all_sizes() {
        for size in [5u8, 9, 13, 19, MAX_BOARD_SIZE] {
            for row in 0..size {
                for col in 0..size {
                    let p = Point::new(row, col);
                    let text = p.to_string();
                    assert_eq!(
                        Move::from_vertex(&text, size),
                        Ok(Move::Point(p)),
                        "{} on {}",
                        text,
                        size
                    );
                    assert_eq!(
                        Move::from_vertex(&text.to_lowercase(), size),
                        Ok(Move::Point(p))
                    );
                }
            }
        }
    }

    #[test]
    fn pass_and_resign_are_case_insensitive() {
        assert_eq!(Move::from_vertex("pass", 19), Ok(Move::Pass));
        assert_eq!(Move::from_vertex("PASS", 19), Ok(Move::Pass));
        assert_eq!(Move::from_vertex("resign", 19), Ok(Move::Resign));
        assert_eq!(Move::from_vertex("RESIGN", 19), Ok(Move::Resign));
    }

    #[test]
    fn column_i_is_never_valid() {
        for row in 1..=19 {
            assert!(Move::from_vertex(&format!("I{}", row), 19).is_err());
            assert!(Move::from_vertex(&format!("i{}", row), 19).is_err());
        }
    }

    #[test]
    fn j_is_ninth_column() {
        assert_eq!(
            Move::from_vertex("J1", 19),
            Ok(Move::Point(Point::new(0, 8)))
        );
        assert_eq!(Point::new(0, 7).to_string(), "H1");
        assert_eq!(Point::new(0, 8).to_string(), "J1");
    }

    #[test]
    fn out_of_range_is_rejected_not_clamped() {
        assert!(Move::from_vertex("K10", 9).is_err());
        assert!(Move::from_vertex("A10", 9).is_err());
        assert!(Move::from_vertex("A0", 9).is_err());
        assert!(Move::from_vertex("", 19).is_err());
        assert!(Move::from_vertex("D", 19).is_err());
        assert!(Move::from_vertex("4D", 19).is_err());
        assert!(Move::from_vertex("D4x", 19).is_err());
        assert!(Move::from_vertex("D-4", 19).is_err());
    }

    #[test]
    fn vertex_error_names_the_text() {
        let err = Move::from_vertex("Z99", 19).unwrap_err();
        assert_eq!(err.text, "Z99");
        assert_eq!(err.board_size, 19);
        assert!(err.to_string().contains("Z99"));
    }

    #[test]
    fn point_index_roundtrip() {
        let p = Point::new(3, 15);
        assert_eq!(p.index(19), 3 * 19 + 15);
        assert_eq!(Point::from_index(p.index(19), 19), Some(p));
        assert_eq!(Point::from_index(361, 19), None);
    }

    #[test]
    fn color_parsing() {
        assert_eq!(Color::from_str("b"), Some(Color::Black));
        assert_eq!(Color::from_str("BLACK"), Some(Color::Black));
        assert_eq!(Color::from_str("W"), Some(Color::White));
        assert_eq!(Color::from_str(""), None);
        assert_eq!(Color::White.to_string(), "w");
    }
}
