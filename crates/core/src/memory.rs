//! Game memory - the part of the session that outlives an engine process
//!
//! Tracks board size, handicap stones and move history from acknowledged
//! commands, so a relaunched engine can be brought back to the same position.

use crate::command::CommandKind;
use crate::types::{Color, Move, PlayedMove, Point, DEFAULT_BOARD_SIZE};

/// What a successful response changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryUpdate {
    None,
    BoardSize,
    /// `clear_board` acknowledged; listeners see a reset.
    Cleared,
    Appended,
    Undone,
    Handicap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMemory {
    board_size: u8,
    handicaps: Vec<Point>,
    history: Vec<PlayedMove>,
}

impl Default for GameMemory {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            handicaps: Vec::new(),
            history: Vec::new(),
        }
    }
}

impl GameMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board_size(&self) -> u8 {
        self.board_size
    }

    pub fn handicaps(&self) -> &[Point] {
        &self.handicaps
    }

    pub fn history(&self) -> &[PlayedMove] {
        &self.history
    }

    /// Forget stones and moves; the board size is kept.
    pub fn clear(&mut self) {
        self.handicaps.clear();
        self.history.clear();
    }

    /// Side to move, derived from history alone.
    ///
    /// Black opens an empty board. Otherwise the side opposite the last mover
    /// plays; with only handicap stones down, white moves.
    pub fn next_to_move(&self) -> Color {
        match self.history.last() {
            Some(last) => last.color.opponent(),
            None if self.handicaps.is_empty() => Color::Black,
            None => Color::White,
        }
    }

    /// Apply a successful response to the memory.
    pub fn apply(&mut self, kind: &CommandKind, payload: &str) -> MemoryUpdate {
        match kind {
            CommandKind::BoardSize(n) => {
                self.board_size = *n;
                MemoryUpdate::BoardSize
            }
            CommandKind::ClearBoard => {
                self.clear();
                MemoryUpdate::Cleared
            }
            CommandKind::Play(color, mv) => {
                self.history.push(PlayedMove::new(*color, *mv));
                MemoryUpdate::Appended
            }
            CommandKind::GenMove(color) | CommandKind::CleanupGenMove(color) => {
                match Move::from_vertex(payload, self.board_size) {
                    Ok(Move::Resign) => MemoryUpdate::None,
                    Ok(mv) => {
                        self.history.push(PlayedMove::new(*color, mv));
                        MemoryUpdate::Appended
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "genmove reply not recorded");
                        MemoryUpdate::None
                    }
                }
            }
            CommandKind::Undo => {
                self.history.pop();
                MemoryUpdate::Undone
            }
            CommandKind::SetFreeHandicap(points) => {
                self.push_handicaps(points.iter().copied().map(Some));
                MemoryUpdate::Handicap
            }
            kind if kind.reports_handicap() => {
                let size = self.board_size;
                self.push_handicaps(
                    payload
                        .split_whitespace()
                        .map(|v| Move::from_vertex(v, size).ok().and_then(|mv| mv.point())),
                );
                MemoryUpdate::Handicap
            }
            _ => MemoryUpdate::None,
        }
    }

    /// Append handicap points, stopping at the first one that does not decode.
    fn push_handicaps(&mut self, points: impl Iterator<Item = Option<Point>>) {
        for p in points {
            match p {
                Some(p) if p.is_on_board(self.board_size) => self.handicaps.push(p),
                _ => break,
            }
        }
    }
}
