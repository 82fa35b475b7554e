//! Local mirror of one server-owned game.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use shared::domain::{BoardSnapshot, Color, GameMode, MoveCoords, SessionId, Square};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    AwaitingSelection,
    SquareSelected,
    AwaitingOpponent,
    GameOver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    pub id: SessionId,
    pub is_active: bool,
    pub local_color: Color,
    pub mode: GameMode,
    pub current_turn: Color,
    pub difficulty: u8,
    pub started_at: DateTime<Utc>,
}

impl GameSession {
    pub fn new(id: SessionId, mode: GameMode, difficulty: u8, local_color: Color, turn: Color) -> Self {
        Self {
            id,
            is_active: true,
            local_color,
            mode,
            current_turn: turn,
            difficulty,
            started_at: Utc::now(),
        }
    }

    pub fn is_local_turn(&self) -> bool {
        self.current_turn == self.local_color
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at).max(Duration::zero())
    }

    /// Phase implied by whose turn it is, ignoring any selection.
    pub fn turn_phase(&self) -> SessionPhase {
        if !self.is_active {
            SessionPhase::GameOver
        } else if self.is_local_turn() {
            SessionPhase::AwaitingSelection
        } else {
            SessionPhase::AwaitingOpponent
        }
    }
}

/// The selected square and the destinations the server allowed for it.
///
/// Never holds a selection without at least one destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: Option<Square>,
    valid_moves: BTreeSet<Square>,
}

impl SelectionState {
    pub fn replace(&mut self, selected: Square, moves: impl IntoIterator<Item = Square>) {
        self.valid_moves = moves.into_iter().filter(|sq| sq.is_on_board()).collect();
        self.selected = (!self.valid_moves.is_empty()).then_some(selected);
    }

    pub fn clear(&mut self) {
        self.selected = None;
        self.valid_moves.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_none()
    }

    pub fn selected(&self) -> Option<Square> {
        self.selected
    }

    pub fn valid_moves(&self) -> impl Iterator<Item = Square> + '_ {
        self.valid_moves.iter().copied()
    }

    pub fn allows(&self, destination: Square) -> bool {
        self.selected.is_some() && self.valid_moves.contains(&destination)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveLogEntry {
    pub mover: Color,
    pub mv: MoveCoords,
}

impl MoveLogEntry {
    pub fn notation(&self) -> String {
        self.mv.to_string()
    }
}

/// One entry per ply. Only undo removes entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveLog {
    entries: Vec<MoveLogEntry>,
}

impl MoveLog {
    pub fn push(&mut self, mover: Color, mv: MoveCoords) -> usize {
        self.entries.push(MoveLogEntry { mover, mv });
        self.entries.len()
    }

    /// Drops up to `plies` trailing entries and returns how many were removed.
    pub fn truncate_last(&mut self, plies: usize) -> usize {
        let removed = plies.min(self.entries.len());
        self.entries.truncate(self.entries.len() - removed);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn notations(&self) -> Vec<String> {
        self.entries.iter().map(MoveLogEntry::notation).collect()
    }

    /// Numbered rounds, e.g. `1. e2-e4 e7-e5`.
    pub fn rounds(&self) -> Vec<String> {
        self.entries
            .chunks(2)
            .enumerate()
            .map(|(idx, pair)| {
                let plies: Vec<String> = pair.iter().map(MoveLogEntry::notation).collect();
                format!("{}. {}", idx + 1, plies.join(" "))
            })
            .collect()
    }
}

/// Boards captured before each local move attempt.
#[derive(Debug, Clone, Default)]
pub struct UndoHistory {
    snapshots: Vec<BoardSnapshot>,
}

impl UndoHistory {
    pub fn push(&mut self, board: BoardSnapshot) {
        self.snapshots.push(board);
    }

    pub fn pop(&mut self) -> Option<BoardSnapshot> {
        self.snapshots.pop()
    }

    pub fn depth(&self) -> usize {
        self.snapshots.len()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}
