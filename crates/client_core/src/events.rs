//! Notifications broadcast to whatever front end renders the session.

use shared::domain::{
    BoardSnapshot, CapturedPieces, Color, GameMode, GameResult, MoveCoords, SessionId, Square,
    Winner,
};

use crate::{
    error::SurfacedError,
    quality::{GameSummary, MoveQuality},
    session::SessionPhase,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOutcome {
    pub result: Option<GameResult>,
    pub winner: Option<Winner>,
}

impl GameOutcome {
    pub fn headline(&self) -> String {
        let winner = self.winner.and_then(Winner::color);
        match (self.result, winner) {
            (Some(GameResult::Checkmate), Some(color)) => format!("Checkmate! {color} Wins!"),
            (Some(GameResult::Stalemate), _) => "Stalemate - Draw!".to_string(),
            (Some(GameResult::Resignation), Some(color)) => {
                format!("Resignation! {color} Wins!")
            }
            _ => "Game Over".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    SessionStarted {
        session_id: SessionId,
        mode: GameMode,
        local_color: Color,
    },
    BoardUpdated {
        board: BoardSnapshot,
        last_move: Option<MoveCoords>,
    },
    SelectionChanged {
        selected: Option<Square>,
        valid_moves: Vec<Square>,
    },
    PhaseChanged {
        phase: SessionPhase,
        current_turn: Option<Color>,
    },
    CapturedUpdated(CapturedPieces),
    MoveLogged {
        ply: usize,
        mover: Color,
        notation: String,
        quality: MoveQuality,
    },
    MoveLogTruncated {
        removed: usize,
        remaining: usize,
    },
    UndoAvailability(bool),
    Status(String),
    ResignConfirmationRequired,
    GameOver {
        outcome: GameOutcome,
        summary: GameSummary,
    },
    Error(SurfacedError),
}
