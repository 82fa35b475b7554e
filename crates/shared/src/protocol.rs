use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    BoardSnapshot, CapturedPieces, Color, GameMode, GameResult, MoveCoords, SessionId, Square,
    Winner,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartGameRequest {
    #[serde(rename = "type")]
    pub mode: GameMode,
    pub difficulty: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartGameResponse {
    #[serde(default)]
    pub success: bool,
    pub game_id: SessionId,
    pub board: BoardSnapshot,
    pub next_player: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_type: Option<GameMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_color: Option<Color>,
}

/// Body shared by the square-addressed calls (select and commit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquareRequest {
    pub game_id: SessionId,
    pub row: u8,
    pub col: u8,
}

impl SquareRequest {
    pub fn new(game_id: SessionId, square: Square) -> Self {
        Self {
            game_id,
            row: square.row,
            col: square.col,
        }
    }

    pub fn square(&self) -> Square {
        Square::new(self.row, self.col)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRequest {
    pub game_id: SessionId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectSquareResponse {
    #[serde(default)]
    pub valid_moves: Vec<Square>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<Square>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitMoveResponse {
    #[serde(default)]
    pub success: bool,
    pub board: BoardSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_move: Option<MoveCoords>,
    pub next_player: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_pieces: Option<CapturedPieces>,
    #[serde(default)]
    pub game_over: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GameResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
    #[serde(default)]
    pub can_undo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoMoveResponse {
    #[serde(default)]
    pub success: bool,
    pub board: BoardSnapshot,
    pub next_player: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_pieces: Option<CapturedPieces>,
    #[serde(default)]
    pub can_undo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResignResponse {
    #[serde(default)]
    pub success: bool,
    pub winner: Winner,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GameResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStateResponse {
    pub board: BoardSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_player: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_pieces: Option<CapturedPieces>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_type: Option<GameMode>,
    #[serde(default)]
    pub can_undo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_move: Option<MoveCoords>,
}

/// Uplink frames on the push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientRequest {
    JoinGame { game_id: SessionId },
    LeaveGame { game_id: SessionId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpponentMove {
    pub board: BoardSnapshot,
    #[serde(rename = "move", alias = "bot_move")]
    pub mv: MoveCoords,
    pub next_player: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_pieces: Option<CapturedPieces>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_undo: Option<bool>,
    #[serde(default)]
    pub game_over: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GameResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
}

/// Unsolicited downlink frames on the push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    OpponentMoved(OpponentMove),
    GameState {
        board: BoardSnapshot,
        next_player: Color,
        #[serde(default)]
        captured_pieces: Option<CapturedPieces>,
    },
    PlayerJoined {
        color: Color,
        player: String,
    },
    PlayerLeft {
        player: String,
    },
    Error {
        message: String,
    },
    /// Second seat filled; carries the board as the game begins.
    GameReady {
        board: BoardSnapshot,
    },
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    const KNOWN_TYPES: [&'static str; 6] = [
        "opponent_moved",
        "game_state",
        "player_joined",
        "player_left",
        "error",
        "game_ready",
    ];

    /// Parses one downlink text frame. Frames whose `type` this client does
    /// not know decode to [`ServerEvent::Unknown`] whatever their payload.
    pub fn from_frame(text: &str) -> serde_json::Result<Self> {
        let frame: Value = serde_json::from_str(text)?;
        match frame.get("type").and_then(Value::as_str) {
            Some(kind) if !Self::KNOWN_TYPES.contains(&kind) => Ok(Self::Unknown),
            _ => serde_json::from_value(frame),
        }
    }
}
