use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque server-issued game identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::White => "White",
            Self::Black => "Black",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

/// A piece as the server reports it. The server also sends a `moved` flag
/// which the client has no use for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PieceRef {
    pub color: Color,
    #[serde(rename = "name")]
    pub kind: PieceKind,
}

impl PieceRef {
    pub fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    /// Single-letter symbol, uppercase for white.
    pub fn symbol(self) -> char {
        let c = match self.kind {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        };
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    #[serde(rename = "bot")]
    VsBot,
    #[serde(rename = "pvp")]
    VsHuman,
}

impl GameMode {
    /// Plies rewound from the local move log by one accepted undo.
    pub fn undo_plies(self) -> usize {
        match self {
            Self::VsBot => 2,
            Self::VsHuman => 1,
        }
    }
}

/// Zero-based board coordinate, row 0 being black's back rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Square {
    pub row: u8,
    pub col: u8,
}

impl Square {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    pub fn checked(row: u8, col: u8) -> Option<Self> {
        (row < 8 && col < 8).then_some(Self { row, col })
    }

    pub fn is_on_board(self) -> bool {
        self.row < 8 && self.col < 8
    }

    /// Parses a square code such as `e2`.
    pub fn from_algebraic(code: &str) -> Option<Self> {
        let mut chars = code.trim().chars();
        let file = chars.next()?.to_ascii_lowercase();
        let rank = chars.next()?.to_digit(10)?;
        if chars.next().is_some() || !('a'..='h').contains(&file) || !(1..=8).contains(&rank) {
            return None;
        }
        Self::checked(8 - rank as u8, file as u8 - b'a')
    }
}

/// Algebraic code for on-board squares, raw `(row,col)` otherwise.
impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_on_board() {
            return write!(f, "({},{})", self.row, self.col);
        }
        let file = char::from(b'a' + self.col);
        write!(f, "{file}{}", 8 - self.row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCoords {
    pub initial: Square,
    #[serde(rename = "final")]
    pub destination: Square,
}

impl MoveCoords {
    pub fn new(initial: Square, destination: Square) -> Self {
        Self {
            initial,
            destination,
        }
    }

    pub fn is_on_board(&self) -> bool {
        self.initial.is_on_board() && self.destination.is_on_board()
    }

    pub fn touches(&self, square: Square) -> bool {
        self.initial == square || self.destination == square
    }
}

impl fmt::Display for MoveCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.initial, self.destination)
    }
}

/// Full 8x8 board as last reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardSnapshot(pub [[Option<PieceRef>; 8]; 8]);

impl Default for BoardSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoardSnapshot {
    pub fn empty() -> Self {
        Self([[None; 8]; 8])
    }

    pub fn piece_at(&self, square: Square) -> Option<PieceRef> {
        self.0
            .get(usize::from(square.row))
            .and_then(|row| row.get(usize::from(square.col)))
            .copied()
            .flatten()
    }

    pub fn piece_count(&self) -> usize {
        self.0.iter().flatten().filter(|cell| cell.is_some()).count()
    }

    /// Standard starting position, white at the bottom.
    pub fn standard() -> Self {
        use PieceKind::*;
        const BACK: [PieceKind; 8] = [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook];
        let mut board = Self::empty();
        for col in 0..8 {
            board.0[0][col] = Some(PieceRef::new(Color::Black, BACK[col]));
            board.0[1][col] = Some(PieceRef::new(Color::Black, Pawn));
            board.0[6][col] = Some(PieceRef::new(Color::White, Pawn));
            board.0[7][col] = Some(PieceRef::new(Color::White, BACK[col]));
        }
        board
    }
}

/// Pieces taken by each side, in capture order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPieces {
    #[serde(default)]
    pub white: Vec<PieceRef>,
    #[serde(default)]
    pub black: Vec<PieceRef>,
}

impl CapturedPieces {
    pub fn taken_by(&self, color: Color) -> &[PieceRef] {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.white.is_empty() && self.black.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Checkmate,
    Stalemate,
    Resignation,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    White,
    Black,
    Draw,
}

impl Winner {
    pub fn color(self) -> Option<Color> {
        match self {
            Self::White => Some(Color::White),
            Self::Black => Some(Color::Black),
            Self::Draw => None,
        }
    }
}
