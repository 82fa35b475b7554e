//! Plain-text rendering for the terminal front end.

use std::fmt::Write as _;

use chrono::Duration;
use client_core::{
    quality::{BestPerformer, GameSummary, QualityCounts},
    SessionView,
};
use shared::domain::{BoardSnapshot, CapturedPieces, Color, MoveCoords, PieceRef, Square};

#[derive(Debug, Default, Clone)]
pub struct Highlights {
    pub selected: Option<Square>,
    pub destinations: Vec<Square>,
    pub last_move: Option<MoveCoords>,
}

/// White at the bottom. `[x]` marks the selection, `*`/`(x)` its
/// destinations, `<x>` the last move.
pub fn board(board: &BoardSnapshot, marks: &Highlights) -> String {
    let mut out = String::new();
    for row in 0..8u8 {
        let _ = write!(out, "{} ", 8 - row);
        for col in 0..8u8 {
            let square = Square::new(row, col);
            let piece = board.piece_at(square).map(PieceRef::symbol);
            let cell = if marks.selected == Some(square) {
                format!("[{}]", piece.unwrap_or(' '))
            } else if marks.destinations.contains(&square) {
                match piece {
                    Some(symbol) => format!("({symbol})"),
                    None => " * ".to_string(),
                }
            } else if marks.last_move.is_some_and(|mv| mv.touches(square)) {
                format!("<{}>", piece.unwrap_or(' '))
            } else {
                format!(" {} ", piece.unwrap_or('.'))
            };
            out.push_str(&cell);
        }
        out.push('\n');
    }
    out.push_str("   a  b  c  d  e  f  g  h\n");
    out
}

pub fn elapsed(duration: Duration) -> String {
    let secs = duration.num_seconds().max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub fn captured(captured: &CapturedPieces) -> String {
    let list = |color: Color| -> String {
        let symbols: String = captured
            .taken_by(color)
            .iter()
            .map(|piece| piece.symbol())
            .collect();
        if symbols.is_empty() {
            "-".to_string()
        } else {
            symbols
        }
    };
    format!(
        "captured by White: {}  captured by Black: {}",
        list(Color::White),
        list(Color::Black)
    )
}

fn counts_line(label: &str, counts: &QualityCounts, accuracy: u32) -> String {
    format!(
        "{label}: accuracy {accuracy}% | excellent {} good {} inaccuracies {} mistakes {} blunders {}",
        counts.excellent, counts.good, counts.inaccuracies, counts.mistakes, counts.blunders
    )
}

pub fn summary(summary: &GameSummary) -> String {
    let best = match summary.best {
        BestPerformer::Color(color) => color.to_string(),
        BestPerformer::Tie => "Tie".to_string(),
    };
    [
        counts_line("White", &summary.white, summary.white_accuracy),
        counts_line("Black", &summary.black, summary.black_accuracy),
        format!("Best performer: {best}"),
    ]
    .join("\n")
}

pub fn view(view: &SessionView, now: chrono::DateTime<chrono::Utc>) -> String {
    let marks = Highlights {
        selected: view.selected,
        destinations: view.valid_moves.clone(),
        last_move: view.last_move,
    };
    let mut out = board(&view.board, &marks);
    if let Some(session) = &view.session {
        let _ = writeln!(
            out,
            "game {} | you: {} | to move: {} | {:?} | {}",
            session.id,
            session.local_color,
            session.current_turn,
            view.phase,
            elapsed(session.elapsed(now))
        );
    } else {
        out.push_str("no game in progress\n");
    }
    let _ = writeln!(out, "{}", captured(&view.captured));
    if !view.move_rounds.is_empty() {
        let _ = writeln!(out, "moves: {}", view.move_rounds.join("  "));
    }
    out
}
