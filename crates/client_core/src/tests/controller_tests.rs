use super::*;
use crate::{
    error::ErrorCategory,
    quality::{BestPerformer, FixedScorer, MoveQuality},
};
use shared::{
    error::ErrorCode,
    protocol::{GameStateResponse, ResignResponse},
};

struct Harness {
    controller: GameSessionController,
    events: broadcast::Receiver<ClientEvent>,
}

impl Harness {
    fn new() -> Self {
        let (tx, events) = broadcast::channel(256);
        Self {
            controller: GameSessionController::new(Box::new(FixedScorer(MoveQuality::Good)), tx),
            events,
        }
    }

    fn drain(&mut self) -> Vec<ClientEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    fn reply(&mut self, request: ApiRequest, reply: ApiReply) -> Vec<Effect> {
        self.controller.on_reply(ApiOutcome {
            request,
            result: Ok(reply),
        })
    }

    fn fail(&mut self, request: ApiRequest, err: ClientError) -> Vec<Effect> {
        self.controller.on_reply(ApiOutcome {
            request,
            result: Err(err),
        })
    }

    fn started(&mut self, id: &str, mode: GameMode) -> Vec<Effect> {
        let effects = self.controller.start(mode, DEFAULT_DIFFICULTY);
        let [Effect::Dispatch(request)] = effects.as_slice() else {
            panic!("start should dispatch one request: {effects:?}");
        };
        self.reply(
            request.clone(),
            ApiReply::Started(StartGameResponse {
                success: true,
                game_id: SessionId::new(id),
                board: BoardSnapshot::standard(),
                next_player: Color::White,
                game_type: Some(mode),
                player_color: Some(Color::White),
            }),
        )
    }

    fn selected(&mut self, from: &str, moves: &[&str]) -> Vec<Effect> {
        let square = sq(from);
        let effects = self.controller.select_square(square);
        assert_eq!(
            effects,
            vec![Effect::Dispatch(ApiRequest::SelectSquare {
                session_id: SessionId::new("g1"),
                square,
            })]
        );
        self.reply(
            ApiRequest::SelectSquare {
                session_id: SessionId::new("g1"),
                square,
            },
            ApiReply::Selection(SelectSquareResponse {
                valid_moves: moves.iter().map(|code| sq(code)).collect(),
                selected: Some(square),
            }),
        )
    }

    fn committed(&mut self, to: &str, response: CommitMoveResponse) -> Vec<Effect> {
        let square = sq(to);
        let effects = self.controller.attempt_move(square);
        assert_eq!(effects, vec![commit_request(square)]);
        self.reply(
            ApiRequest::CommitMove {
                session_id: SessionId::new("g1"),
                square,
            },
            ApiReply::Moved(response),
        )
    }

    fn opponent(&mut self, payload: OpponentMove) -> Vec<Effect> {
        self.controller
            .on_push(&SessionId::new("g1"), Ok(ServerEvent::OpponentMoved(payload)))
    }
}

fn sq(code: &str) -> Square {
    Square::from_algebraic(code).expect("square")
}

fn mv(code: &str) -> MoveCoords {
    let (from, to) = code.split_once('-').expect("dash");
    MoveCoords::new(sq(from), sq(to))
}

fn board_after(moves: &[&str]) -> BoardSnapshot {
    let mut board = BoardSnapshot::standard();
    for code in moves {
        let m = mv(code);
        let piece = board.piece_at(m.initial);
        board.0[usize::from(m.initial.row)][usize::from(m.initial.col)] = None;
        board.0[usize::from(m.destination.row)][usize::from(m.destination.col)] = piece;
    }
    board
}

fn commit_request(square: Square) -> Effect {
    Effect::Dispatch(ApiRequest::CommitMove {
        session_id: SessionId::new("g1"),
        square,
    })
}

fn fetch_state() -> Effect {
    Effect::Dispatch(ApiRequest::FetchState {
        session_id: SessionId::new("g1"),
    })
}

fn commit_response(moves: &[&str], next_player: Color) -> CommitMoveResponse {
    CommitMoveResponse {
        success: true,
        board: board_after(moves),
        last_move: moves.last().map(|code| mv(code)),
        next_player,
        captured_pieces: None,
        game_over: false,
        result: None,
        winner: None,
        can_undo: true,
    }
}

fn opponent_move(moves: &[&str]) -> OpponentMove {
    OpponentMove {
        board: board_after(moves),
        mv: mv(moves.last().expect("at least one move")),
        next_player: Color::White,
        captured_pieces: None,
        can_undo: Some(true),
        game_over: false,
        result: None,
        winner: None,
    }
}

fn play_opening(h: &mut Harness) {
    h.started("g1", GameMode::VsBot);
    h.selected("e2", &["e3", "e4"]);
    h.committed("e4", commit_response(&["e2-e4"], Color::Black));
    h.opponent(opponent_move(&["e2-e4", "e7-e5"]));
}

fn surfaced_errors(events: &[ClientEvent]) -> Vec<SurfacedError> {
    events
        .iter()
        .filter_map(|event| match event {
            ClientEvent::Error(err) => Some(err.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn start_mirrors_server_board_and_joins_push_group() {
    let mut h = Harness::new();
    let effects = h.started("g1", GameMode::VsBot);

    assert_eq!(effects, vec![Effect::JoinPush(SessionId::new("g1"))]);
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingSelection);
    let session = h.controller.session().expect("session");
    assert!(session.is_active);
    assert_eq!(session.current_turn, Color::White);
    assert_eq!(session.difficulty, DEFAULT_DIFFICULTY);
    assert_eq!(*h.controller.board(), BoardSnapshot::standard());
    assert!(h.controller.move_log().is_empty());

    let events = h.drain();
    assert!(events
        .iter()
        .any(|e| matches!(e, ClientEvent::SessionStarted { mode: GameMode::VsBot, .. })));
}

#[test]
fn bot_game_round_trip_logs_both_plies() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);

    let effects = h.selected("e2", &["e3", "e4"]);
    assert_eq!(effects, vec![fetch_state()]);
    assert_eq!(h.controller.phase(), SessionPhase::SquareSelected);
    assert!(h.controller.selection().allows(sq("e4")));

    let effects = h.committed("e4", commit_response(&["e2-e4"], Color::Black));
    assert!(effects.is_empty());
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingOpponent);
    assert!(h.controller.selection().is_empty());
    assert_eq!(h.controller.move_log().notations(), vec!["e2-e4"]);

    let effects = h.opponent(opponent_move(&["e2-e4", "e7-e5"]));
    assert!(effects.is_empty());
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingSelection);
    assert_eq!(
        h.controller.session().map(|s| s.current_turn),
        Some(Color::White)
    );
    assert_eq!(h.controller.move_log().notations(), vec!["e2-e4", "e7-e5"]);
    assert_eq!(h.controller.move_log().rounds(), vec!["1. e2-e4 e7-e5"]);
    assert_eq!(*h.controller.board(), board_after(&["e2-e4", "e7-e5"]));
    assert_eq!(h.controller.tally().counts(Color::Black).good, 1);
    assert!(h.controller.can_undo());
}

#[test]
fn selection_without_destinations_stays_awaiting() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);
    h.drain();

    let effects = h.selected("e1", &[]);
    assert_eq!(effects, vec![fetch_state()]);
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingSelection);
    assert!(h.controller.selection().is_empty());
    assert!(h.controller.attempt_move(sq("e2")).is_empty());
}

#[test]
fn click_commits_only_valid_destinations() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);
    h.selected("e2", &["e3", "e4"]);

    assert!(h.controller.attempt_move(sq("e5")).is_empty());
    assert_eq!(h.controller.phase(), SessionPhase::SquareSelected);

    // A click elsewhere reselects instead of committing.
    assert_eq!(
        h.controller.click(sq("d2")),
        vec![Effect::Dispatch(ApiRequest::SelectSquare {
            session_id: SessionId::new("g1"),
            square: sq("d2"),
        })]
    );
    assert_eq!(h.controller.click(sq("e4")), vec![commit_request(sq("e4"))]);
    assert_eq!(h.controller.undo_depth(), 1);
}

#[test]
fn input_is_ignored_while_opponent_moves() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);
    h.selected("e2", &["e4"]);
    h.committed("e4", commit_response(&["e2-e4"], Color::Black));

    assert!(h.controller.click(sq("d2")).is_empty());
    assert!(h.controller.select_square(sq("e7")).is_empty());
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingOpponent);
}

#[test]
fn declined_commit_resynchronizes_without_touching_the_log() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);
    h.selected("e2", &["e4"]);
    h.controller.attempt_move(sq("e4"));
    assert_eq!(h.controller.undo_depth(), 1);
    h.drain();

    let effects = h.fail(
        ApiRequest::CommitMove {
            session_id: SessionId::new("g1"),
            square: sq("e4"),
        },
        ClientError::declined(ErrorCode::InvalidMove, "Invalid move"),
    );

    assert_eq!(effects, vec![fetch_state()]);
    assert_eq!(h.controller.undo_depth(), 0);
    assert!(h.controller.move_log().is_empty());
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingSelection);
    assert_eq!(*h.controller.board(), BoardSnapshot::standard());
    let errors = surfaced_errors(&h.drain());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].category(), ErrorCategory::Declined);
    assert_eq!(errors[0].message(), "Invalid move");
}

#[test]
fn undelivered_commit_surfaces_retry_message() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);
    h.selected("e2", &["e4"]);
    h.controller.attempt_move(sq("e4"));
    h.drain();

    let effects = h.fail(
        ApiRequest::CommitMove {
            session_id: SessionId::new("g1"),
            square: sq("e4"),
        },
        ClientError::Transport("connection reset".into()),
    );

    assert!(effects.is_empty());
    assert_eq!(*h.controller.board(), BoardSnapshot::standard());
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingSelection);
    let errors = surfaced_errors(&h.drain());
    assert_eq!(errors[0].category(), ErrorCategory::Transport);
    assert_eq!(errors[0].message(), "Failed to make move. Please try again.");
}

#[test]
fn undo_in_bot_mode_drops_both_plies() {
    let mut h = Harness::new();
    play_opening(&mut h);

    assert_eq!(
        h.controller.undo(),
        vec![Effect::Dispatch(ApiRequest::UndoMove {
            session_id: SessionId::new("g1"),
        })]
    );
    h.reply(
        ApiRequest::UndoMove {
            session_id: SessionId::new("g1"),
        },
        ApiReply::Undone(UndoMoveResponse {
            success: true,
            board: BoardSnapshot::standard(),
            next_player: Color::White,
            captured_pieces: None,
            can_undo: false,
        }),
    );

    assert!(h.controller.move_log().is_empty());
    assert_eq!(*h.controller.board(), BoardSnapshot::standard());
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingSelection);
    assert!(!h.controller.can_undo());
    assert!(h.drain().iter().any(|e| matches!(
        e,
        ClientEvent::MoveLogTruncated {
            removed: 2,
            remaining: 0
        }
    )));
}

#[test]
fn undo_in_hot_seat_mode_drops_one_ply_and_follows_server_turn() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsHuman);
    h.selected("e2", &["e4"]);
    h.committed("e4", commit_response(&["e2-e4"], Color::White));
    assert_eq!(h.controller.move_log().len(), 1);

    h.reply(
        ApiRequest::UndoMove {
            session_id: SessionId::new("g1"),
        },
        ApiReply::Undone(UndoMoveResponse {
            success: true,
            board: BoardSnapshot::standard(),
            next_player: Color::White,
            captured_pieces: None,
            can_undo: false,
        }),
    );
    assert!(h.controller.move_log().is_empty());

    // Saturates on an already empty log.
    h.reply(
        ApiRequest::UndoMove {
            session_id: SessionId::new("g1"),
        },
        ApiReply::Undone(UndoMoveResponse {
            success: true,
            board: BoardSnapshot::standard(),
            next_player: Color::Black,
            captured_pieces: None,
            can_undo: false,
        }),
    );
    assert!(h.controller.move_log().is_empty());
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingOpponent);
}

#[test]
fn resign_requires_confirmation_then_ends_the_game() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);
    h.drain();

    assert!(h.controller.resign(false).is_empty());
    assert!(h
        .drain()
        .iter()
        .any(|e| matches!(e, ClientEvent::ResignConfirmationRequired)));
    assert!(h.controller.session().is_some_and(|s| s.is_active));

    let request = ApiRequest::Resign {
        session_id: SessionId::new("g1"),
    };
    assert_eq!(
        h.controller.resign(true),
        vec![Effect::Dispatch(request.clone())]
    );
    let effects = h.reply(
        request,
        ApiReply::Resigned(ResignResponse {
            success: true,
            winner: Winner::Black,
            result: Some(GameResult::Resignation),
        }),
    );

    assert_eq!(effects, vec![Effect::LeavePush(SessionId::new("g1"))]);
    assert_eq!(h.controller.phase(), SessionPhase::GameOver);
    assert!(h.controller.session().is_some_and(|s| !s.is_active));
    let view = h.controller.view();
    assert_eq!(
        view.outcome.map(|o| o.headline()),
        Some("Resignation! Black Wins!".to_string())
    );
    assert!(h.controller.undo().is_empty());
}

#[test]
fn checkmate_from_commit_blocks_further_input() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);
    h.selected("e2", &["e4"]);
    h.drain();

    let mut response = commit_response(&["e2-e4"], Color::Black);
    response.game_over = true;
    response.result = Some(GameResult::Checkmate);
    response.winner = Some(Winner::White);
    let effects = h.committed("e4", response);

    assert_eq!(effects, vec![Effect::LeavePush(SessionId::new("g1"))]);
    assert_eq!(h.controller.phase(), SessionPhase::GameOver);
    assert!(h.controller.click(sq("d2")).is_empty());
    assert!(h.controller.refresh().is_empty());

    let summary = h
        .drain()
        .into_iter()
        .find_map(|e| match e {
            ClientEvent::GameOver { summary, outcome } => {
                assert_eq!(outcome.headline(), "Checkmate! White Wins!");
                Some(summary)
            }
            _ => None,
        })
        .expect("game over event");
    assert_eq!(summary.white.good, 1);
    assert_eq!(summary.white_accuracy, 80);
    assert_eq!(summary.best, BestPerformer::Color(Color::White));
}

#[test]
fn opponent_checkmate_ends_the_game() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);
    h.selected("f2", &["f3"]);
    h.committed("f3", commit_response(&["f2-f3"], Color::Black));

    let mut payload = opponent_move(&["f2-f3", "e7-e5"]);
    payload.game_over = true;
    payload.result = Some(GameResult::Checkmate);
    payload.winner = Some(Winner::Black);
    let effects = h.opponent(payload);

    assert_eq!(effects, vec![Effect::LeavePush(SessionId::new("g1"))]);
    assert_eq!(h.controller.phase(), SessionPhase::GameOver);
    assert_eq!(h.controller.move_log().len(), 2);
}

#[test]
fn restarting_leaves_old_group_and_drops_its_traffic() {
    let mut h = Harness::new();
    play_opening(&mut h);

    let effects = h.started("g2", GameMode::VsBot);
    assert_eq!(
        effects,
        vec![
            Effect::LeavePush(SessionId::new("g1")),
            Effect::JoinPush(SessionId::new("g2")),
        ]
    );
    assert!(h.controller.move_log().is_empty());
    assert_eq!(h.controller.undo_depth(), 0);

    let late_push = h.opponent(opponent_move(&["e2-e4", "e7-e5", "d2-d4"]));
    assert!(late_push.is_empty());
    assert_eq!(*h.controller.board(), BoardSnapshot::standard());

    let late_reply = h.reply(
        ApiRequest::FetchState {
            session_id: SessionId::new("g1"),
        },
        ApiReply::State(GameStateResponse {
            board: board_after(&["e2-e4"]),
            next_player: Some(Color::Black),
            captured_pieces: None,
            game_type: Some(GameMode::VsBot),
            can_undo: true,
            last_move: Some(mv("e2-e4")),
        }),
    );
    assert!(late_reply.is_empty());
    assert_eq!(*h.controller.board(), BoardSnapshot::standard());
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingSelection);
}

#[test]
fn declined_select_clears_selection_and_refreshes() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);
    h.selected("e2", &["e4"]);

    let effects = h.fail(
        ApiRequest::SelectSquare {
            session_id: SessionId::new("g1"),
            square: sq("d7"),
        },
        ClientError::declined(ErrorCode::Validation, "Not your piece"),
    );
    assert_eq!(effects, vec![fetch_state()]);
    assert!(h.controller.selection().is_empty());
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingSelection);
}

#[test]
fn refetch_after_selection_updates_board_and_last_move_only() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);

    h.reply(
        ApiRequest::FetchState {
            session_id: SessionId::new("g1"),
        },
        ApiReply::State(GameStateResponse {
            board: board_after(&["e2-e4"]),
            next_player: Some(Color::Black),
            captured_pieces: None,
            game_type: None,
            can_undo: true,
            last_move: Some(mv("e2-e4")),
        }),
    );

    let view = h.controller.view();
    assert_eq!(view.board, board_after(&["e2-e4"]));
    assert_eq!(view.last_move, Some(mv("e2-e4")));
    assert_eq!(view.current_turn(), Some(Color::White));
    assert!(!view.can_undo);
}

#[test]
fn explicit_refresh_applies_turn_captures_and_undo_flag() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsHuman);
    h.selected("e2", &["e4"]);

    let resync = ApiRequest::Resync {
        session_id: SessionId::new("g1"),
    };
    assert_eq!(h.controller.refresh(), vec![Effect::Dispatch(resync.clone())]);
    let captured = CapturedPieces {
        white: Vec::new(),
        black: vec![shared::domain::PieceRef::new(
            Color::White,
            shared::domain::PieceKind::Pawn,
        )],
    };
    let effects = h.reply(
        resync,
        ApiReply::State(GameStateResponse {
            board: board_after(&["e2-e4"]),
            next_player: Some(Color::Black),
            captured_pieces: Some(captured.clone()),
            game_type: Some(GameMode::VsHuman),
            can_undo: true,
            last_move: Some(mv("e2-e4")),
        }),
    );

    assert!(effects.is_empty());
    let view = h.controller.view();
    assert_eq!(view.board, board_after(&["e2-e4"]));
    assert_eq!(view.current_turn(), Some(Color::Black));
    assert_eq!(view.captured, captured);
    assert!(view.can_undo);
    assert!(view.selected.is_none());
    assert_eq!(view.phase, SessionPhase::AwaitingOpponent);
}

#[test]
fn remote_move_ahead_of_commit_reply_is_resynchronized() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);
    h.selected("e2", &["e3", "e4"]);
    assert_eq!(h.controller.attempt_move(sq("e4")), vec![commit_request(sq("e4"))]);

    h.opponent(opponent_move(&["e2-e4", "e7-e5"]));
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingSelection);

    let effects = h.reply(
        ApiRequest::CommitMove {
            session_id: SessionId::new("g1"),
            square: sq("e4"),
        },
        ApiReply::Moved(commit_response(&["e2-e4"], Color::Black)),
    );
    let resync = ApiRequest::Resync {
        session_id: SessionId::new("g1"),
    };
    assert_eq!(effects, vec![Effect::Dispatch(resync.clone())]);
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingOpponent);
    assert!(h.controller.select_square(sq("d2")).is_empty());

    h.reply(
        resync,
        ApiReply::State(GameStateResponse {
            board: board_after(&["e2-e4", "e7-e5"]),
            next_player: Some(Color::White),
            captured_pieces: None,
            game_type: Some(GameMode::VsBot),
            can_undo: true,
            last_move: Some(mv("e7-e5")),
        }),
    );

    let view = h.controller.view();
    assert_eq!(view.phase, SessionPhase::AwaitingSelection);
    assert_eq!(view.current_turn(), Some(Color::White));
    assert_eq!(view.board, board_after(&["e2-e4", "e7-e5"]));
    assert_eq!(view.move_log.len(), 2);
    assert!(!h.controller.select_square(sq("d2")).is_empty());
}

#[test]
fn commit_reply_in_order_does_not_resync() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);
    h.selected("e2", &["e4"]);
    let effects = h.committed("e4", commit_response(&["e2-e4"], Color::Black));
    assert!(effects.is_empty());
    assert!(h.opponent(opponent_move(&["e2-e4", "e7-e5"])).is_empty());
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingSelection);
}

#[test]
fn off_board_commit_move_is_reported_and_not_logged() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);
    h.selected("e2", &["e4"]);
    h.drain();

    let mut response = commit_response(&["e2-e4"], Color::Black);
    response.last_move = Some(MoveCoords::new(sq("e2"), Square::new(4, 200)));
    let effects = h.committed("e4", response);

    assert!(effects.is_empty());
    assert!(h.controller.move_log().is_empty());
    let view = h.controller.view();
    assert_eq!(view.last_move, None);
    assert_eq!(view.board, board_after(&["e2-e4"]));
    assert_eq!(view.phase, SessionPhase::AwaitingOpponent);
    let errors = surfaced_errors(&h.drain());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].category(), ErrorCategory::Protocol);
}

#[test]
fn off_board_remote_move_still_hands_the_turn_back() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);
    h.selected("e2", &["e4"]);
    h.committed("e4", commit_response(&["e2-e4"], Color::Black));
    h.drain();

    let mut payload = opponent_move(&["e2-e4", "e7-e5"]);
    payload.mv = MoveCoords::new(Square::new(255, 4), sq("e5"));
    h.opponent(payload);

    assert_eq!(h.controller.move_log().len(), 1);
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingSelection);
    assert_eq!(*h.controller.board(), board_after(&["e2-e4", "e7-e5"]));
    let errors = surfaced_errors(&h.drain());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].category(), ErrorCategory::Protocol);
}

#[test]
fn pushed_state_replaces_board_turn_and_captures() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsHuman);
    h.selected("e2", &["e4"]);

    let captured = CapturedPieces {
        white: vec![shared::domain::PieceRef::new(
            Color::Black,
            shared::domain::PieceKind::Pawn,
        )],
        black: Vec::new(),
    };
    h.controller.on_push(
        &SessionId::new("g1"),
        Ok(ServerEvent::GameState {
            board: board_after(&["e2-e4"]),
            next_player: Color::Black,
            captured_pieces: Some(captured.clone()),
        }),
    );

    assert_eq!(*h.controller.board(), board_after(&["e2-e4"]));
    assert_eq!(*h.controller.captured(), captured);
    assert!(h.controller.selection().is_empty());
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingOpponent);
}

#[test]
fn push_channel_errors_are_surfaced() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);
    h.drain();

    h.controller.on_push(
        &SessionId::new("g1"),
        Ok(ServerEvent::Error {
            message: "Game not found".into(),
        }),
    );
    h.controller.on_push(
        &SessionId::new("g1"),
        Err(ClientError::PushChannel("connection closed".into())),
    );

    let errors = surfaced_errors(&h.drain());
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].message(), "Game not found");
    assert_eq!(errors[1].category(), ErrorCategory::Transport);
    assert_eq!(errors[1].message(), "Connection error");
}

#[test]
fn game_ready_and_unrecognized_pushes_are_ignored() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsHuman);
    h.drain();

    let ready = h.controller.on_push(
        &SessionId::new("g1"),
        Ok(ServerEvent::GameReady {
            board: BoardSnapshot::standard(),
        }),
    );
    let unknown = h
        .controller
        .on_push(&SessionId::new("g1"), Ok(ServerEvent::Unknown));

    assert!(ready.is_empty());
    assert!(unknown.is_empty());
    assert!(h.drain().is_empty());
    assert_eq!(h.controller.phase(), SessionPhase::AwaitingSelection);
}

#[test]
fn failed_start_stays_idle() {
    let mut h = Harness::new();
    let effects = h.fail(
        ApiRequest::StartSession {
            mode: GameMode::VsBot,
            difficulty: 3,
        },
        ClientError::Transport("refused".into()),
    );

    assert!(effects.is_empty());
    assert_eq!(h.controller.phase(), SessionPhase::Idle);
    assert!(h.controller.session().is_none());
    let errors = surfaced_errors(&h.drain());
    assert_eq!(errors[0].message(), "Failed to start game. Please try again.");
}

#[test]
fn pushes_after_game_over_are_ignored() {
    let mut h = Harness::new();
    h.started("g1", GameMode::VsBot);
    h.controller.resign(true);
    h.reply(
        ApiRequest::Resign {
            session_id: SessionId::new("g1"),
        },
        ApiReply::Resigned(ResignResponse {
            success: true,
            winner: Winner::Black,
            result: None,
        }),
    );
    h.drain();

    let effects = h.opponent(opponent_move(&["e2-e4", "e7-e5"]));
    assert!(effects.is_empty());
    assert!(h.drain().is_empty());
    assert_eq!(h.controller.phase(), SessionPhase::GameOver);
    assert_eq!(*h.controller.board(), BoardSnapshot::standard());
    assert!(h.controller.move_log().is_empty());
}
