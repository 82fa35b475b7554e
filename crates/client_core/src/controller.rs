//! Client game session controller.
//!
//! A synchronous state machine: it consumes user commands, request
//! completions and push events, mutates the local mirror, and returns the
//! [`Effect`]s (calls to make, push groups to join or leave) for its driver to
//! carry out. It never predicts board changes; every board, turn and capture
//! list it holds came from the server.

use shared::{
    domain::{
        BoardSnapshot, CapturedPieces, Color, GameMode, GameResult, MoveCoords, SessionId, Square,
        Winner,
    },
    protocol::{
        CommitMoveResponse, GameStateResponse, OpponentMove, SelectSquareResponse, ServerEvent,
        StartGameResponse, UndoMoveResponse,
    },
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    error::{ClientError, ErrorContext, SurfacedError},
    events::{ClientEvent, GameOutcome},
    quality::{MoveQualityTally, MoveScorer},
    session::{GameSession, MoveLog, SelectionState, SessionPhase, UndoHistory},
    transport::{ApiReply, ApiRequest, ApiResult},
};

pub const DEFAULT_DIFFICULTY: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    StartGame { mode: GameMode, difficulty: u8 },
    Click(Square),
    SelectSquare(Square),
    AttemptMove(Square),
    Undo,
    Resign { confirmed: bool },
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Dispatch(ApiRequest),
    JoinPush(SessionId),
    LeavePush(SessionId),
}

/// A finished call, paired with the request that produced it.
#[derive(Debug, Clone)]
pub struct ApiOutcome {
    pub request: ApiRequest,
    pub result: ApiResult<ApiReply>,
}

/// Read-only copy of the mirror for front ends and tests.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub session: Option<GameSession>,
    pub board: BoardSnapshot,
    pub last_move: Option<MoveCoords>,
    pub selected: Option<Square>,
    pub valid_moves: Vec<Square>,
    pub captured: CapturedPieces,
    pub move_log: Vec<String>,
    pub move_rounds: Vec<String>,
    pub tally: MoveQualityTally,
    pub can_undo: bool,
    pub undo_depth: usize,
    pub outcome: Option<GameOutcome>,
}

impl SessionView {
    pub fn current_turn(&self) -> Option<Color> {
        self.session.as_ref().map(|session| session.current_turn)
    }
}

pub struct GameSessionController {
    session: Option<GameSession>,
    phase: SessionPhase,
    board: BoardSnapshot,
    last_move: Option<MoveCoords>,
    selection: SelectionState,
    captured: CapturedPieces,
    move_log: MoveLog,
    tally: MoveQualityTally,
    undo_history: UndoHistory,
    can_undo: bool,
    outcome: Option<GameOutcome>,
    pending_commits: usize,
    /// A remote move was applied while a local commit was still in flight.
    commit_overtaken: bool,
    scorer: Box<dyn MoveScorer>,
    events: broadcast::Sender<ClientEvent>,
}

impl GameSessionController {
    pub fn new(scorer: Box<dyn MoveScorer>, events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            session: None,
            phase: SessionPhase::Idle,
            board: BoardSnapshot::empty(),
            last_move: None,
            selection: SelectionState::default(),
            captured: CapturedPieces::default(),
            move_log: MoveLog::default(),
            tally: MoveQualityTally::default(),
            undo_history: UndoHistory::default(),
            can_undo: false,
            outcome: None,
            pending_commits: 0,
            commit_overtaken: false,
            scorer,
            events,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn board(&self) -> &BoardSnapshot {
        &self.board
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn captured(&self) -> &CapturedPieces {
        &self.captured
    }

    pub fn move_log(&self) -> &MoveLog {
        &self.move_log
    }

    pub fn tally(&self) -> &MoveQualityTally {
        &self.tally
    }

    pub fn can_undo(&self) -> bool {
        self.can_undo
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_history.depth()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            phase: self.phase,
            session: self.session.clone(),
            board: self.board,
            last_move: self.last_move,
            selected: self.selection.selected(),
            valid_moves: self.selection.valid_moves().collect(),
            captured: self.captured.clone(),
            move_log: self.move_log.notations(),
            move_rounds: self.move_log.rounds(),
            tally: self.tally,
            can_undo: self.can_undo,
            undo_depth: self.undo_history.depth(),
            outcome: self.outcome.clone(),
        }
    }

    pub fn handle_command(&mut self, command: UserCommand) -> Vec<Effect> {
        match command {
            UserCommand::StartGame { mode, difficulty } => self.start(mode, difficulty),
            UserCommand::Click(square) => self.click(square),
            UserCommand::SelectSquare(square) => self.select_square(square),
            UserCommand::AttemptMove(square) => self.attempt_move(square),
            UserCommand::Undo => self.undo(),
            UserCommand::Resign { confirmed } => self.resign(confirmed),
            UserCommand::Refresh => self.refresh(),
        }
    }

    pub fn start(&mut self, mode: GameMode, difficulty: u8) -> Vec<Effect> {
        vec![Effect::Dispatch(ApiRequest::StartSession { mode, difficulty })]
    }

    /// Commits when the square is a destination of the current selection,
    /// otherwise (re)selects.
    pub fn click(&mut self, square: Square) -> Vec<Effect> {
        if self.selection.allows(square) {
            self.attempt_move(square)
        } else {
            self.select_square(square)
        }
    }

    pub fn select_square(&mut self, square: Square) -> Vec<Effect> {
        let Some(session_id) = self.local_turn_session() else {
            debug!(%square, phase = ?self.phase, "select ignored outside local turn");
            return Vec::new();
        };
        if !square.is_on_board() {
            return Vec::new();
        }
        vec![Effect::Dispatch(ApiRequest::SelectSquare { session_id, square })]
    }

    pub fn attempt_move(&mut self, square: Square) -> Vec<Effect> {
        let Some(session_id) = self.local_turn_session() else {
            debug!(%square, phase = ?self.phase, "move ignored outside local turn");
            return Vec::new();
        };
        if !self.selection.allows(square) {
            debug!(%square, "move ignored: not a valid destination");
            return Vec::new();
        }

        self.undo_history.push(self.board);
        self.pending_commits += 1;
        self.clear_selection();
        self.set_phase(SessionPhase::AwaitingSelection);
        vec![Effect::Dispatch(ApiRequest::CommitMove { session_id, square })]
    }

    pub fn undo(&mut self) -> Vec<Effect> {
        let Some(session_id) = self.active_session_id() else {
            self.status("No active game");
            return Vec::new();
        };
        vec![Effect::Dispatch(ApiRequest::UndoMove { session_id })]
    }

    pub fn resign(&mut self, confirmed: bool) -> Vec<Effect> {
        let Some(session_id) = self.active_session_id() else {
            self.status("No active game to resign");
            return Vec::new();
        };
        if !confirmed {
            self.emit(ClientEvent::ResignConfirmationRequired);
            return Vec::new();
        }
        vec![Effect::Dispatch(ApiRequest::Resign { session_id })]
    }

    pub fn refresh(&mut self) -> Vec<Effect> {
        match self.active_session_id() {
            Some(session_id) => vec![Effect::Dispatch(ApiRequest::Resync { session_id })],
            None => Vec::new(),
        }
    }

    pub fn on_reply(&mut self, outcome: ApiOutcome) -> Vec<Effect> {
        let ApiOutcome { request, result } = outcome;
        if let Some(session_id) = request.session_id() {
            if !self.is_current_active(session_id) {
                debug!(
                    %session_id,
                    request = request.name(),
                    "dropping reply for inactive session"
                );
                return Vec::new();
            }
        }

        match (request, result) {
            (ApiRequest::StartSession { mode, difficulty }, Ok(ApiReply::Started(resp))) => {
                self.apply_started(mode, difficulty, resp)
            }
            (ApiRequest::SelectSquare { session_id, square }, Ok(ApiReply::Selection(resp))) => {
                self.apply_selection(session_id, square, resp)
            }
            (ApiRequest::SelectSquare { session_id, .. }, Err(err)) if err.is_declined() => {
                debug!(%session_id, "select declined: {err}");
                self.clear_selection();
                self.settle_turn_phase();
                vec![Effect::Dispatch(ApiRequest::FetchState { session_id })]
            }
            (ApiRequest::CommitMove { .. }, Ok(ApiReply::Moved(resp))) => self.apply_commit(resp),
            (ApiRequest::CommitMove { session_id, .. }, Err(err)) => {
                self.reject_commit(session_id, err)
            }
            (ApiRequest::UndoMove { .. }, Ok(ApiReply::Undone(resp))) => self.apply_undo(resp),
            (ApiRequest::Resign { .. }, Ok(ApiReply::Resigned(resp))) => {
                let result = resp.result.unwrap_or(GameResult::Resignation);
                self.status("You resigned the game");
                self.finish(Some(result), Some(resp.winner))
            }
            (ApiRequest::FetchState { .. }, Ok(ApiReply::State(resp))) => {
                self.board = resp.board;
                self.last_move = self.on_board_move(resp.last_move);
                self.emit_board();
                Vec::new()
            }
            (ApiRequest::Resync { .. }, Ok(ApiReply::State(resp))) => self.apply_resync(resp),
            (request, Err(err)) => {
                let context = match request {
                    ApiRequest::StartSession { .. } => ErrorContext::StartGame,
                    ApiRequest::SelectSquare { .. } => ErrorContext::SelectSquare,
                    ApiRequest::CommitMove { .. } => ErrorContext::CommitMove,
                    ApiRequest::UndoMove { .. } => ErrorContext::Undo,
                    ApiRequest::Resign { .. } => ErrorContext::Resign,
                    ApiRequest::FetchState { .. } | ApiRequest::Resync { .. } => {
                        ErrorContext::Sync
                    }
                };
                warn!(request = request.name(), "request failed: {err}");
                self.surface(context, &err);
                Vec::new()
            }
            (request, Ok(_)) => {
                warn!(request = request.name(), "reply does not match request");
                Vec::new()
            }
        }
    }

    pub fn on_push(
        &mut self,
        session_id: &SessionId,
        item: Result<ServerEvent, ClientError>,
    ) -> Vec<Effect> {
        if !self.is_current_active(session_id) {
            debug!(%session_id, "dropping stale push notification");
            return Vec::new();
        }

        match item {
            Ok(ServerEvent::OpponentMoved(payload)) => self.on_remote_move(payload),
            Ok(ServerEvent::GameState {
                board,
                next_player,
                captured_pieces,
            }) => {
                self.apply_authoritative(board, self.last_move, next_player, captured_pieces);
                self.settle_turn_phase();
                Vec::new()
            }
            Ok(ServerEvent::PlayerJoined { color, player }) => {
                self.status(format!("{player} joined as {color}"));
                Vec::new()
            }
            Ok(ServerEvent::PlayerLeft { player }) => {
                self.status(format!("{player} left the game"));
                Vec::new()
            }
            Ok(ServerEvent::GameReady { .. }) => {
                debug!(%session_id, "opponent seated");
                Vec::new()
            }
            Ok(ServerEvent::Unknown) => {
                debug!(%session_id, "ignoring unrecognized push event");
                Vec::new()
            }
            Ok(ServerEvent::Error { message }) => {
                warn!(%session_id, "push channel error event: {message}");
                self.emit(ClientEvent::Error(SurfacedError::server_message(
                    ErrorContext::PushChannel,
                    message,
                )));
                Vec::new()
            }
            Err(err) => {
                warn!(%session_id, "push channel failure: {err}");
                self.surface(ErrorContext::PushChannel, &err);
                Vec::new()
            }
        }
    }

    fn on_remote_move(&mut self, payload: OpponentMove) -> Vec<Effect> {
        let Some(local_color) = self.session.as_ref().map(|s| s.local_color) else {
            return Vec::new();
        };
        let mover = local_color.opponent();
        if self.pending_commits > 0 {
            debug!(mv = %payload.mv, "remote move arrived ahead of the commit reply");
            self.commit_overtaken = true;
        }
        let mv = self.on_board_move(Some(payload.mv));
        self.apply_authoritative(
            payload.board,
            mv,
            payload.next_player,
            payload.captured_pieces,
        );
        if let Some(can_undo) = payload.can_undo {
            self.set_can_undo(can_undo);
        }
        if let Some(mv) = mv {
            self.log_ply(mover, mv);
        }

        if payload.game_over {
            return self.finish(payload.result, payload.winner);
        }
        self.settle_turn_phase();
        if self.session.as_ref().is_some_and(GameSession::is_local_turn) {
            self.status("Your turn");
        } else {
            self.status(format!("{}'s turn", payload.next_player));
        }
        Vec::new()
    }

    fn apply_started(
        &mut self,
        mode: GameMode,
        difficulty: u8,
        resp: StartGameResponse,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(previous) = self.session.take() {
            if previous.is_active {
                effects.push(Effect::LeavePush(previous.id));
            }
        }
        self.reset_mirror();

        let mode = resp.game_type.unwrap_or(mode);
        let local_color = resp.player_color.unwrap_or(Color::White);
        let session = GameSession::new(
            resp.game_id.clone(),
            mode,
            difficulty,
            local_color,
            resp.next_player,
        );
        let phase = session.turn_phase();
        info!(session_id = %session.id, ?mode, %local_color, "session started");

        self.board = resp.board;
        self.session = Some(session);
        self.emit(ClientEvent::SessionStarted {
            session_id: resp.game_id.clone(),
            mode,
            local_color,
        });
        self.emit_board();
        self.emit(ClientEvent::CapturedUpdated(self.captured.clone()));
        self.emit(ClientEvent::UndoAvailability(false));
        self.set_phase(phase);
        self.status(format!("Game started! {} to move", resp.next_player));

        effects.push(Effect::JoinPush(resp.game_id));
        effects
    }

    fn apply_selection(
        &mut self,
        session_id: SessionId,
        square: Square,
        resp: SelectSquareResponse,
    ) -> Vec<Effect> {
        if !self.session.as_ref().is_some_and(GameSession::is_local_turn) {
            debug!(%session_id, "selection reply arrived after turn handover");
            return Vec::new();
        }
        let selected = resp.selected.unwrap_or(square);
        self.selection.replace(selected, resp.valid_moves);
        self.emit_selection();
        if self.selection.is_empty() {
            self.set_phase(SessionPhase::AwaitingSelection);
        } else {
            self.set_phase(SessionPhase::SquareSelected);
        }
        vec![Effect::Dispatch(ApiRequest::FetchState { session_id })]
    }

    fn apply_commit(&mut self, resp: CommitMoveResponse) -> Vec<Effect> {
        let Some(local_color) = self.session.as_ref().map(|s| s.local_color) else {
            return Vec::new();
        };
        let overtaken = self.settle_commit();
        let last_move = self.on_board_move(resp.last_move);
        self.apply_authoritative(resp.board, last_move, resp.next_player, resp.captured_pieces);
        if let Some(mv) = last_move {
            self.log_ply(local_color, mv);
        }
        self.set_can_undo(resp.can_undo);

        if resp.game_over {
            return self.finish(resp.result, resp.winner);
        }
        self.settle_turn_phase();
        if overtaken {
            // This reply predates the remote move already applied.
            if let Some(session_id) = self.active_session_id() {
                info!(%session_id, "commit reply overtaken by a remote move, resynchronizing");
                return vec![Effect::Dispatch(ApiRequest::Resync { session_id })];
            }
        }
        let vs_bot = self
            .session
            .as_ref()
            .is_some_and(|s| s.mode == GameMode::VsBot && !s.is_local_turn());
        if vs_bot {
            self.status("Bot is thinking...");
        } else {
            self.status(format!("{}'s turn", resp.next_player));
        }
        Vec::new()
    }

    fn reject_commit(&mut self, session_id: SessionId, err: ClientError) -> Vec<Effect> {
        self.settle_commit();
        self.undo_history.pop();
        self.clear_selection();
        self.settle_turn_phase();
        self.surface(ErrorContext::CommitMove, &err);
        if err.is_declined() {
            info!(%session_id, "move declined, resynchronizing: {err}");
            vec![Effect::Dispatch(ApiRequest::FetchState { session_id })]
        } else {
            warn!(%session_id, "move not delivered: {err}");
            Vec::new()
        }
    }

    fn apply_undo(&mut self, resp: UndoMoveResponse) -> Vec<Effect> {
        let Some(mode) = self.session.as_ref().map(|s| s.mode) else {
            return Vec::new();
        };
        self.apply_authoritative(resp.board, None, resp.next_player, resp.captured_pieces);
        let removed = self.move_log.truncate_last(mode.undo_plies());
        self.undo_history.pop();
        self.emit(ClientEvent::MoveLogTruncated {
            removed,
            remaining: self.move_log.len(),
        });
        self.set_can_undo(resp.can_undo);
        self.settle_turn_phase();
        self.status(format!("{}'s turn", resp.next_player));
        Vec::new()
    }

    /// Full refresh: board, turn, captures and the undo flag all come from
    /// the server.
    fn apply_resync(&mut self, resp: GameStateResponse) -> Vec<Effect> {
        let Some(turn) = resp
            .next_player
            .or_else(|| self.session.as_ref().map(|s| s.current_turn))
        else {
            return Vec::new();
        };
        let last_move = self.on_board_move(resp.last_move);
        self.apply_authoritative(resp.board, last_move, turn, resp.captured_pieces);
        self.set_can_undo(resp.can_undo);
        self.settle_turn_phase();
        debug!(%turn, "state resynchronized");
        Vec::new()
    }

    /// Closes out one in-flight commit. True if a remote move was applied
    /// while the last of them was pending.
    fn settle_commit(&mut self) -> bool {
        self.pending_commits = self.pending_commits.saturating_sub(1);
        if self.pending_commits > 0 {
            return false;
        }
        std::mem::take(&mut self.commit_overtaken)
    }

    /// Drops and reports move coordinates that fall off the board.
    fn on_board_move(&self, mv: Option<MoveCoords>) -> Option<MoveCoords> {
        let mv = mv?;
        if mv.is_on_board() {
            return Some(mv);
        }
        warn!(%mv, "dropping off-board move coordinates");
        self.surface(
            ErrorContext::Sync,
            &ClientError::InvalidPayload(format!("move {mv} is off the board")),
        );
        None
    }

    /// Replaces board, turn and captures with server values and drops any
    /// selection made under the previous state.
    fn apply_authoritative(
        &mut self,
        board: BoardSnapshot,
        last_move: Option<MoveCoords>,
        next_player: Color,
        captured: Option<CapturedPieces>,
    ) {
        self.board = board;
        self.last_move = last_move;
        if let Some(session) = self.session.as_mut() {
            session.current_turn = next_player;
        }
        if let Some(captured) = captured {
            self.captured = captured;
            self.emit(ClientEvent::CapturedUpdated(self.captured.clone()));
        }
        self.clear_selection();
        self.emit_board();
    }

    fn log_ply(&mut self, mover: Color, mv: MoveCoords) {
        let quality = self.scorer.classify(mover, &mv);
        self.tally.record(mover, quality);
        let ply = self.move_log.push(mover, mv);
        self.emit(ClientEvent::MoveLogged {
            ply,
            mover,
            notation: mv.to_string(),
            quality,
        });
    }

    fn finish(&mut self, result: Option<GameResult>, winner: Option<Winner>) -> Vec<Effect> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        session.is_active = false;
        let session_id = session.id.clone();
        let outcome = GameOutcome { result, winner };
        info!(%session_id, ?result, ?winner, "game over");

        self.clear_selection();
        self.set_phase(SessionPhase::GameOver);
        self.outcome = Some(outcome.clone());
        self.status(outcome.headline());
        self.emit(ClientEvent::GameOver {
            outcome,
            summary: self.tally.summary(),
        });
        vec![Effect::LeavePush(session_id)]
    }

    fn reset_mirror(&mut self) {
        self.phase = SessionPhase::Idle;
        self.board = BoardSnapshot::empty();
        self.last_move = None;
        self.selection.clear();
        self.captured = CapturedPieces::default();
        self.move_log = MoveLog::default();
        self.tally = MoveQualityTally::default();
        self.undo_history.clear();
        self.can_undo = false;
        self.outcome = None;
        self.pending_commits = 0;
        self.commit_overtaken = false;
    }

    fn settle_turn_phase(&mut self) {
        if let Some(phase) = self.session.as_ref().map(GameSession::turn_phase) {
            self.set_phase(phase);
        }
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase == phase {
            return;
        }
        debug!(from = ?self.phase, to = ?phase, "phase transition");
        self.phase = phase;
        self.emit(ClientEvent::PhaseChanged {
            phase,
            current_turn: self.session.as_ref().map(|s| s.current_turn),
        });
    }

    fn set_can_undo(&mut self, can_undo: bool) {
        self.can_undo = can_undo;
        self.emit(ClientEvent::UndoAvailability(can_undo));
    }

    fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.emit_selection();
        }
    }

    fn local_turn_session(&self) -> Option<SessionId> {
        if !matches!(
            self.phase,
            SessionPhase::AwaitingSelection | SessionPhase::SquareSelected
        ) {
            return None;
        }
        self.session
            .as_ref()
            .filter(|s| s.is_active && s.is_local_turn())
            .map(|s| s.id.clone())
    }

    fn active_session_id(&self) -> Option<SessionId> {
        self.session
            .as_ref()
            .filter(|s| s.is_active)
            .map(|s| s.id.clone())
    }

    fn is_current_active(&self, session_id: &SessionId) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.is_active && &s.id == session_id)
    }

    fn surface(&self, context: ErrorContext, err: &ClientError) {
        self.emit(ClientEvent::Error(SurfacedError::from_client_error(
            context, err,
        )));
    }

    fn status(&self, message: impl Into<String>) {
        self.emit(ClientEvent::Status(message.into()));
    }

    fn emit_board(&self) {
        self.emit(ClientEvent::BoardUpdated {
            board: self.board,
            last_move: self.last_move,
        });
    }

    fn emit_selection(&self) {
        self.emit(ClientEvent::SelectionChanged {
            selected: self.selection.selected(),
            valid_moves: self.selection.valid_moves().collect(),
        });
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
