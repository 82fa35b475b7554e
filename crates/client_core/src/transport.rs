//! Request/response calls to the game server.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{
    domain::{GameMode, SessionId, Square},
    error::{ApiError, ErrorBody, ErrorCode},
    protocol::{
        CommitMoveResponse, GameRequest, GameStateResponse, ResignResponse, SelectSquareResponse,
        SquareRequest, StartGameRequest, StartGameResponse, UndoMoveResponse,
    },
};
use tracing::debug;

use crate::error::ClientError;

pub type ApiResult<T> = std::result::Result<T, ClientError>;

#[async_trait]
pub trait GameApi: Send + Sync {
    async fn start_game(&self, mode: GameMode, difficulty: u8) -> ApiResult<StartGameResponse>;
    async fn select_square(
        &self,
        session_id: &SessionId,
        square: Square,
    ) -> ApiResult<SelectSquareResponse>;
    async fn commit_move(
        &self,
        session_id: &SessionId,
        square: Square,
    ) -> ApiResult<CommitMoveResponse>;
    async fn undo_move(&self, session_id: &SessionId) -> ApiResult<UndoMoveResponse>;
    async fn resign(&self, session_id: &SessionId) -> ApiResult<ResignResponse>;
    async fn fetch_state(&self, session_id: &SessionId) -> ApiResult<GameStateResponse>;
}

/// A call the controller wants made. Kept as data so the controller itself never awaits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    StartSession { mode: GameMode, difficulty: u8 },
    SelectSquare { session_id: SessionId, square: Square },
    CommitMove { session_id: SessionId, square: Square },
    UndoMove { session_id: SessionId },
    Resign { session_id: SessionId },
    /// Board and last move only, refetched after a selection or a declined commit.
    FetchState { session_id: SessionId },
    /// Explicit refresh: the same call, applied in full.
    Resync { session_id: SessionId },
}

impl ApiRequest {
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::StartSession { .. } => None,
            Self::SelectSquare { session_id, .. }
            | Self::CommitMove { session_id, .. }
            | Self::UndoMove { session_id }
            | Self::Resign { session_id }
            | Self::FetchState { session_id }
            | Self::Resync { session_id } => Some(session_id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::StartSession { .. } => "start_session",
            Self::SelectSquare { .. } => "select_square",
            Self::CommitMove { .. } => "commit_move",
            Self::UndoMove { .. } => "undo_move",
            Self::Resign { .. } => "resign",
            Self::FetchState { .. } => "fetch_state",
            Self::Resync { .. } => "resync",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ApiReply {
    Started(StartGameResponse),
    Selection(SelectSquareResponse),
    Moved(CommitMoveResponse),
    Undone(UndoMoveResponse),
    Resigned(ResignResponse),
    State(GameStateResponse),
}

pub async fn execute(api: &dyn GameApi, request: &ApiRequest) -> ApiResult<ApiReply> {
    match request {
        ApiRequest::StartSession { mode, difficulty } => {
            api.start_game(*mode, *difficulty).await.map(ApiReply::Started)
        }
        ApiRequest::SelectSquare { session_id, square } => api
            .select_square(session_id, *square)
            .await
            .map(ApiReply::Selection),
        ApiRequest::CommitMove { session_id, square } => api
            .commit_move(session_id, *square)
            .await
            .map(ApiReply::Moved),
        ApiRequest::UndoMove { session_id } => api.undo_move(session_id).await.map(ApiReply::Undone),
        ApiRequest::Resign { session_id } => api.resign(session_id).await.map(ApiReply::Resigned),
        ApiRequest::FetchState { session_id } | ApiRequest::Resync { session_id } => {
            api.fetch_state(session_id).await.map(ApiReply::State)
        }
    }
}

pub struct HttpGameApi {
    http: Client,
    server_url: String,
}

impl HttpGameApi {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Self { http, server_url }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> ApiResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        debug!(path, "game api request");
        let res = self
            .http
            .post(format!("{}{path}", self.server_url))
            .json(body)
            .send()
            .await?;
        decode_reply(res).await
    }
}

/// 4xx and `success: false` are declined actions; anything else that is not a
/// well-formed 2xx is a transport failure.
async fn decode_reply<R: DeserializeOwned>(res: Response) -> ApiResult<R> {
    let status = res.status();
    if status.is_client_error() {
        let body = res.json::<ErrorBody>().await.unwrap_or_else(|_| ErrorBody {
            error: status
                .canonical_reason()
                .unwrap_or("request declined")
                .to_string(),
        });
        return Err(ClientError::Declined(ApiError::from_body(
            status.as_u16(),
            body,
        )));
    }

    let res = res.error_for_status()?;
    let value: Value = res.json().await?;
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let message = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(ClientError::Declined(ApiError::new(
            ErrorCode::classify(status.as_u16(), &message),
            message,
        )));
    }
    Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl GameApi for HttpGameApi {
    async fn start_game(&self, mode: GameMode, difficulty: u8) -> ApiResult<StartGameResponse> {
        self.post("/start_game", &StartGameRequest { mode, difficulty })
            .await
    }

    async fn select_square(
        &self,
        session_id: &SessionId,
        square: Square,
    ) -> ApiResult<SelectSquareResponse> {
        self.post(
            "/api/select_square",
            &SquareRequest::new(session_id.clone(), square),
        )
        .await
    }

    async fn commit_move(
        &self,
        session_id: &SessionId,
        square: Square,
    ) -> ApiResult<CommitMoveResponse> {
        self.post(
            "/api/make_move",
            &SquareRequest::new(session_id.clone(), square),
        )
        .await
    }

    async fn undo_move(&self, session_id: &SessionId) -> ApiResult<UndoMoveResponse> {
        self.post(
            "/api/undo_move",
            &GameRequest {
                game_id: session_id.clone(),
            },
        )
        .await
    }

    async fn resign(&self, session_id: &SessionId) -> ApiResult<ResignResponse> {
        self.post(
            "/api/resign_game",
            &GameRequest {
                game_id: session_id.clone(),
            },
        )
        .await
    }

    async fn fetch_state(&self, session_id: &SessionId) -> ApiResult<GameStateResponse> {
        debug!(session_id = %session_id, "game api state fetch");
        let res = self
            .http
            .get(format!("{}/get_game_state/{}", self.server_url, session_id))
            .send()
            .await?;
        decode_reply(res).await
    }
}
