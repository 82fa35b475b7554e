//! Server-to-client push channel carrying opponent moves.

use async_trait::async_trait;
use futures::{stream::BoxStream, SinkExt, StreamExt};
use shared::{
    domain::SessionId,
    protocol::{ClientRequest, ServerEvent},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};
use url::Url;

use crate::error::ClientError;

pub type PushStream = BoxStream<'static, Result<ServerEvent, ClientError>>;

/// A live per-session subscription: incoming events plus an optional uplink
/// for control frames.
pub struct PushSubscription {
    session_id: SessionId,
    events: PushStream,
    uplink: Option<mpsc::UnboundedSender<ClientRequest>>,
}

impl PushSubscription {
    pub fn new(session_id: SessionId, events: PushStream) -> Self {
        Self {
            session_id,
            events,
            uplink: None,
        }
    }

    pub fn with_uplink(mut self, uplink: mpsc::UnboundedSender<ClientRequest>) -> Self {
        self.uplink = Some(uplink);
        self
    }

    pub async fn next_event(&mut self) -> Option<Result<ServerEvent, ClientError>> {
        self.events.next().await
    }

    /// Tells the server this client left the session's broadcast group.
    pub fn leave(&self) {
        if let Some(uplink) = &self.uplink {
            let _ = uplink.send(ClientRequest::LeaveGame {
                game_id: self.session_id.clone(),
            });
        }
    }
}

#[async_trait]
pub trait PushConnector: Send + Sync {
    async fn subscribe(&self, session_id: &SessionId) -> Result<PushSubscription, ClientError>;
}

/// Connector that never delivers anything, for front ends without a push channel.
pub struct NoPushChannel;

#[async_trait]
impl PushConnector for NoPushChannel {
    async fn subscribe(&self, session_id: &SessionId) -> Result<PushSubscription, ClientError> {
        Ok(PushSubscription::new(
            session_id.clone(),
            futures::stream::pending().boxed(),
        ))
    }
}

pub fn push_url(server_url: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(server_url)
        .map_err(|err| ClientError::PushChannel(format!("invalid server url {server_url}: {err}")))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ClientError::PushChannel(format!(
                "unsupported server url scheme: {other}"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| ClientError::PushChannel(format!("cannot derive push url from {server_url}")))?;
    url.set_path("/ws");
    url.set_query(None);
    Ok(url)
}

pub struct WsPushConnector {
    ws_url: Url,
}

impl WsPushConnector {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            ws_url: push_url(server_url)?,
        })
    }
}

#[async_trait]
impl PushConnector for WsPushConnector {
    async fn subscribe(&self, session_id: &SessionId) -> Result<PushSubscription, ClientError> {
        let (ws_stream, _) = connect_async(self.ws_url.as_str()).await?;
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        let (uplink_tx, mut uplink_rx) = mpsc::unbounded_channel::<ClientRequest>();
        uplink_tx
            .send(ClientRequest::JoinGame {
                game_id: session_id.clone(),
            })
            .map_err(|_| ClientError::PushChannel("push uplink closed".into()))?;

        let writer_session = session_id.clone();
        tokio::spawn(async move {
            while let Some(frame) = uplink_rx.recv().await {
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(session_id = %writer_session, "push: failed to encode frame: {err}");
                        continue;
                    }
                };
                if let Err(err) = ws_writer.send(Message::Text(text)).await {
                    warn!(session_id = %writer_session, "push: send failed: {err}");
                    break;
                }
            }
            let _ = ws_writer.close().await;
        });

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let reader_session = session_id.clone();
        tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                let item = match msg {
                    Ok(Message::Text(text)) => {
                        ServerEvent::from_frame(&text).map_err(ClientError::from)
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(err) => {
                        let _ = events_tx.send(Err(ClientError::from(err)));
                        break;
                    }
                };
                if events_tx.send(item).is_err() {
                    break;
                }
            }
            info!(session_id = %reader_session, "push: channel closed");
        });

        info!(session_id = %session_id, url = %self.ws_url, "push: joined session group");
        Ok(
            PushSubscription::new(session_id.clone(), UnboundedReceiverStream::new(events_rx).boxed())
                .with_uplink(uplink_tx),
        )
    }
}
