//! Session driver: owns the controller and feeds it from one ordered queue.
//!
//! User commands, request completions and push notifications are all posted
//! to the same unbounded channel and applied strictly in arrival order by a
//! single worker task. Network calls run concurrently; only their results
//! are serialized.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::{
    domain::{GameMode, SessionId, Square},
    protocol::ServerEvent,
};
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, debug_span, info, warn};

use crate::{
    controller::{ApiOutcome, Effect, GameSessionController, SessionView, UserCommand},
    error::ClientError,
    events::ClientEvent,
    push::{PushConnector, WsPushConnector},
    quality::{MoveScorer, RandomBucketScorer},
    transport::{execute, GameApi, HttpGameApi},
};

const EVENT_BUFFER: usize = 1024;

enum ControllerInput {
    Command(UserCommand),
    Reply(ApiOutcome),
    Push {
        session_id: SessionId,
        item: Result<ServerEvent, ClientError>,
    },
    Inspect(oneshot::Sender<SessionView>),
    Shutdown,
}

impl ControllerInput {
    fn source(&self) -> &'static str {
        match self {
            Self::Command(_) => "user",
            Self::Reply(_) => "reply",
            Self::Push { .. } => "push",
            Self::Inspect(_) => "inspect",
            Self::Shutdown => "shutdown",
        }
    }
}

struct Envelope {
    seq: u64,
    input: ControllerInput,
}

#[derive(Clone)]
struct UpdateQueue {
    tx: mpsc::UnboundedSender<Envelope>,
    next_seq: Arc<AtomicU64>,
}

impl UpdateQueue {
    fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Self {
            tx,
            next_seq: Arc::new(AtomicU64::new(0)),
        };
        (queue, rx)
    }

    /// Returns false once the worker is gone.
    fn post(&self, input: ControllerInput) -> bool {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.tx.send(Envelope { seq, input }).is_ok()
    }
}

struct PushTask {
    session_id: SessionId,
    leave: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct SessionWorker {
    controller: GameSessionController,
    api: Arc<dyn GameApi>,
    push: Arc<dyn PushConnector>,
    queue: UpdateQueue,
    push_task: Option<PushTask>,
}

impl SessionWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Envelope>) {
        while let Some(Envelope { seq, input }) = rx.recv().await {
            let span = debug_span!("session_update", seq, source = input.source());
            if !span.in_scope(|| self.process(input)) {
                break;
            }
        }
        self.leave_push();
        info!("session worker stopped");
    }

    /// Applies one input and carries out its effects. False means stop.
    fn process(&mut self, input: ControllerInput) -> bool {
        let effects = match input {
            ControllerInput::Command(command) => {
                debug!(?command, "user command");
                self.controller.handle_command(command)
            }
            ControllerInput::Reply(outcome) => self.controller.on_reply(outcome),
            ControllerInput::Push { session_id, item } => {
                self.controller.on_push(&session_id, item)
            }
            ControllerInput::Inspect(reply) => {
                let _ = reply.send(self.controller.view());
                Vec::new()
            }
            ControllerInput::Shutdown => return false,
        };
        for effect in effects {
            self.apply(effect);
        }
        true
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Dispatch(request) => {
                let api = Arc::clone(&self.api);
                let queue = self.queue.clone();
                tokio::spawn(async move {
                    let result = execute(api.as_ref(), &request).await;
                    if let Err(err) = &result {
                        debug!(request = request.name(), "game api call returned error: {err}");
                    }
                    queue.post(ControllerInput::Reply(ApiOutcome { request, result }));
                });
            }
            Effect::JoinPush(session_id) => {
                self.leave_push();
                self.push_task = Some(spawn_push_task(
                    Arc::clone(&self.push),
                    self.queue.clone(),
                    session_id,
                ));
            }
            Effect::LeavePush(session_id) => {
                let current = self
                    .push_task
                    .as_ref()
                    .is_some_and(|task| task.session_id == session_id);
                if current {
                    self.leave_push();
                }
            }
        }
    }

    fn leave_push(&mut self) {
        if let Some(task) = self.push_task.take() {
            info!(session_id = %task.session_id, "leaving push group");
            if task.leave.send(()).is_err() {
                task.handle.abort();
            }
        }
    }
}

fn spawn_push_task(
    connector: Arc<dyn PushConnector>,
    queue: UpdateQueue,
    session_id: SessionId,
) -> PushTask {
    let (leave_tx, mut leave_rx) = oneshot::channel::<()>();
    let task_session = session_id.clone();
    let handle = tokio::spawn(async move {
        let mut subscription = match connector.subscribe(&task_session).await {
            Ok(subscription) => subscription,
            Err(err) => {
                warn!(session_id = %task_session, "push subscribe failed: {err}");
                queue.post(ControllerInput::Push {
                    session_id: task_session,
                    item: Err(err),
                });
                return;
            }
        };
        loop {
            tokio::select! {
                _ = &mut leave_rx => {
                    subscription.leave();
                    break;
                }
                item = subscription.next_event() => {
                    let Some(item) = item else {
                        break;
                    };
                    let delivered = queue.post(ControllerInput::Push {
                        session_id: task_session.clone(),
                        item,
                    });
                    if !delivered {
                        break;
                    }
                }
            }
        }
    });
    PushTask {
        session_id,
        leave: leave_tx,
        handle,
    }
}

/// Handle to a running session worker. Cheap calls only enqueue.
pub struct GameClient {
    queue: UpdateQueue,
    events: broadcast::Sender<ClientEvent>,
    worker: JoinHandle<()>,
}

impl GameClient {
    /// HTTP calls plus the WebSocket push channel, with the random scorer.
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        let push = WsPushConnector::new(server_url)?;
        Ok(Self::new_with_dependencies(
            Arc::new(HttpGameApi::new(server_url)),
            Arc::new(push),
            Box::new(RandomBucketScorer),
        ))
    }

    pub fn new_with_dependencies(
        api: Arc<dyn GameApi>,
        push: Arc<dyn PushConnector>,
        scorer: Box<dyn MoveScorer>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (queue, rx) = UpdateQueue::new();
        let worker = SessionWorker {
            controller: GameSessionController::new(scorer, events.clone()),
            api,
            push,
            queue: queue.clone(),
            push_task: None,
        };
        let worker = tokio::spawn(worker.run(rx));
        Self {
            queue,
            events,
            worker,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn send(&self, command: UserCommand) -> Result<(), ClientError> {
        if self.queue.post(ControllerInput::Command(command)) {
            Ok(())
        } else {
            Err(ClientError::Stopped)
        }
    }

    pub fn start_game(&self, mode: GameMode, difficulty: u8) -> Result<(), ClientError> {
        self.send(UserCommand::StartGame { mode, difficulty })
    }

    pub fn click(&self, square: Square) -> Result<(), ClientError> {
        self.send(UserCommand::Click(square))
    }

    pub fn select_square(&self, square: Square) -> Result<(), ClientError> {
        self.send(UserCommand::SelectSquare(square))
    }

    pub fn attempt_move(&self, square: Square) -> Result<(), ClientError> {
        self.send(UserCommand::AttemptMove(square))
    }

    pub fn undo(&self) -> Result<(), ClientError> {
        self.send(UserCommand::Undo)
    }

    pub fn resign(&self, confirmed: bool) -> Result<(), ClientError> {
        self.send(UserCommand::Resign { confirmed })
    }

    pub fn refresh(&self) -> Result<(), ClientError> {
        self.send(UserCommand::Refresh)
    }

    /// Snapshot taken after every update queued before this call.
    pub async fn view(&self) -> Result<SessionView, ClientError> {
        let (tx, rx) = oneshot::channel();
        if !self.queue.post(ControllerInput::Inspect(tx)) {
            return Err(ClientError::Stopped);
        }
        rx.await.map_err(|_| ClientError::Stopped)
    }

    pub async fn shutdown(self) {
        self.queue.post(ControllerInput::Shutdown);
        if let Err(err) = self.worker.await {
            warn!("session worker ended abnormally: {err}");
        }
    }
}
