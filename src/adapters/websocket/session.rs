//! Per-connection session: the relay's protocol state machine.
//!
//! A session owns one connection. Its read loop is the only task that reads
//! the connection's frames, so commands from one client are processed
//! strictly in arrival order. Everything it writes goes through the bounded
//! outbound buffer it shares with the registry.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, watch, Notify};
use tracing::Instrument;

use crate::application::{
    AuthenticateCommand, AuthenticateHandler, GetChatsHandler, GetChatsQuery, SendChatHandler,
};
use crate::domain::chat::ChatError;
use crate::domain::foundation::{ConnectionId, StateMachine, UserId};
use crate::domain::session::{Disposition, SessionError, SessionState};
use crate::ports::{ChatStore, Directory, TokenVerifier};

use super::messages::{inbound, AuthRequest, Envelope, SendChatRequest, ServerMessage, PING, PONG};
use super::registry::{RegistryHandle, SessionHandle};
use super::transport::{Frame, TransportError};

/// Handlers shared by every session.
pub struct SessionServices {
    pub authenticate: AuthenticateHandler,
    pub send_chat: SendChatHandler,
    pub get_chats: GetChatsHandler,
}

impl SessionServices {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        directory: Arc<dyn Directory>,
        store: Arc<dyn ChatStore>,
    ) -> Self {
        Self {
            authenticate: AuthenticateHandler::new(verifier, directory.clone()),
            send_chat: SendChatHandler::new(directory.clone(), store.clone()),
            get_chats: GetChatsHandler::new(directory, store),
        }
    }
}

/// Timing knobs for a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// How long a connection may stay unauthenticated.
    pub auth_timeout: Duration,
    /// How long a write to the outbound buffer may wait for space.
    pub handoff_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            auth_timeout: Duration::from_secs(30),
            handoff_timeout: Duration::from_secs(1),
        }
    }
}

type Flow = ControlFlow<()>;

pub struct Session {
    id: ConnectionId,
    state: SessionState,
    user_id: Option<UserId>,
    user_tx: watch::Sender<Option<UserId>>,
    outbound: mpsc::Sender<Frame>,
    evict: Arc<Notify>,
    services: Arc<SessionServices>,
    registry: RegistryHandle,
    settings: SessionSettings,
}

impl Session {
    pub fn new(
        outbound: mpsc::Sender<Frame>,
        services: Arc<SessionServices>,
        registry: RegistryHandle,
        settings: SessionSettings,
    ) -> Self {
        let (user_tx, _) = watch::channel(None);
        Self {
            id: ConnectionId::new(),
            state: SessionState::default(),
            user_id: None,
            user_tx,
            outbound,
            evict: Arc::new(Notify::new()),
            services,
            registry,
            settings,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The non-owning view of this session handed to the registry.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(
            self.id,
            self.user_tx.subscribe(),
            self.outbound.clone(),
            self.evict.clone(),
        )
    }

    /// Runs the session until the connection ends.
    ///
    /// The session is admitted to the registry on entry and retired exactly
    /// once on exit, whatever ended it.
    pub async fn serve<S>(self, inbound: S)
    where
        S: Stream<Item = Result<Frame, TransportError>> + Unpin,
    {
        let span = tracing::info_span!("session", connection_id = %self.id);
        self.run(inbound).instrument(span).await
    }

    async fn run<S>(mut self, mut inbound: S)
    where
        S: Stream<Item = Result<Frame, TransportError>> + Unpin,
    {
        if let Err(e) = self.registry.admit(self.handle()).await {
            tracing::warn!(error = %e, "registry refused session");
            self.close().await;
            return;
        }
        tracing::debug!("session opened");

        let evict = self.evict.clone();
        let auth_deadline = tokio::time::sleep(self.settings.auth_timeout);
        tokio::pin!(auth_deadline);

        loop {
            let outcome = tokio::select! {
                biased;
                _ = evict.notified() => {
                    tracing::debug!("session evicted by registry");
                    break;
                }
                _ = &mut auth_deadline, if !self.state.is_authenticated() => {
                    Err(SessionError::AuthenticationTimeout)
                }
                next = inbound.next() => match next {
                    None => break,
                    Some(Err(e)) => Err(SessionError::transport(e.0)),
                    Some(Ok(frame)) => self.on_frame(frame).await,
                },
            };

            match outcome {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => break,
                Err(err) => {
                    if self.fail(err).await.is_break() {
                        break;
                    }
                }
            }
        }

        self.close().await;
    }

    async fn on_frame(&mut self, frame: Frame) -> Result<Flow, SessionError> {
        match frame {
            Frame::Text(text) if text == PING => {
                self.send(Frame::text(PONG)).await?;
                Ok(ControlFlow::Continue(()))
            }
            Frame::Text(text) => {
                let envelope: Envelope = serde_json::from_str(&text)
                    .map_err(|e| SessionError::transport(format!("malformed envelope: {}", e)))?;
                self.dispatch(envelope).await
            }
            Frame::Binary(_) => Err(SessionError::transport("binary frames are not supported")),
            Frame::Close => {
                tracing::debug!("peer closed connection");
                Ok(ControlFlow::Break(()))
            }
        }
    }

    async fn dispatch(&mut self, envelope: Envelope) -> Result<Flow, SessionError> {
        match envelope.kind.as_str() {
            inbound::AUTH => self.authenticate(envelope.data).await,
            inbound::SEND_CHAT => self.send_chat(envelope.data).await,
            inbound::GET_CHATS => self.get_chats().await,
            other => Err(SessionError::unknown_type(other)),
        }
    }

    async fn authenticate(&mut self, data: serde_json::Value) -> Result<Flow, SessionError> {
        if self.state.is_authenticated() {
            return Err(SessionError::AlreadyAuthenticated);
        }

        // Failed attempts leave the session unauthenticated so the client
        // can retry before the deadline.
        let request: AuthRequest = match serde_json::from_value(data) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "malformed auth payload");
                return Ok(ControlFlow::Continue(()));
            }
        };
        let user = match self
            .services
            .authenticate
            .handle(AuthenticateCommand {
                token: request.token,
            })
            .await
        {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "authentication failed");
                return Ok(ControlFlow::Continue(()));
            }
        };

        self.state = self
            .state
            .transition_to(SessionState::Authenticated)
            .map_err(|e| SessionError::transport(e.to_string()))?;
        self.user_id = Some(user.id.clone());
        // Publish before replying so events sent after the client sees
        // `success` are routed here.
        self.user_tx.send_replace(Some(user.id.clone()));
        tracing::info!(user_id = %user.id, "session authenticated");

        self.reply(ServerMessage::authenticated(user)).await?;
        Ok(ControlFlow::Continue(()))
    }

    async fn send_chat(&mut self, data: serde_json::Value) -> Result<Flow, SessionError> {
        let sender_id = self.require_user()?;
        let request: SendChatRequest = serde_json::from_value(data)
            .map_err(|e| ChatError::invalid_schema(e.to_string()))?;

        let delivery = self
            .services
            .send_chat
            .handle(request.into_command(sender_id))
            .await?;

        self.reply(ServerMessage::ChatSent(delivery.clone())).await?;

        let chat_id = delivery.chat.chat_id.clone();
        if let Err(e) = self.registry.publish(delivery).await {
            tracing::warn!(error = %e, chat_id = %chat_id, "chat stored but not fanned out");
        }
        Ok(ControlFlow::Continue(()))
    }

    async fn get_chats(&mut self) -> Result<Flow, SessionError> {
        let user_id = self.require_user()?;
        let rooms = self
            .services
            .get_chats
            .handle(GetChatsQuery { user_id })
            .await?;

        self.reply(ServerMessage::Chats(rooms)).await?;
        Ok(ControlFlow::Continue(()))
    }

    fn require_user(&self) -> Result<UserId, SessionError> {
        self.user_id
            .clone()
            .ok_or(SessionError::AuthenticationRequired)
    }

    /// Applies the error's disposition. Breaks when the session must close.
    async fn fail(&mut self, err: SessionError) -> Flow {
        match err.disposition() {
            Disposition::Report => {
                tracing::debug!(error = %err, code = %err.code(), "command rejected");
                match self.reply(ServerMessage::error(&err)).await {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(_) => ControlFlow::Break(()),
                }
            }
            Disposition::ReportAndClose => {
                tracing::warn!(error = %err, "closing session");
                let _ = self.reply(ServerMessage::error(&err)).await;
                ControlFlow::Break(())
            }
            Disposition::Close => {
                match &err {
                    SessionError::Transport(_) => tracing::debug!(error = %err, "closing session"),
                    _ => tracing::warn!(error = %err, "closing session"),
                }
                ControlFlow::Break(())
            }
        }
    }

    async fn reply(&self, message: ServerMessage) -> Result<(), SessionError> {
        let frame = message
            .to_frame()
            .map_err(|e| SessionError::transport(format!("failed to encode reply: {}", e)))?;
        self.send(frame).await
    }

    async fn send(&self, frame: Frame) -> Result<(), SessionError> {
        self.outbound
            .send_timeout(frame, self.settings.handoff_timeout)
            .await
            .map_err(|e| SessionError::transport(format!("outbound unavailable: {}", e)))
    }

    async fn close(mut self) {
        if let Ok(closed) = self.state.transition_to(SessionState::Closed) {
            self.state = closed;
        }
        let _ = self.outbound.try_send(Frame::Close);

        if let Err(e) = self.registry.retire(self.id).await {
            tracing::warn!(error = %e, "failed to retire session");
        }
        tracing::debug!(user_id = ?self.user_id, "session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockTokenVerifier;
    use crate::adapters::chat_store::InMemoryChatStore;
    use crate::adapters::directory::InMemoryDirectory;
    use crate::adapters::websocket::registry::{Registry, RegistryConfig};
    use crate::domain::directory::User;
    use futures::channel::mpsc as fmpsc;
    use futures::SinkExt;

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn services() -> Arc<SessionServices> {
        let verifier = MockTokenVerifier::new()
            .with_user("token-1", uid("u_1"))
            .with_user("token-2", uid("u_2"));
        let directory = InMemoryDirectory::new()
            .with_user(User::new(uid("u_1"), "alice", "Alice"))
            .with_user(User::new(uid("u_2"), "bob", "Bob"));
        Arc::new(SessionServices::new(
            Arc::new(verifier),
            Arc::new(directory),
            Arc::new(InMemoryChatStore::new()),
        ))
    }

    struct Client {
        tx: fmpsc::UnboundedSender<Result<Frame, TransportError>>,
        rx: mpsc::Receiver<Frame>,
        task: tokio::task::JoinHandle<()>,
    }

    impl Client {
        async fn send(&mut self, text: &str) {
            self.tx.send(Ok(Frame::text(text))).await.unwrap();
        }

        async fn next_json(&mut self) -> serde_json::Value {
            match tokio::time::timeout(Duration::from_secs(1), self.rx.recv()).await {
                Ok(Some(Frame::Text(text))) => serde_json::from_str(&text).unwrap(),
                other => panic!("expected a text frame, got {:?}", other),
            }
        }

        async fn next_frame(&mut self) -> Option<Frame> {
            tokio::time::timeout(Duration::from_secs(1), self.rx.recv())
                .await
                .unwrap()
        }
    }

    fn connect(settings: SessionSettings) -> (Client, RegistryHandle) {
        let (registry, _task) = Registry::spawn(RegistryConfig::default());
        let (in_tx, in_rx) = fmpsc::unbounded();
        let (out_tx, out_rx) = mpsc::channel(16);
        let session = Session::new(out_tx, services(), registry.clone(), settings);
        let task = tokio::spawn(session.serve(in_rx));
        (
            Client {
                tx: in_tx,
                rx: out_rx,
                task,
            },
            registry,
        )
    }

    async fn finished(client: Client) {
        tokio::time::timeout(Duration::from_secs(1), client.task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn ping_is_answered_before_authentication() {
        let (mut client, _registry) = connect(SessionSettings::default());

        client.send("ping").await;

        assert_eq!(client.next_frame().await, Some(Frame::text("pong")));
    }

    #[tokio::test]
    async fn auth_replies_success_with_user() {
        let (mut client, registry) = connect(SessionSettings::default());

        client.send(r#"{"type":"auth","data":{"token":"token-1"}}"#).await;
        let reply = client.next_json().await;

        assert_eq!(reply["type"], "success");
        assert_eq!(reply["data"]["user"]["username"], "alice");
        let live = registry.live_sessions().await.unwrap();
        assert_eq!(live[0].user_id, Some(uid("u_1")));
    }

    #[tokio::test]
    async fn failed_auth_is_silent_and_retryable() {
        let (mut client, _registry) = connect(SessionSettings::default());

        client.send(r#"{"type":"auth","data":{"token":"forged"}}"#).await;
        client.send("ping").await;
        assert_eq!(client.next_frame().await, Some(Frame::text("pong")));

        client.send(r#"{"type":"auth","data":{"token":"token-1"}}"#).await;
        assert_eq!(client.next_json().await["type"], "success");
    }

    #[tokio::test]
    async fn second_auth_is_reported_and_keeps_session_open() {
        let (mut client, _registry) = connect(SessionSettings::default());
        client.send(r#"{"type":"auth","data":{"token":"token-1"}}"#).await;
        client.next_json().await;

        client.send(r#"{"type":"auth","data":{"token":"token-2"}}"#).await;
        let reply = client.next_json().await;
        assert_eq!(reply["type"], "error");
        assert_eq!(reply["data"]["message"], "already authenticated");

        client.send("ping").await;
        assert_eq!(client.next_frame().await, Some(Frame::text("pong")));
    }

    #[tokio::test]
    async fn send_chat_before_auth_closes_without_reply() {
        let (mut client, registry) = connect(SessionSettings::default());

        client
            .send(r#"{"type":"send_chat","data":{"type":"text","chat_id":"u_2","text":"hi"}}"#)
            .await;

        assert_eq!(client.next_frame().await, Some(Frame::Close));
        finished(client).await;
        assert!(registry.live_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_chats_before_auth_closes_without_reply() {
        let (mut client, _registry) = connect(SessionSettings::default());

        client.send(r#"{"type":"get_chats"}"#).await;

        assert_eq!(client.next_frame().await, Some(Frame::Close));
        finished(client).await;
    }

    #[tokio::test]
    async fn unknown_type_is_reported_then_closed() {
        let (mut client, _registry) = connect(SessionSettings::default());

        client.send(r#"{"type":"subscribe","data":{}}"#).await;

        let reply = client.next_json().await;
        assert_eq!(reply["data"]["message"], "message type is unknown");
        assert_eq!(client.next_frame().await, Some(Frame::Close));
        finished(client).await;
    }

    #[tokio::test]
    async fn malformed_json_closes_silently() {
        let (mut client, _registry) = connect(SessionSettings::default());

        client.send("{not json").await;

        assert_eq!(client.next_frame().await, Some(Frame::Close));
        finished(client).await;
    }

    #[tokio::test]
    async fn transport_error_closes_silently() {
        let (mut client, _registry) = connect(SessionSettings::default());

        client
            .tx
            .send(Err(TransportError::new("connection reset")))
            .await
            .unwrap();

        assert_eq!(client.next_frame().await, Some(Frame::Close));
        finished(client).await;
    }

    #[tokio::test]
    async fn self_chat_is_reported_and_session_stays_open() {
        let (mut client, _registry) = connect(SessionSettings::default());
        client.send(r#"{"type":"auth","data":{"token":"token-1"}}"#).await;
        client.next_json().await;

        client
            .send(r#"{"type":"send_chat","data":{"type":"text","chat_id":"u_1","text":"me"}}"#)
            .await;
        let reply = client.next_json().await;
        assert_eq!(reply["type"], "error");
        assert_eq!(reply["data"]["code"], "SELF_CHAT");

        client.send("ping").await;
        assert_eq!(client.next_frame().await, Some(Frame::text("pong")));
    }

    #[tokio::test]
    async fn malformed_chat_payload_is_invalid_schema() {
        let (mut client, _registry) = connect(SessionSettings::default());
        client.send(r#"{"type":"auth","data":{"token":"token-1"}}"#).await;
        client.next_json().await;

        client
            .send(r#"{"type":"send_chat","data":{"type":"sticker","chat_id":"u_2"}}"#)
            .await;

        assert_eq!(client.next_json().await["data"]["code"], "INVALID_SCHEMA");
    }

    #[tokio::test]
    async fn chat_sent_echoes_the_stored_chat() {
        let (mut client, _registry) = connect(SessionSettings::default());
        client.send(r#"{"type":"auth","data":{"token":"token-1"}}"#).await;
        client.next_json().await;

        client
            .send(r#"{"type":"send_chat","data":{"type":"text","chat_id":"u_2","text":"hi"}}"#)
            .await;
        let reply = client.next_json().await;

        assert_eq!(reply["type"], "chat_sent");
        assert_eq!(reply["data"]["text"], "hi");
        assert!(reply["data"]["id"].is_string());
        assert_eq!(reply["data"]["receiver"]["id"], "u_2");
    }

    #[tokio::test]
    async fn unauthenticated_session_times_out() {
        let settings = SessionSettings {
            auth_timeout: Duration::from_millis(50),
            ..SessionSettings::default()
        };
        let (mut client, _registry) = connect(settings);

        let reply = client.next_json().await;
        assert_eq!(reply["data"]["code"], "AUTHENTICATION_TIMEOUT");
        assert_eq!(client.next_frame().await, Some(Frame::Close));
        finished(client).await;
    }

    #[tokio::test]
    async fn authenticated_session_outlives_the_auth_deadline() {
        let settings = SessionSettings {
            auth_timeout: Duration::from_millis(50),
            ..SessionSettings::default()
        };
        let (mut client, _registry) = connect(settings);
        client.send(r#"{"type":"auth","data":{"token":"token-1"}}"#).await;
        client.next_json().await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        client.send("ping").await;
        assert_eq!(client.next_frame().await, Some(Frame::text("pong")));
    }

    #[tokio::test]
    async fn peer_close_retires_the_session() {
        let (client, registry) = connect(SessionSettings::default());
        let Client { tx, mut rx, task } = client;
        drop(tx);

        assert_eq!(rx.recv().await, Some(Frame::Close));
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(registry.live_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn new_session_is_unauthenticated() {
        let (registry, _task) = Registry::spawn(RegistryConfig::default());
        let (tx, _rx) = mpsc::channel(1);
        let session = Session::new(tx, services(), registry, SessionSettings::default());

        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(session.handle().user_id(), None);
    }
}
