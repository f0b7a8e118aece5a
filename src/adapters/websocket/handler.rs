//! WebSocket upgrade handler for chat connections.
//!
//! Handles the HTTP → WebSocket upgrade and the connection lifecycle:
//! 1. Upgrade to WebSocket
//! 2. Spawn a writer draining the session's outbound buffer
//! 3. Run the session's read loop until the connection ends
//! 4. Give the writer a bounded grace period to flush, then drop the socket

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Json, Router,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::foundation::ConnectionId;

use super::registry::RegistryHandle;
use super::session::{Session, SessionServices, SessionSettings};
use super::transport::{Frame, TransportError};

/// Route of the liveness check.
pub const PING_PATH: &str = "/ping";

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct RelayState {
    pub services: Arc<SessionServices>,
    pub registry: RegistryHandle,
    pub settings: SessionSettings,
    /// Frames buffered per connection before fan-out starts dropping.
    pub outbound_buffer: usize,
    /// How long a finished session's writer may keep flushing.
    pub close_grace: Duration,
}

impl RelayState {
    pub fn new(
        services: Arc<SessionServices>,
        registry: RegistryHandle,
        settings: SessionSettings,
        outbound_buffer: usize,
        close_grace: Duration,
    ) -> Self {
        Self {
            services,
            registry,
            settings,
            outbound_buffer: outbound_buffer.max(1),
            close_grace,
        }
    }
}

/// Handle WebSocket upgrade requests.
///
/// Authentication happens in-band with an `auth` frame, so the upgrade
/// itself is not gated.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<RelayState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, state: RelayState) {
    let (sink, stream) = socket.split();
    run_connection(sink, stream, state).await;
}

/// Drives one connection: a session reading `stream` and a writer feeding
/// `sink`. Returns once the session has ended and the sink has been
/// released.
async fn run_connection<S, R, E>(sink: S, stream: R, state: RelayState)
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
    R: Stream<Item = Result<Message, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let (outbound_tx, outbound_rx) = mpsc::channel::<Frame>(state.outbound_buffer);

    let session = Session::new(
        outbound_tx,
        state.services.clone(),
        state.registry.clone(),
        state.settings,
    );
    let connection_id = session.id();
    let writer = spawn_writer(sink, outbound_rx, connection_id);

    let inbound = stream.filter_map(|message| async move {
        match message {
            Ok(message) => Frame::from_ws(message).map(Ok),
            Err(e) => Some(Err(TransportError::new(e.to_string()))),
        }
    });

    session.serve(Box::pin(inbound)).await;

    release_writer(writer, state.close_grace, connection_id).await;
}

/// Forwards outbound frames to the socket until a close frame is written
/// or every sender is gone.
fn spawn_writer<S>(
    mut sink: S,
    mut outbound_rx: mpsc::Receiver<Frame>,
    connection_id: ConnectionId,
) -> JoinHandle<()>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
{
    tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let closing = frame == Frame::Close;
            if let Err(e) = sink.send(frame.into_ws()).await {
                tracing::debug!(connection_id = %connection_id, "send error: {}", e);
                break;
            }
            if closing {
                break;
            }
        }
        let _ = sink.close().await;
    })
}

/// Waits up to `grace` for the writer to finish on its own.
///
/// A writer still blocked on a peer that stopped reading is aborted, which
/// drops the sink and with it the connection. Returns whether the writer
/// finished within the grace period.
async fn release_writer(
    mut writer: JoinHandle<()>,
    grace: Duration,
    connection_id: ConnectionId,
) -> bool {
    match tokio::time::timeout(grace, &mut writer).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::debug!(connection_id = %connection_id, "writer task failed: {}", e);
            true
        }
        Err(_) => {
            tracing::debug!(
                connection_id = %connection_id,
                "writer still blocked after close, dropping connection"
            );
            writer.abort();
            false
        }
    }
}

/// Liveness check.
pub async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "pong" }))
}

/// Create axum router for the relay endpoints.
///
/// # Example
///
/// ```ignore
/// let app = relay_router("/ws/chats").with_state(relay_state);
/// ```
pub fn relay_router(ws_path: &str) -> Router<RelayState> {
    Router::new()
        .route(ws_path, get(ws_handler))
        .route(PING_PATH, get(ping))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockTokenVerifier;
    use crate::adapters::chat_store::InMemoryChatStore;
    use crate::adapters::directory::InMemoryDirectory;
    use crate::adapters::websocket::registry::{Registry, RegistryConfig};
    use crate::domain::chat::{ChatContent, ChatDelivery, ChatMessage};
    use crate::domain::directory::User;
    use crate::domain::foundation::UserId;
    use futures::channel::mpsc as fmpsc;
    use std::convert::Infallible;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Context, Poll};

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    /// A peer that never reads: every write stays pending forever.
    struct StalledSink {
        dropped: Arc<AtomicBool>,
    }

    impl Sink<Message> for StalledSink {
        type Error = Infallible;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            Poll::Pending
        }

        fn start_send(self: Pin<&mut Self>, _item: Message) -> Result<(), Infallible> {
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            Poll::Pending
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            Poll::Ready(Ok(()))
        }
    }

    impl Drop for StalledSink {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    async fn wait_for(flag: &AtomicBool) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while !flag.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("flag never set");
    }

    fn services() -> Arc<SessionServices> {
        Arc::new(SessionServices::new(
            Arc::new(MockTokenVerifier::new().with_user("token-2", uid("u_2"))),
            Arc::new(
                InMemoryDirectory::new()
                    .with_user(User::new(uid("u_1"), "alice", "Alice"))
                    .with_user(User::new(uid("u_2"), "bob", "Bob")),
            ),
            Arc::new(InMemoryChatStore::new()),
        ))
    }

    #[tokio::test]
    async fn relay_state_clamps_buffer_to_one() {
        let (registry, _task) = Registry::spawn(RegistryConfig::default());
        let services = services();

        let state = RelayState::new(
            services.clone(),
            registry,
            SessionSettings::default(),
            0,
            Duration::from_secs(1),
        );

        assert_eq!(state.outbound_buffer, 1);
        assert!(Arc::ptr_eq(&state.services, &services));
    }

    #[tokio::test]
    async fn writer_that_finishes_is_not_aborted() {
        let (tx, rx) = mpsc::channel(4);
        let writer = spawn_writer(futures::sink::drain::<Message>(), rx, ConnectionId::new());

        tx.send(Frame::text("pong")).await.unwrap();
        tx.send(Frame::Close).await.unwrap();

        assert!(release_writer(writer, Duration::from_secs(1), ConnectionId::new()).await);
    }

    #[tokio::test]
    async fn blocked_writer_is_aborted_and_drops_the_socket() {
        let dropped = Arc::new(AtomicBool::new(false));
        let sink = StalledSink {
            dropped: dropped.clone(),
        };
        let (tx, rx) = mpsc::channel(4);
        let writer = spawn_writer(sink, rx, ConnectionId::new());
        tx.send(Frame::text("stuck")).await.unwrap();

        let finished =
            release_writer(writer, Duration::from_millis(50), ConnectionId::new()).await;

        assert!(!finished);
        wait_for(&dropped).await;
    }

    #[tokio::test]
    async fn evicted_slow_connection_is_released() {
        let (registry, _task) = Registry::spawn(RegistryConfig {
            max_consecutive_drops: 1,
            ..RegistryConfig::default()
        });
        let state = RelayState::new(
            services(),
            registry.clone(),
            SessionSettings::default(),
            1,
            Duration::from_millis(50),
        );
        let dropped = Arc::new(AtomicBool::new(false));
        let sink = StalledSink {
            dropped: dropped.clone(),
        };
        let (in_tx, in_rx) = fmpsc::unbounded::<Result<Message, Infallible>>();
        in_tx
            .unbounded_send(Ok(Message::Text(
                r#"{"type":"auth","data":{"token":"token-2"}}"#.to_string(),
            )))
            .unwrap();

        let connection = tokio::spawn(run_connection(sink, in_rx, state));

        // The peer never reads, so wait on the registry for authentication.
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                let live = registry.live_sessions().await.unwrap();
                if live.iter().any(|s| s.user_id == Some(uid("u_2"))) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("session never authenticated");

        let delivery = ChatDelivery::direct(
            ChatMessage::new(uid("u_1"), "u_2", ChatContent::text("hi")),
            User::new(uid("u_2"), "bob", "Bob"),
        );
        for _ in 0..3 {
            registry.publish(delivery.clone()).await.unwrap();
        }

        tokio::time::timeout(Duration::from_secs(1), connection)
            .await
            .expect("connection handler never returned")
            .unwrap();
        wait_for(&dropped).await;
        assert!(registry.live_sessions().await.unwrap().is_empty());
        drop(in_tx);
    }

    #[tokio::test]
    async fn ping_returns_pong() {
        let Json(body) = ping().await;
        assert_eq!(body, serde_json::json!({ "message": "pong" }));
    }

    #[test]
    fn relay_router_accepts_a_custom_ws_path() {
        let _router = relay_router("/chat");
    }
}
