//! Live-session registry and fan-out broadcaster.
//!
//! A single coordinator task owns the live-session set. Sessions talk to it
//! through bounded queues: admissions, retirements, outbound chat events and
//! introspection queries. The coordinator blocks on all four at once and
//! wakes only when one of them has work.
//!
//! ```text
//!  Session ──admit──┐
//!  Session ─retire──┤     ┌─────────────┐     try_send     ┌──────────┐
//!  Session publish──┼───▶ │ coordinator │ ───────────────▶ │ outbound │ ─▶ writer
//!  live_sessions ───┘     └─────────────┘  (per session)   └──────────┘
//! ```
//!
//! Delivery is best-effort and at most once per live session. A session
//! whose outbound buffer stays full for `max_consecutive_drops` events in a
//! row is evicted and told to close.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio::sync::{mpsc, oneshot, watch, Notify};
use tokio::task::JoinHandle;

use crate::domain::chat::ChatDelivery;
use crate::domain::foundation::{ConnectionId, UserId};

use super::messages::ServerMessage;
use super::transport::Frame;

/// Registry tuning.
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    /// Capacity of each coordinator queue.
    pub queue_capacity: usize,
    /// Consecutive full-buffer drops before a session is evicted.
    pub max_consecutive_drops: u32,
    /// Whether a group chat is also delivered to the sender's sessions.
    pub include_sender_in_group_fanout: bool,
    /// How long a hand-off to the coordinator may wait for queue space.
    pub handoff_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            max_consecutive_drops: 8,
            include_sender_in_group_fanout: true,
            handoff_timeout: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("registry is no longer running")]
    Closed,

    #[error("registry did not accept the hand-off in time")]
    Timeout,
}

/// What the registry keeps for one session: never the session itself.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: ConnectionId,
    user: watch::Receiver<Option<UserId>>,
    outbound: mpsc::Sender<Frame>,
    evict: Arc<Notify>,
}

impl SessionHandle {
    pub fn new(
        id: ConnectionId,
        user: watch::Receiver<Option<UserId>>,
        outbound: mpsc::Sender<Frame>,
        evict: Arc<Notify>,
    ) -> Self {
        Self {
            id,
            user,
            outbound,
            evict,
        }
    }

    /// The user this session authenticated as, if it has.
    pub fn user_id(&self) -> Option<UserId> {
        self.user.borrow().clone()
    }
}

/// A live session as reported by [`RegistryHandle::live_sessions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSession {
    pub id: ConnectionId,
    pub user_id: Option<UserId>,
}

/// Cloneable front door to the coordinator.
#[derive(Clone)]
pub struct RegistryHandle {
    admit_tx: mpsc::Sender<SessionHandle>,
    retire_tx: mpsc::Sender<ConnectionId>,
    event_tx: mpsc::Sender<ChatDelivery>,
    query_tx: mpsc::Sender<oneshot::Sender<Vec<LiveSession>>>,
    handoff_timeout: Duration,
}

impl RegistryHandle {
    /// Adds a session to the live set. Admitting the same id twice is a no-op.
    pub async fn admit(&self, session: SessionHandle) -> Result<(), RegistryError> {
        hand_off(&self.admit_tx, session, self.handoff_timeout).await
    }

    /// Removes a session. Unknown ids are ignored.
    pub async fn retire(&self, id: ConnectionId) -> Result<(), RegistryError> {
        hand_off(&self.retire_tx, id, self.handoff_timeout).await
    }

    /// Queues a stored chat for fan-out.
    pub async fn publish(&self, delivery: ChatDelivery) -> Result<(), RegistryError> {
        hand_off(&self.event_tx, delivery, self.handoff_timeout).await
    }

    /// Snapshot of the live set, taken by the coordinator itself.
    pub async fn live_sessions(&self) -> Result<Vec<LiveSession>, RegistryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        hand_off(&self.query_tx, reply_tx, self.handoff_timeout).await?;
        reply_rx.await.map_err(|_| RegistryError::Closed)
    }
}

async fn hand_off<T>(
    tx: &mpsc::Sender<T>,
    value: T,
    timeout: Duration,
) -> Result<(), RegistryError> {
    tx.send_timeout(value, timeout).await.map_err(|e| match e {
        SendTimeoutError::Timeout(_) => RegistryError::Timeout,
        SendTimeoutError::Closed(_) => RegistryError::Closed,
    })
}

struct Entry {
    handle: SessionHandle,
    consecutive_drops: u32,
}

/// The coordinator. Created and started with [`Registry::spawn`].
pub struct Registry {
    config: RegistryConfig,
    sessions: HashMap<ConnectionId, Entry>,
    admit_rx: mpsc::Receiver<SessionHandle>,
    retire_rx: mpsc::Receiver<ConnectionId>,
    event_rx: mpsc::Receiver<ChatDelivery>,
    query_rx: mpsc::Receiver<oneshot::Sender<Vec<LiveSession>>>,
}

impl Registry {
    /// Starts the coordinator task.
    ///
    /// The task stops once every [`RegistryHandle`] clone has been dropped.
    pub fn spawn(config: RegistryConfig) -> (RegistryHandle, JoinHandle<()>) {
        let capacity = config.queue_capacity.max(1);
        let (admit_tx, admit_rx) = mpsc::channel(capacity);
        let (retire_tx, retire_rx) = mpsc::channel(capacity);
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let (query_tx, query_rx) = mpsc::channel(capacity);

        let registry = Registry {
            config,
            sessions: HashMap::new(),
            admit_rx,
            retire_rx,
            event_rx,
            query_rx,
        };
        let handle = RegistryHandle {
            admit_tx,
            retire_tx,
            event_tx,
            query_tx,
            handoff_timeout: config.handoff_timeout,
        };

        (handle, tokio::spawn(registry.run()))
    }

    async fn run(mut self) {
        tracing::debug!("session registry started");

        // Admissions are drained first so a session admitted before an event
        // was published always sees that event.
        loop {
            tokio::select! {
                biased;
                Some(session) = self.admit_rx.recv() => self.admit(session),
                Some(id) = self.retire_rx.recv() => self.retire(&id),
                Some(delivery) = self.event_rx.recv() => self.fan_out(delivery),
                Some(reply) = self.query_rx.recv() => {
                    let _ = reply.send(self.snapshot());
                }
                else => break,
            }
        }

        tracing::debug!(live = self.sessions.len(), "session registry stopped");
    }

    fn admit(&mut self, handle: SessionHandle) {
        if self.sessions.contains_key(&handle.id) {
            tracing::debug!(connection_id = %handle.id, "session already admitted");
            return;
        }
        tracing::debug!(connection_id = %handle.id, "session admitted");
        self.sessions.insert(
            handle.id,
            Entry {
                handle,
                consecutive_drops: 0,
            },
        );
    }

    fn retire(&mut self, id: &ConnectionId) {
        if self.sessions.remove(id).is_some() {
            tracing::debug!(connection_id = %id, "session retired");
        }
    }

    fn snapshot(&self) -> Vec<LiveSession> {
        self.sessions
            .values()
            .map(|entry| LiveSession {
                id: entry.handle.id,
                user_id: entry.handle.user_id(),
            })
            .collect()
    }

    fn fan_out(&mut self, delivery: ChatDelivery) {
        let recipients = delivery.recipients(self.config.include_sender_in_group_fanout);
        if recipients.is_empty() {
            return;
        }

        let chat_id = delivery.chat.chat_id.clone();
        let frame = match ServerMessage::NewChat(delivery).to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, chat_id = %chat_id, "failed to encode new_chat");
                return;
            }
        };

        let max_drops = self.config.max_consecutive_drops;
        let mut delivered = 0usize;
        let mut gone = Vec::new();

        for (id, entry) in self.sessions.iter_mut() {
            let Some(user_id) = entry.handle.user_id() else {
                continue;
            };
            if !recipients.contains(&user_id) {
                continue;
            }

            match entry.handle.outbound.try_send(frame.clone()) {
                Ok(()) => {
                    entry.consecutive_drops = 0;
                    delivered += 1;
                }
                Err(TrySendError::Full(_)) => {
                    entry.consecutive_drops += 1;
                    if entry.consecutive_drops >= max_drops {
                        tracing::warn!(
                            connection_id = %id,
                            user_id = %user_id,
                            drops = entry.consecutive_drops,
                            "evicting slow session"
                        );
                        entry.handle.evict.notify_one();
                        gone.push(*id);
                    } else {
                        tracing::debug!(connection_id = %id, "outbound buffer full, event dropped");
                    }
                }
                Err(TrySendError::Closed(_)) => gone.push(*id),
            }
        }

        for id in gone {
            self.sessions.remove(&id);
        }

        tracing::debug!(
            chat_id = %chat_id,
            recipients = recipients.len(),
            delivered,
            "new_chat fanned out"
        );
    }
}
