//! Subscription sessions
//!
//! A session is the per-connection state machine behind the streaming
//! Subscribe call:
//!
//! ```text
//!   Registering ──(registered + membership bootstrapped)──► Streaming
//!        │                                                     │
//!        └──(bootstrap failed)──► Terminated ◄──(cancelled | write failed | evicted | superseded)
//! ```
//!
//! On entering `Terminated`, by whatever path, the session removes its own
//! registry entry and releases its queue exactly once. Dropping a session
//! that has not terminated yet terminates it, so an aborted Subscribe task
//! still cleans up.

use async_trait::async_trait;
use log::*;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::connection::{Inbox, Outbox, Received};
use crate::{ConnectionId, ConnectionRegistry, Error, FanOutConfig, MembershipResolver, Message};

/// The client-facing side of a live subscription.
#[async_trait]
pub trait Transport: Send {
    /// Push one message to the client. An error ends the session.
    async fn send(&mut self, message: &Message) -> Result<(), Error>;

    /// Token cancelled when the client disconnects or the caller gives up.
    fn cancellation(&self) -> CancellationToken;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Registering,
    Streaming,
    Terminated,
}

/// Entry point for the streaming Subscribe call.
#[derive(Clone)]
pub struct SubscriptionService {
    registry: Arc<ConnectionRegistry>,
    membership: Arc<dyn MembershipResolver>,
    queue_capacity: usize,
}

impl SubscriptionService {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        membership: Arc<dyn MembershipResolver>,
        config: &FanOutConfig,
    ) -> Self {
        Self {
            registry,
            membership,
            queue_capacity: config.queue_capacity,
        }
    }

    /// Stream every message delivered to `user_id` into `transport`.
    ///
    /// Blocks for the whole session and returns once it has terminated:
    /// `Ok` after cancellation, an error if a write failed or the session
    /// was evicted. An empty `user_id` is rejected before anything is
    /// registered.
    pub async fn subscribe<T>(&self, user_id: &str, mut transport: T) -> Result<(), Error>
    where
        T: Transport,
    {
        if user_id.is_empty() {
            return Err(Error::Input("user ID required".to_string()));
        }

        let mut session = SubscriptionSession::register(
            user_id,
            Arc::clone(&self.registry),
            self.membership.as_ref(),
            self.queue_capacity,
        )
        .await?;

        session.stream(&mut transport).await
    }
}

/// How a write in flight ended.
enum Write {
    Cancelled,
    Evicted,
    Done(Result<(), Error>),
}

/// One live connection's registration and delivery loop.
pub struct SubscriptionSession {
    user_id: String,
    connection_id: ConnectionId,
    inbox: Inbox,
    registry: Arc<ConnectionRegistry>,
    state: SessionState,
}

impl SubscriptionSession {
    /// Register a fresh queue for `user_id` and bootstrap their membership.
    ///
    /// Any existing registration for the user is replaced. If bootstrap
    /// fails the registration is rolled back and the error returned.
    pub async fn register(
        user_id: &str,
        registry: Arc<ConnectionRegistry>,
        membership: &dyn MembershipResolver,
        queue_capacity: usize,
    ) -> Result<Self, Error> {
        let (outbox, inbox) = Outbox::channel(queue_capacity);

        let mut session = Self {
            user_id: user_id.to_string(),
            connection_id: outbox.connection_id().clone(),
            inbox,
            registry,
            state: SessionState::Registering,
        };

        session.registry.add(session.user_id.clone(), outbox);

        if let Err(e) = membership.bootstrap(user_id).await {
            warn!("Membership bootstrap failed for user {}: {}", user_id, e);
            session.terminate();
            return Err(e);
        }

        session.state = SessionState::Streaming;
        info!(
            "User {} subscribed on connection {}",
            session.user_id,
            session.connection_id.as_str()
        );

        Ok(session)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Deliver queued messages to `transport` until the session terminates.
    ///
    /// Cancellation and eviction are observed while waiting for a delivery
    /// and while a write is in flight; an interrupted write is abandoned.
    pub async fn stream<T>(&mut self, transport: &mut T) -> Result<(), Error>
    where
        T: Transport + ?Sized,
    {
        let cancelled = transport.cancellation();
        let evicted = self.inbox.eviction();

        while self.state == SessionState::Streaming {
            // Exactly one of: cancelled, or something arrived on our queue.
            let received = tokio::select! {
                biased;
                _ = cancelled.cancelled() => None,
                received = self.inbox.recv() => Some(received),
            };

            let message = match received {
                None => {
                    self.disconnected();
                    return Ok(());
                }
                Some(Received::Evicted) => return Err(self.evicted()),
                Some(Received::Superseded) => {
                    info!(
                        "Connection {} for user {} superseded by a newer connection",
                        self.connection_id.as_str(),
                        self.user_id
                    );
                    self.terminate();
                    return Ok(());
                }
                Some(Received::Delivery(message)) => message,
            };

            let written = tokio::select! {
                biased;
                _ = cancelled.cancelled() => Write::Cancelled,
                _ = evicted.cancelled() => Write::Evicted,
                result = transport.send(&message) => Write::Done(result),
            };

            match written {
                Write::Cancelled => {
                    self.disconnected();
                    return Ok(());
                }
                Write::Evicted => return Err(self.evicted()),
                Write::Done(Err(e)) => {
                    error!(
                        "Error sending message {} to user {}: {}",
                        message.message_id, self.user_id, e
                    );
                    self.terminate();
                    return Err(e);
                }
                Write::Done(Ok(())) => trace!(
                    "Delivered message {} to user {}",
                    message.message_id,
                    self.user_id
                ),
            }
        }

        Ok(())
    }

    fn disconnected(&mut self) {
        info!("User {} disconnected", self.user_id);
        self.terminate();
    }

    fn evicted(&mut self) -> Error {
        warn!(
            "User {} evicted as a slow consumer on connection {}",
            self.user_id,
            self.connection_id.as_str()
        );
        self.terminate();
        Error::Evicted(self.user_id.clone())
    }

    fn terminate(&mut self) {
        if self.state == SessionState::Terminated {
            return;
        }
        self.state = SessionState::Terminated;

        // The engine may already have evicted us, or a newer connection may
        // own the entry; either way there is nothing of ours left to remove.
        match self
            .registry
            .remove_connection(&self.user_id, &self.connection_id)
        {
            Ok(_) => debug!(
                "Removed connection {} for user {}",
                self.connection_id.as_str(),
                self.user_id
            ),
            Err(_) => debug!(
                "Connection {} for user {} was already removed",
                self.connection_id.as_str(),
                self.user_id
            ),
        }

        self.inbox.close();
    }
}

impl Drop for SubscriptionSession {
    fn drop(&mut self) {
        self.terminate();
    }
}
