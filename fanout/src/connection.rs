use dashmap::DashMap;
use log::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::{Error, Message, UserId};

/// A message queued for one recipient. Shared by every recipient of the same
/// record, so fan-out never copies message bodies.
pub type Delivery = Arc<Message>;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Sending half of one live session's bounded delivery queue.
///
/// This is the handle stored in the [`ConnectionRegistry`]; cloning it is cheap.
#[derive(Debug, Clone)]
pub struct Outbox {
    connection_id: ConnectionId,
    sender: mpsc::Sender<Delivery>,
    evicted: CancellationToken,
}

/// What a session observes on its own queue.
#[derive(Debug)]
pub enum Received {
    Delivery(Delivery),
    /// The engine evicted this queue as a slow consumer.
    Evicted,
    /// Every outbox for this queue is gone, i.e. a newer registration for the
    /// same user replaced this one.
    Superseded,
}

/// Receiving half of a session's delivery queue.
#[derive(Debug)]
pub struct Inbox {
    receiver: mpsc::Receiver<Delivery>,
    evicted: CancellationToken,
}

impl Outbox {
    /// Create a queue with the given capacity, returning both halves.
    pub fn channel(capacity: usize) -> (Outbox, Inbox) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let evicted = CancellationToken::new();

        let outbox = Outbox {
            connection_id: ConnectionId::new(),
            sender,
            evicted: evicted.clone(),
        };
        (outbox, Inbox { receiver, evicted })
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    /// Non-blocking enqueue. Fails immediately when the queue is full or the
    /// session has already released it.
    pub fn try_deliver(&self, delivery: Delivery) -> Result<(), TrySendError<Delivery>> {
        self.sender.try_send(delivery)
    }

    /// Signal the owning session that it has been disconnected as a slow
    /// consumer.
    pub fn evict(&self) {
        self.evicted.cancel();
    }
}

impl Inbox {
    /// Wait for the next event on this queue.
    ///
    /// Eviction takes priority over any backlog still sitting in the queue.
    pub async fn recv(&mut self) -> Received {
        tokio::select! {
            biased;
            _ = self.evicted.cancelled() => Received::Evicted,
            delivery = self.receiver.recv() => match delivery {
                Some(delivery) => Received::Delivery(delivery),
                None if self.evicted.is_cancelled() => Received::Evicted,
                None => Received::Superseded,
            },
        }
    }

    /// Token cancelled when the engine evicts this queue.
    pub fn eviction(&self) -> CancellationToken {
        self.evicted.clone()
    }

    /// Release the queue. Pending deliveries are discarded and further
    /// enqueue attempts fail as closed.
    pub fn close(&mut self) {
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
    }
}

/// Concurrent directory of live sessions, keyed by user id.
///
/// Sharded locking via `DashMap`; every operation touches a single key and is
/// safe for any number of concurrent callers.
pub struct ConnectionRegistry {
    connections: DashMap<UserId, Outbox>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Insert or overwrite the live queue for a user - O(1)
    ///
    /// A second registration for the same user replaces the first; the
    /// replaced outbox is returned.
    pub fn add(&self, user_id: UserId, outbox: Outbox) -> Option<Outbox> {
        let connection_id = outbox.connection_id().clone();
        let previous = self.connections.insert(user_id.clone(), outbox);

        if let Some(ref prev) = previous {
            debug!(
                "Connection {} for user {} replaced by {}",
                prev.connection_id().as_str(),
                user_id,
                connection_id.as_str()
            );
        }

        previous
    }

    /// Look up the live queue for a user - O(1)
    pub fn get(&self, user_id: &str) -> Result<Outbox, Error> {
        self.connections
            .get(user_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::NotFound(format!("connection for user {}", user_id)))
    }

    /// Remove a user's entry whichever connection owns it - O(1)
    ///
    /// Removing an absent entry returns `NotFound` and changes nothing.
    pub fn remove(&self, user_id: &str) -> Result<Outbox, Error> {
        self.connections
            .remove(user_id)
            .map(|(_, outbox)| outbox)
            .ok_or_else(|| Error::NotFound(format!("connection for user {}", user_id)))
    }

    /// Remove a user's entry only if it still belongs to `connection_id` - O(1)
    ///
    /// A session that was replaced by a newer registration must not remove
    /// the newer session's entry.
    pub fn remove_connection(
        &self,
        user_id: &str,
        connection_id: &ConnectionId,
    ) -> Result<Outbox, Error> {
        self.connections
            .remove_if(user_id, |_, outbox| outbox.connection_id() == connection_id)
            .map(|(_, outbox)| outbox)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "connection {} for user {}",
                    connection_id.as_str(),
                    user_id
                ))
            })
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.connections.contains_key(user_id)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str) -> Delivery {
        Arc::new(Message {
            message_id: id.to_string(),
            chat_id: "c1".to_string(),
            sender_id: "u3".to_string(),
            text: "hi".to_string(),
            sent_at: "1700000000".to_string(),
        })
    }

    #[test]
    fn test_add_and_get() {
        let registry = ConnectionRegistry::new();
        let (outbox, _inbox) = Outbox::channel(4);
        let connection_id = outbox.connection_id().clone();

        assert!(registry.add("u1".to_string(), outbox).is_none());

        let found = registry.get("u1").unwrap();
        assert_eq!(found.connection_id(), &connection_id);
        assert!(matches!(registry.get("u2"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_second_registration_replaces_first() {
        let registry = ConnectionRegistry::new();
        let (first, _first_inbox) = Outbox::channel(4);
        let (second, _second_inbox) = Outbox::channel(4);
        let first_id = first.connection_id().clone();
        let second_id = second.connection_id().clone();

        registry.add("u1".to_string(), first);
        let replaced = registry.add("u1".to_string(), second).unwrap();

        assert_eq!(replaced.connection_id(), &first_id);
        assert_eq!(registry.get("u1").unwrap().connection_id(), &second_id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_twice_is_not_found_and_leaves_others() {
        let registry = ConnectionRegistry::new();
        let (a, _a_inbox) = Outbox::channel(4);
        let (b, _b_inbox) = Outbox::channel(4);
        registry.add("u1".to_string(), a);
        registry.add("u2".to_string(), b);

        assert!(registry.remove("u1").is_ok());
        assert!(matches!(registry.remove("u1"), Err(Error::NotFound(_))));

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("u2"));
    }

    #[test]
    fn test_remove_connection_only_removes_own_entry() {
        let registry = ConnectionRegistry::new();
        let (old, _old_inbox) = Outbox::channel(4);
        let (new, _new_inbox) = Outbox::channel(4);
        let old_id = old.connection_id().clone();
        let new_id = new.connection_id().clone();

        registry.add("u1".to_string(), old);
        registry.add("u1".to_string(), new);

        assert!(matches!(
            registry.remove_connection("u1", &old_id),
            Err(Error::NotFound(_))
        ));
        assert!(registry.contains("u1"));

        assert!(registry.remove_connection("u1", &new_id).is_ok());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_add_and_remove() {
        let registry = Arc::new(ConnectionRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let user_id = format!("user-{}-{}", worker, i);
                        let (outbox, _inbox) = Outbox::channel(1);
                        registry.add(user_id.clone(), outbox);
                        if i % 2 == 0 {
                            registry.remove(&user_id).unwrap();
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 8 * 50);
    }

    #[tokio::test]
    async fn test_full_queue_rejects_without_blocking() {
        let (outbox, mut inbox) = Outbox::channel(1);

        outbox.try_deliver(message("m1")).unwrap();
        assert!(matches!(
            outbox.try_deliver(message("m2")),
            Err(TrySendError::Full(_))
        ));

        match inbox.recv().await {
            Received::Delivery(delivery) => assert_eq!(delivery.message_id, "m1"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_eviction_preempts_backlog() {
        let (outbox, mut inbox) = Outbox::channel(2);
        outbox.try_deliver(message("m1")).unwrap();

        outbox.evict();

        assert!(matches!(inbox.recv().await, Received::Evicted));
    }

    #[tokio::test]
    async fn test_dropping_every_outbox_supersedes_inbox() {
        let (outbox, mut inbox) = Outbox::channel(2);
        drop(outbox);

        assert!(matches!(inbox.recv().await, Received::Superseded));
    }

    #[tokio::test]
    async fn test_closed_inbox_rejects_deliveries() {
        let (outbox, mut inbox) = Outbox::channel(2);
        inbox.close();

        assert!(matches!(
            outbox.try_deliver(message("m1")),
            Err(TrySendError::Closed(_))
        ));
    }
}
