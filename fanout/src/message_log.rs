//! Consumer interface over the durable input log.
//!
//! The durable log itself (a Kafka-style topic conventionally named
//! `messages`) is an external collaborator. The engine only needs to read
//! records in commit order and advance its commit position, which is what
//! [`MessageLog`] captures. [`InMemoryLog`] is an in-process implementation
//! used by the standalone binary and by tests.

use async_trait::async_trait;
use log::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::{Error, Message};

/// Conventional name of the topic carrying chat messages.
pub const MESSAGES_TOPIC: &str = "messages";

/// One record read from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Position assigned by the log, strictly increasing in append order
    pub offset: u64,
    /// Encoded message, see `messages::schema`
    pub payload: Vec<u8>,
}

/// Ordered, offset-addressed source of records for the fan-out engine.
#[async_trait]
pub trait MessageLog: Send {
    /// Name of the topic being consumed
    fn topic(&self) -> &str;

    /// Wait for the next record in commit order. `None` once the log is
    /// closed and drained.
    async fn next_record(&mut self) -> Option<LogRecord>;

    /// Mark every record up to and including `offset` as processed.
    async fn commit(&mut self, offset: u64) -> Result<(), Error>;
}

/// Create a connected in-memory log for `topic`.
pub fn in_memory(topic: &str) -> (LogAppender, InMemoryLog) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let topic: Arc<str> = Arc::from(topic);
    let position = Arc::new(AtomicU64::new(0));

    let appender = LogAppender {
        topic: Arc::clone(&topic),
        next: Arc::new(Mutex::new(Appender {
            next_offset: 0,
            sender,
        })),
        position: Arc::clone(&position),
    };

    let log = InMemoryLog {
        topic,
        receiver,
        position,
    };

    (appender, log)
}

struct Appender {
    next_offset: u64,
    sender: mpsc::UnboundedSender<LogRecord>,
}

/// Producer side of an [`InMemoryLog`]. Cheap to clone.
#[derive(Clone)]
pub struct LogAppender {
    topic: Arc<str>,
    // Offset assignment and send happen under one lock so records enter the
    // queue in offset order.
    next: Arc<Mutex<Appender>>,
    position: Arc<AtomicU64>,
}

impl LogAppender {
    /// Append a raw payload and return its offset.
    ///
    /// Success means the record is in the log; it says nothing about delivery.
    pub fn append(&self, payload: Vec<u8>) -> Result<u64, Error> {
        let mut next = self
            .next
            .lock()
            .map_err(|_| Error::Log("appender lock poisoned".to_string()))?;

        let offset = next.next_offset;
        next.sender
            .send(LogRecord { offset, payload })
            .map_err(|_| Error::Log(format!("topic {} is closed", self.topic)))?;
        next.next_offset += 1;

        trace!("Appended record {} to topic {}", offset, self.topic);
        Ok(offset)
    }

    /// Encode a message with the current schema and append it.
    pub fn append_message(&self, message: &Message) -> Result<u64, Error> {
        let payload = messages::encode(message).map_err(|e| Error::Log(e.to_string()))?;
        self.append(payload)
    }

    /// A read-only view of the commit position that does not keep the log open.
    pub fn commit_position(&self) -> CommitPosition {
        CommitPosition(Arc::clone(&self.position))
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// Read-only view of an in-memory log's commit position.
#[derive(Debug, Clone)]
pub struct CommitPosition(Arc<AtomicU64>);

impl CommitPosition {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

/// Consumer side of the in-memory log.
pub struct InMemoryLog {
    topic: Arc<str>,
    receiver: mpsc::UnboundedReceiver<LogRecord>,
    position: Arc<AtomicU64>,
}

#[async_trait]
impl MessageLog for InMemoryLog {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn next_record(&mut self) -> Option<LogRecord> {
        self.receiver.recv().await
    }

    async fn commit(&mut self, offset: u64) -> Result<(), Error> {
        let position = self.position.load(Ordering::Acquire);
        if offset < position {
            return Err(Error::Log(format!(
                "commit of offset {} behind position {}",
                offset, position
            )));
        }

        self.position.store(offset + 1, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_arrive_in_offset_order() {
        let (appender, mut log) = in_memory(MESSAGES_TOPIC);

        assert_eq!(appender.append(b"a".to_vec()).unwrap(), 0);
        assert_eq!(appender.append(b"b".to_vec()).unwrap(), 1);

        assert_eq!(log.topic(), "messages");
        assert_eq!(appender.topic(), "messages");
        assert_eq!(log.next_record().await.unwrap().payload, b"a");
        let second = log.next_record().await.unwrap();
        assert_eq!(second.offset, 1);
        assert_eq!(second.payload, b"b");
    }

    #[tokio::test]
    async fn test_commit_advances_position() {
        let (appender, mut log) = in_memory(MESSAGES_TOPIC);
        appender.append(b"a".to_vec()).unwrap();

        let position = appender.commit_position();
        let record = log.next_record().await.unwrap();
        assert_eq!(position.get(), 0);

        log.commit(record.offset).await.unwrap();
        assert_eq!(position.get(), 1);

        // Committing behind the current position is rejected.
        assert!(matches!(log.commit(0).await, Err(Error::Log(_))));
    }

    #[tokio::test]
    async fn test_log_closes_when_appenders_drop() {
        let (appender, mut log) = in_memory(MESSAGES_TOPIC);
        appender.append(b"a".to_vec()).unwrap();
        drop(appender);

        assert!(log.next_record().await.is_some());
        assert!(log.next_record().await.is_none());
    }

    #[tokio::test]
    async fn test_append_after_consumer_drop_fails() {
        let (appender, log) = in_memory(MESSAGES_TOPIC);
        drop(log);

        assert!(matches!(appender.append(b"a".to_vec()), Err(Error::Log(_))));
    }
}
