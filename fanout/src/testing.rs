//! Shared test doubles for the fan-out core.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{Error, Message, Transport};

pub(crate) fn message(message_id: &str, chat_id: &str, sender_id: &str) -> Message {
    Message {
        message_id: message_id.to_string(),
        chat_id: chat_id.to_string(),
        sender_id: sender_id.to_string(),
        text: "hi".to_string(),
        sent_at: "1700000000".to_string(),
    }
}

/// Spin until `condition` holds, failing the test after a few seconds.
pub(crate) async fn wait_for<F>(condition: F)
where
    F: Fn() -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Transport that forwards every written message into a channel.
pub(crate) struct ChannelTransport {
    written: Option<mpsc::UnboundedSender<Message>>,
    cancel: CancellationToken,
}

impl ChannelTransport {
    pub(crate) fn new() -> (
        Self,
        mpsc::UnboundedReceiver<Message>,
        CancellationToken,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let transport = Self {
            written: Some(tx),
            cancel: cancel.clone(),
        };
        (transport, rx, cancel)
    }

    /// A transport whose every write fails.
    pub(crate) fn failing() -> (Self, CancellationToken) {
        let cancel = CancellationToken::new();
        let transport = Self {
            written: None,
            cancel: cancel.clone(),
        };
        (transport, cancel)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&mut self, message: &Message) -> Result<(), Error> {
        match self.written {
            Some(ref tx) => tx
                .send(message.clone())
                .map_err(|_| Error::Transport("client stream closed".to_string())),
            None => Err(Error::Transport("broken pipe".to_string())),
        }
    }

    fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Transport whose writes never complete, like a client that stays connected
/// but stops reading.
pub(crate) struct StalledTransport {
    attempts: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl StalledTransport {
    /// The transport, a counter of writes started, and its cancellation token.
    pub(crate) fn new() -> (Self, Arc<AtomicUsize>, CancellationToken) {
        let attempts = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();
        let transport = Self {
            attempts: Arc::clone(&attempts),
            cancel: cancel.clone(),
        };
        (transport, attempts, cancel)
    }
}

#[async_trait]
impl Transport for StalledTransport {
    async fn send(&mut self, _message: &Message) -> Result<(), Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
