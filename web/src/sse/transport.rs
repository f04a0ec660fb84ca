use async_trait::async_trait;
use axum::response::sse::Event;
use fanout::{Error, Message, Transport};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Events buffered between a session and its HTTP response body.
pub(crate) const EVENT_BUFFER: usize = 16;

/// SSE event name carrying one delivered message.
pub(crate) const MESSAGE_EVENT: &str = "message";

/// Transport that writes deliveries as SSE events into the response stream.
pub(crate) struct SseTransport {
    events: mpsc::Sender<Event>,
    cancel: CancellationToken,
}

impl SseTransport {
    /// The transport plus the receiving end the response body drains and the
    /// token cancelled when the body is dropped. The token is also cancelled
    /// with `parent`.
    pub(crate) fn new(parent: &CancellationToken) -> (Self, mpsc::Receiver<Event>, CancellationToken) {
        let (events, receiver) = mpsc::channel(EVENT_BUFFER);
        let cancel = parent.child_token();

        let transport = Self {
            events,
            cancel: cancel.clone(),
        };

        (transport, receiver, cancel)
    }
}

pub(crate) fn message_event(message: &Message) -> Result<Event, Error> {
    Event::default()
        .event(MESSAGE_EVENT)
        .id(message.message_id.as_str())
        .json_data(message)
        .map_err(|e| Error::Transport(format!("failed to encode event: {e}")))
}

#[async_trait]
impl Transport for SseTransport {
    async fn send(&mut self, message: &Message) -> Result<(), Error> {
        let event = message_event(message)?;

        self.events
            .send(event)
            .await
            .map_err(|_| Error::Transport("client stream closed".to_string()))
    }

    fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> Message {
        Message {
            message_id: "m1".to_string(),
            chat_id: "c1".to_string(),
            sender_id: "u1".to_string(),
            text: "hello".to_string(),
            sent_at: "1700000000".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_forwards_event() {
        let (mut transport, mut receiver, _cancel) = SseTransport::new(&CancellationToken::new());

        transport.send(&message()).await.unwrap();

        assert!(receiver.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_send_fails_once_body_is_dropped() {
        let (mut transport, receiver, _cancel) = SseTransport::new(&CancellationToken::new());
        drop(receiver);

        assert!(matches!(
            transport.send(&message()).await,
            Err(Error::Transport(_))
        ));
    }

    #[test]
    fn test_parent_cancellation_reaches_transport() {
        let parent = CancellationToken::new();
        let (transport, _receiver, _cancel) = SseTransport::new(&parent);
        parent.cancel();

        assert!(transport.cancellation().is_cancelled());
    }

    #[test]
    fn test_cancellation_is_shared() {
        let (transport, _receiver, cancel) = SseTransport::new(&CancellationToken::new());
        cancel.cancel();

        assert!(transport.cancellation().is_cancelled());
    }
}
