use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::Error;

// Identifiers are opaque strings assigned by other services (identity, chat
// directory, producers). The fan-out core never interprets them.
pub type MessageId = String;
pub type ChatId = String;
pub type UserId = String;

/// A committed chat message as delivered to live subscribers.
///
/// All five fields must be non-empty for the message to be actionable; see
/// [`Message::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    /// Caller-generated, expected to be globally unique. Used for tracing and
    /// duplicate suppression.
    pub message_id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub text: String,
    /// Decimal string of Unix seconds at which the producer accepted the message.
    pub sent_at: String,
}

impl Message {
    /// Checks that every field is non-empty, reporting the first empty one.
    pub fn validate(&self) -> Result<(), Error> {
        let fields = [
            ("message_id", &self.message_id),
            ("chat_id", &self.chat_id),
            ("sender_id", &self.sender_id),
            ("text", &self.text),
            ("sent_at", &self.sent_at),
        ];

        match fields.iter().find(|(_, value)| value.is_empty()) {
            Some((name, _)) => Err(Error::MissingField(*name)),
            None => Ok(()),
        }
    }
}

/// A message as submitted by a producer, before the service stamps it with
/// an id and a timestamp.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct Draft {
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub text: String,
}

impl Draft {
    /// Producer-side content validation. The consumer re-validates the full
    /// record independently.
    pub fn validate(&self) -> Result<(), Error> {
        if self.chat_id.is_empty() {
            return Err(Error::MissingField("chat_id"));
        }
        if self.sender_id.is_empty() {
            return Err(Error::MissingField("sender_id"));
        }
        if self.text.is_empty() {
            return Err(Error::MissingField("text"));
        }
        Ok(())
    }

    /// Assigns a fresh message id and the current time.
    pub fn into_message(self) -> Message {
        Message {
            message_id: uuid::Uuid::new_v4().to_string(),
            chat_id: self.chat_id,
            sender_id: self.sender_id,
            text: self.text,
            sent_at: Utc::now().timestamp().to_string(),
        }
    }
}
