//! Versioned wire schema for records on the `messages` log.
//!
//! Every record is a JSON object carrying an explicit `version`. Only
//! [`SCHEMA_VERSION`] is understood; anything else is rejected instead of
//! being guessed at.
//!
//! ```json
//! {"version":1,"message_id":"m1","chat_id":"c1","sender_id":"u3",
//!  "message_text":"hi","sent_ts":"1700000000"}
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Message};

/// The schema version written by [`encode`] and accepted by [`decode`].
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Deserialize)]
struct Envelope {
    version: u32,
}

// Absent string fields decode as empty so that validation, not decoding,
// reports them.
#[derive(Serialize, Deserialize)]
struct WireRecord {
    version: u32,
    #[serde(default)]
    message_id: String,
    #[serde(default)]
    chat_id: String,
    #[serde(default)]
    sender_id: String,
    #[serde(default)]
    message_text: String,
    #[serde(default)]
    sent_ts: String,
}

/// Encodes a message as a current-version log record.
pub fn encode(message: &Message) -> Result<Vec<u8>, Error> {
    let record = WireRecord {
        version: SCHEMA_VERSION,
        message_id: message.message_id.clone(),
        chat_id: message.chat_id.clone(),
        sender_id: message.sender_id.clone(),
        message_text: message.text.clone(),
        sent_ts: message.sent_at.clone(),
    };

    serde_json::to_vec(&record).map_err(|e| Error::Encode(e.to_string()))
}

/// Decodes a log record payload into a message.
///
/// The result is not validated; callers decide how to treat empty fields.
pub fn decode(payload: &[u8]) -> Result<Message, Error> {
    let envelope: Envelope =
        serde_json::from_slice(payload).map_err(|e| Error::Decode(e.to_string()))?;

    if envelope.version != SCHEMA_VERSION {
        return Err(Error::UnsupportedVersion(envelope.version));
    }

    let record: WireRecord =
        serde_json::from_slice(payload).map_err(|e| Error::Decode(e.to_string()))?;

    Ok(Message {
        message_id: record.message_id,
        chat_id: record.chat_id,
        sender_id: record.sender_id,
        text: record.message_text,
        sent_at: record.sent_ts,
    })
}
