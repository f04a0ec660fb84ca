//! Chat message types and the log wire schema for the fan-out service.
//!
//! This crate owns the one stable representation of a chat message that flows
//! from producers, through the durable `messages` log, to live subscribers.
//!
//! # Architecture
//!
//! - **Message**: the decoded, validated record delivered to subscribers
//! - **Draft**: what a producer submits before id and timestamp are assigned
//! - **schema**: the versioned wire encoding used on the log. Records are
//!   decoded exactly once at the log boundary, so nothing downstream ever
//!   branches on payload shape.
//!
//! This crate has no dependencies on the other workspace crates, so both the
//! fan-out core and the HTTP layer can share it without cycles.

pub mod error;
pub mod message;
pub mod schema;

pub use error::Error;
pub use message::{ChatId, Draft, Message, MessageId, UserId};
pub use schema::{decode, encode, SCHEMA_VERSION};
