//! Message fan-out core for real-time chat delivery.
//!
//! This crate keeps track of which users currently hold a live delivery
//! session, consumes committed chat messages from the durable `messages` log,
//! resolves each message's recipients, and pushes it to every connected one.
//!
//! # Architecture
//!
//! ```text
//!   producers ──► [messages log] ──► FanOutEngine (single ordered consumer)
//!                                        │  MembershipResolver::get_participants
//!                                        │  ConnectionRegistry::get
//!                                        ▼
//!                        Outbox (bounded) ──► Inbox ──► SubscriptionSession ──► Transport
//! ```
//!
//! - **Single ordered consumer**: exactly one engine task drains the log in
//!   commit order, which preserves per-chat delivery order.
//! - **One queue per user**: the registry maps a user id to one bounded
//!   outbox; a newer registration replaces the older one.
//! - **Never block the consumer**: deliveries use a non-blocking enqueue and a
//!   named [`OverflowPolicy`] decides what happens when a queue is full.
//! - **Best effort**: offline users receive nothing; there is no buffering or
//!   retry for them.
//! - **Injected state**: the registry and resolver are explicitly owned and
//!   passed by `Arc` into both the sessions and the engine, so a core can be
//!   built and torn down per test.
//!
//! # Modules
//!
//! - `connection`: ConnectionRegistry, Outbox/Inbox queue halves, ConnectionId
//! - `membership`: MembershipResolver trait and the in-memory directory
//! - `session`: Subscribe entry point and the per-connection state machine
//! - `engine`: FanOutEngine and per-record reports
//! - `message_log`: consumer interface over the durable log, in-memory log
//! - `dedup`: bounded window of recently fanned-out message ids
//! - `config`: queue capacity, overflow, echo and dedup settings

pub mod config;
pub mod connection;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod membership;
pub mod message_log;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::{EchoPolicy, FanOutConfig, OverflowPolicy};
pub use connection::{ConnectionId, ConnectionRegistry, Delivery, Inbox, Outbox, Received};
pub use engine::{FanOutEngine, Outcome, Report};
pub use error::Error;
pub use membership::{InMemoryMembership, MembershipResolver, StaticDirectory};
pub use message_log::{
    in_memory, CommitPosition, InMemoryLog, LogAppender, LogRecord, MessageLog, MESSAGES_TOPIC,
};
pub use session::{SessionState, SubscriptionService, SubscriptionSession, Transport};

pub use messages::{ChatId, Draft, Message, MessageId, UserId};
