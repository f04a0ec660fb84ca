//! Server-sent events edge for the Subscribe call.
//!
//! The handler runs one subscription session per HTTP stream. Deliveries are
//! handed from the session to the response body through a small bounded
//! buffer, so a slow client backs up into the session's queue where the
//! overflow policy applies.

pub mod handler;
pub(crate) mod transport;
