//! Fan-out configuration
//!
//! Delivery settings shared by the subscription sessions and the engine.

use std::fmt;
use std::str::FromStr;

/// Default per-session queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 500;

/// Default number of recent message ids remembered for duplicate suppression.
pub const DEFAULT_DEDUP_WINDOW: usize = 1024;

/// What the engine does when a recipient's queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Drop the new delivery for that recipient and log it.
    DropNewest,
    /// Evict the recipient's registry entry and terminate its session.
    Disconnect,
}

/// Whether a message is delivered back to the session of its own author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoPolicy {
    /// Never deliver a message to its sender.
    SkipSender,
    /// Deliver to the sender like any other live participant.
    IncludeSender,
}

#[derive(Debug, PartialEq, Eq)]
pub struct PolicyParseError(pub String);

impl fmt::Display for PolicyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown policy: {}", self.0)
    }
}

impl std::error::Error for PolicyParseError {}

impl FromStr for OverflowPolicy {
    type Err = PolicyParseError;
    fn from_str(policy: &str) -> Result<OverflowPolicy, Self::Err> {
        match policy.to_lowercase().as_str() {
            "drop-newest" => Ok(OverflowPolicy::DropNewest),
            "disconnect" => Ok(OverflowPolicy::Disconnect),
            _ => Err(PolicyParseError(policy.to_string())),
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => write!(f, "drop-newest"),
            OverflowPolicy::Disconnect => write!(f, "disconnect"),
        }
    }
}

impl FromStr for EchoPolicy {
    type Err = PolicyParseError;
    fn from_str(policy: &str) -> Result<EchoPolicy, Self::Err> {
        match policy.to_lowercase().as_str() {
            "skip-sender" => Ok(EchoPolicy::SkipSender),
            "include-sender" => Ok(EchoPolicy::IncludeSender),
            _ => Err(PolicyParseError(policy.to_string())),
        }
    }
}

impl fmt::Display for EchoPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EchoPolicy::SkipSender => write!(f, "skip-sender"),
            EchoPolicy::IncludeSender => write!(f, "include-sender"),
        }
    }
}

/// Configuration for the fan-out core
#[derive(Debug, Clone)]
pub struct FanOutConfig {
    /// Capacity of each live session's delivery queue (at least 1)
    pub queue_capacity: usize,
    /// Policy applied when a recipient's queue is full
    pub overflow_policy: OverflowPolicy,
    /// Whether senders receive their own messages
    pub echo_policy: EchoPolicy,
    /// Number of recent message ids remembered; 0 disables duplicate suppression
    pub dedup_window: usize,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::DropNewest,
            echo_policy: EchoPolicy::SkipSender,
            dedup_window: DEFAULT_DEDUP_WINDOW,
        }
    }
}

impl FanOutConfig {
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    pub fn echo_policy(mut self, policy: EchoPolicy) -> Self {
        self.echo_policy = policy;
        self
    }

    pub fn dedup_window(mut self, window: usize) -> Self {
        self.dedup_window = window;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policies_parse_case_insensitively() {
        assert_eq!(
            "DROP-NEWEST".parse::<OverflowPolicy>(),
            Ok(OverflowPolicy::DropNewest)
        );
        assert_eq!(
            "disconnect".parse::<OverflowPolicy>(),
            Ok(OverflowPolicy::Disconnect)
        );
        assert_eq!(
            "Include-Sender".parse::<EchoPolicy>(),
            Ok(EchoPolicy::IncludeSender)
        );
        assert!("drop-oldest".parse::<OverflowPolicy>().is_err());
    }

    #[test]
    fn test_policies_display_as_they_parse() {
        for policy in [OverflowPolicy::DropNewest, OverflowPolicy::Disconnect] {
            assert_eq!(policy.to_string().parse::<OverflowPolicy>(), Ok(policy));
        }
        for policy in [EchoPolicy::SkipSender, EchoPolicy::IncludeSender] {
            assert_eq!(policy.to_string().parse::<EchoPolicy>(), Ok(policy));
        }
    }

    #[test]
    fn test_zero_queue_capacity_is_clamped() {
        let config = FanOutConfig::default().queue_capacity(0);
        assert_eq!(config.queue_capacity, 1);
    }
}
