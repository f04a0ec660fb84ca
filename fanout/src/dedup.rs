//! Bounded window of recently fanned-out message ids.
//!
//! Consumption from the log is at-least-once, so a record can be redelivered
//! after a crash or appended twice by a retrying producer. The window
//! suppresses such repeats while they are still recent. It lives in memory
//! only; across restarts downstream consumers deduplicate by `message_id`.

use std::collections::{HashSet, VecDeque};

use crate::MessageId;

pub struct DedupWindow {
    capacity: usize,
    order: VecDeque<MessageId>,
    seen: HashSet<MessageId>,
}

impl DedupWindow {
    /// A window remembering at most `capacity` ids; 0 disables it.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.seen.contains(message_id)
    }

    /// Remember `message_id`, forgetting the oldest id once full.
    pub fn insert(&mut self, message_id: MessageId) {
        if !self.is_enabled() || self.seen.contains(&message_id) {
            return;
        }

        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }

        self.seen.insert(message_id.clone());
        self.order.push_back(message_id);
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remembers_recent_ids() {
        let mut window = DedupWindow::new(2);
        window.insert("m1".to_string());

        assert!(window.contains("m1"));
        assert!(!window.contains("m2"));
    }

    #[test]
    fn test_forgets_oldest_when_full() {
        let mut window = DedupWindow::new(2);
        window.insert("m1".to_string());
        window.insert("m2".to_string());
        window.insert("m3".to_string());

        assert!(!window.contains("m1"));
        assert!(window.contains("m2"));
        assert!(window.contains("m3"));
    }

    #[test]
    fn test_repeat_insert_does_not_refresh_or_grow() {
        let mut window = DedupWindow::new(2);
        window.insert("m1".to_string());
        window.insert("m1".to_string());
        window.insert("m2".to_string());

        // The repeat did not take a slot, so m1 is still remembered.
        assert!(window.contains("m1"));
        assert!(window.contains("m2"));
    }

    #[test]
    fn test_zero_capacity_disables_window() {
        let mut window = DedupWindow::new(0);
        window.insert("m1".to_string());

        assert!(!window.is_enabled());
        assert!(!window.contains("m1"));
    }
}
