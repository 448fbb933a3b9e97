//! Bounded FIFO of received message frames awaiting a polling client.

use std::collections::VecDeque;

use bytes::Bytes;
use meshcore_protocol::{RESP_CODE_CHANNEL_MSG_RECV, RESP_CODE_CHANNEL_MSG_RECV_V3};
use tracing::debug;

use crate::error::SessionError;

/// One queued frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineEntry {
    pub frame: Bytes,
    /// Unix seconds at enqueue.
    pub enqueued_at: u32,
}

impl OfflineEntry {
    /// Channel messages are the only entries the queue may evict.
    pub fn is_channel_message(&self) -> bool {
        matches!(
            self.frame.first(),
            Some(&RESP_CODE_CHANNEL_MSG_RECV) | Some(&RESP_CODE_CHANNEL_MSG_RECV_V3)
        )
    }
}

/// Fixed-capacity queue.
///
/// When full, the oldest channel message makes room for the new frame. Direct
/// messages are never dropped; if nothing is evictable the enqueue fails and
/// the queue is left as it was.
#[derive(Debug, Clone)]
pub struct OfflineQueue {
    entries: VecDeque<OfflineEntry>,
    capacity: usize,
}

impl OfflineQueue {
    pub fn new(capacity: usize) -> Self {
        OfflineQueue {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn enqueue(&mut self, frame: Bytes, enqueued_at: u32) -> Result<(), SessionError> {
        if self.entries.len() >= self.capacity {
            let Some(victim) = self.entries.iter().position(OfflineEntry::is_channel_message) else {
                debug!(capacity = self.capacity, "offline queue full of direct messages");
                return Err(SessionError::QueueFull);
            };
            self.entries.remove(victim);
            debug!(position = victim, "evicted oldest channel message");
        }

        self.entries.push_back(OfflineEntry { frame, enqueued_at });
        Ok(())
    }

    /// Remove the oldest entry, whatever its kind.
    pub fn dequeue(&mut self) -> Option<OfflineEntry> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &OfflineEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshcore_protocol::{RESP_CODE_CONTACT_MSG_RECV, RESP_CODE_CONTACT_MSG_RECV_V3};

    fn direct(tag: u8) -> Bytes {
        Bytes::from(vec![RESP_CODE_CONTACT_MSG_RECV, tag])
    }

    fn channel(tag: u8) -> Bytes {
        Bytes::from(vec![RESP_CODE_CHANNEL_MSG_RECV_V3, tag])
    }

    fn tags(queue: &OfflineQueue) -> Vec<u8> {
        queue.iter().map(|e| e.frame[1]).collect()
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = OfflineQueue::new(4);
        queue.enqueue(direct(1), 10).unwrap();
        queue.enqueue(channel(2), 11).unwrap();
        queue.enqueue(direct(3), 12).unwrap();

        assert_eq!(queue.dequeue().unwrap().frame[1], 1);
        let second = queue.dequeue().unwrap();
        assert_eq!(second.frame[1], 2);
        assert_eq!(second.enqueued_at, 11);
        assert_eq!(queue.dequeue().unwrap().frame[1], 3);
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_full_queue_evicts_oldest_channel_message() {
        let mut queue = OfflineQueue::new(4);
        queue.enqueue(direct(1), 0).unwrap();
        queue.enqueue(channel(2), 0).unwrap();
        queue.enqueue(direct(3), 0).unwrap();
        queue.enqueue(channel(4), 0).unwrap();

        queue.enqueue(direct(5), 0).unwrap();
        assert_eq!(tags(&queue), vec![1, 3, 4, 5]);

        queue.enqueue(channel(6), 0).unwrap();
        assert_eq!(tags(&queue), vec![1, 3, 5, 6]);
    }

    #[test]
    fn test_full_queue_of_channel_messages_drops_first() {
        let mut queue = OfflineQueue::new(3);
        for tag in 1..=3 {
            queue.enqueue(channel(tag), tag as u32).unwrap();
        }

        queue.enqueue(channel(4), 4).unwrap();
        assert_eq!(queue.len(), 3);
        assert_eq!(tags(&queue), vec![2, 3, 4]);
        assert_eq!(queue.dequeue().unwrap().enqueued_at, 2);
    }

    #[test]
    fn test_full_queue_of_direct_messages_rejects() {
        let mut queue = OfflineQueue::new(3);
        for tag in 1..=3 {
            queue.enqueue(direct(tag), 0).unwrap();
        }

        assert_eq!(queue.enqueue(channel(9), 0), Err(SessionError::QueueFull));
        assert_eq!(queue.enqueue(direct(9), 0), Err(SessionError::QueueFull));
        assert_eq!(tags(&queue), vec![1, 2, 3]);
    }

    #[test]
    fn test_v1_and_v3_channel_codes_are_evictable() {
        assert!(OfflineEntry {
            frame: Bytes::from_static(&[RESP_CODE_CHANNEL_MSG_RECV]),
            enqueued_at: 0
        }
        .is_channel_message());
        assert!(!OfflineEntry {
            frame: Bytes::from_static(&[RESP_CODE_CONTACT_MSG_RECV_V3]),
            enqueued_at: 0
        }
        .is_channel_message());
        assert!(!OfflineEntry {
            frame: Bytes::new(),
            enqueued_at: 0
        }
        .is_channel_message());
    }
}
