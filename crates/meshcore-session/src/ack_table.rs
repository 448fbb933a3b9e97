//! Correlation of delivery ACK codes back to the contact that owes them.

use tracing::trace;

/// An outstanding delivery confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedAck {
    pub ack_code: u32,
    /// Key (or key prefix) of the contact the message went to.
    pub contact_key: Vec<u8>,
    /// Unix seconds at registration.
    pub registered_at: u32,
}

/// Fixed-size circular table of [`ExpectedAck`]s.
///
/// Each add writes the slot under the cursor and advances it, overwriting
/// whatever was there. A code is live in at most one slot.
#[derive(Debug, Clone)]
pub struct ExpectedAckTable {
    slots: Box<[Option<ExpectedAck>]>,
    next: usize,
}

impl ExpectedAckTable {
    pub fn new(capacity: usize) -> Self {
        ExpectedAckTable {
            slots: vec![None; capacity.max(1)].into_boxed_slice(),
            next: 0,
        }
    }

    pub fn add(&mut self, ack_code: u32, contact_key: impl Into<Vec<u8>>, registered_at: u32) {
        // One live entry per code wins over plain circular overwrite. The
        // older entry is cleared, and the new one still lands on the cursor.
        for slot in self.slots.iter_mut() {
            if slot.as_ref().is_some_and(|e| e.ack_code == ack_code) {
                *slot = None;
            }
        }

        if let Some(old) = &self.slots[self.next] {
            trace!(ack_code = old.ack_code, "overwriting unconfirmed ack");
        }
        self.slots[self.next] = Some(ExpectedAck {
            ack_code,
            contact_key: contact_key.into(),
            registered_at,
        });
        self.next = (self.next + 1) % self.slots.len();
    }

    /// Remove and return the entry for `ack_code`. Unknown codes are ignored.
    pub fn check(&mut self, ack_code: u32) -> Option<ExpectedAck> {
        self.slots
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|e| e.ack_code == ack_code))
            .and_then(Option::take)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_removes_entry() {
        let mut table = ExpectedAckTable::new(8);
        table.add(0xAABB, vec![1, 2, 3, 4, 5, 6], 100);

        let hit = table.check(0xAABB).unwrap();
        assert_eq!(hit.contact_key, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(hit.registered_at, 100);
        assert!(table.check(0xAABB).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_unknown_code_is_ignored() {
        let mut table = ExpectedAckTable::new(2);
        table.add(1, vec![1], 0);
        assert!(table.check(99).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_cursor_overwrites_oldest_when_full() {
        let mut table = ExpectedAckTable::new(3);
        for code in 1..=4 {
            table.add(code, vec![code as u8], 0);
        }
        // Slot 0 held code 1 and was overwritten by code 4.
        assert!(table.check(1).is_none());
        for code in 2..=4 {
            assert!(table.check(code).is_some(), "code {}", code);
        }
    }

    #[test]
    fn test_cursor_advances_past_checked_slots() {
        let mut table = ExpectedAckTable::new(2);
        table.add(1, vec![1], 0);
        table.add(2, vec![2], 0);
        table.check(2);
        // The cursor is back at slot 0 and overwrites code 1, not the free slot.
        table.add(3, vec![3], 0);
        assert!(table.check(1).is_none());
        assert!(table.check(3).is_some());
    }

    #[test]
    fn test_duplicate_code_keeps_newest() {
        let mut table = ExpectedAckTable::new(4);
        table.add(7, vec![0xA], 1);
        table.add(7, vec![0xB], 2);
        assert_eq!(table.len(), 1);

        let hit = table.check(7).unwrap();
        assert_eq!(hit.contact_key, vec![0xB]);
        assert!(table.check(7).is_none());
    }

    #[test]
    fn test_duplicate_code_still_takes_cursor_slot() {
        let mut table = ExpectedAckTable::new(2);
        table.add(1, vec![0x1], 0);
        table.add(2, vec![0x2], 0);

        // Slot 1 is cleared, slot 0 under the cursor takes the new entry.
        table.add(2, vec![0xB], 1);
        assert_eq!(table.len(), 1);
        assert!(table.check(1).is_none());
        assert_eq!(table.check(2).unwrap().contact_key, vec![0xB]);
    }
}
