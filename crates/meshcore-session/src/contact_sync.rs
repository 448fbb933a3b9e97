//! Incremental contact enumeration.
//!
//! A sync snapshots every contact modified strictly after the caller's
//! watermark, walks the snapshot oldest first, and hands back the newest
//! modification time so the caller can resume from it next time.

use meshcore_protocol::ContactInfo;

#[derive(Debug, Clone, Default)]
pub struct ContactIterator {
    snapshot: Vec<ContactInfo>,
    cursor: usize,
    since: u32,
    most_recent_lastmod: u32,
    active: bool,
}

impl ContactIterator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot `contacts` with `lastmod > since` and return how many matched.
    ///
    /// Starting again while a sync is active discards the previous snapshot.
    pub fn begin<'a>(&mut self, contacts: impl IntoIterator<Item = &'a ContactInfo>, since: u32) -> usize {
        let mut snapshot: Vec<ContactInfo> = contacts
            .into_iter()
            .filter(|c| c.lastmod > since)
            .cloned()
            .collect();
        snapshot.sort_by_key(|c| c.lastmod);

        self.most_recent_lastmod = snapshot.last().map_or(0, |c| c.lastmod);
        self.snapshot = snapshot;
        self.cursor = 0;
        self.since = since;
        self.active = true;
        self.snapshot.len()
    }

    /// The next contact in `lastmod` order, or `None` once exhausted.
    pub fn next_contact(&mut self) -> Option<&ContactInfo> {
        if !self.active {
            return None;
        }
        let contact = self.snapshot.get(self.cursor)?;
        self.cursor += 1;
        Some(contact)
    }

    /// End the sync, returning the watermark for the next one.
    pub fn finish(&mut self) -> u32 {
        let watermark = self.most_recent_lastmod;
        *self = Self::default();
        watermark
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn remaining(&self) -> usize {
        self.snapshot.len() - self.cursor
    }

    pub fn since(&self) -> u32 {
        self.since
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(tag: u8, lastmod: u32) -> ContactInfo {
        ContactInfo {
            name: format!("node-{}", tag),
            lastmod,
            ..Default::default()
        }
    }

    fn drain(iter: &mut ContactIterator) -> Vec<u32> {
        let mut out = Vec::new();
        while let Some(c) = iter.next_contact() {
            out.push(c.lastmod);
        }
        out
    }

    #[test]
    fn test_strict_filter_and_ascending_order() {
        let store = vec![contact(1, 300), contact(2, 100), contact(3, 200), contact(4, 150)];
        let mut iter = ContactIterator::new();

        assert_eq!(iter.begin(&store, 150), 2);
        assert_eq!(drain(&mut iter), vec![200, 300]);
        assert_eq!(iter.finish(), 300);
        assert!(!iter.is_active());
    }

    #[test]
    fn test_empty_snapshot_watermark_is_zero() {
        let store = vec![contact(1, 100)];
        let mut iter = ContactIterator::new();

        assert_eq!(iter.begin(&store, 100), 0);
        assert!(iter.next_contact().is_none());
        assert_eq!(iter.finish(), 0);
    }

    #[test]
    fn test_snapshot_is_isolated_from_store_changes() {
        let mut store = vec![contact(1, 10), contact(2, 20)];
        let mut iter = ContactIterator::new();
        iter.begin(&store, 0);

        store.push(contact(3, 30));
        store[0].lastmod = 99;

        assert_eq!(drain(&mut iter), vec![10, 20]);
        assert_eq!(iter.finish(), 20);
    }

    #[test]
    fn test_watermark_resumes_next_sync() {
        let mut store = vec![contact(1, 10), contact(2, 20)];
        let mut iter = ContactIterator::new();

        iter.begin(&store, 0);
        drain(&mut iter);
        let watermark = iter.finish();

        store.push(contact(3, 25));
        store[0].lastmod = 30;
        iter.begin(&store, watermark);
        assert_eq!(drain(&mut iter), vec![25, 30]);
        assert!(iter.finish() > watermark);
    }

    #[test]
    fn test_next_after_finish_is_none() {
        let store = vec![contact(1, 10)];
        let mut iter = ContactIterator::new();
        iter.begin(&store, 0);
        assert_eq!(iter.remaining(), 1);
        iter.finish();
        assert!(iter.next_contact().is_none());
        assert_eq!(iter.remaining(), 0);
    }
}
