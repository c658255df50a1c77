use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::traits::ChainStore;
use crate::types::{Hid, Timestamp};

/// State kept for one hid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainRecord {
    pub chain_id: u64,
    pub last_issued_at: Option<Timestamp>,
}

impl ChainRecord {
    fn fresh() -> Self {
        Self { chain_id: OsRng.next_u64(), last_issued_at: None }
    }
}

/// Process-local chain store. Records are sharded so that different hids do
/// not contend, and every read-modify-write runs under the hid's shard lock.
/// Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryChainStore {
    inner: DashMap<Hid, ChainRecord>,
}

impl InMemoryChainStore {
    /// Create a new, empty in-memory chain store.
    pub fn new() -> Self {
        Self { inner: DashMap::new() }
    }

    /// Snapshot of the record for `hid`.
    pub fn record(&self, hid: &Hid) -> Option<ChainRecord> {
        self.inner.get(hid).map(|r| *r)
    }

    /// Drop every chain, invalidating all outstanding tokens.
    pub fn clear(&self) {
        self.inner.clear();
    }
}

impl ChainStore for InMemoryChainStore {
    fn chain_id_for(&self, hid: &Hid) -> u64 {
        if let Some(record) = self.inner.get(hid) {
            return record.chain_id;
        }
        self.inner.entry(hid.clone()).or_insert_with(ChainRecord::fresh).chain_id
    }

    fn current_chain(&self, hid: &Hid) -> Option<u64> {
        self.inner.get(hid).map(|r| r.chain_id)
    }

    fn record_issuance(&self, hid: &Hid, issued_at: Timestamp) -> bool {
        match self.inner.get_mut(hid) {
            Some(mut record) => {
                record.last_issued_at = Some(issued_at);
                true
            }
            None => false,
        }
    }

    fn issue(&self, hid: &Hid, now: Timestamp) -> (u64, Timestamp) {
        let mut record = match self.inner.entry(hid.clone()) {
            Entry::Occupied(e) => e.into_ref(),
            Entry::Vacant(e) => e.insert(ChainRecord::fresh()),
        };
        let issued_at = match record.last_issued_at {
            Some(last) if last >= now => last.next_nano(),
            _ => now,
        };
        record.last_issued_at = Some(issued_at);
        (record.chain_id, issued_at)
    }

    fn break_chain(&self, hid: &Hid) {
        self.inner.remove(hid);
    }

    fn break_chain_if(&self, hid: &Hid, chain_id: u64) -> bool {
        self.inner.remove_if(hid, |_, r| r.chain_id == chain_id).is_some()
    }

    fn last_issued_at(&self, hid: &Hid) -> Option<Timestamp> {
        self.inner.get(hid).and_then(|r| r.last_issued_at)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn is_current_chain(&self, hid: &Hid, chain_id: u64) -> bool {
        self.inner.get(hid).is_some_and(|r| r.chain_id == chain_id)
    }

    fn is_current_issuance(&self, hid: &Hid, issued_at: Timestamp) -> bool {
        self.inner.get(hid).is_some_and(|r| r.last_issued_at == Some(issued_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hid(s: &str) -> Hid {
        Hid::new(s).unwrap()
    }

    #[test]
    fn chain_id_is_stable_until_broken() {
        let store = InMemoryChainStore::new();
        let h = hid("alice");
        assert_eq!(store.current_chain(&h), None);

        let first = store.chain_id_for(&h);
        assert_eq!(store.chain_id_for(&h), first);
        assert!(store.is_current_chain(&h, first));

        store.break_chain(&h);
        assert_eq!(store.current_chain(&h), None);
        assert!(store.is_empty());
    }

    #[test]
    fn record_issuance_needs_a_chain_and_overwrites() {
        let store = InMemoryChainStore::new();
        let h = hid("bob");
        let t1 = Timestamp::new(100, 1).unwrap();
        let t2 = Timestamp::new(100, 2).unwrap();

        assert!(!store.record_issuance(&h, t1));
        store.chain_id_for(&h);
        assert!(store.record_issuance(&h, t1));
        assert!(store.is_current_issuance(&h, t1));
        assert!(store.record_issuance(&h, t2));
        assert!(!store.is_current_issuance(&h, t1));
        assert!(store.is_current_issuance(&h, t2));
    }

    #[test]
    fn break_chain_if_spares_a_newer_chain() {
        let store = InMemoryChainStore::new();
        let h = hid("carol");
        let (old, _) = store.issue(&h, Timestamp::new(1, 0).unwrap());
        store.break_chain(&h);
        let (new, _) = store.issue(&h, Timestamp::new(2, 0).unwrap());
        assert_ne!(old, new);

        assert!(!store.break_chain_if(&h, old));
        assert_eq!(store.current_chain(&h), Some(new));
        assert!(store.break_chain_if(&h, new));
        assert_eq!(store.record(&h), None);
    }

    #[test]
    fn issue_never_repeats_an_instant() {
        let store = InMemoryChainStore::new();
        let h = hid("erin");
        let now = Timestamp::new(5, 999_999_999).unwrap();

        let (chain, first) = store.issue(&h, now);
        let (same_chain, second) = store.issue(&h, now);
        assert_eq!(chain, same_chain);
        assert_eq!(first, now);
        assert_eq!(second, Timestamp::new(6, 0).unwrap());
        assert!(store.is_current_issuance(&h, second));

        // a clock stepping backwards still moves forward
        let (_, third) = store.issue(&h, Timestamp::new(1, 0).unwrap());
        assert_eq!(third, Timestamp::new(6, 1).unwrap());
    }

    #[test]
    fn concurrent_first_access_creates_one_chain() {
        let store = InMemoryChainStore::new();
        let h = hid("dave");
        let ids: Vec<u64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| s.spawn(|| store.chain_id_for(&h)))
                .collect();
            handles.into_iter().map(|j| j.join().unwrap()).collect()
        });
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.len(), 1);
    }
}
