/// Seams of the token engine. Implementers decide where chain state lives,
/// how bodies are signed, and where "now" comes from.
use crate::types::{Hid, Timestamp};

/// Per-hid chain state. Every method is atomic with respect to concurrent
/// calls for the same hid.
pub trait ChainStore: Send + Sync {
    /// Current chain id for `hid`, creating a random one if there is none.
    fn chain_id_for(&self, hid: &Hid) -> u64;
    /// Current chain id for `hid` without creating one.
    fn current_chain(&self, hid: &Hid) -> Option<u64>;
    /// Overwrite the last issuance instant. Returns false if `hid` has no chain.
    fn record_issuance(&self, hid: &Hid, issued_at: Timestamp) -> bool;
    /// `chain_id_for` followed by `record_issuance` as one step. The recorded
    /// instant is `now`, moved forward if needed so that it is strictly later
    /// than the previous issuance for the same chain. Returns the chain id and
    /// the recorded instant.
    fn issue(&self, hid: &Hid, now: Timestamp) -> (u64, Timestamp);
    /// Remove the record for `hid`, whatever it holds.
    fn break_chain(&self, hid: &Hid);
    /// Remove the record for `hid` only while it still carries `chain_id`.
    fn break_chain_if(&self, hid: &Hid, chain_id: u64) -> bool;
    /// Last issuance instant recorded for `hid`.
    fn last_issued_at(&self, hid: &Hid) -> Option<Timestamp>;
    /// Number of live chains.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_current_chain(&self, hid: &Hid, chain_id: u64) -> bool {
        self.current_chain(hid) == Some(chain_id)
    }

    fn is_current_issuance(&self, hid: &Hid, issued_at: Timestamp) -> bool {
        self.last_issued_at(hid) == Some(issued_at)
    }
}

/// Keyed MAC over token bodies. The key is bound when the signer is built.
pub trait TokenSigner: Send + Sync {
    /// Algorithm name, for diagnostics.
    fn algorithm(&self) -> &'static str;
    /// Produce a tag over `msg`.
    fn sign(&self, msg: &[u8]) -> Vec<u8>;
    /// Check `tag` against `msg` in constant time.
    fn verify(&self, msg: &[u8], tag: &[u8]) -> bool;
}

/// Source of the current wall-clock instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
