use sha2::{Digest, Sha256};

use crate::codec::b64encode;
use crate::types::{Hid, RawIdentity};

/// Maps raw identities to hids under one process-wide salt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidDeriver {
    salt: i64,
}

impl HidDeriver {
    pub fn new(salt: i64) -> Self {
        Self { salt }
    }

    pub fn derive(&self, raw: &RawIdentity) -> Hid {
        derive_hid(raw, self.salt)
    }
}

/// Per-identity salt: `salt ‖ lsb ‖ msb ‖ (lsb ⊕ msb ⊕ salt)`, big-endian.
fn derived_salt(raw: &RawIdentity, salt: i64) -> [u8; 32] {
    let salt = salt as u64;
    let words = [salt, raw.lsb(), raw.msb(), raw.lsb() ^ raw.msb() ^ salt];
    let mut out = [0u8; 32];
    for (chunk, word) in out.chunks_exact_mut(8).zip(words) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    out
}

/// `base64url(SHA-256(derived_salt ‖ lsb ‖ msb))`.
pub fn derive_hid(raw: &RawIdentity, salt: i64) -> Hid {
    let mut hasher = Sha256::new();
    hasher.update(derived_salt(raw, salt));
    hasher.update(raw.lsb().to_be_bytes());
    hasher.update(raw.msb().to_be_bytes());
    Hid::from_base64url(b64encode(&hasher.finalize()))
}
