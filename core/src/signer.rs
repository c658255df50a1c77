use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::errors::ConfigError;
use crate::traits::TokenSigner;
use crate::types::SigningAlgorithm;

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA256 tag in bytes.
pub const TAG_LEN: usize = 32;

/// Compare two byte strings without branching on their contents.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// HMAC-SHA256 signer bound to one secret for its whole lifetime.
pub struct HmacSigner {
    mac: HmacSha256,
    // kept so the key bytes are wiped on drop
    _key: Zeroizing<Vec<u8>>,
}

impl HmacSigner {
    pub fn new(key: &[u8]) -> Result<Self, ConfigError> {
        Self::with_algorithm(SigningAlgorithm::HmacSha256, key)
    }

    pub fn with_algorithm(algorithm: SigningAlgorithm, key: &[u8]) -> Result<Self, ConfigError> {
        if key.is_empty() {
            return Err(ConfigError::InvalidKey("signing key must not be empty".into()));
        }
        let mac = match algorithm {
            SigningAlgorithm::HmacSha256 => {
                HmacSha256::new_from_slice(key).map_err(|e| ConfigError::InvalidKey(e.to_string()))?
            }
        };
        Ok(Self { mac, _key: Zeroizing::new(key.to_vec()) })
    }

    pub fn tag(&self, msg: &[u8]) -> [u8; TAG_LEN] {
        let mut mac = self.mac.clone();
        mac.update(msg);
        let mut out = [0u8; TAG_LEN];
        out.copy_from_slice(&mac.finalize().into_bytes());
        out
    }
}

impl fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSigner").field("key", &"<redacted>").finish()
    }
}

impl TokenSigner for HmacSigner {
    fn algorithm(&self) -> &'static str {
        SigningAlgorithm::HmacSha256.name()
    }

    fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.tag(msg).to_vec()
    }

    fn verify(&self, msg: &[u8], tag: &[u8]) -> bool {
        constant_time_eq(&self.tag(msg), tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4231, test case 2
    #[test]
    fn matches_rfc4231_vector() {
        let signer = HmacSigner::new(b"Jefe").unwrap();
        let tag = signer.tag(b"what do ya want for nothing?");
        let expected = [
            0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e, 0x6a, 0x04, 0x24, 0x26, 0x08, 0x95, 0x75,
            0xc7, 0x5a, 0x00, 0x3f, 0x08, 0x9d, 0x27, 0x39, 0x83, 0x9d, 0xec, 0x58, 0xb9, 0x64, 0xec,
            0x38, 0x43,
        ];
        assert_eq!(tag, expected);
    }

    #[test]
    fn verify_rejects_other_key_and_truncation() {
        let a = HmacSigner::new(b"key-a").unwrap();
        let b = HmacSigner::new(b"key-b").unwrap();
        let tag = a.sign(b"payload");
        assert!(a.verify(b"payload", &tag));
        assert!(!b.verify(b"payload", &tag));
        assert!(!a.verify(b"payload", &tag[..TAG_LEN - 1]));
        assert!(!a.verify(b"payloaD", &tag));
    }

    #[test]
    fn empty_key_is_a_construction_error() {
        assert!(matches!(HmacSigner::new(b""), Err(ConfigError::InvalidKey(_))));
    }

    #[test]
    fn debug_hides_key() {
        let signer = HmacSigner::new(b"super secret").unwrap();
        assert!(!format!("{signer:?}").contains("secret"));
    }

    #[test]
    fn constant_time_eq_handles_lengths() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
