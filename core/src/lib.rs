//! sessionchain core library: hashed identities, signed session tokens, and
//! replay-chain invalidation.
//!
//! - HID derivation: salted SHA-256 over a 128-bit raw identity
//! - Token wire format: `base64url(body).base64url(hmac)` with body
//!   `<hid>:<chain_id>:<seconds>.<nanos>:<expiration_seconds>`
//! - One live chain per hid; only the most recently issued token verifies,
//!   and presenting an older one breaks the chain
//! - Pluggable chain store, signer, and clock
//!
//! All state is process-local. A restart invalidates every issued token.

pub mod clock;
pub mod codec;
pub mod config;
pub mod engine;
pub mod errors;
pub mod hid;
pub mod signer;
pub mod store;
pub mod traits;
pub mod types;

pub use clock::{ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::TokenEngine;
pub use errors::{ConfigError, DecodeError, VerifyError};
pub use hid::{derive_hid, HidDeriver};
pub use signer::{constant_time_eq, HmacSigner};
pub use store::{ChainRecord, InMemoryChainStore};
pub use traits::{ChainStore, Clock, TokenSigner};
pub use types::{ExpirationPolicy, Hid, RawIdentity, SigningAlgorithm, TimeUnit, Timestamp, TokenBody};

/// Library version string.
pub fn version() -> &'static str {
    concat!("sessionchain-core ", env!("CARGO_PKG_VERSION"))
}
