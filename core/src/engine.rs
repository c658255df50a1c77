use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clock::SystemClock;
use crate::codec::{b64decode, b64encode, decode_body, encode_body, split_token};
use crate::config::EngineConfig;
use crate::errors::{ConfigError, VerifyError};
use crate::hid::HidDeriver;
use crate::signer::HmacSigner;
use crate::store::InMemoryChainStore;
use crate::traits::{ChainStore, Clock, TokenSigner};
use crate::types::{ExpirationPolicy, Hid, RawIdentity, TokenBody};

/// Issues and verifies session tokens.
///
/// Each hid moves through `no chain -> active(chain_id, last_issued_at)`.
/// Issuing a token keeps the chain and moves `last_issued_at`, so only the
/// newest token verifies. Presenting a stale or expired token that is
/// otherwise authentic removes the chain and forces re-authentication.
pub struct TokenEngine {
    signer: Arc<dyn TokenSigner>,
    store: Arc<dyn ChainStore>,
    clock: Arc<dyn Clock>,
    deriver: HidDeriver,
    expiration_seconds: u64,
}

impl TokenEngine {
    /// HMAC-SHA256 engine with an in-memory store and the system clock.
    pub fn new(signing_key: impl AsRef<[u8]>, salt: i64, expiration: ExpirationPolicy) -> Result<Self, ConfigError> {
        let signer = HmacSigner::new(signing_key.as_ref())?;
        Ok(Self {
            signer: Arc::new(signer),
            store: Arc::new(InMemoryChainStore::new()),
            clock: Arc::new(SystemClock),
            deriver: HidDeriver::new(salt),
            expiration_seconds: expiration.as_seconds()?,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        Self::with_parts(config, Arc::new(InMemoryChainStore::new()), Arc::new(SystemClock))
    }

    /// Build from `config` with a caller-owned store and clock.
    pub fn with_parts(
        config: &EngineConfig,
        store: Arc<dyn ChainStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let (algorithm, expiration_seconds) = config.validate()?;
        let signer = HmacSigner::with_algorithm(algorithm, config.signing_key.as_bytes())?;
        Ok(Self {
            signer: Arc::new(signer),
            store,
            clock,
            deriver: HidDeriver::new(config.salt),
            expiration_seconds,
        })
    }

    /// Swap the signer, e.g. for one backed by an HSM.
    pub fn with_signer(mut self, signer: Arc<dyn TokenSigner>) -> Self {
        self.signer = signer;
        self
    }

    /// Name of the signing algorithm in use.
    pub fn algorithm(&self) -> &'static str {
        self.signer.algorithm()
    }

    pub fn store(&self) -> &Arc<dyn ChainStore> {
        &self.store
    }

    /// Lifetime written into new tokens; `0` means they never expire.
    pub fn expiration_seconds(&self) -> u64 {
        self.expiration_seconds
    }

    /// Hid for an identity obtained from the authentication handshake.
    pub fn hid_for(&self, raw: &RawIdentity) -> Hid {
        self.deriver.derive(raw)
    }

    /// Issue the next token for `hid`, invalidating any earlier one.
    pub fn generate_token(&self, hid: &Hid) -> String {
        let (chain_id, created_at) = self.store.issue(hid, self.clock.now());
        let body = TokenBody { hid: hid.clone(), chain_id, created_at, expiration_seconds: self.expiration_seconds };

        let encoded = b64encode(encode_body(&body).as_bytes());
        let signature = b64encode(&self.signer.sign(encoded.as_bytes()));
        info!(%hid, chain_id, %created_at, "token issued");
        format!("{encoded}.{signature}")
    }

    /// Whether `token` is authentic, unexpired and the newest for its chain.
    /// Rejections are only reported through the log.
    pub fn verify_token(&self, token: &str) -> bool {
        self.check_token(token).is_ok()
    }

    /// The hid carried by `token` if it verifies.
    pub fn get_hid_if_valid(&self, token: &str) -> Option<Hid> {
        self.check_token(token).ok().map(|body| body.hid)
    }

    /// Verify `token` and issue its successor for the same hid.
    pub fn refresh_token(&self, token: &str) -> Option<String> {
        self.get_hid_if_valid(token).map(|hid| self.generate_token(&hid))
    }

    pub(crate) fn check_token(&self, token: &str) -> Result<TokenBody, VerifyError> {
        let result = self.evaluate(token);
        if let Err(err) = &result {
            debug!(error = %err, chain_broken = err.breaks_chain(), "token rejected");
        }
        result
    }

    fn evaluate(&self, token: &str) -> Result<TokenBody, VerifyError> {
        let (encoded, signature) = split_token(token)?;
        let body = decode_body(&b64decode(encoded)?)?;
        let hid = &body.hid;

        match self.store.current_chain(hid) {
            None => {
                info!(%hid, "token presented for a hid without a live chain");
                return Err(VerifyError::UnknownChain);
            }
            Some(current) if current != body.chain_id => {
                info!(%hid, "token from a different chain presented");
                return Err(VerifyError::ChainMismatch);
            }
            Some(_) => {}
        }

        let signature = b64decode(signature).map_err(|_| VerifyError::InvalidSignature)?;
        if !self.signer.verify(encoded.as_bytes(), &signature) {
            warn!(%hid, "token with invalid signature");
            return Err(VerifyError::InvalidSignature);
        }

        let failure = if body.is_expired_at(self.clock.now()) {
            Some(VerifyError::Expired)
        } else if !self.store.is_current_issuance(hid, body.created_at) {
            Some(VerifyError::StaleIssuance)
        } else {
            None
        };
        if let Some(err) = failure {
            self.store.break_chain_if(hid, body.chain_id);
            info!(%hid, chain_id = body.chain_id, reason = %err, "token chain broken");
            return Err(err);
        }

        Ok(body)
    }
}
