use std::fmt;

use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::ConfigError;
use crate::types::{ExpirationPolicy, SigningAlgorithm};

fn default_algorithm() -> String {
    SigningAlgorithm::default().name().to_string()
}

/// Everything an engine is built from. Fixed for the engine's lifetime.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct EngineConfig {
    pub signing_key: String,
    pub salt: i64,
    #[zeroize(skip)]
    pub expiration: ExpirationPolicy,
    #[serde(default = "default_algorithm")]
    #[zeroize(skip)]
    pub algorithm: String,
}

impl EngineConfig {
    pub fn new(signing_key: impl Into<String>, salt: i64, expiration: ExpirationPolicy) -> Self {
        Self { signing_key: signing_key.into(), salt, expiration, algorithm: default_algorithm() }
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    /// Check every field, returning the parsed algorithm and the expiration in
    /// seconds.
    pub fn validate(&self) -> Result<(SigningAlgorithm, u64), ConfigError> {
        let algorithm = self.algorithm.parse()?;
        if self.signing_key.is_empty() {
            return Err(ConfigError::InvalidKey("signing key must not be empty".into()));
        }
        Ok((algorithm, self.expiration.as_seconds()?))
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("signing_key", &"<redacted>")
            .field("salt", &"<redacted>")
            .field("expiration", &self.expiration)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}
