use std::net::SocketAddr;

use anyhow::{Context, Result};
use sessionchain_core::{EngineConfig, ExpirationPolicy};

pub const ENV_SIGNING_KEY: &str = "SESSIONCHAIN_SIGNING_KEY";
pub const ENV_SALT: &str = "SESSIONCHAIN_SALT";
pub const ENV_EXPIRATION: &str = "SESSIONCHAIN_EXPIRATION";
pub const ENV_ALGORITHM: &str = "SESSIONCHAIN_ALGORITHM";
pub const ENV_BIND: &str = "SESSIONCHAIN_BIND";

const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub engine: EngineConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Only the signing key is mandatory.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let signing_key = lookup(ENV_SIGNING_KEY).with_context(|| format!("{ENV_SIGNING_KEY} must be set"))?;

        let salt = match lookup(ENV_SALT) {
            Some(raw) => raw.trim().parse::<i64>().with_context(|| format!("{ENV_SALT} must be a signed 64-bit integer"))?,
            None => {
                tracing::warn!("{ENV_SALT} not set, hashing identities with salt 0");
                0
            }
        };

        let expiration = match lookup(ENV_EXPIRATION) {
            Some(raw) => raw.parse::<ExpirationPolicy>().with_context(|| format!("invalid {ENV_EXPIRATION}"))?,
            None => ExpirationPolicy::ONE_HOUR,
        };

        let bind = lookup(ENV_BIND)
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse()
            .with_context(|| format!("invalid {ENV_BIND}"))?;

        let mut engine = EngineConfig::new(signing_key, salt, expiration);
        if let Some(algorithm) = lookup(ENV_ALGORITHM) {
            engine = engine.with_algorithm(algorithm);
        }
        engine.validate().context("invalid engine configuration")?;

        Ok(Self { bind, engine })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use sessionchain_core::TimeUnit;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[(ENV_SIGNING_KEY, "k")]).unwrap();
        assert_eq!(cfg.bind, DEFAULT_BIND.parse().unwrap());
        assert!(cfg.bind.ip().is_loopback());
        assert_eq!(cfg.engine.salt, 0);
        assert_eq!(cfg.engine.expiration, ExpirationPolicy::ONE_HOUR);
    }

    #[test]
    fn reads_every_variable() {
        let cfg = config(&[
            (ENV_SIGNING_KEY, "k"),
            (ENV_SALT, "-42"),
            (ENV_EXPIRATION, "15m"),
            (ENV_ALGORITHM, "hs256"),
            (ENV_BIND, "127.0.0.1:9000"),
        ])
        .unwrap();
        assert_eq!(cfg.engine.salt, -42);
        assert_eq!(cfg.engine.expiration, ExpirationPolicy::of(15, TimeUnit::Minutes));
        assert_eq!(cfg.bind.port(), 9000);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[]).is_err());
        assert!(config(&[(ENV_SIGNING_KEY, "k"), (ENV_SALT, "pepper")]).is_err());
        assert!(config(&[(ENV_SIGNING_KEY, "k"), (ENV_EXPIRATION, "soon")]).is_err());
        assert!(config(&[(ENV_SIGNING_KEY, "k"), (ENV_ALGORITHM, "ES256")]).is_err());
        assert!(config(&[(ENV_SIGNING_KEY, "")]).is_err());
    }
}
