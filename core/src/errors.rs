use thiserror::Error;

/// Errors raised while parsing a token or its body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("token must have exactly 2 dot-separated parts, found {0}")]
    PartCount(usize),
    #[error("body must have exactly 4 fields, found {0}")]
    FieldCount(usize),
    #[error("invalid base64url: {0}")]
    Base64(String),
    #[error("body is not valid UTF-8")]
    Utf8,
    #[error("invalid hid: {0}")]
    InvalidHid(String),
    #[error("field `{0}` is not a canonical unsigned integer")]
    NotNumeric(&'static str),
    #[error("malformed timestamp: {0}")]
    Timestamp(&'static str),
}

/// Why a token was rejected. Never returned to callers of the public
/// verification API; only logged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("malformed token: {0}")]
    Malformed(#[from] DecodeError),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("no live chain for hid")]
    UnknownChain,
    #[error("token belongs to a different chain")]
    ChainMismatch,
    #[error("token is not the most recently issued for its chain")]
    StaleIssuance,
    #[error("token expired")]
    Expired,
}

impl VerifyError {
    /// Whether this failure evicts the hid's chain record.
    pub fn breaks_chain(&self) -> bool {
        matches!(self, VerifyError::StaleIssuance | VerifyError::Expired)
    }
}

/// Construction-time misconfiguration. Fatal for the engine being built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
    #[error("invalid expiration: {0}")]
    InvalidExpiration(String),
    #[error("expiration does not fit in u64 seconds")]
    ExpirationOverflow,
}
