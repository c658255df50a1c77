use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ConfigError, DecodeError};

/// Hashed identity: the pseudonymous key all chain state hangs off.
///
/// Never empty and never contains the body (`:`) or token (`.`) delimiters,
/// so it can be embedded in a token body without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hid(String);

impl Hid {
    /// Validate and wrap a hid string.
    pub fn new(value: impl Into<String>) -> Result<Self, DecodeError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DecodeError::InvalidHid("empty".into()));
        }
        if let Some(c) = value.chars().find(|&c| matches!(c, ':' | '.') || c.is_control()) {
            return Err(DecodeError::InvalidHid(format!("forbidden character {c:?}")));
        }
        Ok(Self(value))
    }

    /// Base64url text never contains the delimiters.
    pub(crate) fn from_base64url(encoded: String) -> Self {
        debug_assert!(Self::new(encoded.as_str()).is_ok());
        Self(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Hid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Hid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Hid {
    type Err = DecodeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Hid {
    type Error = DecodeError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Hid> for String {
    fn from(hid: Hid) -> Self {
        hid.0
    }
}

/// 128-bit identity handed over by the authentication handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawIdentity(Uuid);

impl RawIdentity {
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Most significant 64 bits.
    pub fn msb(&self) -> u64 {
        (self.0.as_u128() >> 64) as u64
    }

    /// Least significant 64 bits.
    pub fn lsb(&self) -> u64 {
        self.0.as_u128() as u64
    }
}

/// Accepts both the dashed form and the bare 32 hex digits identity services
/// return in their profile payloads.
impl FromStr for RawIdentity {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl fmt::Display for RawIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Wall-clock instant with nanosecond precision, counted from the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    seconds: u64,
    nanos: u32,
}

impl Timestamp {
    pub const NANOS_PER_SECOND: u32 = 1_000_000_000;

    /// `None` when `nanos` is not below one second.
    pub fn new(seconds: u64, nanos: u32) -> Option<Self> {
        (nanos < Self::NANOS_PER_SECOND).then_some(Self { seconds, nanos })
    }

    /// Instants before the epoch clamp to the epoch.
    pub fn from_system_time(time: SystemTime) -> Self {
        let since = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self { seconds: since.as_secs(), nanos: since.subsec_nanos() }
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    pub fn checked_add_seconds(&self, seconds: u64) -> Option<Self> {
        Some(Self { seconds: self.seconds.checked_add(seconds)?, nanos: self.nanos })
    }

    /// The instant one nanosecond later.
    pub fn next_nano(&self) -> Self {
        match self.nanos + 1 {
            Self::NANOS_PER_SECOND => Self { seconds: self.seconds.saturating_add(1), nanos: 0 },
            nanos => Self { seconds: self.seconds, nanos },
        }
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::try_from(self.seconds).ok()?, self.nanos)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)),
            None => write!(f, "{}.{:09}", self.seconds, self.nanos),
        }
    }
}

/// Signed plaintext payload of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBody {
    pub hid: Hid,
    pub chain_id: u64,
    pub created_at: Timestamp,
    /// `0` means the token never expires.
    pub expiration_seconds: u64,
}

impl TokenBody {
    pub fn never_expires(&self) -> bool {
        self.expiration_seconds == 0
    }

    /// Expired at or after `created_at + expiration_seconds`. A deadline that
    /// does not fit the clock range counts as passed.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        if self.never_expires() {
            return false;
        }
        match self.created_at.checked_add_seconds(self.expiration_seconds) {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }
}

/// Unit of an [`ExpirationPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    HalfDays,
    Days,
    Weeks,
    Forever,
}

impl TimeUnit {
    /// Length of one unit, `None` for [`TimeUnit::Forever`].
    pub fn seconds(&self) -> Option<u64> {
        match self {
            TimeUnit::Seconds => Some(1),
            TimeUnit::Minutes => Some(60),
            TimeUnit::Hours => Some(3_600),
            TimeUnit::HalfDays => Some(43_200),
            TimeUnit::Days => Some(86_400),
            TimeUnit::Weeks => Some(604_800),
            TimeUnit::Forever => None,
        }
    }
}

/// Lifetime given to every token an engine issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExpirationPolicy {
    pub amount: u64,
    pub unit: TimeUnit,
}

impl ExpirationPolicy {
    pub const FOREVER: Self = Self { amount: 0, unit: TimeUnit::Forever };
    pub const ONE_HOUR: Self = Self { amount: 1, unit: TimeUnit::Hours };

    pub const fn of(amount: u64, unit: TimeUnit) -> Self {
        Self { amount, unit }
    }

    /// Lifetime in seconds as written into token bodies; `0` is the
    /// never-expires sentinel.
    pub fn as_seconds(&self) -> Result<u64, ConfigError> {
        match self.unit.seconds() {
            None => Ok(0),
            Some(unit) => self.amount.checked_mul(unit).ok_or(ConfigError::ExpirationOverflow),
        }
    }
}

/// Parses `forever`, a bare number of seconds, or a number followed by one of
/// `s`, `m`, `h`, `hd` (half days), `d`, `w`.
impl FromStr for ExpirationPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("forever") {
            return Ok(Self::FOREVER);
        }
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, suffix) = s.split_at(split);
        let amount: u64 = digits.parse().map_err(|_| ConfigError::InvalidExpiration(s.to_string()))?;
        let unit = match suffix {
            "" | "s" => TimeUnit::Seconds,
            "m" => TimeUnit::Minutes,
            "h" => TimeUnit::Hours,
            "hd" => TimeUnit::HalfDays,
            "d" => TimeUnit::Days,
            "w" => TimeUnit::Weeks,
            _ => return Err(ConfigError::InvalidExpiration(s.to_string())),
        };
        let policy = Self::of(amount, unit);
        policy.as_seconds()?;
        Ok(policy)
    }
}

impl TryFrom<String> for ExpirationPolicy {
    type Error = ConfigError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExpirationPolicy> for String {
    fn from(policy: ExpirationPolicy) -> Self {
        policy.to_string()
    }
}

impl fmt::Display for ExpirationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.unit {
            TimeUnit::Forever => return f.write_str("forever"),
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
            TimeUnit::HalfDays => "hd",
            TimeUnit::Days => "d",
            TimeUnit::Weeks => "w",
        };
        write!(f, "{}{}", self.amount, suffix)
    }
}

/// Message authentication algorithm used to sign token bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    #[default]
    HmacSha256,
}

impl SigningAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            SigningAlgorithm::HmacSha256 => "HS256",
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" | "HMACSHA256" | "HMAC-SHA256" => Ok(SigningAlgorithm::HmacSha256),
            other => Err(ConfigError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(created_at: Timestamp, expiration_seconds: u64) -> TokenBody {
        TokenBody { hid: Hid::new("p").unwrap(), chain_id: 1, created_at, expiration_seconds }
    }

    #[test]
    fn deadline_past_the_clock_range_counts_as_expired() {
        let near_end = Timestamp::new(u64::MAX - 1, 0).unwrap();
        assert!(body(near_end, 5).is_expired_at(Timestamp::new(0, 0).unwrap()));
        // the sentinel still never expires
        assert!(!body(near_end, 0).is_expired_at(Timestamp::new(u64::MAX, 0).unwrap()));
        assert!(!body(near_end, 1).is_expired_at(near_end));
    }

    #[test]
    fn expiration_policy_display_parses_back() {
        for unit in [
            TimeUnit::Seconds,
            TimeUnit::Minutes,
            TimeUnit::Hours,
            TimeUnit::HalfDays,
            TimeUnit::Days,
            TimeUnit::Weeks,
        ] {
            let policy = ExpirationPolicy::of(3, unit);
            assert_eq!(policy.to_string().parse::<ExpirationPolicy>().unwrap(), policy);
        }
        assert_eq!(ExpirationPolicy::of(1, TimeUnit::HalfDays).to_string(), "1hd");
        assert_eq!("forever".parse::<ExpirationPolicy>().unwrap(), ExpirationPolicy::FOREVER);
        assert_eq!(ExpirationPolicy::FOREVER.to_string(), "forever");
    }
}
