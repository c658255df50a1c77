//! Token body text format and the base64url wrapping around it.
//!
//! Body: `<hid>:<chain_id>:<seconds>.<nanos>:<expiration_seconds>` with
//! `nanos` always nine digits. Integers are plain decimal without sign or
//! leading zeros, so every body has exactly one encoding.
//!
//! Base64url is used unpadded in both directions; padded input is rejected.

use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use base64::Engine as _;

use crate::errors::DecodeError;
use crate::types::{Hid, Timestamp, TokenBody};

pub const FIELD_DELIMITER: char = ':';
pub const TOKEN_DELIMITER: char = '.';
const NANOS_DIGITS: usize = 9;

pub fn b64encode(data: &[u8]) -> String {
    B64.encode(data)
}

pub fn b64decode(data: &str) -> Result<Vec<u8>, DecodeError> {
    B64.decode(data.as_bytes()).map_err(|e| DecodeError::Base64(e.to_string()))
}

/// Canonical text of `body`.
pub fn encode_body(body: &TokenBody) -> String {
    format!(
        "{hid}{d}{chain}{d}{secs}.{nanos:09}{d}{exp}",
        d = FIELD_DELIMITER,
        hid = body.hid,
        chain = body.chain_id,
        secs = body.created_at.seconds(),
        nanos = body.created_at.nanos(),
        exp = body.expiration_seconds,
    )
}

/// Exact inverse of [`encode_body`].
pub fn decode_body(bytes: &[u8]) -> Result<TokenBody, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::Utf8)?;
    let fields: Vec<&str> = text.split(FIELD_DELIMITER).collect();
    let [hid, chain_id, created_at, expiration] = fields[..] else {
        return Err(DecodeError::FieldCount(fields.len()));
    };

    Ok(TokenBody {
        hid: Hid::new(hid)?,
        chain_id: parse_u64(chain_id, "chain_id")?,
        created_at: parse_timestamp(created_at)?,
        expiration_seconds: parse_u64(expiration, "expiration_seconds")?,
    })
}

/// Split a token into its base64url body and signature segments.
pub fn split_token(token: &str) -> Result<(&str, &str), DecodeError> {
    let mut parts = token.split(TOKEN_DELIMITER);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(body), Some(sig), None) => Ok((body, sig)),
        _ => Err(DecodeError::PartCount(token.split(TOKEN_DELIMITER).count())),
    }
}

fn parse_u64(field: &str, name: &'static str) -> Result<u64, DecodeError> {
    if !is_canonical_decimal(field) {
        return Err(DecodeError::NotNumeric(name));
    }
    field.parse().map_err(|_| DecodeError::NotNumeric(name))
}

fn is_canonical_decimal(field: &str) -> bool {
    let bytes = field.as_bytes();
    !bytes.is_empty()
        && bytes.iter().all(u8::is_ascii_digit)
        && (bytes.len() == 1 || bytes[0] != b'0')
}

fn parse_timestamp(field: &str) -> Result<Timestamp, DecodeError> {
    let (seconds, nanos) = field
        .split_once('.')
        .ok_or(DecodeError::Timestamp("missing '.' between seconds and nanoseconds"))?;
    let seconds = parse_u64(seconds, "seconds").map_err(|_| DecodeError::Timestamp("seconds"))?;
    if nanos.len() != NANOS_DIGITS || !nanos.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::Timestamp("nanoseconds must be exactly 9 digits"));
    }
    let nanos: u32 = nanos.parse().map_err(|_| DecodeError::Timestamp("nanoseconds"))?;
    Timestamp::new(seconds, nanos).ok_or(DecodeError::Timestamp("nanoseconds out of range"))
}
