//! Signed session token
//!
//! Wire format: `token:issuedAt:signature`
//!
//! - `token`: 32 random bytes, lowercase hex (64 chars)
//! - `issuedAt`: milliseconds since the Unix epoch, decimal
//! - `signature`: HMAC-SHA256 over the UTF-8 bytes of `"{token}:{issuedAt}"`, lowercase hex
//!
//! This module is the only place that knows the format. The session manager and the
//! edge gatekeeper both call [`verify`] so the two paths cannot drift apart.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use thiserror::Error;

use super::clock::Clock;

type HmacSha256 = Hmac<Sha256>;

/// Session lifetime in seconds (24 hours)
pub const SESSION_MAX_AGE_SECONDS: i64 = 60 * 60 * 24;

/// Session lifetime in milliseconds
pub const SESSION_MAX_AGE_MS: i64 = SESSION_MAX_AGE_SECONDS * 1000;

/// Random bytes per session token
pub const TOKEN_BYTES: usize = 32;

const DELIMITER: char = ':';

/// Errors raised when the shared secret cannot be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("AUTH_SECRET is not configured")]
    MissingSecret,
    #[error("AUTH_SECRET cannot be used as an HMAC key")]
    InvalidSecret,
}

/// Shared HMAC key for minting and verifying session tokens.
///
/// Holds a keyed HMAC instance so the key schedule runs once at startup.
#[derive(Clone)]
pub struct SessionSecret {
    mac: HmacSha256,
}

impl SessionSecret {
    /// Build a secret from its configured string form
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingSecret` for an empty value.
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        let mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
            .map_err(|_| ConfigError::InvalidSecret)?;
        Ok(Self { mac })
    }

    fn sign(&self, token: &str, issued_at: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        mac.update(b":");
        mac.update(issued_at.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionSecret(<redacted>)")
    }
}

/// Why a token was refused. Never leaves this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Format,
    Expired,
    SignatureMismatch,
}

/// Mint a token stamped with the clock's current time
#[must_use]
pub fn mint(secret: &SessionSecret, clock: &dyn Clock) -> String {
    mint_at(secret, clock.now_ms())
}

/// Mint a token with an explicit `issuedAt`
#[must_use]
pub fn mint_at(secret: &SessionSecret, issued_at_ms: i64) -> String {
    let token = generate_token();
    let issued_at = issued_at_ms.to_string();
    let signature = secret.sign(&token, &issued_at);
    format!("{token}{DELIMITER}{issued_at}{DELIMITER}{signature}")
}

/// Verify a token against `now_ms`. Any malformed, expired or forged value is `false`.
#[must_use]
pub fn verify(secret: &SessionSecret, value: &str, now_ms: i64) -> bool {
    match check(secret, value, now_ms) {
        Ok(()) => true,
        Err(rejection) => {
            log::debug!("Session token rejected: {rejection:?}");
            false
        }
    }
}

fn check(secret: &SessionSecret, value: &str, now_ms: i64) -> Result<(), Rejection> {
    let parts: Vec<&str> = value.split(DELIMITER).collect();
    let [token, issued_at, signature] = parts.as_slice() else {
        return Err(Rejection::Format);
    };

    let issued_at_ms: i64 = issued_at.parse().map_err(|_| Rejection::Format)?;

    // Future timestamps give a negative age and pass; only staleness is bounded.
    if now_ms.saturating_sub(issued_at_ms) > SESSION_MAX_AGE_MS {
        return Err(Rejection::Expired);
    }

    // Sign the received substrings verbatim, never a re-rendered integer.
    let expected = secret.sign(token, issued_at);
    if constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        Ok(())
    } else {
        Err(Rejection::SignatureMismatch)
    }
}

/// Compare two byte strings in time that depends only on the longer length.
///
/// Walks every index of the longer input, treating missing bytes as zero, and
/// folds a length mismatch into the accumulator instead of returning early.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut diff = u8::from(a.len() != b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= x ^ y;
    }
    std::hint::black_box(diff) == 0
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
