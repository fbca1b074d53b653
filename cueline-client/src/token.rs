//! Reads the claims of signed credentials. Signatures are not verified, that is the server's job.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token does not have three segments")]
    Shape,
    #[error("Token payload is not valid base64: {0}")]
    Encoding(String),
    #[error("Token payload is not valid json: {0}")]
    Payload(String),
    #[error("Token has no expiry claim")]
    NoExpiry,
}

/// The claims the client cares about
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Claims {
    /// Expiry as a unix timestamp in seconds
    pub exp: Option<i64>,
    pub username: Option<String>,
    /// Set on refresh credentials
    #[serde(default)]
    pub refresh: bool,
}

pub fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    let mut segments = token.split('.');

    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(TokenError::Shape),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| TokenError::Encoding(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| TokenError::Payload(e.to_string()))
}

/// Returns the expiry of a token as a unix timestamp in seconds.
pub fn expiry(token: &str) -> Result<i64, TokenError> {
    decode_claims(token)?.exp.ok_or(TokenError::NoExpiry)
}

/// Returns true if the token expires within `leeway` seconds of `now`.
///
/// Tokens that cannot be decoded count as expired.
pub fn is_expired_at(token: &str, now: i64, leeway: i64) -> bool {
    match expiry(token) {
        Ok(exp) => exp <= now + leeway,
        Err(_) => true,
    }
}

pub fn is_expired(token: &str, leeway: i64) -> bool {
    is_expired_at(token, Utc::now().timestamp(), leeway)
}

/// Builds an unsigned token with the given claims, for tests.
#[cfg(test)]
pub fn encode_for_test(exp: i64, username: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({ "exp": exp, "username": username, "refresh": false }).to_string(),
    );

    format!("{header}.{payload}.signature")
}
