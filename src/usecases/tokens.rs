//! Short-link & report token issuer.
//!
//! Tokens are `base64url(payload_json).base64url(hmac_sha256(secret, payload_json))`
//! — an HS256-shaped scheme without pulling in a full JWT crate, since the
//! only claims needed are `sub` and `exp`. Verification compares the
//! signature in constant time.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_EXPIRY: Duration = Duration::days(7);

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

pub fn issue_report_token(secret: &[u8], user_id: &str, expiry: Duration) -> Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + expiry).timestamp(),
    };
    let payload = serde_json::to_vec(&claims)?;
    let payload_b64 = URL_SAFE_NO_PAD.encode(&payload);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| Error::Configuration(format!("invalid token secret: {e}")))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{payload_b64}.{signature_b64}"))
}

/// Returns the token's `sub` claim if the signature verifies and the token
/// has not expired.
pub fn verify_report_token(secret: &[u8], token: &str) -> Result<String> {
    let (payload_b64, signature_b64) = token
        .split_once('.')
        .ok_or_else(|| Error::Auth("malformed report token".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| Error::Configuration(format!("invalid token secret: {e}")))?;
    mac.update(payload_b64.as_bytes());
    let expected = mac.finalize().into_bytes();

    let provided = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| Error::Auth("malformed report token signature".to_string()))?;

    if expected.ct_eq(&provided).unwrap_u8() != 1 {
        return Err(Error::Auth("report token signature mismatch".to_string()));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| Error::Auth("malformed report token payload".to_string()))?;
    let claims: Claims = serde_json::from_slice(&payload)?;

    if claims.exp < Utc::now().timestamp() {
        return Err(Error::Auth("report token expired".to_string()));
    }

    Ok(claims.sub)
}

/// Precedence used by the report read endpoint: query, then header, then
/// cookie.
pub fn resolve_token<'a>(
    query: Option<&'a str>,
    authorization_header: Option<&'a str>,
    cookie: Option<&'a str>,
) -> Option<&'a str> {
    query
        .or_else(|| authorization_header.and_then(|h| h.strip_prefix("Bearer ")))
        .or(cookie)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_valid_token() {
        let secret = b"test-secret";
        let token = issue_report_token(secret, "slack_U1", DEFAULT_EXPIRY).unwrap();
        let sub = verify_report_token(secret, &token).unwrap();
        assert_eq!(sub, "slack_U1");
    }

    #[test]
    fn rejects_tampered_payload() {
        let secret = b"test-secret";
        let token = issue_report_token(secret, "slack_U1", DEFAULT_EXPIRY).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let tampered_payload = URL_SAFE_NO_PAD.encode(b"{\"sub\":\"slack_EVIL\",\"exp\":9999999999}");
        parts[0] = &tampered_payload;
        let tampered = parts.join(".");
        assert!(verify_report_token(secret, &tampered).is_err());
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = issue_report_token(b"secret-a", "slack_U1", DEFAULT_EXPIRY).unwrap();
        assert!(verify_report_token(b"secret-b", &token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let token = issue_report_token(b"secret", "slack_U1", Duration::seconds(-1)).unwrap();
        assert!(verify_report_token(b"secret", &token).is_err());
    }

    #[test]
    fn query_takes_precedence_over_header_and_cookie() {
        let resolved = resolve_token(Some("query-token"), Some("Bearer header-token"), Some("cookie-token"));
        assert_eq!(resolved, Some("query-token"));
    }

    #[test]
    fn header_takes_precedence_over_cookie_when_query_absent() {
        let resolved = resolve_token(None, Some("Bearer header-token"), Some("cookie-token"));
        assert_eq!(resolved, Some("header-token"));
    }

    #[test]
    fn falls_back_to_cookie() {
        let resolved = resolve_token(None, None, Some("cookie-token"));
        assert_eq!(resolved, Some("cookie-token"));
    }
}
