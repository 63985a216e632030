//! Shared signature verification helpers. Every comparison is constant-time
//! (no early-exit on the first differing byte) per the testable property
//! that a single mutated byte must fail authentication.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

fn hmac_sha256(secret: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| Error::Configuration(format!("invalid hmac key: {e}")))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).unwrap_u8() == 1
}

/// LINE: `base64(HMAC-SHA256(channel_secret, body)) == X-Line-Signature`.
pub fn verify_line(channel_secret: &[u8], body: &[u8], signature_header: &str) -> Result<()> {
    let computed = hmac_sha256(channel_secret, body)?;
    let computed_b64 = STANDARD.encode(computed);
    if constant_time_eq(computed_b64.as_bytes(), signature_header.as_bytes()) {
        Ok(())
    } else {
        Err(Error::Auth("line signature mismatch".to_string()))
    }
}

/// Slack: form `v0:{ts}:{body}`, `hex(HMAC-SHA256(signing_secret, form))`
/// prefixed `v0=`, with a replay window on `ts`.
pub fn verify_slack(
    signing_secret: &[u8],
    body: &[u8],
    timestamp: &str,
    signature_header: &str,
    now_unix: i64,
    replay_window_secs: i64,
) -> Result<()> {
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| Error::Auth("slack timestamp not numeric".to_string()))?;
    if (now_unix - ts).abs() > replay_window_secs {
        return Err(Error::Auth("slack request timestamp outside replay window".to_string()));
    }

    let mut form = Vec::with_capacity(body.len() + timestamp.len() + 4);
    form.extend_from_slice(b"v0:");
    form.extend_from_slice(timestamp.as_bytes());
    form.extend_from_slice(b":");
    form.extend_from_slice(body);

    let computed = hmac_sha256(signing_secret, &form)?;
    let computed_hex = format!("v0={}", hex::encode(computed));

    if constant_time_eq(computed_hex.as_bytes(), signature_header.as_bytes()) {
        Ok(())
    } else {
        Err(Error::Auth("slack signature mismatch".to_string()))
    }
}

/// WhatsApp: `X-Hub-Signature-256: sha256=hex(HMAC-SHA256(app_secret, body))`.
pub fn verify_whatsapp(app_secret: &[u8], body: &[u8], signature_header: &str) -> Result<()> {
    let computed = hmac_sha256(app_secret, body)?;
    let computed_hex = format!("sha256={}", hex::encode(computed));
    if constant_time_eq(computed_hex.as_bytes(), signature_header.as_bytes()) {
        Ok(())
    } else {
        Err(Error::Auth("whatsapp signature mismatch".to_string()))
    }
}

/// Teams: `Authorization: Bearer <base64(HMAC-SHA256(app_password, body))>`.
pub fn verify_teams(app_password: &[u8], body: &[u8], authorization_header: &str) -> Result<()> {
    let token = authorization_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::Auth("teams authorization header missing Bearer prefix".to_string()))?;

    let computed = hmac_sha256(app_password, body)?;
    let computed_b64 = STANDARD.encode(computed);

    if constant_time_eq(computed_b64.as_bytes(), token.as_bytes()) {
        Ok(())
    } else {
        Err(Error::Auth("teams signature mismatch".to_string()))
    }
}

/// Telegram: presumed trusted network (secret path) or an optional shared
/// token compared in constant time.
pub fn verify_telegram(configured_token: Option<&str>, provided_token: Option<&str>) -> Result<()> {
    match (configured_token, provided_token) {
        (None, _) => Ok(()),
        (Some(expected), Some(actual)) if constant_time_eq(expected.as_bytes(), actual.as_bytes()) => Ok(()),
        _ => Err(Error::Auth("telegram shared token mismatch".to_string())),
    }
}

/// Discord: ed25519 signature over `{timestamp}{body}`.
pub fn verify_discord(
    public_key: &ed25519_dalek::VerifyingKey,
    body: &[u8],
    timestamp: &str,
    signature_header: &str,
) -> Result<()> {
    use ed25519_dalek::Verifier;

    let signature_bytes = hex::decode(signature_header)
        .map_err(|_| Error::Auth("discord signature not valid hex".to_string()))?;
    let signature_bytes: [u8; 64] = signature_bytes
        .try_into()
        .map_err(|_| Error::Auth("discord signature wrong length".to_string()))?;
    let signature = ed25519_dalek::Signature::from_bytes(&signature_bytes);

    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);

    public_key
        .verify(&message, &signature)
        .map_err(|_| Error::Auth("discord signature mismatch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_signature_flips_on_single_byte_mutation() {
        let secret = b"channel-secret";
        let body = b"{\"events\":[]}";
        let computed = hmac_sha256(secret, body).unwrap();
        let sig = STANDARD.encode(computed);

        assert!(verify_line(secret, body, &sig).is_ok());

        let mut mutated = body.to_vec();
        mutated[0] ^= 0x01;
        assert!(verify_line(secret, &mutated, &sig).is_err());
    }

    #[test]
    fn slack_rejects_replay_outside_window() {
        let secret = b"signing-secret";
        let body = b"token=abc";
        let now = 1_700_000_000i64;
        let old_ts = (now - 601).to_string();

        let mut form = Vec::new();
        form.extend_from_slice(b"v0:");
        form.extend_from_slice(old_ts.as_bytes());
        form.extend_from_slice(b":");
        form.extend_from_slice(body);
        let sig = format!("v0={}", hex::encode(hmac_sha256(secret, &form).unwrap()));

        let err = verify_slack(secret, body, &old_ts, &sig, now, 300).unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn slack_accepts_within_window_with_correct_signature() {
        let secret = b"signing-secret";
        let body = b"token=abc";
        let now = 1_700_000_000i64;
        let ts = now.to_string();

        let mut form = Vec::new();
        form.extend_from_slice(b"v0:");
        form.extend_from_slice(ts.as_bytes());
        form.extend_from_slice(b":");
        form.extend_from_slice(body);
        let sig = format!("v0={}", hex::encode(hmac_sha256(secret, &form).unwrap()));

        assert!(verify_slack(secret, body, &ts, &sig, now, 300).is_ok());
    }

    #[test]
    fn whatsapp_signature_round_trips() {
        let secret = b"app-secret";
        let body = b"payload";
        let sig = format!("sha256={}", hex::encode(hmac_sha256(secret, body).unwrap()));
        assert!(verify_whatsapp(secret, body, &sig).is_ok());
        assert!(verify_whatsapp(secret, b"different", &sig).is_err());
    }

    #[test]
    fn teams_requires_bearer_prefix() {
        let secret = b"app-password";
        let body = b"activity";
        let token = STANDARD.encode(hmac_sha256(secret, body).unwrap());
        assert!(verify_teams(secret, body, &format!("Bearer {token}")).is_ok());
        assert!(verify_teams(secret, body, &token).is_err());
    }

    #[test]
    fn telegram_with_no_configured_token_trusts_the_network() {
        assert!(verify_telegram(None, None).is_ok());
    }

    #[test]
    fn telegram_with_configured_token_requires_a_match() {
        assert!(verify_telegram(Some("shared"), Some("shared")).is_ok());
        assert!(verify_telegram(Some("shared"), Some("wrong")).is_err());
        assert!(verify_telegram(Some("shared"), None).is_err());
    }

    #[test]
    fn discord_ed25519_round_trips() {
        use ed25519_dalek::{Signer, SigningKey};

        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let verifying_key = signing_key.verifying_key();

        let timestamp = "1700000000";
        let body = b"{\"type\":1}";
        let mut message = Vec::new();
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);
        let signature = signing_key.sign(&message);

        assert!(verify_discord(&verifying_key, body, timestamp, &hex::encode(signature.to_bytes())).is_ok());
        assert!(verify_discord(&verifying_key, b"tampered", timestamp, &hex::encode(signature.to_bytes())).is_err());
    }
}
