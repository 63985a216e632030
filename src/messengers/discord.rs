//! Discord adapter.
//!
//! Verification is ed25519 over `{timestamp}{body}` using the application's
//! public key (`X-Signature-Ed25519` / `X-Signature-Timestamp` headers).
//! `type == 1` (PING) interactions must be PONGed before any use-case runs.

use std::time::Duration;

use async_trait::async_trait;
use ed25519_dalek::VerifyingKey;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::messengers::signature::verify_discord;
use crate::messengers::{ConversationType, MessengerAdapter, Platform, UserMessage, WebhookShortcut};

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);
const PING_TYPE: i64 = 1;
const APPLICATION_COMMAND_TYPE: i64 = 2;

pub fn parse_public_key(hex_key: &str) -> Result<VerifyingKey> {
    let bytes = hex::decode(hex_key).map_err(|_| Error::Configuration("discord public key not valid hex".to_string()))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| Error::Configuration("discord public key must be 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| Error::Configuration(format!("invalid discord public key: {e}")))
}

pub fn verify(public_key: &VerifyingKey, body: &[u8], timestamp: &str, signature_header: &str) -> Result<()> {
    verify_discord(public_key, body, timestamp, signature_header)
}

/// Runs before any use-case: a PING interaction is answered with `{type:1}`
/// (PONG) and never reaches the use-case layer.
pub fn shortcut(body: &[u8]) -> Result<Option<WebhookShortcut>> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|e| Error::BadRequest(format!("invalid discord payload: {e}")))?;
    if payload.get("type").and_then(Value::as_i64) == Some(PING_TYPE) {
        return Ok(Some(WebhookShortcut::Pong));
    }
    Ok(None)
}

pub fn decode(body: &[u8]) -> Result<Option<UserMessage>> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|e| Error::BadRequest(format!("invalid discord payload: {e}")))?;

    if payload.get("type").and_then(Value::as_i64) != Some(APPLICATION_COMMAND_TYPE) {
        return Ok(None);
    }

    let Some(user_id) = payload
        .pointer("/member/user/id")
        .or_else(|| payload.pointer("/user/id"))
        .and_then(Value::as_str)
    else {
        return Ok(None);
    };
    let Some(token) = payload.get("token").and_then(Value::as_str) else {
        return Ok(None);
    };

    let text = payload
        .pointer("/data/options/0/value")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    Ok(Some(UserMessage {
        platform: Platform::Discord,
        external_user_id: user_id.to_string(),
        text,
        reply_handle: token.to_string(),
        is_bot_msg: false,
        conversation_type: ConversationType::Channel,
    }))
}

pub struct DiscordAdapter {
    http: reqwest::Client,
    application_id: String,
}

impl DiscordAdapter {
    pub fn new(application_id: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REPLY_TIMEOUT)
            .build()
            .map_err(Error::Reqwest)?;
        Ok(Self { http, application_id })
    }
}

#[async_trait]
impl MessengerAdapter for DiscordAdapter {
    fn platform(&self) -> Platform {
        Platform::Discord
    }

    /// Posts a followup message using the interaction token — the initial
    /// ACK is handled synchronously by the webhook handler within Discord's
    /// 3-second budget.
    async fn send(&self, reply_handle: &str, text: &str) -> Result<()> {
        self.http
            .post(format!(
                "https://discord.com/api/v10/webhooks/{}/{}",
                self.application_id, reply_handle
            ))
            .json(&serde_json::json!({ "content": text }))
            .send()
            .await
            .map_err(Error::Reqwest)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_interaction_short_circuits_to_pong() {
        let body = br#"{"type":1}"#;
        assert_eq!(shortcut(body).unwrap(), Some(WebhookShortcut::Pong));
    }

    #[test]
    fn application_command_decodes_first_option_as_text() {
        let body = br#"{"type":2,"token":"tok","member":{"user":{"id":"U1"}},"data":{"options":[{"value":"breakfast $8"}]}}"#;
        assert!(shortcut(body).unwrap().is_none());
        let msg = decode(body).unwrap().unwrap();
        assert_eq!(msg.text, "breakfast $8");
        assert_eq!(msg.namespaced_user_id(), "discord_U1");
        assert_eq!(msg.reply_handle, "tok");
    }
}
