//! WhatsApp Cloud API adapter.
//!
//! The subscription handshake is a GET with `hub.mode=subscribe` that must
//! echo `hub.challenge` before any use-case runs. Inbound messages arrive as
//! POSTs verified via `X-Hub-Signature-256`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::messengers::signature::verify_whatsapp;
use crate::messengers::{ConversationType, MessengerAdapter, Platform, UserMessage, WebhookShortcut};

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn verify(app_secret: &[u8], body: &[u8], signature_header: &str) -> Result<()> {
    verify_whatsapp(app_secret, body, signature_header)
}

/// Handles the GET subscription handshake: `hub.mode=subscribe` with a
/// matching verify token echoes `hub.challenge` verbatim.
pub fn verify_subscription(
    configured_verify_token: &str,
    mode: Option<&str>,
    verify_token: Option<&str>,
    challenge: Option<&str>,
) -> Result<WebhookShortcut> {
    if mode != Some("subscribe") {
        return Err(Error::BadRequest("unsupported hub.mode".to_string()));
    }
    if verify_token != Some(configured_verify_token) {
        return Err(Error::Auth("whatsapp verify token mismatch".to_string()));
    }
    let challenge = challenge.ok_or_else(|| Error::BadRequest("missing hub.challenge".to_string()))?;
    Ok(WebhookShortcut::Challenge(challenge.to_string()))
}

/// Decodes every text message in the payload. WhatsApp uses the sender's raw
/// phone number as the identity — no platform prefix is applied to it.
pub fn decode(body: &[u8]) -> Result<Vec<UserMessage>> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|e| Error::BadRequest(format!("invalid whatsapp payload: {e}")))?;

    let mut messages = Vec::new();
    let entries = payload.get("entry").and_then(Value::as_array).cloned().unwrap_or_default();
    for entry in entries {
        let changes = entry.get("changes").and_then(Value::as_array).cloned().unwrap_or_default();
        for change in changes {
            let items = change.pointer("/value/messages").and_then(Value::as_array).cloned().unwrap_or_default();
            for item in items {
                if item.get("type").and_then(Value::as_str) != Some("text") {
                    continue;
                }
                let Some(from) = item.get("from").and_then(Value::as_str) else {
                    continue;
                };
                let Some(text) = item.pointer("/text/body").and_then(Value::as_str) else {
                    continue;
                };

                messages.push(UserMessage {
                    platform: Platform::WhatsApp,
                    external_user_id: from.to_string(),
                    text: text.to_string(),
                    reply_handle: from.to_string(),
                    is_bot_msg: false,
                    conversation_type: ConversationType::Direct,
                });
            }
        }
    }

    Ok(messages)
}

pub struct WhatsAppAdapter {
    http: reqwest::Client,
    phone_number_id: String,
    access_token: String,
}

impl WhatsAppAdapter {
    pub fn new(phone_number_id: String, access_token: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REPLY_TIMEOUT)
            .build()
            .map_err(Error::Reqwest)?;
        Ok(Self { http, phone_number_id, access_token })
    }
}

#[async_trait]
impl MessengerAdapter for WhatsAppAdapter {
    fn platform(&self) -> Platform {
        Platform::WhatsApp
    }

    async fn send(&self, reply_handle: &str, text: &str) -> Result<()> {
        self.http
            .post(format!("https://graph.facebook.com/v19.0/{}/messages", self.phone_number_id))
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({
                "messaging_product": "whatsapp",
                "to": reply_handle,
                "type": "text",
                "text": { "body": text },
            }))
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
    fn subscription_handshake_echoes_challenge_on_matching_token() {
        let shortcut = verify_subscription("verify-me", Some("subscribe"), Some("verify-me"), Some("12345")).unwrap();
        assert_eq!(shortcut, WebhookShortcut::Challenge("12345".to_string()));
    }

    #[test]
    fn subscription_handshake_rejects_wrong_token() {
        assert!(verify_subscription("verify-me", Some("subscribe"), Some("wrong"), Some("12345")).is_err());
    }

    #[test]
    fn decodes_text_message_using_raw_phone_number() {
        let body = br#"{"entry":[{"changes":[{"value":{"messages":[{"type":"text","from":"15551234567","text":{"body":"lunch $12"}}]}}]}]}"#;
        let messages = decode(body).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].namespaced_user_id(), "15551234567");
        assert_eq!(messages[0].text, "lunch $12");
    }

    #[test]
    fn non_text_message_types_are_skipped() {
        let body = br#"{"entry":[{"changes":[{"value":{"messages":[{"type":"image","from":"1"}]}}]}]}"#;
        assert!(decode(body).unwrap().is_empty());
    }
}
