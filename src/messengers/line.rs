//! LINE adapter.
//!
//! Body: `{"events":[{"type":"message","source":{"userId":".."},"message":{"type":"text","text":".."},"replyToken":".."}]}`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::messengers::signature::verify_line;
use crate::messengers::{ConversationType, MessengerAdapter, Platform, UserMessage};

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn verify(channel_secret: &[u8], body: &[u8], signature_header: &str) -> Result<()> {
    verify_line(channel_secret, body, signature_header)
}

/// Decodes every text-message event in the payload. Non-text / non-message
/// events are silently skipped, mirroring other adapters' "ignore what we
/// don't understand" policy for unrelated event types.
pub fn decode(body: &[u8]) -> Result<Vec<UserMessage>> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|e| Error::BadRequest(format!("invalid line payload: {e}")))?;

    let events = payload
        .get("events")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::BadRequest("line payload missing events array".to_string()))?;

    let mut messages = Vec::new();
    for event in events {
        if event.get("type").and_then(Value::as_str) != Some("message") {
            continue;
        }
        let message = event.get("message");
        if message.and_then(|m| m.get("type")).and_then(Value::as_str) != Some("text") {
            continue;
        }
        let Some(text) = message.and_then(|m| m.get("text")).and_then(Value::as_str) else {
            continue;
        };
        let Some(user_id) = event.pointer("/source/userId").and_then(Value::as_str) else {
            continue;
        };
        let Some(reply_token) = event.get("replyToken").and_then(Value::as_str) else {
            continue;
        };

        messages.push(UserMessage {
            platform: Platform::Line,
            external_user_id: user_id.to_string(),
            text: text.to_string(),
            reply_handle: reply_token.to_string(),
            is_bot_msg: false,
            conversation_type: ConversationType::Direct,
        });
    }

    Ok(messages)
}

pub struct LineAdapter {
    http: reqwest::Client,
    channel_access_token: String,
}

impl LineAdapter {
    pub fn new(channel_access_token: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REPLY_TIMEOUT)
            .build()
            .map_err(Error::Reqwest)?;
        Ok(Self { http, channel_access_token })
    }
}

#[async_trait]
impl MessengerAdapter for LineAdapter {
    fn platform(&self) -> Platform {
        Platform::Line
    }

    async fn send(&self, reply_handle: &str, text: &str) -> Result<()> {
        self.http
            .post("https://api.line.me/v2/bot/message/reply")
            .bearer_auth(&self.channel_access_token)
            .json(&serde_json::json!({
                "replyToken": reply_handle,
                "messages": [{ "type": "text", "text": text }],
            }))
            .send()
            .await
            .map_err(Error::Reqwest)?;
        Ok(())
    }
}
