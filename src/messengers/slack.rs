//! Slack Events API adapter.
//!
//! `url_verification` challenges are answered before any use-case runs.
//! Bot-origin events (`event.bot_id` present) are decoded to `None` so a
//! bot's own messages — including the app's replies in a shared channel —
//! never loop back into a use-case.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::messengers::signature::verify_slack;
use crate::messengers::{strip_bot_mention, ConversationType, MessengerAdapter, Platform, UserMessage, WebhookShortcut};

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);
pub const REPLAY_WINDOW_SECS: i64 = 300;

pub fn verify(signing_secret: &[u8], body: &[u8], timestamp: &str, signature_header: &str, now_unix: i64) -> Result<()> {
    verify_slack(signing_secret, body, timestamp, signature_header, now_unix, REPLAY_WINDOW_SECS)
}

/// `url_verification` must be answered with `{"challenge": "..."}` before any
/// use-case runs.
pub fn shortcut(payload: &Value) -> Option<WebhookShortcut> {
    if payload.get("type").and_then(Value::as_str) == Some("url_verification") {
        return payload.get("challenge").and_then(Value::as_str).map(|c| WebhookShortcut::Challenge(c.to_string()));
    }
    None
}

pub fn decode(body: &[u8]) -> Result<Option<UserMessage>> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|e| Error::BadRequest(format!("invalid slack payload: {e}")))?;

    if payload.get("type").and_then(Value::as_str) != Some("event_callback") {
        return Ok(None);
    }
    let Some(event) = payload.get("event") else {
        return Ok(None);
    };
    if event.get("bot_id").is_some() {
        return Ok(None);
    }
    if event.get("type").and_then(Value::as_str) != Some("message") {
        return Ok(None);
    }
    let Some(text) = event.get("text").and_then(Value::as_str) else {
        return Ok(None);
    };
    let Some(user) = event.get("user").and_then(Value::as_str) else {
        return Ok(None);
    };
    let Some(channel) = event.get("channel").and_then(Value::as_str) else {
        return Ok(None);
    };
    let channel_type = event.get("channel_type").and_then(Value::as_str);

    Ok(Some(UserMessage {
        platform: Platform::Slack,
        external_user_id: user.to_string(),
        text: strip_bot_mention(text),
        reply_handle: channel.to_string(),
        is_bot_msg: false,
        conversation_type: if channel_type == Some("im") { ConversationType::Direct } else { ConversationType::Channel },
    }))
}

pub struct SlackAdapter {
    http: reqwest::Client,
    bot_token: String,
}

impl SlackAdapter {
    pub fn new(bot_token: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REPLY_TIMEOUT)
            .build()
            .map_err(Error::Reqwest)?;
        Ok(Self { http, bot_token })
    }
}

#[async_trait]
impl MessengerAdapter for SlackAdapter {
    fn platform(&self) -> Platform {
        Platform::Slack
    }

    async fn send(&self, reply_handle: &str, text: &str) -> Result<()> {
        self.http
            .post("https://slack.com/api/chat.postMessage")
            .bearer_auth(&self.bot_token)
            .json(&serde_json::json!({ "channel": reply_handle, "text": text }))
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
    fn url_verification_is_answered_with_the_challenge() {
        let payload = serde_json::json!({ "type": "url_verification", "challenge": "abc123" });
        assert_eq!(shortcut(&payload), Some(WebhookShortcut::Challenge("abc123".to_string())));
    }

    #[test]
    fn non_verification_payloads_have_no_shortcut() {
        let payload = serde_json::json!({ "type": "event_callback" });
        assert_eq!(shortcut(&payload), None);
    }

    #[test]
    fn bot_origin_events_decode_to_none() {
        let body = br#"{"type":"event_callback","event":{"type":"message","bot_id":"B1","user":"U1","channel":"C1","text":"hi"}}"#;
        assert!(decode(body).unwrap().is_none());
    }

    #[test]
    fn user_message_strips_bot_mention_and_decodes() {
        let body = br#"{"type":"event_callback","event":{"type":"message","user":"U1","channel":"C1","channel_type":"im","text":"@bot lunch $12"}}"#;
        let msg = decode(body).unwrap().unwrap();
        assert_eq!(msg.text, "lunch $12");
        assert_eq!(msg.namespaced_user_id(), "slack_U1");
        assert_eq!(msg.conversation_type, ConversationType::Direct);
    }
}
