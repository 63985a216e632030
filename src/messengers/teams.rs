//! Microsoft Teams (Bot Framework) adapter.
//!
//! Inbound activities are verified via a bearer-wrapped HMAC over the raw
//! body rather than Bot Framework's full JWT exchange — sufficient for a
//! single-tenant deployment and consistent with the other adapters' shared
//! `signature` module.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::messengers::signature::verify_teams;
use crate::messengers::{ConversationType, MessengerAdapter, Platform, UserMessage};

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn verify(app_password: &[u8], body: &[u8], authorization_header: &str) -> Result<()> {
    verify_teams(app_password, body, authorization_header)
}

pub fn decode(body: &[u8]) -> Result<Option<UserMessage>> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|e| Error::BadRequest(format!("invalid teams payload: {e}")))?;

    if payload.get("type").and_then(Value::as_str) != Some("message") {
        return Ok(None);
    }
    let Some(text) = payload.get("text").and_then(Value::as_str) else {
        return Ok(None);
    };
    let Some(user_id) = payload.pointer("/from/id").and_then(Value::as_str) else {
        return Ok(None);
    };
    let Some(service_url) = payload.get("serviceUrl").and_then(Value::as_str) else {
        return Ok(None);
    };
    let conversation_type = payload.pointer("/conversation/conversationType").and_then(Value::as_str);

    Ok(Some(UserMessage {
        platform: Platform::Teams,
        external_user_id: user_id.to_string(),
        text: text.trim().to_string(),
        reply_handle: service_url.to_string(),
        is_bot_msg: false,
        conversation_type: if conversation_type == Some("personal") { ConversationType::Direct } else { ConversationType::Channel },
    }))
}

pub struct TeamsAdapter {
    http: reqwest::Client,
    bot_app_password: String,
}

impl TeamsAdapter {
    pub fn new(bot_app_password: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REPLY_TIMEOUT)
            .build()
            .map_err(Error::Reqwest)?;
        Ok(Self { http, bot_app_password })
    }
}

#[async_trait]
impl MessengerAdapter for TeamsAdapter {
    fn platform(&self) -> Platform {
        Platform::Teams
    }

    /// `reply_handle` is the activity's `serviceUrl` — Bot Framework replies
    /// are POSTed back to the conversation's own service endpoint, not a
    /// fixed API host.
    async fn send(&self, reply_handle: &str, text: &str) -> Result<()> {
        self.http
            .post(format!("{}/v3/conversations", reply_handle.trim_end_matches('/')))
            .bearer_auth(&self.bot_app_password)
            .json(&serde_json::json!({ "type": "message", "text": text }))
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
    fn decodes_personal_message_as_direct() {
        let body = br#"{"type":"message","text":"breakfast $8","from":{"id":"U1"},"serviceUrl":"https://smba.example.com/","conversation":{"conversationType":"personal"}}"#;
        let msg = decode(body).unwrap().unwrap();
        assert_eq!(msg.namespaced_user_id(), "teams_U1");
        assert_eq!(msg.conversation_type, ConversationType::Direct);
        assert_eq!(msg.reply_handle, "https://smba.example.com/");
    }

    #[test]
    fn non_message_activities_decode_to_none() {
        let body = br#"{"type":"conversationUpdate"}"#;
        assert!(decode(body).unwrap().is_none());
    }
}
