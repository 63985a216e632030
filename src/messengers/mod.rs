//! Messenger ingestion pipeline.
//!
//! Each platform module implements the same five-step webhook contract:
//! read the raw body, verify its signature in constant time, handle any
//! URL-verification/PING shortcut before touching a use-case, decode into
//! [`UserMessage`], and expose a `Send` for the reply path. `server::webhooks`
//! wires these into axum handlers.

pub mod discord;
pub mod line;
pub mod signature;
pub mod slack;
pub mod teams;
pub mod telegram;
pub mod whatsapp;

use async_trait::async_trait;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Line,
    Telegram,
    Discord,
    WhatsApp,
    Slack,
    Teams,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Line => "line",
            Platform::Telegram => "telegram",
            Platform::Discord => "discord",
            Platform::WhatsApp => "whatsapp",
            Platform::Slack => "slack",
            Platform::Teams => "teams",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationType {
    Direct,
    Channel,
}

/// The internal event every adapter normalizes its platform payload into.
/// `reply_handle` carries whatever the platform needs to route a reply back
/// (LINE reply token, Discord interaction token, Teams service URL, ...).
#[derive(Debug, Clone)]
pub struct UserMessage {
    pub platform: Platform,
    pub external_user_id: String,
    pub text: String,
    pub reply_handle: String,
    pub is_bot_msg: bool,
    pub conversation_type: ConversationType,
}

impl UserMessage {
    /// `{platform}_{raw_id}` everywhere inside the system except WhatsApp,
    /// which uses the raw phone number by design.
    pub fn namespaced_user_id(&self) -> String {
        match self.platform {
            Platform::WhatsApp => self.external_user_id.clone(),
            other => format!("{}_{}", other.as_str(), self.external_user_id),
        }
    }
}

/// Strips a leading `@bot` mention token from channel messages.
pub fn strip_bot_mention(text: &str) -> String {
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix('@') {
        if let Some(space_idx) = rest.find(char::is_whitespace) {
            return rest[space_idx..].trim_start().to_string();
        }
    }
    trimmed.to_string()
}

/// A response that must be sent without invoking any use-case: Slack's
/// `url_verification` challenge echo, Discord's PING/PONG, WhatsApp's
/// subscription challenge echo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookShortcut {
    Challenge(String),
    Pong,
}

#[async_trait]
pub trait MessengerAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Sends a reply via the platform's outbound API. Failures are logged
    /// by the implementation and never propagated to the webhook response.
    async fn send(&self, reply_handle: &str, text: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_non_whatsapp_platforms() {
        let msg = UserMessage {
            platform: Platform::Slack,
            external_user_id: "U123".to_string(),
            text: "hi".to_string(),
            reply_handle: "C1".to_string(),
            is_bot_msg: false,
            conversation_type: ConversationType::Channel,
        };
        assert_eq!(msg.namespaced_user_id(), "slack_U123");
    }

    #[test]
    fn whatsapp_uses_raw_phone_number() {
        let msg = UserMessage {
            platform: Platform::WhatsApp,
            external_user_id: "15551234567".to_string(),
            text: "hi".to_string(),
            reply_handle: "15551234567".to_string(),
            is_bot_msg: false,
            conversation_type: ConversationType::Direct,
        };
        assert_eq!(msg.namespaced_user_id(), "15551234567");
    }

    #[test]
    fn strips_leading_bot_mention() {
        assert_eq!(strip_bot_mention("@bot breakfast $8"), "breakfast $8");
        assert_eq!(strip_bot_mention("breakfast $8"), "breakfast $8");
    }
}
