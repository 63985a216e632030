//! Shared application state threaded through every axum handler via
//! `State<AppState>`. Construction happens once at startup in `main`;
//! everything here is cheap to clone (`Arc` wrappers only).

use std::collections::HashMap;
use std::sync::Arc;

use ed25519_dalek::VerifyingKey;

use crate::ai::AiClient;
use crate::domain::Repos;
use crate::messengers::{MessengerAdapter, Platform};
use crate::pricing::PricingSyncEngine;

/// Verification secrets for whichever messengers are enabled. `None` means
/// that platform's webhook route rejects every request with 400 — the
/// adapter was never configured.
#[derive(Default)]
pub struct MessengerCredentials {
    pub line_channel_secret: Option<Vec<u8>>,
    pub telegram_secret_token: Option<String>,
    pub discord_public_key: Option<VerifyingKey>,
    pub whatsapp_app_secret: Option<Vec<u8>>,
    pub whatsapp_verify_token: Option<String>,
    pub slack_signing_secret: Option<Vec<u8>>,
    pub teams_app_password: Option<Vec<u8>>,
}

#[derive(Clone)]
pub struct AppState {
    pub repos: Repos,
    pub pricing_engine: Arc<PricingSyncEngine>,
    pub ai_client: Option<Arc<dyn AiClient>>,
    pub credentials: Arc<MessengerCredentials>,
    pub adapters: Arc<HashMap<Platform, Arc<dyn MessengerAdapter>>>,
    pub admin_api_key: Arc<Option<String>>,
    pub report_secret: Arc<Vec<u8>>,
    pub dashboard_url: Arc<String>,
}

impl AppState {
    pub fn adapter_for(&self, platform: Platform) -> Option<Arc<dyn MessengerAdapter>> {
        self.adapters.get(&platform).cloned()
    }
}
