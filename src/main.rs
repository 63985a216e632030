//! Tallyline CLI entry point: loads configuration from the environment,
//! connects to SQLite, and dispatches to either `migrate` or `serve`.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ed25519_dalek::VerifyingKey;

use tallyline::ai::gemini::GeminiClient;
use tallyline::ai::AiClient;
use tallyline::cli::{run_migrate, Cli, Commands};
use tallyline::database::Database;
use tallyline::domain::Repos;
use tallyline::error::{Error, Result};
use tallyline::messengers::discord::{parse_public_key, DiscordAdapter};
use tallyline::messengers::line::LineAdapter;
use tallyline::messengers::slack::SlackAdapter;
use tallyline::messengers::teams::TeamsAdapter;
use tallyline::messengers::telegram::TelegramAdapter;
use tallyline::messengers::whatsapp::WhatsAppAdapter;
use tallyline::messengers::{MessengerAdapter, Platform};
use tallyline::pricing::{PricingSyncEngine, StaticTablePricingProvider};
use tallyline::server::{self, AppState, MessengerCredentials};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let database_path = env::var("DATABASE_PATH").ok();
    let database_url = env::var("DATABASE_URL").ok();
    let db = Database::connect(database_path.as_deref(), database_url.as_deref()).await?;
    db.migrate().await?;

    match cli.command {
        Commands::Migrate => run_migrate(&db).await,
        Commands::Serve { host, port } => {
            let port = env::var("SERVER_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(port);
            let state = build_app_state(db)?;
            server::run(state, &host, port).await
        }
    }
}

fn build_app_state(db: Database) -> Result<AppState> {
    let repos = Repos::sqlite(db.pool().clone());

    let admin_api_key = env::var("ADMIN_API_KEY").ok().filter(|k| !k.is_empty());
    if admin_api_key.is_none() {
        tracing::warn!("ADMIN_API_KEY is not set; the admin/metrics surface is unauthenticated (dev only)");
    }

    let jwt_secret = env::var("JWT_SECRET").map_err(|_| Error::Configuration("JWT_SECRET is required".to_string()))?;
    let dashboard_url = env::var("DASHBOARD_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let ai_client = build_ai_client()?;
    let pricing_engine = PricingSyncEngine::new(vec![Arc::new(StaticTablePricingProvider::openai_defaults())]);

    let enabled: Vec<String> = env::var("ENABLED_MESSENGERS")
        .unwrap_or_else(|_| "terminal".to_string())
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .collect();

    let (credentials, adapters) = build_messengers(&enabled)?;

    Ok(AppState {
        repos,
        pricing_engine: Arc::new(pricing_engine),
        ai_client,
        credentials: Arc::new(credentials),
        adapters: Arc::new(adapters),
        admin_api_key: Arc::new(admin_api_key),
        report_secret: Arc::new(jwt_secret.into_bytes()),
        dashboard_url: Arc::new(dashboard_url),
    })
}

fn build_ai_client() -> Result<Option<Arc<dyn AiClient>>> {
    let provider = env::var("AI_PROVIDER").unwrap_or_default();
    if provider.is_empty() {
        return Ok(None);
    }
    if provider != "gemini" {
        return Err(Error::Configuration(format!("unsupported AI_PROVIDER: {provider}")));
    }

    let api_key = env::var("GEMINI_API_KEY")
        .map_err(|_| Error::Configuration("GEMINI_API_KEY is required when AI_PROVIDER=gemini".to_string()))?;
    let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string());

    Ok(Some(Arc::new(GeminiClient::new(api_key, model)?)))
}

/// Builds verification credentials and outbound adapters for whichever
/// platforms appear in `enabled` and have their required env vars set. A
/// platform named in `ENABLED_MESSENGERS` without credentials is a fatal
/// config error; an unmentioned platform's webhook route stays live but
/// rejects every request with 400 (see `server::webhooks`).
fn build_messengers(enabled: &[String]) -> Result<(MessengerCredentials, HashMap<Platform, Arc<dyn MessengerAdapter>>)> {
    let mut credentials = MessengerCredentials::default();
    let mut adapters: HashMap<Platform, Arc<dyn MessengerAdapter>> = HashMap::new();

    if enabled.iter().any(|p| p == "line") {
        let secret = require_env("LINE_CHANNEL_SECRET")?;
        let token = require_env("LINE_CHANNEL_ACCESS_TOKEN")?;
        credentials.line_channel_secret = Some(secret.into_bytes());
        adapters.insert(Platform::Line, Arc::new(LineAdapter::new(token)?));
    }

    if enabled.iter().any(|p| p == "telegram") {
        let token = require_env("TELEGRAM_BOT_TOKEN")?;
        credentials.telegram_secret_token = env::var("TELEGRAM_SECRET_TOKEN").ok();
        adapters.insert(Platform::Telegram, Arc::new(TelegramAdapter::new(token)?));
    }

    if enabled.iter().any(|p| p == "discord") {
        let public_key_hex = require_env("DISCORD_PUBLIC_KEY")?;
        let public_key: VerifyingKey = parse_public_key(&public_key_hex)?;
        let application_id = require_env("DISCORD_APPLICATION_ID")?;
        credentials.discord_public_key = Some(public_key);
        adapters.insert(Platform::Discord, Arc::new(DiscordAdapter::new(application_id)?));
    }

    if enabled.iter().any(|p| p == "whatsapp") {
        let app_secret = require_env("WHATSAPP_APP_SECRET")?;
        let verify_token = require_env("WHATSAPP_VERIFY_TOKEN")?;
        let phone_number_id = require_env("WHATSAPP_PHONE_NUMBER_ID")?;
        let access_token = require_env("WHATSAPP_ACCESS_TOKEN")?;
        credentials.whatsapp_app_secret = Some(app_secret.into_bytes());
        credentials.whatsapp_verify_token = Some(verify_token);
        adapters.insert(Platform::WhatsApp, Arc::new(WhatsAppAdapter::new(phone_number_id, access_token)?));
    }

    if enabled.iter().any(|p| p == "slack") {
        let signing_secret = require_env("SLACK_SIGNING_SECRET")?;
        let bot_token = require_env("SLACK_BOT_TOKEN")?;
        credentials.slack_signing_secret = Some(signing_secret.into_bytes());
        adapters.insert(Platform::Slack, Arc::new(SlackAdapter::new(bot_token)?));
    }

    if enabled.iter().any(|p| p == "teams") {
        let app_password = require_env("TEAMS_APP_PASSWORD")?;
        credentials.teams_app_password = Some(app_password.clone().into_bytes());
        adapters.insert(Platform::Teams, Arc::new(TeamsAdapter::new(app_password)?));
    }

    Ok((credentials, adapters))
}

fn require_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Configuration(format!("{name} is required")))
}
