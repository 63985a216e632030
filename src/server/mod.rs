//! HTTP server: webhook ingestion, the conversational/report API, and the
//! admin/metrics surface, all wired onto one axum `Router` over `AppState`.

mod admin;
mod api;
mod auth;
mod error_response;
mod health;
pub mod state;
mod webhooks;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::{AppState, MessengerCredentials};

use crate::error::Result;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/live", get(health::live))
        .route("/webhook/line", post(webhooks::line))
        .route("/webhook/telegram", post(webhooks::telegram))
        .route("/webhook/discord", post(webhooks::discord))
        .route("/webhook/whatsapp", get(webhooks::whatsapp_verify).post(webhooks::whatsapp))
        .route("/webhook/slack", post(webhooks::slack))
        .route("/webhook/teams", post(webhooks::teams))
        .route("/api/users/auto-signup", post(api::auto_signup_handler))
        .route("/api/expenses/parse", post(api::parse_expenses_handler))
        .route(
            "/api/expenses",
            get(api::list_expenses_handler).post(api::create_expense_handler),
        )
        .route("/api/expenses/:id", get(api::get_expense_handler))
        .route("/api/categories", get(api::list_categories_handler))
        .route("/api/reports/generate", post(api::generate_report_handler))
        .route("/api/pricing/sync", post(admin::sync_pricing_handler))
        .route("/api/pricing", get(admin::pricing_history_handler))
        .route("/api/pricing/:id", axum::routing::delete(admin::deactivate_pricing_handler))
        .route("/api/metrics/dau", get(admin::dau_handler))
        .route("/api/metrics/growth", get(admin::growth_handler))
        .route("/api/metrics/expenses-summary", get(admin::expenses_summary_handler))
        .route("/api/metrics/ai-costs", get(admin::ai_costs_handler))
        .route("/r/:id", get(api::short_link_redirect))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = router(state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
