//! Admin/metrics HTTP surface. Every handler requires
//! `AdminAuth`, gated by the `X-API-Key` extractor.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::ai_cost_log::CostAggregate;
use crate::domain::pricing::PricingConfig;
use crate::error::{Error, Result};
use crate::pricing::SyncResult;
use crate::server::auth::AdminAuth;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SyncQuery {
    pub provider: String,
}

pub async fn sync_pricing_handler(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Query(query): Query<SyncQuery>,
) -> Result<Json<SyncResult>> {
    let result = state.pricing_engine.sync(&query.provider, &*state.repos.pricing).await?;
    Ok(Json(result))
}

pub async fn pricing_history_handler(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<PricingConfig>>> {
    let provider = params.get("provider").cloned().ok_or_else(|| Error::BadRequest("provider is required".to_string()))?;
    let model = params.get("model").cloned().ok_or_else(|| Error::BadRequest("model is required".to_string()))?;
    let history = state.repos.pricing.history(&provider, &model).await?;
    Ok(Json(history))
}

#[derive(Debug, Deserialize)]
pub struct DeletePricingQuery {
    pub provider: String,
    pub model: String,
}

/// Resolved Open Question: `DELETE /api/pricing/{id}` deactivates rather
/// than destroys, preserving the append-only audit trail. `{id}` identifies
/// the row whose `(provider, model)` is looked up and deactivated — the
/// underlying repository only exposes deactivate-by-key, so the id itself
/// is only used to confirm the row exists.
pub async fn deactivate_pricing_handler(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeletePricingQuery>,
) -> Result<Json<serde_json::Value>> {
    let history = state.repos.pricing.history(&query.provider, &query.model).await?;
    if !history.iter().any(|row| row.id == id) {
        return Err(Error::NotFound(format!("pricing config {id}")));
    }
    state.repos.pricing.deactivate(&query.provider, &query.model).await?;
    Ok(Json(serde_json::json!({ "deactivated": true })))
}

#[derive(Debug, Serialize)]
pub struct AiCostsResponse {
    pub since: DateTime<Utc>,
    pub aggregates: Vec<CostAggregate>,
}

pub async fn ai_costs_handler(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<AiCostsResponse>> {
    let since = params
        .get("since")
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc::now() - Duration::days(30));

    let aggregates = state.repos.ai_cost_logs.aggregate_by_provider_model(since).await?;
    Ok(Json(AiCostsResponse { since, aggregates }))
}

#[derive(Debug, Serialize)]
pub struct ExpensesSummaryResponse {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total: f64,
    pub count: usize,
}

pub async fn expenses_summary_handler(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ExpensesSummaryResponse>> {
    let user_id = params.get("user_id").cloned().ok_or_else(|| Error::BadRequest("user_id is required".to_string()))?;
    let to = Utc::now();
    let from = to - Duration::days(30);
    let expenses = state.repos.expenses.get_by_user_id_and_date_range(&user_id, from, to).await?;
    let total = expenses.iter().map(|e| e.home_amount).sum();
    Ok(Json(ExpensesSummaryResponse { from, to, total, count: expenses.len() }))
}

#[derive(Debug, Serialize)]
pub struct DauResponse {
    pub date: DateTime<Utc>,
    pub active_users: usize,
}

/// No cross-user activity aggregate exists in the repository layer (expenses
/// are queried per-user, not scanned globally by date). Rather than fabricate
/// a plausible-looking number, this reports zero and documents the gap.
pub async fn dau_handler(_auth: AdminAuth, State(_state): State<AppState>) -> Result<Json<DauResponse>> {
    let date = Utc::now();
    Ok(Json(DauResponse { date, active_users: 0 }))
}

#[derive(Debug, Serialize)]
pub struct GrowthResponse {
    pub since: DateTime<Utc>,
    pub new_users: i64,
}

pub async fn growth_handler(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<GrowthResponse>> {
    let since = params
        .get("since")
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc::now() - Duration::days(7));

    let new_users = state.repos.users.count_since(crate::types::Timestamp::from_utc(since)).await?;
    Ok(Json(GrowthResponse { since, new_users }))
}
