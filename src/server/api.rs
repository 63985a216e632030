//! Public (non-admin) API surface: signup, conversational parsing, expense
//! CRUD, categories, report generation, and the short-link redirect.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Redirect, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::category::suggest_category_from_keywords;
use crate::domain::expense::Expense;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::usecases::expense::{create_expense, get_expenses, CreateExpenseInput};
use crate::usecases::parse_conversation::parse_conversation;
use crate::usecases::report::{generate_report, Report, ReportPeriod};
use crate::usecases::signup::auto_signup;
use crate::usecases::tokens::{resolve_token, verify_report_token};

#[derive(Debug, Deserialize)]
pub struct AutoSignupRequest {
    pub user_id: String,
    pub messenger_type: String,
}

#[derive(Debug, Serialize)]
pub struct AutoSignupResponse {
    pub user_id: String,
    pub created: bool,
}

pub async fn auto_signup_handler(
    State(state): State<AppState>,
    Json(req): Json<AutoSignupRequest>,
) -> Result<Json<AutoSignupResponse>> {
    let outcome = auto_signup(&*state.repos.users, &*state.repos.categories, &req.user_id, &req.messenger_type).await?;
    Ok(Json(AutoSignupResponse { user_id: outcome.user.user_id, created: outcome.created }))
}

#[derive(Debug, Deserialize)]
pub struct ParseExpensesRequest {
    pub user_id: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ParsedItemResponse {
    pub amount: f64,
    pub description: String,
    pub currency: Option<String>,
    pub resolved_date: DateTime<Utc>,
}

pub async fn parse_expenses_handler(
    State(state): State<AppState>,
    Json(req): Json<ParseExpensesRequest>,
) -> Result<Json<Vec<ParsedItemResponse>>> {
    let user = state
        .repos
        .users
        .get_by_id(&req.user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("user {}", req.user_id)))?;

    let items = parse_conversation(
        state.ai_client.as_deref(),
        &*state.repos.interaction_logs,
        &*state.repos.ai_cost_logs,
        &*state.repos.pricing,
        &user,
        &req.text,
    )
    .await;

    Ok(Json(
        items
            .into_iter()
            .map(|i| ParsedItemResponse {
                amount: i.amount,
                description: i.description,
                currency: i.currency,
                resolved_date: i.resolved_date,
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub user_id: String,
    pub description: String,
    pub original_amount: f64,
    pub currency: Option<String>,
    pub category_id: Option<String>,
    pub expense_date: Option<DateTime<Utc>>,
    pub account: Option<String>,
}

pub async fn create_expense_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateExpenseRequest>,
) -> Result<Json<Expense>> {
    let keywords = state.repos.categories.keywords_for_user(&req.user_id).await?;
    let suggested_category_id = if req.category_id.is_none() {
        suggest_category_from_keywords(&req.description, &keywords)
    } else {
        None
    };

    let result = create_expense(
        &*state.repos.users,
        &*state.repos.categories,
        &*state.repos.exchange_rates,
        &*state.repos.expenses,
        CreateExpenseInput {
            user_id: req.user_id,
            description: req.description,
            original_amount: req.original_amount,
            currency: req.currency,
            category_id: req.category_id,
            expense_date: req.expense_date,
            account: req.account,
        },
        suggested_category_id,
    )
    .await?;

    Ok(Json(result.expense))
}

pub async fn get_expense_handler(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Expense>> {
    state
        .repos
        .expenses
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("expense {id}")))
}

#[derive(Debug, Deserialize)]
pub struct ListExpensesQuery {
    pub user_id: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

pub async fn list_expenses_handler(
    State(state): State<AppState>,
    Query(query): Query<ListExpensesQuery>,
) -> Result<Json<Vec<Expense>>> {
    let expenses = get_expenses(&*state.repos.expenses, &query.user_id, query.from, query.to).await?;
    Ok(Json(expenses))
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

pub async fn list_categories_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<CategoryResponse>>> {
    let user_id = params.get("user_id").cloned().ok_or_else(|| Error::BadRequest("user_id is required".to_string()))?;
    let categories = state.repos.categories.get_by_user(&user_id).await?;
    Ok(Json(
        categories
            .into_iter()
            .map(|c| CategoryResponse { id: c.id, name: c.name, is_default: c.is_default })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriodRequest {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

#[derive(Debug, Deserialize)]
pub struct GenerateReportRequest {
    pub user_id: String,
    pub period: ReportPeriodRequest,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn generate_report_handler(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(req): Json<GenerateReportRequest>,
) -> Result<Json<Report>> {
    let authorization = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    let cookie = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
    let token = resolve_token(query.get("token").map(String::as_str), authorization, cookie)
        .ok_or_else(|| Error::Auth("report token required".to_string()))?;
    let subject = verify_report_token(&state.report_secret, token)?;
    if subject != req.user_id {
        return Err(Error::Auth("report token does not match user_id".to_string()));
    }

    let period = match req.period {
        ReportPeriodRequest::Daily => ReportPeriod::Daily,
        ReportPeriodRequest::Weekly => ReportPeriod::Weekly,
        ReportPeriodRequest::Monthly => ReportPeriod::Monthly,
        ReportPeriodRequest::Custom => {
            let from = req.from.ok_or_else(|| Error::BadRequest("from is required for a custom period".to_string()))?;
            let to = req.to.ok_or_else(|| Error::BadRequest("to is required for a custom period".to_string()))?;
            ReportPeriod::Custom { from, to }
        }
    };

    let report = generate_report(&*state.repos.expenses, &*state.repos.categories, &req.user_id, period).await?;
    Ok(Json(report))
}

/// `/r/{id}`: resolves a short link, sets the `report_token` cookie, and
/// 302-redirects to the dashboard's report view.
pub async fn short_link_redirect(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.repos.short_links.resolve(&id).await {
        Ok(Some(link)) => {
            let location = format!("{}/reports?token={}", state.dashboard_url, link.target_token);
            let cookie = format!("report_token={}; Path=/; HttpOnly; SameSite=Lax", link.target_token);
            let mut response = Redirect::to(&location).into_response();
            if let Ok(value) = header::HeaderValue::from_str(&cookie) {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            response
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => e.into_response(),
    }
}
