//! CreateExpense and GetExpenses.

use chrono::{DateTime, Utc};

use crate::domain::category::CategoryRepository;
use crate::domain::expense::{Expense, ExpenseRepository, NewExpense, DEFAULT_ACCOUNT};
use crate::domain::exchange_rate::ExchangeRateRepository;
use crate::domain::user::UserRepository;
use crate::error::{Error, Result};
use crate::usecases::currency::normalize;

pub struct CreateExpenseInput {
    pub user_id: String,
    pub description: String,
    pub original_amount: f64,
    pub currency: Option<String>,
    pub category_id: Option<String>,
    pub expense_date: Option<DateTime<Utc>>,
    pub account: Option<String>,
}

pub struct CreateExpenseResult {
    pub expense: Expense,
    pub category_name: Option<String>,
    pub confirmation_text: String,
}

/// Resolves currency, normalizes to the user's home currency, optionally
/// assigns a category, and inserts the expense. Category suggestion is the
/// caller's concern when `input.category_id` is absent: pass the result of
/// an `AiClient::suggest_category` call (or its regex/keyword fallback) via
/// `suggested_category_id`.
pub async fn create_expense(
    users: &dyn UserRepository,
    categories: &dyn CategoryRepository,
    rates: &dyn ExchangeRateRepository,
    expenses: &dyn ExpenseRepository,
    input: CreateExpenseInput,
    suggested_category_id: Option<String>,
) -> Result<CreateExpenseResult> {
    let user = users
        .get_by_id(&input.user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("user {}", input.user_id)))?;

    let currency = input
        .currency
        .unwrap_or_else(|| user.home_currency.clone());
    let expense_date = input.expense_date.unwrap_or_else(Utc::now);

    if expense_date > Utc::now() + chrono::Duration::days(1) {
        return Err(Error::BadRequest("expense_date cannot be more than one day in the future".to_string()));
    }

    let normalized = normalize(rates, input.original_amount, &currency, &user.home_currency, expense_date).await?;

    let category_id = match input.category_id {
        Some(id) => Some(id),
        None => match suggested_category_id {
            Some(id) if categories.get_by_id(&id).await?.is_some() => Some(id),
            _ => None,
        },
    };

    let category_name = match &category_id {
        Some(id) => categories.get_by_id(id).await?.map(|c| c.name),
        None => None,
    };

    let expense = expenses
        .create(NewExpense {
            user_id: input.user_id,
            description: input.description.clone(),
            original_amount: input.original_amount,
            currency,
            home_amount: normalized.home_amount,
            home_currency: user.home_currency,
            exchange_rate: normalized.exchange_rate,
            category_id,
            account: input.account.unwrap_or_else(|| DEFAULT_ACCOUNT.to_string()),
            expense_date,
        })
        .await?;

    let confirmation_text = format!(
        "Logged {:.2} {} for \"{}\"{}",
        expense.home_amount,
        expense.home_currency,
        input.description,
        category_name
            .as_ref()
            .map(|name| format!(" under {name}"))
            .unwrap_or_default(),
    );

    Ok(CreateExpenseResult { expense, category_name, confirmation_text })
}

pub async fn get_expenses(
    expenses: &dyn ExpenseRepository,
    user_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Expense>> {
    expenses.get_by_user_id_and_date_range(user_id, from, to).await
}
