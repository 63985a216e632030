//! End-to-end conversational expense flow: AutoSignup -> ParseConversation
//! -> CreateExpense chained exactly as `server::webhooks::process_user_message`
//! drives them, verified against the database rather than through a
//! webhook's fire-and-forget HTTP response.

use sqlx::SqlitePool;

use tallyline::domain::ai_cost_log::SqliteAiCostLogRepository;
use tallyline::domain::category::SqliteCategoryRepository;
use tallyline::domain::exchange_rate::SqliteExchangeRateRepository;
use tallyline::domain::expense::SqliteExpenseRepository;
use tallyline::domain::interaction_log::SqliteInteractionLogRepository;
use tallyline::domain::pricing::SqlitePricingRepository;
use tallyline::domain::user::SqliteUserRepository;
use tallyline::usecases::expense::{create_expense, CreateExpenseInput};
use tallyline::usecases::parse_conversation::parse_conversation;
use tallyline::usecases::signup::auto_signup;

async fn pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

/// LINE new user, single expense (spec scenario S1): a first-contact
/// message "breakfast $8" provisions the user, parses to one item via the
/// regex fallback (no AI provider configured), and logs one expense at
/// `home_amount == original_amount` since a fresh user's home currency is
/// the regex fallback's implicit currency (no symbol-to-code mapping, so
/// `currency` stays `None` and defaults to the user's own).
#[tokio::test]
async fn line_new_user_single_expense() {
    let pool = pool().await;
    let users = SqliteUserRepository::new(pool.clone());
    let categories = SqliteCategoryRepository::new(pool.clone());
    let rates = SqliteExchangeRateRepository::new(pool.clone());
    let expenses = SqliteExpenseRepository::new(pool.clone());
    let interaction_logs = SqliteInteractionLogRepository::new(pool.clone());
    let ai_cost_logs = SqliteAiCostLogRepository::new(pool.clone());
    let pricing = SqlitePricingRepository::new(pool.clone());

    let user_id = "line_U1";
    let outcome = auto_signup(&users, &categories, user_id, "line").await.unwrap();
    assert!(outcome.created);
    assert_eq!(
        categories.get_by_user(user_id).await.unwrap().len(),
        tallyline::domain::category::DEFAULT_CATEGORIES.len()
    );

    let items = parse_conversation(
        None,
        &interaction_logs,
        &ai_cost_logs,
        &pricing,
        &outcome.user,
        "breakfast $8",
    )
    .await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].description, "breakfast");
    assert_eq!(items[0].amount, 8.0);

    let result = create_expense(
        &users,
        &categories,
        &rates,
        &expenses,
        CreateExpenseInput {
            user_id: user_id.to_string(),
            description: items[0].description.clone(),
            original_amount: items[0].amount,
            currency: items[0].currency.clone(),
            category_id: None,
            expense_date: Some(items[0].resolved_date),
            account: None,
        },
        None,
    )
    .await
    .unwrap();

    assert_eq!(result.expense.original_amount, 8.0);
    assert_eq!(result.expense.home_amount, 8.0);
    assert_eq!(result.expense.exchange_rate, 1.0);
    assert!(result.confirmation_text.contains("8.00"));

    let stored = expenses
        .get_by_user_id_and_date_range(
            user_id,
            chrono::Utc::now() - chrono::Duration::days(1),
            chrono::Utc::now() + chrono::Duration::days(1),
        )
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

/// Re-running AutoSignup for the same message on a pre-existing user must
/// not create a second user row or a second default category set.
#[tokio::test]
async fn repeat_contact_from_the_same_user_is_idempotent() {
    let pool = pool().await;
    let users = SqliteUserRepository::new(pool.clone());
    let categories = SqliteCategoryRepository::new(pool.clone());

    let first = auto_signup(&users, &categories, "slack_U9", "slack").await.unwrap();
    let second = auto_signup(&users, &categories, "slack_U9", "slack").await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(
        categories.get_by_user("slack_U9").await.unwrap().len(),
        tallyline::domain::category::DEFAULT_CATEGORIES.len()
    );
}
