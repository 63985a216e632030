//! Currency normalization.
//!
//! Pure given repository outputs: `normalize` takes whatever the exchange
//! rate repository returns and never talks to the network itself — the
//! rate-fetching transport lives outside this crate's scope.

use chrono::{DateTime, Utc};

use crate::domain::exchange_rate::ExchangeRateRepository;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub home_amount: f64,
    pub exchange_rate: f64,
}

/// Converts `original_amount` in `currency` to `home_currency` as of
/// `expense_date`. Exact-day rate first, then most-recent on-or-before;
/// never silently falls back to `1.0` for a genuinely unknown rate.
pub async fn normalize(
    rates: &dyn ExchangeRateRepository,
    original_amount: f64,
    currency: &str,
    home_currency: &str,
    expense_date: DateTime<Utc>,
) -> Result<Normalized> {
    if currency.eq_ignore_ascii_case(home_currency) {
        return Ok(Normalized {
            home_amount: original_amount,
            exchange_rate: 1.0,
        });
    }

    let rate = match rates.get_exact(currency, home_currency, expense_date).await? {
        Some(rate) => rate,
        None => rates
            .get_most_recent_rate(currency, home_currency, expense_date)
            .await?
            .ok_or_else(|| {
                Error::Transient(format!(
                    "no exchange rate available for {currency}->{home_currency} on or before {expense_date}"
                ))
            })?,
    };

    Ok(Normalized {
        home_amount: round2(original_amount * rate.rate),
        exchange_rate: rate.rate,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
