//! Deterministic fallback parser for `ParseExpense`.
//!
//! Used when no AI provider is configured, or the primary call fails after
//! its internal retries. Kept as a pure function — no I/O, no repositories —
//! so it can be property-tested directly.
//!
//! Rule: the amount is the first decimal or integer numeric literal
//! separated from a label by optional currency symbols or whitespace;
//! consecutive items are implicitly separated by common delimiters
//! (comma, space, CJK middle-dot, newline) since none of those characters
//! can appear inside a label match.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ai::ParsedExpense;

static ITEM_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<label>[^\d,\n・·]+?)[ \t]*[$€£¥]?[ \t]*(?P<amount>\d+(?:\.\d{1,2})?)").unwrap()
});

/// Extracts `(amount, description)` pairs from free text without calling
/// any LLM. Returns an empty vec when nothing looks like an expense.
pub fn parse_expense_regex(text: &str) -> Vec<ParsedExpense> {
    ITEM_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let label = caps.name("label")?.as_str().trim();
            let amount: f64 = caps.name("amount")?.as_str().parse().ok()?;
            if label.is_empty() {
                return None;
            }
            Some(ParsedExpense {
                amount,
                description: label.to_string(),
                currency: None,
                date_hint: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakfast_lunch_example_from_the_design_doc() {
        let parsed = parse_expense_regex("breakfast $8 lunch $12");
        assert_eq!(
            parsed,
            vec![
                ParsedExpense { amount: 8.0, description: "breakfast".to_string(), currency: None, date_hint: None },
                ParsedExpense { amount: 12.0, description: "lunch".to_string(), currency: None, date_hint: None },
            ]
        );
    }

    #[test]
    fn comma_separated_items_without_currency_symbols() {
        let parsed = parse_expense_regex("coffee 4.5, taxi 10");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].description, "coffee");
        assert_eq!(parsed[0].amount, 4.5);
        assert_eq!(parsed[1].description, "taxi");
        assert_eq!(parsed[1].amount, 10.0);
    }

    #[test]
    fn newline_separated_items() {
        let parsed = parse_expense_regex("groceries 30\ngas 45");
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn no_numeric_literal_yields_empty_result() {
        assert!(parse_expense_regex("just chatting, no expenses here").is_empty());
    }

    #[test]
    fn cjk_middle_dot_separates_items() {
        let parsed = parse_expense_regex("午餐 100・咖啡 50");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].amount, 100.0);
        assert_eq!(parsed[1].amount, 50.0);
    }
}
