//! Token-count estimation used when a provider doesn't report usage.
//!
//! Heuristic: `ceil(chars / 4)`, the same rough ratio most providers quote
//! for English prose. Good enough for cost-ledger purposes, not billing-grade.

pub fn estimate_tokens(text: &str) -> i64 {
    let chars = text.chars().count() as i64;
    (chars + 3) / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_on_partial_chunks() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
