//! Use-case orchestration (Components B, E, F, H).
//!
//! Each submodule wires domain repositories and the AI/pricing abstractions
//! together into the operations the HTTP surface calls. Use-cases own
//! cross-entity invariants; repositories stay side-effect-only on their one
//! table.

pub mod cost_ledger;
pub mod currency;
pub mod expense;
pub mod parse_conversation;
pub mod regex_fallback;
pub mod report;
pub mod signup;
pub mod tokens;
