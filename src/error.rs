//! Error taxonomy for Tallyline.
//!
//! Mirrors the error classes in the design doc: `Auth`, `BadRequest`,
//! `NotFound`, `Transient`, `Invariant`, `Capacity`, plus the ambient
//! wrapping variants for the libraries we sit on top of. `IntoResponse`
//! (see `server::error_response`) maps each to its HTTP status.

use thiserror::Error;

/// Main error type for Tallyline.
#[derive(Debug, Error)]
pub enum Error {
    /// Signature mismatch, missing/invalid admin key. Never retried.
    #[error("Unauthorized: {0}")]
    Auth(String),

    /// Malformed body, unknown provider, bad date, etc.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unknown id/key.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream network, DB busy, rate-limit — retried internally up to
    /// the owning component's policy, then surfaced.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Uniqueness violation, foreign-key miss, or other broken invariant.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// Job queue full, statement-cache full.
    #[error("Capacity exceeded: {0}")]
    Capacity(String),

    /// Database-related errors not otherwise classified.
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration errors (missing/invalid env vars).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQL errors (converted to `Invariant`/`Database` at the repository
    /// boundary where we can tell uniqueness violations apart from the rest;
    /// this variant is the fallback when we can't).
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    /// Outbound HTTP client errors (LLM calls, messenger replies, pricing
    /// provider fetches).
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// Generic errors that don't fit elsewhere.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True if this error class is safe to retry internally (used by the
    /// pricing sync engine and the AI client's fallback decision).
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_) | Error::Reqwest(_))
    }
}

/// Result type alias for Tallyline operations.
pub type Result<T> = std::result::Result<T, Error>;
