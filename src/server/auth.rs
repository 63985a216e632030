//! `X-API-Key` extractor for the admin/metrics surface.
//! An empty `ADMIN_API_KEY` disables auth entirely — dev-only, logged once
//! at startup in `main`, not here.

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use subtle::ConstantTimeEq;

use crate::error::Error;
use crate::server::state::AppState;

pub struct AdminAuth;

#[async_trait]
impl<S> FromRequestParts<S> for AdminAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let Some(expected) = app_state.admin_api_key.as_ref() else {
            return Ok(AdminAuth);
        };

        let provided = parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if expected.as_bytes().ct_eq(provided.as_bytes()).unwrap_u8() == 1 {
            Ok(AdminAuth)
        } else {
            Err(Error::Auth("missing or invalid X-API-Key".to_string()))
        }
    }
}
