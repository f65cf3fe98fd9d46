//! Resolves the acting user of a request.
//!
//! Authentication happens upstream; by the time a request gets here the verified user
//! id is carried in the `X-User-Id` header.

use super::AppState;
use crate::{
    core::user::{self, Actor},
    errors::Error,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

/// Header carrying the verified user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the client's retry guard for payment-producing calls.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// The [`Actor`] behind the current request.
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| Error::unauthorized("missing X-User-Id header"))?;
        let user_id: i64 = header
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse().ok())
            .ok_or_else(|| Error::unauthorized("malformed X-User-Id header"))?;

        match user::resolve_actor(&state.db, user_id).await {
            Ok(actor) => Ok(Self(actor)),
            Err(Error::NotFound { .. }) => {
                Err(Error::unauthorized(format!("unknown user {user_id}")))
            }
            Err(other) => Err(other),
        }
    }
}

/// The [`Actor`] behind the current request, or `None` when no `X-User-Id` header
/// was sent at all.
///
/// A header that is present but malformed or names an unknown user is still
/// rejected, exactly as for [`CurrentActor`].
#[derive(Debug, Clone, Copy)]
pub struct OptionalActor(pub Option<Actor>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalActor {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(USER_ID_HEADER) {
            return Ok(Self(None));
        }
        let CurrentActor(actor) = CurrentActor::from_request_parts(parts, state).await?;
        Ok(Self(Some(actor)))
    }
}

/// Reads the `Idempotency-Key` header, if present and valid UTF-8.
pub fn idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
