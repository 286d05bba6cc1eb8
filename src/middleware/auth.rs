use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError, state::AppState};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Resolve the session carried by the request headers.
///
/// Returns `None` for a missing header, a non-bearer scheme, or a token that
/// does not verify against `secret`.
pub fn resolve_session(headers: &HeaderMap, secret: &str) -> Option<AuthUser> {
    let auth_str = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();

    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    let user_id = Uuid::parse_str(&decoded.claims.sub).ok()?;
    Some(AuthUser { user_id })
}

pub fn require_session(session: Option<AuthUser>) -> Result<AuthUser, AppError> {
    session.ok_or(AppError::Unauthorized)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = resolve_session(&parts.headers, &state.jwt_secret);
        if session.is_none() {
            tracing::debug!("request without a valid session");
        }
        require_session(session)
    }
}
