use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;
use uuid::Uuid;

use super::{claims::TokenKind, jwt::JwtKeys};
use crate::error::AppError;

const MISSING_TOKEN: &str = "Missing or invalid token";
const INVALID_TOKEN: &str = "Invalid access token";

/// Identity of the caller, verified from the access token on every request.
///
/// The `Authorization` header holds the token itself; a `Bearer ` prefix is
/// accepted and stripped.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let raw = parts.headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match raw.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        // Scheme with nothing after it.
        None if raw.eq_ignore_ascii_case("bearer") => "",
        _ => raw,
    };
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<JwtKeys>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| AppError::unauthorized(MISSING_TOKEN))?;

        let keys = Arc::<JwtKeys>::from_ref(state);
        let claims = keys.verify(token, TokenKind::Access).map_err(|e| {
            // Cause stays in the log; the caller only learns the token was rejected.
            debug!(error = %e, "access token rejected");
            AppError::unauthorized(INVALID_TOKEN)
        })?;

        Ok(AuthUser(claims.sub))
    }
}
