use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        claims::TokenKind,
        dto::{
            ListUsersQuery, LoginRequest, LoginResponse, PublicUser, RefreshRequest,
            RefreshResponse, RegisterRequest,
        },
        extractors::AuthUser,
        services::{validate_password, RegisterError, VerifyError},
    },
    error::AppError,
    state::AppState,
    validation::{is_valid_email, Violations},
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/users/register", post(register))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users", get(list_users))
}

impl From<RegisterError> for AppError {
    fn from(e: RegisterError) -> Self {
        match e {
            RegisterError::Invalid(errors) => AppError::Validation(errors),
            RegisterError::EmailInUse => AppError::Conflict("Email is already in use".into()),
            RegisterError::Internal(e) => AppError::Internal(e),
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(payload) = payload?;
    let user = state.credentials.register(payload).await?;
    info!(user_id = %user.id, "registration accepted");
    Ok((StatusCode::ACCEPTED, Json(json!({ "success": true }))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    let Json(payload) = payload?;

    let email = payload.email.trim();
    let mut v = Violations::new();
    v.check_present("email", email, Some(("email", is_valid_email(email))));
    validate_password(&mut v, &payload.password);
    v.finish().map_err(AppError::Validation)?;

    let user = match state.credentials.verify(email, &payload.password).await {
        Ok(u) => u,
        Err(VerifyError::NotFound) => {
            warn!("login unknown email");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }
        Err(VerifyError::WrongPassword) => {
            warn!("login invalid password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }
        Err(VerifyError::Internal(e)) => return Err(AppError::Internal(e)),
    };

    let access_token = state
        .keys
        .issue(user.id, TokenKind::Access)
        .map_err(|e| anyhow::Error::new(e).context("sign access token"))?;
    let refresh_token = state
        .keys
        .issue(user.id, TokenKind::Refresh)
        .map_err(|e| anyhow::Error::new(e).context("sign refresh token"))?;

    info!(user_id = %user.id, "user logged in");
    Ok((
        StatusCode::ACCEPTED,
        Json(LoginResponse {
            access_token,
            refresh_token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, AppError> {
    let Json(payload) = payload?;

    let access_token = state.keys.refresh(&payload.refresh_token).map_err(|e| {
        if e.is_rejection() {
            warn!(error = %e, "refresh token rejected");
            AppError::unauthorized("Invalid refresh token")
        } else {
            AppError::Internal(anyhow::Error::new(e).context("sign access token"))
        }
    })?;

    Ok(Json(RefreshResponse { access_token }))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let Query(query) = query?;
    let users = state.credentials.list(&query.into()).await?;
    Ok(Json(users))
}
