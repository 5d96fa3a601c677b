use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{
    dto::{
        CreateDebtRequest, CreatedDebtResponse, ListDebtsQuery, UpdateDebtRequest,
        UpdatedDebtResponse,
    },
    repo_types::Debt,
    services::{parse_id, parse_role},
};
use crate::{auth::extractors::AuthUser, error::AppError, state::AppState};

pub fn debt_routes() -> Router<AppState> {
    Router::new()
        .route("/debts", get(list_debts).post(create_debt))
        .route("/debts/remind", post(remind))
        .route("/debts/:id", put(update_debt).delete(delete_debt))
}

#[instrument(skip(state, payload))]
pub async fn create_debt(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreateDebtRequest>, JsonRejection>,
) -> Result<Json<CreatedDebtResponse>, AppError> {
    let Json(payload) = payload?;
    let debt = state.debts.create(user_id, payload).await?;
    Ok(Json(CreatedDebtResponse {
        success: true,
        id: debt.id,
    }))
}

#[instrument(skip(state))]
pub async fn list_debts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<ListDebtsQuery>, QueryRejection>,
) -> Result<Json<Vec<Debt>>, AppError> {
    let Query(query) = query?;
    let role = parse_role(query.role.as_deref())?;
    let debts = state.debts.list(user_id, role).await?;
    Ok(Json(debts))
}

#[instrument(skip(state, payload))]
pub async fn update_debt(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateDebtRequest>, JsonRejection>,
) -> Result<Json<UpdatedDebtResponse>, AppError> {
    let id = parse_id(&id)?;
    let Json(payload) = payload?;
    let updated_fields = state.debts.update(user_id, id, payload).await?;
    Ok(Json(UpdatedDebtResponse {
        success: true,
        updated_fields,
    }))
}

#[instrument(skip(state))]
pub async fn delete_debt(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id)?;
    state.debts.delete(user_id, id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Reminders are not delivered anywhere yet; the endpoint only acknowledges.
#[instrument]
pub async fn remind(AuthUser(user_id): AuthUser) -> Json<Value> {
    debug!(%user_id, "reminder requested");
    Json(json!({ "success": true }))
}
