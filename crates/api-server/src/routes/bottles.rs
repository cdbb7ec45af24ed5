//! Bottle-deposit routes.
//!
//! Any authenticated caller may record a deposit (machines authenticate
//! with an ordinary account); corrections of past deposits are admin-only.
//! Responses join in the machine name for display.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use revend_core::bottle::{BottleEvent, NewBottleEvent};

use crate::auth::{require_role, require_token, Role};
use crate::state::AppState;

use super::auth::{map_auth_error, map_core_error, route_error, RouteError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordBottlesRequest {
    machine_id: i64,
    bottle_count: i64,
    bottle_weight: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CorrectBottlesRequest {
    bottle_count: i64,
    bottle_weight: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BottleEventResponse {
    id: i64,
    machine_id: i64,
    machine_name: Option<String>,
    bottle_count: i64,
    bottle_weight: f64,
    created_at: DateTime<FixedOffset>,
    updated_at: DateTime<FixedOffset>,
}

impl BottleEventResponse {
    fn new(event: BottleEvent, machine_name: Option<String>) -> Self {
        Self {
            id: event.id,
            machine_id: event.machine_id,
            machine_name,
            bottle_count: event.bottle_count,
            bottle_weight: event.bottle_weight,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

async fn with_machine_name(state: &AppState, event: BottleEvent) -> BottleEventResponse {
    let machine_name = state
        .machines()
        .get(event.machine_id)
        .await
        .map(|machine| machine.name);
    BottleEventResponse::new(event, machine_name)
}

async fn record_bottles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RecordBottlesRequest>,
) -> Result<(StatusCode, Json<BottleEventResponse>), RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;

    let machine = state.machines().get(req.machine_id).await.ok_or_else(|| {
        route_error(
            StatusCode::NOT_FOUND,
            format!("Machine not found: {}", req.machine_id),
        )
    })?;

    let event = state
        .bottles()
        .create(NewBottleEvent {
            machine_id: machine.id,
            bottle_count: req.bottle_count,
            bottle_weight: req.bottle_weight,
            recorded_by: claims.uid,
            created_at: None,
        })
        .await
        .map_err(map_core_error)?;

    Ok((
        StatusCode::CREATED,
        Json(BottleEventResponse::new(event, Some(machine.name))),
    ))
}

async fn list_bottles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<BottleEventResponse>>, RouteError> {
    require_token(state.tokens(), &headers).map_err(map_auth_error)?;

    let mut responses = Vec::new();
    for event in state.bottles().list().await {
        responses.push(with_machine_name(&state, event).await);
    }
    Ok(Json(responses))
}

async fn get_bottles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<BottleEventResponse>, RouteError> {
    require_token(state.tokens(), &headers).map_err(map_auth_error)?;

    let event = state.bottles().get(id).await.ok_or_else(|| {
        route_error(StatusCode::NOT_FOUND, format!("Bottle event not found: {}", id))
    })?;
    Ok(Json(with_machine_name(&state, event).await))
}

async fn correct_bottles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<CorrectBottlesRequest>,
) -> Result<Json<BottleEventResponse>, RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    require_role(&claims, Role::Admin).map_err(map_auth_error)?;

    let event = state
        .bottles()
        .update_totals(id, req.bottle_count, req.bottle_weight, claims.uid)
        .await
        .map_err(map_core_error)?;
    Ok(Json(with_machine_name(&state, event).await))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/bottles", get(list_bottles).post(record_bottles))
        .route("/api/v1/bottles/{id}", get(get_bottles).put(correct_bottles))
}
