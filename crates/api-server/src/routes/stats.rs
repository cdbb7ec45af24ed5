//! Statistics routes.
//!
//! The `/stats` tree is the admin dashboard over the whole fleet; the
//! `/my/stats` tree scopes every rollup to the business owned by the
//! calling account.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};

use revend_core::stats::{
    BottleTotals, BusinessStats, DayBucket, FleetDayBucket, FleetSummary,
};

use crate::auth::{require_role, require_token, Role};
use crate::state::AppState;

use super::auth::{map_auth_error, map_core_error, route_error, RouteError};

async fn overall_totals(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BottleTotals>, RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    require_role(&claims, Role::Admin).map_err(map_auth_error)?;
    Ok(Json(state.stats().overall_totals().await))
}

async fn business_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<BusinessStats>, RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    require_role(&claims, Role::Admin).map_err(map_auth_error)?;
    let stats = state
        .stats()
        .business_stats(id)
        .await
        .map_err(map_core_error)?;
    Ok(Json(stats))
}

async fn fleet_daywise(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<FleetDayBucket>>, RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    require_role(&claims, Role::Admin).map_err(map_auth_error)?;
    Ok(Json(state.stats().daywise_all_businesses().await))
}

async fn fleet_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<FleetSummary>, RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    require_role(&claims, Role::Admin).map_err(map_auth_error)?;
    Ok(Json(state.stats().fleet_summary().await))
}

/// Resolve the calling account's business or fail with 404
async fn owned_business_id(state: &AppState, user_id: i64) -> Result<i64, RouteError> {
    state
        .businesses()
        .find_by_owner(user_id)
        .await
        .map(|business| business.id)
        .ok_or_else(|| route_error(StatusCode::NOT_FOUND, "No business found for user"))
}

async fn my_totals(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BottleTotals>, RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    let business_id = owned_business_id(&state, claims.uid).await?;
    let totals = state
        .stats()
        .totals_for_business(business_id)
        .await
        .map_err(map_core_error)?;
    Ok(Json(totals))
}

async fn my_daywise(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<DayBucket>>, RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    let business_id = owned_business_id(&state, claims.uid).await?;
    let buckets = state
        .stats()
        .daywise_for_business(business_id)
        .await
        .map_err(map_core_error)?;
    Ok(Json(buckets))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/stats/bottles", get(overall_totals))
        .route("/api/v1/stats/businesses/{id}", get(business_stats))
        .route("/api/v1/stats/daywise", get(fleet_daywise))
        .route("/api/v1/stats/fleet", get(fleet_summary))
        .route("/api/v1/my/stats/bottles", get(my_totals))
        .route("/api/v1/my/stats/daywise", get(my_daywise))
}
