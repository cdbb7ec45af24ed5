//! Registration, login and identity routes.
//!
//! Also home of the error plumbing the other route files share: the JSON
//! error body and the mappings from store errors to HTTP statuses. Token
//! failures map to 403 across the board; only a failed login itself
//! answers 401.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{require_token, AuthError, Role};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type RouteError = (StatusCode, Json<ErrorResponse>);

pub fn route_error(status: StatusCode, error: impl Into<String>) -> RouteError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// Map auth-store failures onto HTTP statuses.
///
/// Missing or bad tokens are 403, matching the rest of the access
/// control surface.
pub fn map_auth_error(err: AuthError) -> RouteError {
    let status = match err {
        AuthError::Unauthenticated(_) | AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
        AuthError::NotFound(_) => StatusCode::NOT_FOUND,
        AuthError::Conflict(_) => StatusCode::CONFLICT,
        AuthError::Validation(_) => StatusCode::BAD_REQUEST,
        AuthError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    route_error(status, err.to_string())
}

pub fn map_core_error(err: revend_core::Error) -> RouteError {
    use revend_core::Error;
    let status = match err {
        Error::BusinessNotFound(_) | Error::MachineNotFound(_) | Error::NotFound(_) => {
            StatusCode::NOT_FOUND
        }
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::Io(_) | Error::Serialization(_) | Error::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    route_error(status, err.to_string())
}

pub fn format_expiry(exp: usize) -> String {
    DateTime::<Utc>::from_timestamp(exp as i64, 0)
        .map(|value| value.to_rfc3339())
        .unwrap_or_else(|| Utc::now().to_rfc3339())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    email: String,
    password: String,
    #[serde(default)]
    role: Option<Role>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    token: String,
    expires_at: String,
    user_id: i64,
    email: String,
    role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    user_id: i64,
    email: String,
    /// Role as embedded in the presented token
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), RouteError> {
    let role = req.role.unwrap_or(Role::Customer);
    let user = state
        .users()
        .create_user(&req.email, &req.password, role, None)
        .await
        .map_err(map_auth_error)?;

    let issued = state
        .tokens()
        .issue(&user.email, user.role, user.id)
        .map_err(|err| route_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token: issued.token,
            expires_at: format_expiry(issued.expires_at),
            user_id: user.id,
            email: user.email,
            role: user.role,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, RouteError> {
    // Bad credentials are the one case that answers 401 instead of 403.
    let user = state
        .users()
        .authenticate(&req.email, &req.password)
        .await
        .map_err(|err| route_error(StatusCode::UNAUTHORIZED, err.to_string()))?;

    let issued = state
        .tokens()
        .issue(&user.email, user.role, user.id)
        .map_err(|err| route_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;

    Ok(Json(AuthResponse {
        token: issued.token,
        expires_at: format_expiry(issued.expires_at),
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}

async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    let user = state
        .users()
        .get(claims.uid)
        .await
        .ok_or_else(|| route_error(StatusCode::NOT_FOUND, "User not found"))?;
    Ok(Json(MeResponse {
        user_id: user.id,
        email: user.email,
        role: claims.role,
        is_active: user.is_active,
        created_at: user.created_at,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/me", get(me))
}
