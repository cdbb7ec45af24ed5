//! Business (tenant) routes.
//!
//! Creating a business also provisions its owner account in one request.
//! The two stores are separate files, so a failed business insert rolls
//! the freshly created owner back by hand; an owner that already existed
//! is reused and left untouched.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use revend_core::business::Business;

use crate::auth::{require_role, require_token, Role};
use crate::state::AppState;

use super::auth::{map_auth_error, map_core_error, route_error, RouteError};

const MAX_LOGO_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BusinessFields {
    name: String,
    mobile: String,
    #[serde(default)]
    logo_image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnerFields {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBusinessRequest {
    business: BusinessFields,
    owner: OwnerFields,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBusinessRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    mobile: Option<String>,
    #[serde(default)]
    logo_image: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BusinessResponse {
    id: i64,
    name: String,
    mobile: String,
    logo_image: Option<String>,
    owner_user_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Business> for BusinessResponse {
    fn from(business: Business) -> Self {
        Self {
            id: business.id,
            name: business.name,
            mobile: business.mobile,
            logo_image: business.logo_image.map(|bytes| BASE64.encode(bytes)),
            owner_user_id: business.owner_user_id,
            created_at: business.created_at,
            updated_at: business.updated_at,
        }
    }
}

fn decode_logo(encoded: Option<&str>) -> Result<Option<Vec<u8>>, RouteError> {
    let Some(encoded) = encoded else {
        return Ok(None);
    };
    let bytes = BASE64
        .decode(encoded)
        .map_err(|_| route_error(StatusCode::BAD_REQUEST, "Logo image is not valid base64"))?;
    if bytes.len() > MAX_LOGO_BYTES {
        return Err(route_error(
            StatusCode::BAD_REQUEST,
            "Logo image exceeds the 5 MB limit",
        ));
    }
    Ok(Some(bytes))
}

async fn create_business(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateBusinessRequest>,
) -> Result<(StatusCode, Json<BusinessResponse>), RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    require_role(&claims, Role::Admin).map_err(map_auth_error)?;

    let logo = decode_logo(req.business.logo_image.as_deref())?;

    // Reuse an existing account as owner, otherwise provision one.
    let (owner, owner_was_created) = match state.users().get_by_email(&req.owner.email).await {
        Some(existing) => (existing, false),
        None => {
            let created = state
                .users()
                .create_user(
                    &req.owner.email,
                    &req.owner.password,
                    Role::Customer,
                    Some(claims.uid),
                )
                .await
                .map_err(map_auth_error)?;
            (created, true)
        }
    };

    let result = state
        .businesses()
        .create(
            &req.business.name,
            &req.business.mobile,
            logo,
            owner.id,
            claims.uid,
        )
        .await;

    match result {
        Ok(business) => Ok((StatusCode::CREATED, Json(business.into()))),
        Err(err) => {
            if owner_was_created {
                if let Err(rollback_err) = state.users().remove(owner.id).await {
                    tracing::error!(
                        owner_id = owner.id,
                        error = %rollback_err,
                        "Failed to roll back owner after business create failure"
                    );
                }
            }
            Err(map_core_error(err))
        }
    }
}

async fn list_businesses(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<BusinessResponse>>, RouteError> {
    require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    let businesses = state.businesses().list().await;
    Ok(Json(businesses.into_iter().map(Into::into).collect()))
}

async fn get_business(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<BusinessResponse>, RouteError> {
    require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    let business = state
        .businesses()
        .get(id)
        .await
        .ok_or_else(|| route_error(StatusCode::NOT_FOUND, format!("Business not found: {}", id)))?;
    Ok(Json(business.into()))
}

async fn update_business(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<UpdateBusinessRequest>,
) -> Result<Json<BusinessResponse>, RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    require_role(&claims, Role::Admin).map_err(map_auth_error)?;

    let logo = decode_logo(req.logo_image.as_deref())?;
    let business = state
        .businesses()
        .update(id, req.name.as_deref(), req.mobile.as_deref(), logo, claims.uid)
        .await
        .map_err(map_core_error)?;
    Ok(Json(business.into()))
}

async fn delete_business(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    require_role(&claims, Role::Admin).map_err(map_auth_error)?;

    state.businesses().delete(id).await.map_err(map_core_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn my_business(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BusinessResponse>, RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    let business = state
        .businesses()
        .find_by_owner(claims.uid)
        .await
        .ok_or_else(|| route_error(StatusCode::NOT_FOUND, "No business found for user"))?;
    Ok(Json(business.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/businesses", get(list_businesses).post(create_business))
        .route(
            "/api/v1/businesses/{id}",
            get(get_business).put(update_business).delete(delete_business),
        )
        .route("/api/v1/my/business", get(my_business))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::auth::{Role, TokenService};
    use crate::state::AppState;

    async fn build_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let tokens = TokenService::new("test-secret", 1800);
        let state = AppState::new(temp_dir.path(), tokens).await.unwrap();
        (state, temp_dir)
    }

    async fn admin_token(state: &AppState) -> String {
        let admin = state
            .users()
            .ensure_superadmin("root@revend.local", "superadminpassword")
            .await
            .unwrap();
        state
            .tokens()
            .issue(&admin.email, Role::Admin, admin.id)
            .unwrap()
            .token
    }

    async fn customer_token(state: &AppState, email: &str) -> (i64, String) {
        let user = state
            .users()
            .create_user(email, "custpassword", Role::Customer, None)
            .await
            .unwrap();
        let token = state
            .tokens()
            .issue(&user.email, Role::Customer, user.id)
            .unwrap()
            .token;
        (user.id, token)
    }

    fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    async fn response_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn create_body(name: &str, mobile: &str, owner_email: &str) -> Value {
        json!({
            "business": { "name": name, "mobile": mobile },
            "owner": { "email": owner_email, "password": "ownerpassword" }
        })
    }

    #[tokio::test]
    async fn create_provisions_owner_and_business() {
        let (state, _tmp) = build_state().await;
        let token = admin_token(&state).await;
        let app = super::router().with_state(state.clone());

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/businesses",
                &token,
                create_body("Green Mart", "9100000001", "owner@greenmart.com"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let business = response_json(response).await;
        assert_eq!(business["name"], "Green Mart");

        let owner = state.users().get_by_email("owner@greenmart.com").await;
        assert!(owner.is_some());
        assert_eq!(
            business["ownerUserId"].as_i64().unwrap(),
            owner.unwrap().id
        );
    }

    #[tokio::test]
    async fn create_requires_admin_role() {
        let (state, _tmp) = build_state().await;
        let (_, token) = customer_token(&state, "cust@example.com").await;
        let app = super::router().with_state(state);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/businesses",
                &token,
                create_body("Green Mart", "9100000001", "owner@greenmart.com"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn duplicate_business_rolls_back_fresh_owner() {
        let (state, _tmp) = build_state().await;
        let token = admin_token(&state).await;
        let app = super::router().with_state(state.clone());

        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/businesses",
                &token,
                create_body("Green Mart", "9100000001", "first@greenmart.com"),
            ))
            .await
            .unwrap();

        // Same name, different owner email: the owner account created for
        // this request must not survive the failed insert.
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/businesses",
                &token,
                create_body("Green Mart", "9100000009", "second@greenmart.com"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(state
            .users()
            .get_by_email("second@greenmart.com")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn bad_logo_base64_is_400() {
        let (state, _tmp) = build_state().await;
        let token = admin_token(&state).await;
        let app = super::router().with_state(state);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/businesses",
                &token,
                json!({
                    "business": {
                        "name": "Green Mart",
                        "mobile": "9100000001",
                        "logoImage": "@@not-base64@@"
                    },
                    "owner": { "email": "owner@greenmart.com", "password": "ownerpassword" }
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn my_business_resolves_by_owner() {
        let (state, _tmp) = build_state().await;
        let admin = admin_token(&state).await;
        let app = super::router().with_state(state.clone());

        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/businesses",
                &admin,
                create_body("Green Mart", "9100000001", "owner@greenmart.com"),
            ))
            .await
            .unwrap();

        let owner = state.users().get_by_email("owner@greenmart.com").await.unwrap();
        let owner_token = state
            .tokens()
            .issue(&owner.email, owner.role, owner.id)
            .unwrap()
            .token;
        let response = app
            .clone()
            .oneshot(get_request("/api/v1/my/business", &owner_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let business = response_json(response).await;
        assert_eq!(business["name"], "Green Mart");

        // A customer with no business gets a hard 404
        let (_, stray_token) = customer_token(&state, "stray@example.com").await;
        let missing = app
            .oneshot(get_request("/api/v1/my/business", &stray_token))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_and_delete_are_admin_gated() {
        let (state, _tmp) = build_state().await;
        let admin = admin_token(&state).await;
        let (_, customer) = customer_token(&state, "cust@example.com").await;
        let app = super::router().with_state(state);

        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/businesses",
                &admin,
                create_body("Green Mart", "9100000001", "owner@greenmart.com"),
            ))
            .await
            .unwrap();
        let id = response_json(created).await["id"].as_i64().unwrap();

        let forbidden = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/businesses/{}", id),
                &customer,
                json!({ "name": "Blue Mart" }),
            ))
            .await
            .unwrap();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let renamed = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/businesses/{}", id),
                &admin,
                json!({ "name": "Blue Mart" }),
            ))
            .await
            .unwrap();
        assert_eq!(renamed.status(), StatusCode::OK);
        assert_eq!(response_json(renamed).await["name"], "Blue Mart");

        let deleted = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/v1/businesses/{}", id))
                    .header("Authorization", format!("Bearer {}", admin))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let gone = app
            .oneshot(get_request(&format!("/api/v1/businesses/{}", id), &admin))
            .await
            .unwrap();
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    }
}
