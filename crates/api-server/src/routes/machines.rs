//! Machine (reverse-vending unit) routes.
//!
//! Mutations are admin-only and always verify the target business exists
//! before touching the machine store.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};

use revend_core::machine::{Machine, MachineSpec};

use crate::auth::{require_role, require_token, Role};
use crate::state::AppState;

use super::auth::{map_auth_error, map_core_error, route_error, RouteError};

async fn require_business_exists(state: &AppState, business_id: i64) -> Result<(), RouteError> {
    if state.businesses().get(business_id).await.is_none() {
        return Err(route_error(
            StatusCode::NOT_FOUND,
            format!("Business not found: {}", business_id),
        ));
    }
    Ok(())
}

async fn create_machine(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(spec): Json<MachineSpec>,
) -> Result<(StatusCode, Json<Machine>), RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    require_role(&claims, Role::Admin).map_err(map_auth_error)?;
    require_business_exists(&state, spec.business_id).await?;

    let machine = state
        .machines()
        .create(spec, claims.uid)
        .await
        .map_err(map_core_error)?;
    Ok((StatusCode::CREATED, Json(machine)))
}

async fn list_machines(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Machine>>, RouteError> {
    require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    Ok(Json(state.machines().list().await))
}

async fn get_machine(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Machine>, RouteError> {
    require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    let machine = state
        .machines()
        .get(id)
        .await
        .ok_or_else(|| route_error(StatusCode::NOT_FOUND, format!("Machine not found: {}", id)))?;
    Ok(Json(machine))
}

async fn update_machine(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(spec): Json<MachineSpec>,
) -> Result<Json<Machine>, RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    require_role(&claims, Role::Admin).map_err(map_auth_error)?;
    require_business_exists(&state, spec.business_id).await?;

    let machine = state
        .machines()
        .update(id, spec, claims.uid)
        .await
        .map_err(map_core_error)?;
    Ok(Json(machine))
}

async fn delete_machine(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    require_role(&claims, Role::Admin).map_err(map_auth_error)?;

    state.machines().delete(id).await.map_err(map_core_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Machines of the business owned by the caller
async fn my_machines(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Machine>>, RouteError> {
    let claims = require_token(state.tokens(), &headers).map_err(map_auth_error)?;
    let business = state
        .businesses()
        .find_by_owner(claims.uid)
        .await
        .ok_or_else(|| route_error(StatusCode::NOT_FOUND, "No business found for user"))?;
    Ok(Json(state.machines().list_by_business(business.id).await))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/machines", get(list_machines).post(create_machine))
        .route(
            "/api/v1/machines/{id}",
            get(get_machine).put(update_machine).delete(delete_machine),
        )
        .route("/api/v1/my/machines", get(my_machines))
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

    fn machine_body(number: &str, business_id: i64) -> Value {
        json!({
            "name": format!("RVM {}", number),
            "number": number,
            "street": "12 Harbour Rd",
            "city": "Pune",
            "state": "MH",
            "pinCode": "411001",
            "businessId": business_id
        })
    }

    async fn seed_business(state: &AppState, owner_user_id: i64) -> i64 {
        state
            .businesses()
            .create("Green Mart", "9100000001", None, owner_user_id, 1)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn create_rejects_unknown_business() {
        let (state, _tmp) = build_state().await;
        let token = admin_token(&state).await;
        let app = super::router().with_state(state);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/machines",
                &token,
                machine_body("RV-001", 42),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_get_update_delete_lifecycle() {
        let (state, _tmp) = build_state().await;
        let token = admin_token(&state).await;
        let business_id = seed_business(&state, 10).await;
        let app = super::router().with_state(state);

        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/machines",
                &token,
                machine_body("RV-001", business_id),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let id = response_json(created).await["id"].as_i64().unwrap();

        let fetched = app
            .clone()
            .oneshot(get_request(&format!("/api/v1/machines/{}", id), &token))
            .await
            .unwrap();
        assert_eq!(fetched.status(), StatusCode::OK);
        assert_eq!(response_json(fetched).await["number"], "RV-001");

        let updated = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/machines/{}", id),
                &token,
                machine_body("RV-002", business_id),
            ))
            .await
            .unwrap();
        assert_eq!(updated.status(), StatusCode::OK);

        let deleted = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/v1/machines/{}", id))
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let gone = app
            .oneshot(get_request(&format!("/api/v1/machines/{}", id), &token))
            .await
            .unwrap();
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn customer_cannot_register_machines() {
        let (state, _tmp) = build_state().await;
        let business_id = seed_business(&state, 10).await;
        let user = state
            .users()
            .create_user("cust@example.com", "custpassword", Role::Customer, None)
            .await
            .unwrap();
        let token = state
            .tokens()
            .issue(&user.email, Role::Customer, user.id)
            .unwrap()
            .token;
        let app = super::router().with_state(state);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/machines",
                &token,
                machine_body("RV-001", business_id),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn my_machines_lists_only_the_owned_business() {
        let (state, _tmp) = build_state().await;
        let owner = state
            .users()
            .create_user("owner@greenmart.com", "ownerpassword", Role::Customer, None)
            .await
            .unwrap();
        let mine = seed_business(&state, owner.id).await;
        let other = state
            .businesses()
            .create("Blue Mart", "9100000002", None, 99, 1)
            .await
            .unwrap()
            .id;
        state
            .machines()
            .create(
                serde_json::from_value(machine_body("RV-001", mine)).unwrap(),
                1,
            )
            .await
            .unwrap();
        state
            .machines()
            .create(
                serde_json::from_value(machine_body("RV-002", other)).unwrap(),
                1,
            )
            .await
            .unwrap();

        let token = state
            .tokens()
            .issue(&owner.email, Role::Customer, owner.id)
            .unwrap()
            .token;
        let app = super::router().with_state(state);

        let response = app
            .oneshot(get_request("/api/v1/my/machines", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let machines = response_json(response).await;
        let numbers: Vec<&str> = machines
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["number"].as_str().unwrap())
            .collect();
        assert_eq!(numbers, vec!["RV-001"]);
    }
}
