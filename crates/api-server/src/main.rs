//! API server for the Revend backend
//!
//! REST API over JSON-file-backed stores. Configuration is environment
//! only: RV_DATA_DIR, RV_PORT, RV_JWT_SECRET, RV_TOKEN_TTL_SECONDS and
//! the bootstrap super-admin credentials.

mod auth;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::TokenService;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = std::env::var("RV_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".revend-data"));
    tracing::info!("Using data directory: {:?}", data_dir);

    let tokens = TokenService::from_env();
    let app_state = AppState::new(data_dir, tokens)
        .await
        .expect("Failed to initialize application state");

    // Bootstrap the super-admin so a fresh deployment is reachable.
    let superadmin_email = std::env::var("RV_SUPERADMIN_EMAIL")
        .unwrap_or_else(|_| "superadmin@revend.local".to_string());
    let superadmin_password = std::env::var("RV_SUPERADMIN_PASSWORD")
        .unwrap_or_else(|_| "superadminpassword".to_string());
    app_state
        .users()
        .ensure_superadmin(&superadmin_email, &superadmin_password)
        .await
        .expect("Failed to bootstrap super-admin");

    let app = Router::new()
        .merge(routes::health::router())
        .merge(routes::auth::router())
        .merge(routes::businesses::router())
        .merge(routes::machines::router())
        .merge(routes::bottles::router())
        .merge(routes::stats::router())
        .with_state(app_state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let port = std::env::var("RV_PORT")
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind API server port");
    axum::serve(listener, app)
        .await
        .expect("API server crashed");
}
