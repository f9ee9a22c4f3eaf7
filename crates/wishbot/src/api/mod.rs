//! HTTP API behind the Mini-App
//!
//! Every `/api` route authenticates its caller through the signed initData
//! header (see [`auth::CurrentUser`]); `/health` is open.

pub mod auth;
pub mod error;
pub mod groups;
pub mod patch;
pub mod reservations;
pub mod users;
pub mod wishes;

use std::sync::Arc;

use axum::extract::Request;
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router, ServiceExt};
use tower::Layer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

use wishcore::{config, DbPool, InitDataVerifier};

pub use error::{ApiError, ApiResult};

/// Shared state for all endpoints
#[derive(Clone)]
pub struct ApiState {
    pub db_pool: Arc<DbPool>,
    pub verifier: Arc<InitDataVerifier>,
}

impl ApiState {
    pub fn new(db_pool: Arc<DbPool>, verifier: Arc<InitDataVerifier>) -> Self {
        Self { db_pool, verifier }
    }
}

/// Route table without path normalization
pub fn create_router(state: ApiState) -> Router {
    // Auth travels in a header, not cookies, so any origin may call us
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/user/profile", get(users::get_profile).put(users::update_profile))
        .route("/api/user/{id}", get(users::get_public_user))
        .route("/api/user/{id}/wishes", get(users::get_public_wishes))
        .route("/api/wishes", get(wishes::list_wishes).post(wishes::create_wish))
        .route(
            "/api/wishes/{id}",
            get(wishes::get_wish).put(wishes::update_wish).delete(wishes::delete_wish),
        )
        .route("/api/wishes/{id}/complete", patch(wishes::complete_wish))
        .route("/api/groups", get(groups::list_groups).post(groups::create_group))
        .route("/api/groups/{id}", get(groups::get_group).put(groups::update_group))
        .route("/api/groups/{id}/join", post(groups::join_group))
        .route("/api/groups/{id}/members", get(groups::list_members))
        .route("/api/groups/{id}/wishes", get(groups::list_group_wishes))
        .route(
            "/api/reservations",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route("/api/reservations/{id}", delete(reservations::delete_reservation))
        .fallback(not_found)
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Full application: `/api/wishes/` and `/api/wishes` reach the same handler
pub fn create_app(state: ApiState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(create_router(state))
}

/// Serves the API until the process is stopped
pub async fn run_api_server(port: u16, state: ApiState) -> anyhow::Result<()> {
    let app = create_app(state);

    let addr = format!("0.0.0.0:{}", port);
    log::info!("Starting API server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;

    Ok(())
}

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "environment": config::ENVIRONMENT.as_str(),
        "version": config::VERSION,
    }))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not Found")
}
