pub mod export;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::enrich::CompanyDetector;
use crate::error::TalentError;
use crate::storage::ProfileStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProfileStore>,
    pub detector: Arc<dyn CompanyDetector>,
}

/// Error wrapper translating [`TalentError`] into HTTP responses. The body
/// mirrors the `{"detail": ...}` shape clients of the API already expect.
pub struct ApiError(TalentError);

impl From<TalentError> for ApiError {
    fn from(err: TalentError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TalentError::NotFound(_) => StatusCode::NOT_FOUND,
            TalentError::InvalidRequest(_) | TalentError::UnsupportedFormat(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "request failed");
        }
        let body = Json(serde_json::json!({ "detail": self.0.to_string() }));
        (status, body).into_response()
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/profiles/import", post(handlers::import_profiles))
        .route(
            "/api/profiles/import-folder",
            post(handlers::import_profiles_folder),
        )
        .route("/api/profiles", get(handlers::list_profiles))
        .route("/api/profiles/search", get(handlers::search_profiles))
        .route(
            "/api/profiles/search-adv",
            get(handlers::search_profiles_advanced),
        )
        .route(
            "/api/profiles/by-category",
            get(handlers::profiles_by_category),
        )
        .route(
            "/api/profiles/by-id/:profile_id",
            get(handlers::get_profile)
                .put(handlers::update_profile)
                .delete(handlers::delete_profile),
        )
        .route("/api/profiles/export-csv", get(handlers::export_profiles_csv))
        .route("/api/profiles/stats", get(handlers::profile_stats))
        .route(
            "/api/profiles/backfill-education",
            post(handlers::backfill_education),
        )
        .route(
            "/api/profiles/detect-company/:profile_id",
            post(handlers::detect_company),
        )
        .nest_service("/static", ServeDir::new("static"))
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
        .layer(cors)
        .with_state(state)
}

pub async fn run(state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app_router(state)).await?;
    Ok(())
}
