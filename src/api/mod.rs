mod auth;
mod handlers;

use std::sync::Arc;

use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::{header::WWW_AUTHENTICATE, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};

use crate::{cache::SubstitutionUpdater, error::Error, fetch::PageFetcher};

/// Failure of a request, rendered as `{"detail": ...}` with a matching status.
#[derive(Debug)]
pub enum ApiError {
    MissingCredentials,
    BadRequest(String),
    Core(Error),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self::Core(e)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            Self::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "Missing or malformed basic auth credentials".to_owned(),
            ),
            Self::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail.clone()),
            Self::Core(Error::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_owned())
            }
            Self::Core(e @ Error::InvalidProperty(_)) => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::Core(e) if e.is_upstream() => (
                StatusCode::BAD_GATEWAY,
                format!("Could not load data from the infoportal: {e}"),
            ),
            Self::Core(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        if status.is_server_error() {
            log::error!("{detail}");
        } else {
            log::debug!("Rejected request ({status}): {detail}");
        }
        let mut response = (status, Json(json!({ "detail": detail }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Basic"));
        }
        response
    }
}

pub fn router<F: PageFetcher + 'static>(updater: Arc<SubstitutionUpdater<F>>) -> Router {
    let compression_layer: CompressionLayer = CompressionLayer::new()
        .br(true)
        .deflate(true)
        .gzip(true)
        .zstd(true);
    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET]) // browsers may not trigger refreshes
        .allow_origin(Any);

    Router::new()
        .route("/auth/check", get(handlers::auth_check::<F>))
        .route("/substitutions", get(handlers::substitutions::<F>))
        .route("/news", get(handlers::all_news::<F>))
        .route("/news/today", get(handlers::today_news::<F>))
        .route("/news/date/:date", get(handlers::news_for_date::<F>))
        .route("/last_updated", get(handlers::last_updated::<F>))
        .route(
            "/internal/last_updated",
            get(handlers::internal_last_updated::<F>),
        )
        .route("/refresh", put(handlers::refresh::<F>))
        .with_state(updater)
        .layer(cors_layer)
        .layer(compression_layer)
}
