//! HTTP boundary for the tip page store.
//!
//! Two JSON endpoints (`POST /api/create-tip-page`, `GET /api/tip/:token`)
//! translate wire requests into store calls and store errors into accurate
//! status codes, so a client can tell "not found" (permanent for this
//! backend) from transient failure. Non-API paths serve the static setup
//! and tip-display pages. Every response carries the privacy-hardening
//! headers.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::NodeConfig;
use crate::store::{StoreError, TipPageInput, TipPageStore, TipPageView};

#[derive(Clone)]
struct ApiState {
    store: Arc<dyn TipPageStore>,
    public_dir: PathBuf,
}

/// Response for tip page creation
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CreateResponse {
    Created { success: bool, token: String },
    Failed { success: bool, error: String },
}

impl CreateResponse {
    fn failed(error: impl Into<String>) -> Self {
        CreateResponse::Failed {
            success: false,
            error: error.into(),
        }
    }
}

/// Response for tip page reads
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TipResponse {
    Found {
        success: bool,
        #[serde(flatten)]
        page: TipPageView,
    },
    Failed {
        success: bool,
        error: String,
    },
}

impl TipResponse {
    fn failed(error: impl Into<String>) -> Self {
        TipResponse::Failed {
            success: false,
            error: error.into(),
        }
    }
}

/// Build the full router: API, health probe and static pages.
pub fn build_router(store: Arc<dyn TipPageStore>, config: &NodeConfig) -> Router {
    let state = ApiState {
        store,
        public_dir: config.public_dir.clone(),
    };

    Router::new()
        .route("/api/create-tip-page", post(create_tip_page))
        .route("/api/tip/", get(token_required))
        .route("/api/tip/:token", get(get_tip_page))
        .route("/health", get(health))
        .route("/", get(setup_page))
        .route("/tip/:token", get(tip_page))
        .fallback_service(ServeDir::new(&config.public_dir))
        .layer(RequestBodyLimitLayer::new(config.body_limit))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("interest-cohort=()"),
        ))
        .with_state(state)
}

/// POST /api/create-tip-page - validate and persist a new tip page
async fn create_tip_page(
    State(state): State<ApiState>,
    payload: Result<Json<TipPageInput>, JsonRejection>,
) -> (StatusCode, Json<CreateResponse>) {
    // An undeserializable body (bad JSON, unknown payment kind) is the
    // same validation failure as a missing field on the wire.
    let Ok(Json(input)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(CreateResponse::failed("Invalid data")),
        );
    };

    match state.store.create(input) {
        Ok(token) => (
            StatusCode::OK,
            Json(CreateResponse::Created {
                success: true,
                token,
            }),
        ),
        Err(StoreError::InvalidData) => (
            StatusCode::BAD_REQUEST,
            Json(CreateResponse::failed("Invalid data")),
        ),
        Err(e) => {
            tracing::error!("[API] create tip page failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CreateResponse::failed(e.to_string())),
            )
        }
    }
}

/// GET /api/tip/:token - public fields of one tip page
async fn get_tip_page(
    State(state): State<ApiState>,
    Path(token): Path<String>,
) -> (StatusCode, Json<TipResponse>) {
    match state.store.get(&token) {
        Ok(page) => (
            StatusCode::OK,
            Json(TipResponse::Found {
                success: true,
                page: page.into(),
            }),
        ),
        Err(StoreError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(TipResponse::failed("Tip page not found")),
        ),
        Err(e) => {
            tracing::error!("[API] get tip page failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TipResponse::failed(e.to_string())),
            )
        }
    }
}

/// GET /api/tip/ - token segment left empty
async fn token_required() -> (StatusCode, Json<TipResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(TipResponse::failed("Token required")),
    )
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// GET / - the setup form
async fn setup_page(State(state): State<ApiState>) -> Response {
    serve_html(state.public_dir.join("setup.html")).await
}

/// GET /tip/:token - the tip display page; the page itself fetches the
/// record through the API, so the token never needs server-side templating.
async fn tip_page(State(state): State<ApiState>, Path(_token): Path<String>) -> Response {
    serve_html(state.public_dir.join("tip.html")).await
}

async fn serve_html(path: PathBuf) -> Response {
    match tokio::fs::read_to_string(&path).await {
        Ok(body) => Html(body).into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Html("<h1>404 - Page Not Found</h1>".to_string()),
        )
            .into_response(),
    }
}
