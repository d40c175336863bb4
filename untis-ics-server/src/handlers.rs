use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use untis_ics_core::generator::{FeedSnapshot, FeedStore};

const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";
const CALENDAR_DISPOSITION: &str = "inline; filename=\"timetable.ics\"";
const FEED_CACHE_CONTROL: &str = "max-age=600, must-revalidate";
const NOT_READY_MESSAGE: &str = "Calendar not yet generated. Please try again in a moment.";

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FeedStore>,
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    feed_ready: bool,
    last_modified: Option<DateTime<Utc>>,
}

/// Routes: service info, health, and the feed under `/{secret}` and `/{secret}.ics`.
/// Any other path is a 404, so the feed cannot be found without the secret.
pub fn create_app(state: AppState, secret_path: &str) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route(&format!("/{secret_path}"), get(feed_handler))
        .route(&format!("/{secret_path}.ics"), get(feed_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "untis-ics",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "WebUntis timetable published as an ICS calendar feed",
        "endpoints": {
            "health": "/health"
        }
    }))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.store.current().await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        feed_ready: snapshot.is_some(),
        last_modified: snapshot.map(|s| s.last_modified),
    })
}

/// Serves the latest snapshot. HEAD is answered by the same handler without a body.
async fn feed_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(snapshot) = state.store.current().await else {
        tracing::debug!("Feed requested before the first generation finished");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, "60")],
            NOT_READY_MESSAGE,
        )
            .into_response();
    };

    if not_modified_since(&headers, snapshot.last_modified) {
        return (StatusCode::NOT_MODIFIED, feed_headers(&snapshot, false)).into_response();
    }

    (
        StatusCode::OK,
        feed_headers(&snapshot, true),
        snapshot.body.clone(),
    )
        .into_response()
}

fn feed_headers(snapshot: &FeedSnapshot, with_content: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if with_content {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(CALENDAR_CONTENT_TYPE),
        );
        headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static(CALENDAR_DISPOSITION),
        );
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(FEED_CACHE_CONTROL),
    );
    if let Ok(value) = HeaderValue::from_str(&http_date(snapshot.last_modified)) {
        headers.insert(header::LAST_MODIFIED, value);
    }
    headers
}

/// IMF-fixdate, e.g. `Fri, 15 Mar 2024 08:00:00 GMT`
fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// True when the client's copy is at least as new as `last_modified`.
/// Unparseable dates are ignored.
fn not_modified_since(headers: &HeaderMap, last_modified: DateTime<Utc>) -> bool {
    headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
        .is_some_and(|since| since.with_timezone(&Utc) >= last_modified)
}
