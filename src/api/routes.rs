use crate::config::Config;
use crate::display::{self, StatusView};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Local;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
}

impl ApiState {
    /// Settings can change while the service runs; fall back to the
    /// startup copy when the file is unreadable.
    fn current_config(&self) -> Config {
        Config::load().unwrap_or_else(|_| (*self.config).clone())
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/stats", get(stats))
        .route("/api/v1/settings", get(settings))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct SettingsPayload {
    check_in_on_startup: bool,
    check_in_interval_hours: u32,
    browsing_interval_minutes: u32,
    topic_count: usize,
    max_visit_count: u32,
}

async fn stats(State(state): State<ApiState>) -> ApiResult<Json<StatusView>> {
    let config = state.current_config();
    Ok(Json(display::load_status(&config, Local::now().date_naive())?))
}

async fn settings(State(state): State<ApiState>) -> Json<SettingsPayload> {
    let config = state.current_config();

    Json(SettingsPayload {
        check_in_on_startup: config.check_in_on_startup,
        check_in_interval_hours: config.check_in_interval_hours,
        browsing_interval_minutes: config.browsing_interval_minutes,
        topic_count: config.topic_count,
        max_visit_count: config.max_visit_count,
    })
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}
