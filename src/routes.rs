use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

use crate::{
    aqi::{
        types::CityAqiSummary,
        waqi::{AqiError, WaqiClient},
    },
    config::Config,
    utils::{DataResponse, ErrorResponse},
};

const MISSING_CITY_MESSAGE: &str = "Query parameter 'city' is required.";

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub aqi_client: Arc<WaqiClient>,
}

#[derive(Debug, Deserialize)]
pub struct AqiQuery {
    pub city: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error returned by the JSON API, rendered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}

impl From<AqiError> for ApiError {
    fn from(err: AqiError) -> Self {
        match err {
            AqiError::InvalidInput(message) => ApiError::bad_request(message),
            AqiError::Configuration(message) | AqiError::Upstream(message) => {
                ApiError::bad_gateway(message)
            }
        }
    }
}

// Route handlers
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now(),
    })
}

pub async fn get_aqi(
    State(state): State<AppState>,
    query: Result<Query<AqiQuery>, QueryRejection>,
) -> Result<Json<DataResponse<CityAqiSummary>>, ApiError> {
    let city = match query {
        Ok(Query(AqiQuery { city: Some(city) })) if !city.is_empty() => city,
        _ => return Err(ApiError::bad_request(MISSING_CITY_MESSAGE)),
    };

    match state.aqi_client.fetch_city_aqi(&city).await {
        Ok(summary) => Ok(Json(DataResponse::new(summary))),
        Err(e) => {
            match &e {
                AqiError::InvalidInput(_) => tracing::warn!("Rejected AQI request: {}", e),
                _ => tracing::error!("Failed to fetch AQI for {:?}: {}", city, e),
            }
            Err(e.into())
        }
    }
}

async fn api_not_found() -> ApiError {
    ApiError::not_found("Not found")
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    let public_dir = state.config.public_dir.clone();
    let index = public_dir.join("index.html");

    let api = Router::new()
        .route("/health", get(health))
        .route("/aqi", get(get_aqi))
        .fallback(api_not_found);

    // Unknown non-API paths get the entry document so client-side routing works.
    let static_files = ServeDir::new(public_dir).fallback(ServeFile::new(index));

    Router::new()
        .nest("/api", api)
        .fallback_service(static_files)
        .with_state(state)
}
