//! Axum REST API handlers

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::error::ServiceError;
use crate::service::AgeService;
use crate::utils::image::png_data_uri;

use super::dto::*;
use super::page::index_handler;

/// Upload extensions the page accepts
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Application state shared across handlers
pub struct AppState {
    pub service: Arc<AgeService>,
    pub start_time: Instant,
}

/// Create the REST API router
pub fn create_rest_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/v1/estimate", post(estimate_handler))
        // System endpoints
        .route("/health", get(health_handler))
        .route("/api/v1/health", get(health_handler))
        // Middleware
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Whether `file_name` carries one of the accepted image extensions
pub fn is_supported_upload(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Pull the uploaded image out of the form
async fn read_upload(multipart: &mut Multipart) -> Result<Vec<u8>, (StatusCode, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != "image" && name != "file" {
            continue;
        }

        if let Some(file_name) = field.file_name() {
            if !is_supported_upload(file_name) {
                return Err((
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    format!(
                        "unsupported file type '{}', expected one of: {}",
                        file_name,
                        SUPPORTED_EXTENSIONS.join(", ")
                    ),
                ));
            }
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| (e.status(), e.body_text()))?;
        return Ok(data.to_vec());
    }

    Err((StatusCode::BAD_REQUEST, "missing image field".to_string()))
}

/// Detect faces and estimate their ages
async fn estimate_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> (StatusCode, Json<EstimateResponse>) {
    let image_data = match read_upload(&mut multipart).await {
        Ok(data) => data,
        Err((status, reason)) => {
            warn!("Rejected upload: {}", reason);
            return (status, Json(EstimateResponse::processing_error(reason)));
        }
    };

    let result = match state.service.estimate(image_data).await {
        Ok(result) => result,
        Err(ServiceError::Load(e)) => {
            error!("Model loading failed: {}", e);
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(EstimateResponse::load_error(e)),
            );
        }
        Err(ServiceError::Processing(e)) => {
            error!("Processing failed: {}", e);
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(EstimateResponse::processing_error(e)),
            );
        }
    };

    let annotated = match png_data_uri(&result.annotated) {
        Ok(uri) => uri,
        Err(e) => {
            error!("Encoding failed: {}", e);
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(EstimateResponse::processing_error(e)),
            );
        }
    };

    if result.is_empty() {
        return (
            StatusCode::OK,
            Json(EstimateResponse::no_faces(annotated, result.inference_time_ms)),
        );
    }

    let faces: Vec<FaceDto> = result
        .faces
        .iter()
        .enumerate()
        .map(|(i, f)| FaceDto {
            index: i + 1,
            x1: f.face_box.x1,
            y1: f.face_box.y1,
            x2: f.face_box.x2,
            y2: f.face_box.y2,
            confidence: f.face_box.confidence,
            age: f.age,
        })
        .collect();

    (
        StatusCode::OK,
        Json(EstimateResponse::faces(annotated, faces, result.inference_time_ms)),
    )
}

/// Health check
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health();

    Json(HealthResponse {
        healthy: health.healthy,
        version: health.version,
        models_loaded: health.models_loaded,
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
