//! REST API request/response data transfer objects

use serde::Serialize;
use std::collections::HashMap;

use crate::engine::AgeBracket;

pub const NO_FACES_MESSAGE: &str = "No faces detected in the image. Try another image with clearer faces.";
pub const LOAD_ERROR_HINT: &str = "Make sure all model files are present at the configured paths.";

/// Estimate response. Every outcome of an upload maps to exactly one variant,
/// which the page turns into a banner.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EstimateResponse {
    Faces {
        message: String,
        annotated: String,
        faces: Vec<FaceDto>,
        inference_time_ms: u64,
    },
    NoFaces {
        message: String,
        annotated: String,
        inference_time_ms: u64,
    },
    ProcessingError {
        message: String,
    },
    LoadError {
        message: String,
        hint: String,
    },
}

impl EstimateResponse {
    pub fn faces(annotated: String, faces: Vec<FaceDto>, inference_time_ms: u64) -> Self {
        Self::Faces {
            message: format!("Detected {} face(s)!", faces.len()),
            annotated,
            faces,
            inference_time_ms,
        }
    }

    pub fn no_faces(annotated: String, inference_time_ms: u64) -> Self {
        Self::NoFaces {
            message: NO_FACES_MESSAGE.to_string(),
            annotated,
            inference_time_ms,
        }
    }

    pub fn processing_error(reason: impl std::fmt::Display) -> Self {
        Self::ProcessingError {
            message: format!("Error processing image: {}", reason),
        }
    }

    pub fn load_error(reason: impl std::fmt::Display) -> Self {
        Self::LoadError {
            message: format!("Error loading models: {}", reason),
            hint: LOAD_ERROR_HINT.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FaceDto {
    /// 1-based position in detection order
    pub index: usize,
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    pub confidence: f32,
    pub age: AgeBracket,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub models_loaded: HashMap<String, bool>,
    pub uptime_seconds: u64,
}
