//! Service layer types

use image::RgbImage;
use serde::Serialize;

use crate::engine::{AgeBracket, FaceBox};

/// One detected face and its predicted age range
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceEstimate {
    pub face_box: FaceBox,
    pub age: AgeBracket,
}

/// Result of running the whole pipeline over one image
#[derive(Debug, Clone)]
pub struct EstimateResult {
    /// Source image with boxes and labels drawn on it
    pub annotated: RgbImage,
    /// One entry per face, in detection order
    pub faces: Vec<FaceEstimate>,
    pub inference_time_ms: u64,
}

impl EstimateResult {
    pub fn boxes(&self) -> Vec<FaceBox> {
        self.faces.iter().map(|f| f.face_box).collect()
    }

    pub fn ages(&self) -> Vec<AgeBracket> {
        self.faces.iter().map(|f| f.age).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// Health check result
#[derive(Debug, Clone, Serialize)]
pub struct HealthResult {
    pub healthy: bool,
    pub version: String,
    pub models_loaded: std::collections::HashMap<String, bool>,
}
