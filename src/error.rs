//! Error types for the two failure domains: loading the networks, and
//! processing a single uploaded image.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to bring a network into memory.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model file not found: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("inference runtime unavailable: {0}")]
    Runtime(String),

    #[error("failed to load {model} model: {reason}")]
    Model { model: &'static str, reason: String },
}

/// Failure while handling one image.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image dimensions are zero")]
    ZeroDimensions,

    #[error("unexpected {model} output shape {shape:?}")]
    OutputShape {
        model: &'static str,
        shape: Vec<usize>,
    },

    #[error("face crop around ({x1}, {y1})-({x2}, {y2}) is empty")]
    EmptyCrop { x1: u32, y1: u32, x2: u32, y2: u32 },

    #[error("inference failed: {0}")]
    Inference(#[from] anyhow::Error),

    #[error("failed to encode result image: {0}")]
    Encode(String),

    #[error("worker task failed: {0}")]
    Worker(String),
}

/// Outcome of a request that did not produce a result.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),
}
