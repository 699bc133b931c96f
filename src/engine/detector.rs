//! SSD Face Detector
//!
//! Runs the single-shot face detector on a 300x300 blob and maps its
//! normalized detections back onto the source image.

use std::sync::Arc;

use image::{DynamicImage, GenericImageView, RgbImage};
use ndarray::ArrayD;
use serde::Serialize;

use crate::error::ProcessingError;
use crate::utils::image::draw_box;

use super::network::Network;
use super::preprocess::preprocess_for_detection;

/// Values per detection row: image_id, label, confidence, x1, y1, x2, y2
const DETECTION_ROW_LEN: usize = 7;

/// Box colour, RGB
pub const BOX_COLOR: [u8; 3] = [0, 255, 0];

/// Face detection result in source-image pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    pub confidence: f32,
}

impl FaceBox {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// SSD Face Detector
pub struct FaceDetector {
    network: Arc<dyn Network>,
    confidence_threshold: f32,
}

impl FaceDetector {
    pub fn new(network: Arc<dyn Network>, confidence_threshold: f32) -> Self {
        Self {
            network,
            confidence_threshold,
        }
    }

    /// Detect faces, in detector output order
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceBox>, ProcessingError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ProcessingError::ZeroDimensions);
        }

        let input = preprocess_for_detection(image);
        let output = self.network.forward(&input)?;

        let faces = parse_detections(&output, width, height, self.confidence_threshold)?;
        tracing::debug!(
            "Detected {} faces above {}",
            faces.len(),
            self.confidence_threshold
        );

        Ok(faces)
    }

    /// Detect faces and return an RGB copy with every box drawn on it
    pub fn localize(&self, image: &DynamicImage) -> Result<(RgbImage, Vec<FaceBox>), ProcessingError> {
        let faces = self.detect(image)?;

        let mut canvas = image.to_rgb8();
        let thickness = box_thickness(canvas.height());
        for face in &faces {
            draw_box(&mut canvas, face, thickness, image::Rgb(BOX_COLOR));
        }

        Ok((canvas, faces))
    }
}

/// Line width that scales with the picture
pub fn box_thickness(image_height: u32) -> u32 {
    ((image_height as f32 / 150.0).round() as u32).max(1)
}

/// Parse `[1, 1, N, 7]` SSD output into boxes scaled to `width` x `height`.
/// Only rows with confidence strictly above `threshold` are kept. A negative
/// image id marks the end of the valid rows.
pub fn parse_detections(
    output: &ArrayD<f32>,
    width: u32,
    height: u32,
    threshold: f32,
) -> Result<Vec<FaceBox>, ProcessingError> {
    let shape = output.shape();
    if shape.len() != 4 || shape[0] == 0 || shape[1] == 0 || shape[3] != DETECTION_ROW_LEN {
        return Err(ProcessingError::OutputShape {
            model: "face_detector",
            shape: shape.to_vec(),
        });
    }

    let max_x = width.saturating_sub(1) as f32;
    let max_y = height.saturating_sub(1) as f32;
    let to_pixel = |v: f32, scale: u32, max: f32| (v * scale as f32).trunc().clamp(0.0, max) as u32;

    let mut faces = Vec::new();
    for i in 0..shape[2] {
        if output[[0, 0, i, 0]] < 0.0 {
            break;
        }

        let confidence = output[[0, 0, i, 2]];
        if confidence.is_nan() || confidence <= threshold {
            continue;
        }

        let xa = to_pixel(output[[0, 0, i, 3]], width, max_x);
        let ya = to_pixel(output[[0, 0, i, 4]], height, max_y);
        let xb = to_pixel(output[[0, 0, i, 5]], width, max_x);
        let yb = to_pixel(output[[0, 0, i, 6]], height, max_y);

        faces.push(FaceBox {
            x1: xa.min(xb),
            y1: ya.min(yb),
            x2: xa.max(xb),
            y2: ya.max(yb),
            confidence,
        });
    }

    Ok(faces)
}
