//! Age Service - detect, crop, classify, annotate
//!
//! Runs the detector over an uploaded image, classifies every face with the
//! age network and draws the results onto a copy of the image. The first
//! face that fails aborts the whole request.

use std::sync::Arc;
use std::time::Instant;

use image::{DynamicImage, GenericImageView, Rgb};
use tracing::info;

use crate::config::PipelineConfig;
use crate::engine::{
    detector::box_thickness,
    preprocess::{crop, crop_with_margin, decode_image},
    AgeClassifier, FaceDetector, LoadedModels, ModelPool,
};
use crate::error::{ProcessingError, ServiceError};
use crate::utils::image::{draw_label, GLYPH_SIZE};

use super::types::*;

/// Label colour, RGB
pub const LABEL_COLOR: [u8; 3] = [255, 255, 0];

/// Gap between the label baseline and the box top
const LABEL_OFFSET: i32 = 10;

/// Run detection and age classification over a decoded image.
///
/// Faces are cropped from `image` itself, not from the annotated copy, so
/// the drawn boxes never reach the age network.
pub fn run_pipeline(
    image: &DynamicImage,
    models: &LoadedModels,
    config: &PipelineConfig,
) -> Result<EstimateResult, ProcessingError> {
    let start = Instant::now();
    let (width, height) = image.dimensions();

    let detector = FaceDetector::new(models.detector.clone(), config.confidence_threshold);
    let classifier = AgeClassifier::new(models.age.clone());

    let (mut annotated, boxes) = detector.localize(image)?;
    let scale = box_thickness(height);

    let mut faces = Vec::with_capacity(boxes.len());
    for face_box in boxes {
        let rect = crop_with_margin(&face_box, config.face_margin, width, height).ok_or(
            ProcessingError::EmptyCrop {
                x1: face_box.x1,
                y1: face_box.y1,
                x2: face_box.x2,
                y2: face_box.y2,
            },
        )?;

        // Crop from the clean image so the drawn boxes don't reach the classifier
        let age = classifier.classify(&crop(image, rect))?;

        let label = format!("Age: {}", age);
        let top = (face_box.y1 as i32 - LABEL_OFFSET - (GLYPH_SIZE * scale) as i32).max(0);
        draw_label(&mut annotated, &label, face_box.x1 as i32, top, scale, Rgb(LABEL_COLOR));

        faces.push(FaceEstimate { face_box, age });
    }

    Ok(EstimateResult {
        annotated,
        faces,
        inference_time_ms: start.elapsed().as_millis() as u64,
    })
}

/// Age estimation service
pub struct AgeService {
    pool: Arc<ModelPool>,
    config: PipelineConfig,
}

impl AgeService {
    pub fn new(pool: Arc<ModelPool>, config: PipelineConfig) -> Self {
        Self { pool, config }
    }

    /// Estimate ages for every face in an encoded image
    pub async fn estimate(&self, image_data: Vec<u8>) -> Result<EstimateResult, ServiceError> {
        let start = Instant::now();
        let pool = self.pool.clone();
        let config = self.config.clone();

        let result = tokio::task::spawn_blocking(move || -> Result<EstimateResult, ServiceError> {
            let models = pool.get_models()?;
            let image = decode_image(&image_data)?;
            Ok(run_pipeline(&image, &models, &config)?)
        })
        .await
        .map_err(|e| ProcessingError::Worker(e.to_string()))??;

        info!(
            "Estimated {} face(s) in {}ms",
            result.faces.len(),
            start.elapsed().as_millis()
        );

        Ok(result)
    }

    /// Get health status
    pub fn health(&self) -> HealthResult {
        let models_loaded = self
            .pool
            .get_status()
            .into_iter()
            .map(|(t, loaded)| (t.as_str().to_string(), loaded))
            .collect();

        HealthResult {
            healthy: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
            models_loaded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{bail, Result};
    use image::{ImageBuffer, RgbImage};
    use ndarray::{Array4, ArrayD, IxDyn};

    use crate::engine::{AgeBracket, Network};

    struct FixedDetector(Vec<[f32; 7]>);

    impl Network for FixedDetector {
        fn forward(&self, input: &Array4<f32>) -> Result<ArrayD<f32>> {
            assert_eq!(input.shape(), &[1, 3, 300, 300]);
            let flat: Vec<f32> = self.0.iter().flatten().copied().collect();
            Ok(ArrayD::from_shape_vec(IxDyn(&[1, 1, self.0.len(), 7]), flat)?)
        }
    }

    /// Returns bracket `i` for the i-th call
    #[derive(Default)]
    struct CyclingAge(AtomicUsize);

    impl Network for CyclingAge {
        fn forward(&self, input: &Array4<f32>) -> Result<ArrayD<f32>> {
            assert_eq!(input.shape(), &[1, 3, 227, 227]);
            let call = self.0.fetch_add(1, Ordering::SeqCst) % 8;
            let mut scores = vec![0.0f32; 8];
            scores[call] = 1.0;
            Ok(ArrayD::from_shape_vec(IxDyn(&[1, 8]), scores)?)
        }
    }

    struct BrokenAge;

    impl Network for BrokenAge {
        fn forward(&self, _input: &Array4<f32>) -> Result<ArrayD<f32>> {
            bail!("device lost")
        }
    }

    /// Fails unless every channel of the crop is uniform
    struct UniformCropAge;

    impl Network for UniformCropAge {
        fn forward(&self, input: &Array4<f32>) -> Result<ArrayD<f32>> {
            for channel in 0..3 {
                let plane: ndarray::ArrayView2<f32> = input.slice(ndarray::s![0, channel, .., ..]);
                let first = plane[[0, 0]];
                if plane.iter().any(|v| (v - first).abs() > 1e-3) {
                    bail!("crop carries annotation pixels");
                }
            }
            Ok(ArrayD::from_shape_vec(IxDyn(&[1, 8]), vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])?)
        }
    }

    fn models(rows: Vec<[f32; 7]>, age: Arc<dyn Network>) -> LoadedModels {
        LoadedModels {
            detector: Arc::new(FixedDetector(rows)),
            age,
        }
    }

    fn gray(w: u32, h: u32) -> DynamicImage {
        let img: RgbImage = ImageBuffer::from_pixel(w, h, Rgb([128u8, 128, 128]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_labels_follow_detection_order() {
        let rows = vec![
            [0.0, 1.0, 0.9, 0.1, 0.1, 0.3, 0.3],
            [0.0, 1.0, 0.95, 0.6, 0.6, 0.9, 0.9],
            [0.0, 1.0, 0.1, 0.4, 0.4, 0.5, 0.5],
        ];
        let models = models(rows, Arc::new(CyclingAge::default()));

        let result = run_pipeline(&gray(200, 200), &models, &PipelineConfig::default()).unwrap();

        assert_eq!(result.boxes().len(), 2);
        assert_eq!(result.ages(), vec![AgeBracket::Infant, AgeBracket::Toddler]);
        assert_eq!(result.boxes()[0].x1, 20);
        assert_eq!(result.boxes()[1].x1, 120);
        assert_eq!(result.annotated.dimensions(), (200, 200));
    }

    #[test]
    fn test_crop_comes_from_clean_image() {
        let rows = vec![[0.0, 1.0, 0.9, 0.3, 0.3, 0.7, 0.7]];
        let models = models(rows, Arc::new(UniformCropAge));

        let result = run_pipeline(&gray(200, 200), &models, &PipelineConfig::default()).unwrap();

        assert_eq!(result.ages(), vec![AgeBracket::Infant]);
        assert_eq!(*result.annotated.get_pixel(60, 100), Rgb([0, 255, 0]));
    }

    #[test]
    fn test_face_failure_aborts_request() {
        let rows = vec![[0.0, 1.0, 0.9, 0.1, 0.1, 0.3, 0.3]];
        let models = models(rows, Arc::new(BrokenAge));

        let err = run_pipeline(&gray(100, 100), &models, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, ProcessingError::Inference(_)));
        assert!(err.to_string().contains("device lost"));
    }

    #[test]
    fn test_degenerate_box_without_margin_is_rejected() {
        let rows = vec![[0.0, 1.0, 0.9, 0.5, 0.2, 0.5, 0.6]];
        let models = models(rows, Arc::new(CyclingAge::default()));
        let config = PipelineConfig { face_margin: 0, ..PipelineConfig::default() };

        let err = run_pipeline(&gray(100, 100), &models, &config).unwrap_err();
        assert!(matches!(err, ProcessingError::EmptyCrop { x1: 50, .. }));
    }

    #[test]
    fn test_no_faces_leaves_image_untouched() {
        let models = models(vec![], Arc::new(CyclingAge::default()));
        let image = gray(64, 48);

        let result = run_pipeline(&image, &models, &PipelineConfig::default()).unwrap();

        assert!(result.is_empty());
        assert!(result.ages().is_empty());
        assert_eq!(result.annotated, image.to_rgb8());
    }
}
