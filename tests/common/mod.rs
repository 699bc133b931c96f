//! Scripted networks and fixtures shared by the integration tests

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, RgbImage};
use ndarray::{Array4, ArrayD, IxDyn};

use agecam::config::ModelsConfig;
use agecam::engine::pool::{ModelArtifact, ModelLoader, ModelType};
use agecam::engine::{LoadedModels, ModelPool, Network};
use agecam::LoadError;

/// SSD detector that always answers with the same rows
pub struct ScriptedDetector {
    pub rows: Vec<[f32; 7]>,
}

impl Network for ScriptedDetector {
    fn forward(&self, input: &Array4<f32>) -> Result<ArrayD<f32>> {
        assert_eq!(input.shape(), &[1, 3, 300, 300]);
        let flat: Vec<f32> = self.rows.iter().flatten().copied().collect();
        Ok(ArrayD::from_shape_vec(IxDyn(&[1, 1, self.rows.len(), 7]), flat)?)
    }
}

/// Age network with fixed scores
pub struct FixedAge {
    pub scores: [f32; 8],
}

impl Network for FixedAge {
    fn forward(&self, input: &Array4<f32>) -> Result<ArrayD<f32>> {
        assert_eq!(input.shape(), &[1, 3, 227, 227]);
        Ok(ArrayD::from_shape_vec(IxDyn(&[1, 8]), self.scores.to_vec())?)
    }
}

/// Scores that make "(25-32)" win
pub const YOUNG_ADULT_SCORES: [f32; 8] = [0.01, 0.02, 0.03, 0.14, 0.55, 0.15, 0.06, 0.04];

/// One face at (50,50)-(350,350) of a 400x400 image with score 0.95,
/// plus a weak candidate that must be dropped
pub fn single_face_rows() -> Vec<[f32; 7]> {
    vec![
        [0.0, 1.0, 0.95, 0.125, 0.125, 0.875, 0.875],
        [0.0, 1.0, 0.30, 0.5, 0.5, 0.6, 0.6],
    ]
}

/// What the detector returns for a uniform image
pub fn blank_rows() -> Vec<[f32; 7]> {
    vec![[0.0, 1.0, 0.01, 0.0, 0.0, 0.0, 0.0]; 4]
}

pub fn models(rows: Vec<[f32; 7]>) -> LoadedModels {
    LoadedModels {
        detector: Arc::new(ScriptedDetector { rows }),
        age: Arc::new(FixedAge { scores: YOUNG_ADULT_SCORES }),
    }
}

/// Loader handing out scripted networks and counting calls
pub struct ScriptedLoader {
    pub rows: Vec<[f32; 7]>,
    pub calls: Arc<AtomicUsize>,
}

impl ModelLoader for ScriptedLoader {
    fn load(&self, model_type: ModelType, _artifact: &ModelArtifact) -> Result<Arc<dyn Network>, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match model_type {
            ModelType::FaceDetector => Arc::new(ScriptedDetector { rows: self.rows.clone() }),
            ModelType::AgeClassifier => Arc::new(FixedAge { scores: YOUNG_ADULT_SCORES }),
        })
    }
}

pub fn scripted_pool(rows: Vec<[f32; 7]>) -> (ModelPool, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let loader = ScriptedLoader { rows, calls: calls.clone() };
    (ModelPool::with_loader(Box::new(loader), &ModelsConfig::default()), calls)
}

/// Image with a light square where the scripted face sits
pub fn portrait(size: u32) -> DynamicImage {
    let img: RgbImage = ImageBuffer::from_fn(size, size, |x, y| {
        if (50..350).contains(&x) && (50..350).contains(&y) {
            Rgb([224, 172, 105])
        } else {
            Rgb([40, 60, 90])
        }
    });
    DynamicImage::ImageRgb8(img)
}

pub fn blank(size: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_pixel(size, size, Rgb([255, 255, 255])))
}

pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}
