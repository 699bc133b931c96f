//! Inference engine module
//!
//! Provides OpenVINO-based inference with:
//! - One-time model loading shared across requests
//! - SSD face detection
//! - Age bracket classification

pub mod network;
pub mod pool;
pub mod detector;
pub mod attribute;
pub mod preprocess;

pub use network::Network;
pub use pool::{LoadedModels, ModelPool};
pub use detector::{FaceBox, FaceDetector};
pub use attribute::{AgeBracket, AgeClassifier};
