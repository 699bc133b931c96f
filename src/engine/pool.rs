//! Model Pool
//!
//! Loads the face detector and the age classifier once per process and hands
//! out shared read-only handles. A failed load is not remembered, so the next
//! request tries again.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use openvino::Core;
use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::config::{Config, ModelsConfig};
use crate::error::LoadError;

use super::network::{Network, OpenVinoNetwork};

/// Wrapper for OpenVINO Core that implements Send + Sync
pub struct SafeCore(Core);
unsafe impl Send for SafeCore {}
unsafe impl Sync for SafeCore {}

impl Deref for SafeCore {
    type Target = Core;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SafeCore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Networks the service needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    FaceDetector,
    AgeClassifier,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::FaceDetector => "face_detector",
            ModelType::AgeClassifier => "age_classifier",
        }
    }
}

/// Topology + weights pair on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifact {
    pub topology: PathBuf,
    pub weights: PathBuf,
}

impl ModelArtifact {
    pub fn new(topology: impl Into<PathBuf>, weights: impl Into<PathBuf>) -> Self {
        Self {
            topology: topology.into(),
            weights: weights.into(),
        }
    }

    /// First file of the pair that does not exist
    pub fn missing_file(&self) -> Option<&Path> {
        [&self.topology, &self.weights]
            .into_iter()
            .find(|p| !p.is_file())
            .map(PathBuf::as_path)
    }
}

/// Turns an artifact into a ready network
pub trait ModelLoader: Send + Sync {
    fn load(&self, model_type: ModelType, artifact: &ModelArtifact) -> Result<Arc<dyn Network>, LoadError>;
}

/// Loads OpenVINO-readable models and compiles them for one device
pub struct OpenVinoLoader {
    device: String,
    core: Mutex<Option<SafeCore>>,
}

impl OpenVinoLoader {
    pub fn new(device: &str) -> Self {
        Self {
            device: device.to_string(),
            core: Mutex::new(None),
        }
    }
}

impl ModelLoader for OpenVinoLoader {
    fn load(&self, model_type: ModelType, artifact: &ModelArtifact) -> Result<Arc<dyn Network>, LoadError> {
        if let Some(missing) = artifact.missing_file() {
            return Err(LoadError::MissingArtifact(missing.to_path_buf()));
        }

        let to_load_error = |reason: String| LoadError::Model {
            model: model_type.as_str(),
            reason,
        };

        let mut guard = self.core.lock();
        if guard.is_none() {
            let core = Core::new().map_err(|e| LoadError::Runtime(e.to_string()))?;
            *guard = Some(SafeCore(core));
        }
        let Some(core) = guard.as_mut() else {
            return Err(LoadError::Runtime("OpenVINO core not initialized".to_string()));
        };

        let topology = artifact.topology.to_string_lossy();
        let weights = artifact.weights.to_string_lossy();
        let model = core
            .read_model_from_file(&topology, &weights)
            .map_err(|e| to_load_error(e.to_string()))?;
        let compiled = core
            .compile_model(&model, self.device.as_str().into())
            .map_err(|e| to_load_error(e.to_string()))?;

        Ok(Arc::new(OpenVinoNetwork::new(model_type.as_str(), compiled)))
    }
}

/// Both networks, shared read-only
#[derive(Clone)]
pub struct LoadedModels {
    pub detector: Arc<dyn Network>,
    pub age: Arc<dyn Network>,
}

/// Model pool with load-once semantics
pub struct ModelPool {
    loader: Box<dyn ModelLoader>,
    detector_artifact: ModelArtifact,
    age_artifact: ModelArtifact,
    cache: RwLock<Option<LoadedModels>>,
}

impl ModelPool {
    /// Pool backed by OpenVINO on the configured device
    pub fn new(config: &Config) -> Self {
        Self::with_loader(
            Box::new(OpenVinoLoader::new(&config.inference.device)),
            &config.models,
        )
    }

    /// Pool backed by an arbitrary loader
    pub fn with_loader(loader: Box<dyn ModelLoader>, models: &ModelsConfig) -> Self {
        Self {
            loader,
            detector_artifact: ModelArtifact::new(&models.face_topology, &models.face_weights),
            age_artifact: ModelArtifact::new(&models.age_topology, &models.age_weights),
            cache: RwLock::new(None),
        }
    }

    /// Get both models, loading them on first use
    pub fn get_models(&self) -> Result<LoadedModels, LoadError> {
        if let Some(models) = self.cache.read().as_ref() {
            return Ok(models.clone());
        }

        let mut write_guard = self.cache.write();

        // Double-check after acquiring write lock
        if let Some(models) = write_guard.as_ref() {
            return Ok(models.clone());
        }

        let detector = self.load_one(ModelType::FaceDetector, &self.detector_artifact)?;
        let age = self.load_one(ModelType::AgeClassifier, &self.age_artifact)?;

        let models = LoadedModels { detector, age };
        *write_guard = Some(models.clone());

        Ok(models)
    }

    fn load_one(&self, model_type: ModelType, artifact: &ModelArtifact) -> Result<Arc<dyn Network>, LoadError> {
        info!(
            "Loading model: {} from {} ({})",
            model_type.as_str(),
            artifact.topology.display(),
            artifact.weights.display()
        );
        let start = Instant::now();

        let network = self.loader.load(model_type, artifact)?;

        info!("Model {} loaded in {:?}", model_type.as_str(), start.elapsed());
        Ok(network)
    }

    /// Check if the models are loaded
    pub fn is_loaded(&self) -> bool {
        self.cache.read().is_some()
    }

    /// Get status of all models
    pub fn get_status(&self) -> Vec<(ModelType, bool)> {
        let loaded = self.is_loaded();
        vec![
            (ModelType::FaceDetector, loaded),
            (ModelType::AgeClassifier, loaded),
        ]
    }
}
