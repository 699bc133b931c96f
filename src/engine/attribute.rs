//! Age Bracket Classifier
//!
//! Maps a face crop to one of eight fixed age ranges by taking the
//! highest-scoring class of the age network.

use std::fmt;
use std::sync::Arc;

use image::{DynamicImage, GenericImageView};
use serde::{Serialize, Serializer};

use crate::error::ProcessingError;
use crate::utils::math::argmax;

use super::network::Network;
use super::preprocess::preprocess_for_age;

/// Age range predicted for a face, in network output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeBracket {
    Infant,
    Toddler,
    Child,
    Teen,
    YoungAdult,
    Adult,
    MiddleAged,
    Senior,
}

impl AgeBracket {
    pub const ALL: [AgeBracket; 8] = [
        AgeBracket::Infant,
        AgeBracket::Toddler,
        AgeBracket::Child,
        AgeBracket::Teen,
        AgeBracket::YoungAdult,
        AgeBracket::Adult,
        AgeBracket::MiddleAged,
        AgeBracket::Senior,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeBracket::Infant => "(0-2)",
            AgeBracket::Toddler => "(4-6)",
            AgeBracket::Child => "(8-12)",
            AgeBracket::Teen => "(15-20)",
            AgeBracket::YoungAdult => "(25-32)",
            AgeBracket::Adult => "(38-43)",
            AgeBracket::MiddleAged => "(48-53)",
            AgeBracket::Senior => "(60-100)",
        }
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }
}

impl fmt::Display for AgeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AgeBracket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Age Classifier
pub struct AgeClassifier {
    network: Arc<dyn Network>,
}

impl AgeClassifier {
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self { network }
    }

    /// Classify a face crop (margin already applied)
    pub fn classify(&self, face: &DynamicImage) -> Result<AgeBracket, ProcessingError> {
        let (w, h) = face.dimensions();
        if w == 0 || h == 0 {
            return Err(ProcessingError::EmptyCrop { x1: 0, y1: 0, x2: w, y2: h });
        }

        let input = preprocess_for_age(face);
        let output = self.network.forward(&input)?;

        let scores: Vec<f32> = output.iter().copied().collect();
        tracing::debug!("Age model raw output: {:?}", scores);

        bracket_from_scores(&scores).ok_or_else(|| ProcessingError::OutputShape {
            model: "age_classifier",
            shape: output.shape().to_vec(),
        })
    }
}

/// Pick the bracket with the highest score; `None` unless exactly eight
/// scores are given.
pub fn bracket_from_scores(scores: &[f32]) -> Option<AgeBracket> {
    if scores.len() != AgeBracket::ALL.len() {
        return None;
    }
    argmax(scores).and_then(AgeBracket::from_index)
}
