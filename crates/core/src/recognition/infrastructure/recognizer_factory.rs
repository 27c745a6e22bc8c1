use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detection::infrastructure::model_resolver::resolve_model;
use crate::recognition::domain::face_recognizer::FaceRecognizer;
use crate::shared::constants::{EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL};

use super::embedding_face_recognizer::{self, EmbeddingFaceRecognizer};
use super::histogram_face_recognizer::{self, HistogramFaceRecognizer};
use super::reference_gallery::ReferenceGallery;

/// Face recognizer backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerKind {
    #[default]
    Embedding,
    Histogram,
}

impl RecognizerKind {
    pub fn default_threshold(self) -> f64 {
        match self {
            RecognizerKind::Embedding => embedding_face_recognizer::DEFAULT_THRESHOLD,
            RecognizerKind::Histogram => histogram_face_recognizer::DEFAULT_THRESHOLD,
        }
    }
}

/// Builds the configured recognizer over an already-loaded gallery.
pub fn create_recognizer(
    kind: RecognizerKind,
    gallery: &ReferenceGallery,
    model_path: Option<&Path>,
    threshold: Option<f64>,
) -> Result<Box<dyn FaceRecognizer>, Box<dyn std::error::Error>> {
    let threshold = threshold.unwrap_or_else(|| kind.default_threshold());
    log::info!("Using {kind:?} face recognizer (threshold {threshold})");
    match kind {
        RecognizerKind::Embedding => {
            let path = resolve_model(model_path, EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL)?;
            Ok(Box::new(EmbeddingFaceRecognizer::new(&path, gallery, threshold)?))
        }
        RecognizerKind::Histogram => Ok(Box::new(HistogramFaceRecognizer::new(gallery, threshold))),
    }
}
