use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::constants::{YOLO_MODEL_NAME, YOLO_MODEL_URL};

use super::model_resolver::resolve_model;
use super::onnx_blazeface_detector::{self, OnnxBlazefaceDetector};
use super::onnx_yolo_detector::{self, OnnxYoloDetector};

/// Face detector backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    #[default]
    Yolo,
    Blazeface,
}

impl DetectorKind {
    pub fn default_confidence(self) -> f64 {
        match self {
            DetectorKind::Yolo => onnx_yolo_detector::DEFAULT_CONFIDENCE,
            DetectorKind::Blazeface => onnx_blazeface_detector::DEFAULT_CONFIDENCE,
        }
    }
}

/// Builds the configured detector. YOLO falls back to the published model
/// when no path is given; BlazeFace needs an explicit model file.
pub fn create_detector(
    kind: DetectorKind,
    model_path: Option<&Path>,
    confidence: Option<f64>,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let confidence = confidence.unwrap_or_else(|| kind.default_confidence());
    log::info!("Using {kind:?} face detector (confidence {confidence})");
    match kind {
        DetectorKind::Yolo => {
            let path = resolve_model(model_path, YOLO_MODEL_NAME, YOLO_MODEL_URL)?;
            Ok(Box::new(OnnxYoloDetector::new(&path, confidence)?))
        }
        DetectorKind::Blazeface => {
            let path = model_path.ok_or("the blazeface detector requires detector.model_path")?;
            Ok(Box::new(OnnxBlazefaceDetector::new(path, confidence)?))
        }
    }
}
