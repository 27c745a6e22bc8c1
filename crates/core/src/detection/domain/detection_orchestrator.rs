use std::time::Instant;

use super::face_detector::FaceDetector;
use crate::motion::domain::adaptation_gate::BackgroundAdaptationGate;
use crate::motion::domain::motion_region_extractor::MotionRegionExtractor;
use crate::shared::frame::Frame;
use crate::shared::region::BoundingBox;

/// How the orchestrator decides where to look for faces.
pub enum DetectionMode {
    /// Run the detector only on regions that moved. A `gate` of `None`
    /// keeps the background frozen at the first frame.
    MotionGated {
        extractor: MotionRegionExtractor,
        gate: Option<BackgroundAdaptationGate>,
    },
    /// Run the detector on every whole frame.
    Direct,
}

/// Decides where the detector runs and keeps the background model in step
/// with what was found.
pub struct DetectionOrchestrator {
    detector: Box<dyn FaceDetector>,
    mode: DetectionMode,
    last_positive: Option<Instant>,
    regions_last_frame: usize,
}

impl DetectionOrchestrator {
    pub fn new(detector: Box<dyn FaceDetector>, mode: DetectionMode) -> Self {
        Self {
            detector,
            mode,
            last_positive: None,
            regions_last_frame: 0,
        }
    }

    pub fn mode(&self) -> &DetectionMode {
        &self.mode
    }

    /// Time of the last positive detection. Starts at the first frame seen.
    pub fn last_positive(&self) -> Option<Instant> {
        self.last_positive
    }

    /// Number of motion regions examined in the last frame (0 when direct).
    pub fn regions_last_frame(&self) -> usize {
        self.regions_last_frame
    }

    /// Returns face boxes in frame coordinates.
    pub fn locate_faces(&mut self, frame: &Frame, now: Instant) -> Vec<BoundingBox> {
        let last_positive = *self.last_positive.get_or_insert(now);

        match &mut self.mode {
            DetectionMode::Direct => {
                self.regions_last_frame = 0;
                let faces = detect_or_warn(self.detector.as_mut(), frame, frame.index());
                if !faces.is_empty() {
                    self.last_positive = Some(now);
                }
                faces
            }
            DetectionMode::MotionGated { extractor, gate } => {
                let regions = extractor.propose_regions(frame);
                self.regions_last_frame = regions.len();

                let mut last_positive = last_positive;
                if regions.is_empty() {
                    if let Some(gate) = gate.as_ref() {
                        extractor.adapt_background(gate, last_positive, now);
                    }
                    return Vec::new();
                }

                let mut faces = Vec::new();
                for region in &regions {
                    let local = detect_or_warn(self.detector.as_mut(), &region.pixels, frame.index());
                    if local.is_empty() {
                        if let Some(gate) = gate.as_ref() {
                            extractor.adapt_background(gate, last_positive, now);
                        }
                        continue;
                    }
                    last_positive = now;
                    let origin = region.bounding_box;
                    faces.extend(local.iter().map(|b| b.translate(origin.x, origin.y)));
                }
                self.last_positive = Some(last_positive);
                faces
            }
        }
    }
}

fn detect_or_warn(detector: &mut dyn FaceDetector, frame: &Frame, index: usize) -> Vec<BoundingBox> {
    match detector.detect(frame) {
        Ok(boxes) => boxes,
        Err(e) => {
            log::warn!("Face detection failed on frame {index}: {e}");
            Vec::new()
        }
    }
}
