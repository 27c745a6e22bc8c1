use std::time::Instant;

use ndarray::Array2;

use super::adaptation_gate::BackgroundAdaptationGate;
use super::background_model::BackgroundModel;
use super::candidate_region::CandidateRegion;
use crate::motion::imaging::contours::find_external_contours;
use crate::motion::imaging::gaussian::{gaussian_blur, gaussian_kernel_1d};
use crate::motion::imaging::morphology::{abs_diff, dilate, threshold};
use crate::shared::frame::Frame;

/// Tuning for motion segmentation.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionConfig {
    /// Per-pixel difference a pixel must exceed to count as motion.
    pub pixel_threshold: u8,
    /// Contour area a blob must exceed to become a candidate region.
    pub min_area: f64,
    pub dilate_iterations: usize,
    /// Gaussian kernel size (odd).
    pub blur_kernel: usize,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            pixel_threshold: 15,
            min_area: 5000.0,
            dilate_iterations: 2,
            blur_kernel: 21,
        }
    }
}

/// Finds the parts of a frame that differ from a running background
/// estimate.
///
/// The first frame seeds the background, so it never yields regions.
pub struct MotionRegionExtractor {
    config: MotionConfig,
    kernel: Vec<f32>,
    scratch: Vec<f32>,
    background: Option<BackgroundModel>,
    current_frame: Option<Array2<u8>>,
}

impl MotionRegionExtractor {
    pub fn new(config: MotionConfig) -> Self {
        let kernel = gaussian_kernel_1d(config.blur_kernel);
        Self {
            config,
            kernel,
            scratch: Vec::new(),
            background: None,
            current_frame: None,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn background(&self) -> Option<&BackgroundModel> {
        self.background.as_ref()
    }

    /// Blurred grayscale version of the most recent frame.
    pub fn current_frame(&self) -> Option<&Array2<u8>> {
        self.current_frame.as_ref()
    }

    /// Returns every blob of changed pixels larger than `min_area`, cropped
    /// from the original frame. Overlapping boxes are not merged.
    pub fn propose_regions(&mut self, frame: &Frame) -> Vec<CandidateRegion> {
        let gray = frame.to_gray();
        let blurred = gaussian_blur(&gray, &self.kernel, &mut self.scratch);

        if self
            .background
            .as_ref()
            .is_some_and(|bg| bg.dim() != blurred.dim())
        {
            log::warn!(
                "Frame size changed to {}x{}, reseeding background",
                frame.width(),
                frame.height()
            );
            self.background = None;
        }
        let background = self
            .background
            .get_or_insert_with(|| BackgroundModel::new(&blurred));

        let delta = abs_diff(&blurred, &background.render());
        let mask = dilate(
            &threshold(&delta, self.config.pixel_threshold),
            self.config.dilate_iterations,
        );

        let regions: Vec<CandidateRegion> = find_external_contours(&mask)
            .iter()
            .filter(|contour| contour.area() > self.config.min_area)
            .filter_map(|contour| {
                let bounding_box = contour.bounding_rect();
                frame.crop(&bounding_box).map(|pixels| CandidateRegion {
                    pixels,
                    bounding_box,
                })
            })
            .collect();

        self.current_frame = Some(blurred);
        regions
    }

    /// Offers the current frame to the background through `gate`.
    /// Returns whether the background changed.
    pub fn adapt_background(
        &mut self,
        gate: &BackgroundAdaptationGate,
        last_positive: Instant,
        now: Instant,
    ) -> bool {
        match (self.background.as_mut(), self.current_frame.as_ref()) {
            (Some(background), Some(current)) => {
                gate.maybe_adapt(background, current, last_positive, now)
            }
            _ => false,
        }
    }
}
