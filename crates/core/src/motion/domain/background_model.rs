use ndarray::{Array2, Zip};

/// Running grayscale estimate of the static scene.
///
/// Stored as `f32` so repeated small-weight blends accumulate instead of
/// being lost to integer rounding.
#[derive(Clone, Debug)]
pub struct BackgroundModel {
    average: Array2<f32>,
}

impl BackgroundModel {
    /// Seeds the model with an already-blurred grayscale frame.
    pub fn new(seed: &Array2<u8>) -> Self {
        Self {
            average: seed.mapv(f32::from),
        }
    }

    /// `(rows, cols)` of the model.
    pub fn dim(&self) -> (usize, usize) {
        self.average.dim()
    }

    pub fn average(&self) -> &Array2<f32> {
        &self.average
    }

    /// Blends `frame` in: `avg = (1 - alpha) * avg + alpha * frame`.
    pub fn accumulate(&mut self, frame: &Array2<u8>, alpha: f32) {
        debug_assert_eq!(self.average.dim(), frame.dim());
        Zip::from(&mut self.average)
            .and(frame)
            .for_each(|avg, &px| *avg = (1.0 - alpha) * *avg + alpha * f32::from(px));
    }

    /// Renders the average as an 8-bit plane (rounded, saturated).
    pub fn render(&self) -> Array2<u8> {
        self.average.mapv(|v| v.round().clamp(0.0, 255.0) as u8)
    }
}
