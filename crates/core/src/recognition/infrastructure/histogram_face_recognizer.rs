/// Hue-Saturation histogram recognizer.
///
/// A model-free fallback comparing face crops by color distribution with
/// Pearson correlation. Much weaker than embeddings, but needs nothing
/// beyond the reference images.
use crate::recognition::domain::face_recognizer::FaceRecognizer;
use crate::recognition::domain::identity::{most_common_identity, Identity};
use crate::shared::frame::Frame;
use crate::shared::region::BoundingBox;

use super::reference_gallery::ReferenceGallery;

pub const DEFAULT_THRESHOLD: f64 = 0.7;

const HUE_BINS: usize = 32;
const SAT_BINS: usize = 32;

pub struct HistogramFaceRecognizer {
    threshold: f64,
    references: Vec<(Identity, Vec<f64>)>,
    names: Vec<String>,
}

impl HistogramFaceRecognizer {
    pub fn new(gallery: &ReferenceGallery, threshold: f64) -> Self {
        let references = gallery
            .faces()
            .iter()
            .map(|face| (face.identity, compute_histogram(&face.image)))
            .collect();
        Self {
            threshold,
            references,
            names: gallery.names().to_vec(),
        }
    }

    fn identify(&self, face: &Frame) -> Identity {
        let histogram = compute_histogram(face);
        let matches: Vec<Identity> = self
            .references
            .iter()
            .filter(|(_, reference)| pearson_correlation(&histogram, reference) >= self.threshold)
            .map(|(identity, _)| *identity)
            .collect();
        most_common_identity(&matches)
    }
}

impl FaceRecognizer for HistogramFaceRecognizer {
    fn encode_and_match(
        &mut self,
        frame: &Frame,
        faces: &[BoundingBox],
    ) -> Result<Vec<Identity>, Box<dyn std::error::Error>> {
        Ok(faces
            .iter()
            .map(|face| {
                frame
                    .crop(face)
                    .map_or(Identity::Unknown, |crop| self.identify(&crop))
            })
            .collect())
    }

    fn identity_names(&self) -> &[String] {
        &self.names
    }
}

/// Normalized 2D Hue-Saturation histogram of an RGB or grayscale image.
fn compute_histogram(image: &Frame) -> Vec<f64> {
    let channels = image.channels() as usize;
    let mut hist = vec![0.0f64; HUE_BINS * SAT_BINS];
    let mut count = 0usize;

    for px in image.data().chunks_exact(channels.max(1)) {
        let (r, g, b) = if channels >= 3 {
            (px[0], px[1], px[2])
        } else {
            (px[0], px[0], px[0])
        };
        let (h, s, _v) = rgb_to_hsv(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);

        let h_bin = ((h / 360.0) * HUE_BINS as f64).min(HUE_BINS as f64 - 1.0) as usize;
        let s_bin = (s * SAT_BINS as f64).min(SAT_BINS as f64 - 1.0) as usize;

        hist[h_bin * SAT_BINS + s_bin] += 1.0;
        count += 1;
    }

    if count > 0 {
        let total = count as f64;
        for v in &mut hist {
            *v /= total;
        }
    }

    hist
}

fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { delta / max } else { 0.0 };

    let h = if delta == 0.0 {
        0.0
    } else if (max - r).abs() < f64::EPSILON {
        60.0 * (((g - b) / delta) % 6.0)
    } else if (max - g).abs() < f64::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let h = if h < 0.0 { h + 360.0 } else { h };

    (h, s, v)
}

/// Pearson correlation coefficient.
///
/// Returns 1.0 when both inputs have zero variance (identical distributions),
/// and 0.0 when only one has zero variance.
fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let n = len as f64;
    let mean_a = a[..len].iter().sum::<f64>() / n;
    let mean_b = b[..len].iter().sum::<f64>() / n;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a[..len].iter().zip(&b[..len]) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < f64::EPSILON {
        return if var_a < f64::EPSILON && var_b < f64::EPSILON {
            1.0
        } else {
            0.0
        };
    }
    cov / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::infrastructure::reference_gallery::ReferenceFace;
    use approx::assert_relative_eq;

    fn solid(r: u8, g: u8, b: u8, size: u32) -> Frame {
        let data = [r, g, b].repeat((size * size) as usize);
        Frame::new(data, size, size, 3, 0)
    }

    fn gallery() -> ReferenceGallery {
        ReferenceGallery::from_faces(
            vec!["red".into(), "blue".into()],
            vec![
                ReferenceFace {
                    identity: Identity::Known(1),
                    image: solid(200, 30, 30, 8),
                },
                ReferenceFace {
                    identity: Identity::Known(2),
                    image: solid(30, 30, 200, 8),
                },
            ],
        )
    }

    #[test]
    fn test_rgb_to_hsv_primaries() {
        let (h, s, v) = rgb_to_hsv(1.0, 0.0, 0.0);
        assert_relative_eq!(h, 0.0);
        assert_relative_eq!(s, 1.0);
        assert_relative_eq!(v, 1.0);
        assert_relative_eq!(rgb_to_hsv(0.0, 1.0, 0.0).0, 120.0);
        assert_relative_eq!(rgb_to_hsv(0.0, 0.0, 1.0).0, 240.0);
    }

    #[test]
    fn test_histogram_sums_to_one() {
        let hist = compute_histogram(&solid(10, 200, 90, 5));
        assert_relative_eq!(hist.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pearson_identical_and_constant() {
        let a = vec![0.1, 0.5, 0.4];
        assert_relative_eq!(pearson_correlation(&a, &a), 1.0, epsilon = 1e-9);
        assert_relative_eq!(pearson_correlation(&[1.0, 1.0], &[2.0, 2.0]), 1.0);
        assert_relative_eq!(pearson_correlation(&[1.0, 1.0], &[1.0, 2.0]), 0.0);
        assert_relative_eq!(pearson_correlation(&[], &[]), 0.0);
    }

    #[test]
    fn test_matches_face_by_color() {
        let mut recognizer = HistogramFaceRecognizer::new(&gallery(), DEFAULT_THRESHOLD);
        let mut data = solid(30, 30, 200, 20).data().to_vec();
        data[..30].copy_from_slice(&[200u8, 30, 30].repeat(10));
        let frame = Frame::new(data, 20, 20, 3, 0);

        let ids = recognizer
            .encode_and_match(&frame, &[BoundingBox::new(5, 5, 10, 10)])
            .unwrap();
        assert_eq!(ids, vec![Identity::Known(2)]);
    }

    #[test]
    fn test_unmatched_face_is_unknown() {
        let mut recognizer = HistogramFaceRecognizer::new(&gallery(), DEFAULT_THRESHOLD);
        let frame = solid(30, 200, 30, 20);
        let ids = recognizer
            .encode_and_match(&frame, &[BoundingBox::new(0, 0, 10, 10)])
            .unwrap();
        assert_eq!(ids, vec![Identity::Unknown]);
    }

    #[test]
    fn test_face_outside_frame_is_unknown() {
        let mut recognizer = HistogramFaceRecognizer::new(&gallery(), DEFAULT_THRESHOLD);
        let frame = solid(200, 30, 30, 20);
        let ids = recognizer
            .encode_and_match(
                &frame,
                &[BoundingBox::new(100, 100, 10, 10), BoundingBox::new(0, 0, 5, 5)],
            )
            .unwrap();
        assert_eq!(ids, vec![Identity::Unknown, Identity::Known(1)]);
    }

    #[test]
    fn test_identity_names_follow_gallery() {
        let recognizer = HistogramFaceRecognizer::new(&gallery(), DEFAULT_THRESHOLD);
        assert_eq!(recognizer.identity_names(), &["red", "blue"]);
    }
}
