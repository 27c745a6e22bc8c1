//! Candidate boxes shared by the ONNX detectors and greedy non-maximum
//! suppression over them.

use crate::shared::region::BoundingBox;

/// Decoded detector output in input-image coordinates (corner form).
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub score: f64,
}

impl ScoredBox {
    /// Rounds to pixel coordinates clipped to a `width x height` image.
    /// Returns `None` when nothing of the box is left.
    pub fn to_bounding_box(&self, width: u32, height: u32) -> Option<BoundingBox> {
        let left = self.x1.round() as i32;
        let top = self.y1.round() as i32;
        let right = self.x2.round() as i32;
        let bottom = self.y2.round() as i32;
        BoundingBox::from_edges(top, right, bottom, left).clamp_to(width, height)
    }
}

/// Greedy NMS: sort by score descending, suppress boxes overlapping a kept
/// box by more than `iou_thresh`.
pub fn nms(dets: &mut [ScoredBox], iou_thresh: f64) -> Vec<ScoredBox> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && iou(&dets[i], &dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

pub fn iou(a: &ScoredBox, b: &ScoredBox) -> f64 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scored(x1: f64, y1: f64, x2: f64, y2: f64, score: f64) -> ScoredBox {
        ScoredBox {
            x1,
            y1,
            x2,
            y2,
            score,
        }
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let mut dets = vec![
            scored(0.0, 0.0, 100.0, 100.0, 0.9),
            scored(5.0, 5.0, 105.0, 105.0, 0.8),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_nms_keeps_non_overlapping() {
        let mut dets = vec![
            scored(0.0, 0.0, 50.0, 50.0, 0.9),
            scored(200.0, 200.0, 250.0, 250.0, 0.8),
        ];
        assert_eq!(nms(&mut dets, 0.3).len(), 2);
    }

    #[test]
    fn test_nms_prefers_higher_score_regardless_of_order() {
        let mut dets = vec![
            scored(0.0, 0.0, 100.0, 100.0, 0.5),
            scored(2.0, 2.0, 102.0, 102.0, 0.9),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_nms_empty_input() {
        let mut dets: Vec<ScoredBox> = Vec::new();
        assert!(nms(&mut dets, 0.3).is_empty());
    }

    #[test]
    fn test_iou_identical_and_disjoint() {
        let a = scored(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = scored(20.0, 20.0, 30.0, 30.0, 1.0);
        assert_relative_eq!(iou(&a, &a), 1.0);
        assert_relative_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn test_to_bounding_box_clips_to_image() {
        let b = scored(-4.6, 10.2, 30.4, 80.0, 0.9);
        assert_eq!(b.to_bounding_box(25, 60), Some(BoundingBox::new(0, 10, 25, 50)));
    }

    #[test]
    fn test_to_bounding_box_outside_image_is_none() {
        let b = scored(100.0, 100.0, 120.0, 120.0, 0.9);
        assert_eq!(b.to_bounding_box(50, 50), None);
    }
}
