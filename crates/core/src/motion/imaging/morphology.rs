use ndarray::{Array2, Zip};

/// Per-pixel `|a - b|`. Both planes must share a shape.
pub fn abs_diff(a: &Array2<u8>, b: &Array2<u8>) -> Array2<u8> {
    debug_assert_eq!(a.dim(), b.dim(), "planes must share a shape");
    Zip::from(a).and(b).map_collect(|&x, &y| x.abs_diff(y))
}

/// Binary mask of pixels strictly greater than `thresh`.
pub fn threshold(plane: &Array2<u8>, thresh: u8) -> Array2<bool> {
    plane.mapv(|v| v > thresh)
}

/// Dilation with a 3x3 square structuring element, applied `iterations`
/// times. Pixels outside the plane count as unset.
pub fn dilate(mask: &Array2<bool>, iterations: usize) -> Array2<bool> {
    let (height, width) = mask.dim();
    let mut current = mask.clone();
    for _ in 0..iterations {
        let mut next = Array2::from_elem((height, width), false);
        for y in 0..height {
            for x in 0..width {
                if !current[[y, x]] {
                    continue;
                }
                let y0 = y.saturating_sub(1);
                let x0 = x.saturating_sub(1);
                let y1 = (y + 1).min(height - 1);
                let x1 = (x + 1).min(width - 1);
                for ny in y0..=y1 {
                    for nx in x0..=x1 {
                        next[[ny, nx]] = true;
                    }
                }
            }
        }
        current = next;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abs_diff_is_symmetric() {
        let a = Array2::from_shape_vec((1, 3), vec![10u8, 200, 50]).unwrap();
        let b = Array2::from_shape_vec((1, 3), vec![30u8, 100, 50]).unwrap();
        assert_eq!(abs_diff(&a, &b), abs_diff(&b, &a));
        let diff: Vec<u8> = abs_diff(&a, &b).iter().copied().collect();
        assert_eq!(diff, vec![20, 100, 0]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let plane = Array2::from_shape_vec((1, 3), vec![14u8, 15, 16]).unwrap();
        let mask = threshold(&plane, 15);
        let flags: Vec<bool> = mask.iter().copied().collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn test_dilate_grows_single_pixel() {
        let mut mask = Array2::from_elem((7, 7), false);
        mask[[3, 3]] = true;
        let once = dilate(&mask, 1);
        assert_eq!(once.iter().filter(|&&v| v).count(), 9);
        let twice = dilate(&mask, 2);
        assert_eq!(twice.iter().filter(|&&v| v).count(), 25);
    }

    #[test]
    fn test_dilate_clips_at_border() {
        let mut mask = Array2::from_elem((4, 4), false);
        mask[[0, 0]] = true;
        let out = dilate(&mask, 1);
        assert_eq!(out.iter().filter(|&&v| v).count(), 4);
    }

    #[test]
    fn test_dilate_zero_iterations_is_identity() {
        let mut mask = Array2::from_elem((3, 3), false);
        mask[[1, 2]] = true;
        assert_eq!(dilate(&mask, 0), mask);
    }
}
