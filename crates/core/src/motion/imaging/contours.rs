use std::collections::VecDeque;

use ndarray::Array2;

use crate::shared::region::BoundingBox;

/// Moore neighborhood offsets, clockwise starting east (y grows downward).
const DX: [i32; 8] = [1, 1, 0, -1, -1, -1, 0, 1];
const DY: [i32; 8] = [0, 1, 1, 1, 0, -1, -1, -1];

/// Direction index pointing west, the guaranteed-background neighbor of a
/// component's first pixel in raster order.
const WEST: usize = 4;

/// Outer boundary of one 8-connected blob, as pixel coordinates `(x, y)`
/// in tracing order.
#[derive(Clone, Debug, PartialEq)]
pub struct Contour {
    points: Vec<(i32, i32)>,
}

impl Contour {
    /// Smallest upright rectangle containing every boundary pixel.
    pub fn bounding_rect(&self) -> BoundingBox {
        let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
        let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
        for &(x, y) in &self.points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        BoundingBox::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
    }

    /// Polygon area enclosed by the boundary pixel centers (shoelace).
    ///
    /// A filled `w x h` rectangle measures `(w - 1) * (h - 1)`; lines and
    /// single pixels measure zero.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let (x0, y0) = self.points[i];
                let (x1, y1) = self.points[(i + 1) % n];
                x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64
            })
            .sum();
        twice.abs() as f64 / 2.0
    }
}

/// Finds the outer contour of every 8-connected blob in `mask`.
///
/// Contours come back in raster order of each blob's top-left-most pixel.
/// Holes are not reported.
pub fn find_external_contours(mask: &Array2<bool>) -> Vec<Contour> {
    let (height, width) = mask.dim();
    let mut visited = Array2::from_elem((height, width), false);
    let mut contours = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if !mask[[y, x]] || visited[[y, x]] {
                continue;
            }
            mark_component(mask, &mut visited, x, y);
            contours.push(trace_boundary(mask, x as i32, y as i32));
        }
    }
    contours
}

fn is_set(mask: &Array2<bool>, x: i32, y: i32) -> bool {
    let (height, width) = mask.dim();
    x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height && mask[[y as usize, x as usize]]
}

fn mark_component(mask: &Array2<bool>, visited: &mut Array2<bool>, x: usize, y: usize) {
    let mut queue = VecDeque::from([(x as i32, y as i32)]);
    visited[[y, x]] = true;
    while let Some((cx, cy)) = queue.pop_front() {
        for d in 0..8 {
            let (nx, ny) = (cx + DX[d], cy + DY[d]);
            if is_set(mask, nx, ny) && !visited[[ny as usize, nx as usize]] {
                visited[[ny as usize, nx as usize]] = true;
                queue.push_back((nx, ny));
            }
        }
    }
}

/// Moore-neighbor tracing with Jacob's stopping criterion.
fn trace_boundary(mask: &Array2<bool>, sx: i32, sy: i32) -> Contour {
    let start = (sx, sy);
    let mut points = vec![start];
    let mut current = start;
    let mut back_dir = WEST;
    let mut first_move: Option<usize> = None;
    let max_steps = 4 * mask.len() + 8;

    for _ in 0..max_steps {
        let next_dir = (1..=8)
            .map(|i| (back_dir + i) % 8)
            .find(|&d| is_set(mask, current.0 + DX[d], current.1 + DY[d]));
        let Some(dir) = next_dir else {
            break; // isolated pixel
        };

        if current == start {
            match first_move {
                Some(first) if first == dir => break,
                None => first_move = Some(dir),
                _ => {}
            }
        }

        current = (current.0 + DX[dir], current.1 + DY[dir]);
        points.push(current);
        // Last background neighbor checked, expressed relative to the new pixel.
        back_dir = (dir + 6 - dir % 2) % 8;
    }

    if points.len() > 1 && points.last() == Some(&start) {
        points.pop();
    }
    Contour { points }
}
