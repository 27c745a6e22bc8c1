/// Axis-aligned rectangle in pixel coordinates: origin at the top-left
/// corner, `width`/`height` in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a box from `(top, right, bottom, left)` edges.
    pub fn from_edges(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Shifts the box by an origin offset, mapping a region-local box into
    /// the coordinate space of the enclosing frame.
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Intersection with the `[0, width) x [0, height)` frame, or `None`
    /// when nothing remains.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = self.right().min(width as i32);
        let y2 = self.bottom().min(height as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Self::new(x1, y1, x2 - x1, y2 - y1))
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_from_edges_measures_size_between_edges() {
        let b = BoundingBox::from_edges(20, 40, 60, 10);
        assert_eq!(b, BoundingBox::new(10, 20, 30, 40));
        assert_eq!((b.right(), b.bottom()), (40, 60));
    }

    #[test]
    fn test_translate_adds_region_origin() {
        let local = BoundingBox::new(5, 7, 20, 25);
        let framed = local.translate(100, 50);
        assert_eq!(framed, BoundingBox::new(105, 57, 20, 25));
    }

    #[test]
    fn test_area_of_negative_size_is_zero() {
        assert_eq!(BoundingBox::new(0, 0, -4, 10).area(), 0);
    }

    #[test]
    fn test_clamp_inside_is_identity() {
        let b = BoundingBox::new(2, 3, 4, 5);
        assert_eq!(b.clamp_to(100, 100), Some(b));
    }

    #[test]
    fn test_clamp_partially_outside() {
        let b = BoundingBox::new(-10, 90, 30, 30);
        assert_eq!(b.clamp_to(100, 100), Some(BoundingBox::new(0, 90, 20, 10)));
    }

    #[rstest]
    #[case::right_of_frame(BoundingBox::new(100, 0, 10, 10))]
    #[case::above_frame(BoundingBox::new(0, -20, 10, 10))]
    #[case::zero_width(BoundingBox::new(5, 5, 0, 10))]
    fn test_clamp_empty_is_none(#[case] b: BoundingBox) {
        assert!(b.clamp_to(100, 100).is_none());
    }
}
