use crate::shared::frame::Frame;
use crate::shared::region::BoundingBox;

/// Domain interface for face detection.
///
/// Boxes are returned in the coordinate space of the frame passed in, which
/// may be a crop of a larger frame. Implementations may hold inference
/// sessions, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}
