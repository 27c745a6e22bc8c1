use crate::shared::frame::Frame;
use crate::shared::region::BoundingBox;

/// Area of the frame that differs from the background enough to be worth
/// running the face detector on.
#[derive(Clone, Debug)]
pub struct CandidateRegion {
    /// Crop of the original (color) frame.
    pub pixels: Frame,
    /// Location of the crop in frame coordinates.
    pub bounding_box: BoundingBox,
}
