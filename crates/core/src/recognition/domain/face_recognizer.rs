use super::identity::Identity;
use crate::shared::frame::Frame;
use crate::shared::region::BoundingBox;

/// Domain interface for matching detected faces against known people.
pub trait FaceRecognizer: Send {
    /// Returns one identity per entry of `faces`, in the same order.
    /// `faces` are in `frame` coordinates.
    fn encode_and_match(
        &mut self,
        frame: &Frame,
        faces: &[BoundingBox],
    ) -> Result<Vec<Identity>, Box<dyn std::error::Error>>;

    /// Reference names in identity order: entry `i` names `Known(i + 1)`.
    fn identity_names(&self) -> &[String];
}
