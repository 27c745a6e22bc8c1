use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Produces frames from a camera, stream, video file or image sequence.
///
/// The location is fixed when the source is constructed; `open` connects
/// to it and reports what it found.
pub trait FrameSource: Send {
    /// Opens the source and returns its metadata.
    fn open(&mut self) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames in capture order. Live sources never
    /// end on their own.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the source.
    fn close(&mut self);
}
