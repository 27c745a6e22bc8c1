/// Properties of an opened frame source.
///
/// Live sources (cameras, network streams) report `total_frames: None`;
/// `fps` is 0.0 when the container does not declare a rate.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: Option<usize>,
    pub source: String,
}

impl VideoMetadata {
    pub fn is_live(&self) -> bool {
        self.total_frames.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_source_is_not_live() {
        let meta = VideoMetadata {
            width: 1920,
            height: 1080,
            fps: 30.0,
            total_frames: Some(900),
            source: "/tmp/test.mp4".to_string(),
        };
        assert!(!meta.is_live());
        assert_eq!(meta.total_frames, Some(900));
    }

    #[test]
    fn test_stream_is_live() {
        let meta = VideoMetadata {
            width: 640,
            height: 480,
            fps: 0.0,
            total_frames: None,
            source: "http://camera.local:2067/html/cam_pic_new.php".to_string(),
        };
        assert!(meta.is_live());
    }
}
