use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::FrameSource;

/// Plays a directory of still images (or a single image) as a recorded clip.
///
/// Images are taken in file-name order and decoded lazily with the `image`
/// crate. Useful for replaying captured frames through the pipeline.
pub struct ImageSequenceSource {
    path: PathBuf,
    fps: f64,
    files: Vec<PathBuf>,
}

impl ImageSequenceSource {
    pub fn new(path: impl Into<PathBuf>, fps: f64) -> Self {
        Self {
            path: path.into(),
            fps,
            files: Vec::new(),
        }
    }

    /// Returns true when `path` is something this source can play.
    pub fn accepts(path: &Path) -> bool {
        path.is_dir() || is_image_file(path)
    }
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        self.files = if self.path.is_dir() {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(&self.path)? {
                let path = entry?.path();
                if is_image_file(&path) {
                    files.push(path);
                }
            }
            files.sort();
            files
        } else if is_image_file(&self.path) {
            vec![self.path.clone()]
        } else {
            Vec::new()
        };

        let first = self
            .files
            .first()
            .ok_or_else(|| format!("No images found at {}", self.path.display()))?;
        let (width, height) = image::image_dimensions(first)?;

        log::info!(
            "Opened {} images from {} ({}x{})",
            self.files.len(),
            self.path.display(),
            width,
            height
        );
        Ok(VideoMetadata {
            width,
            height,
            fps: self.fps,
            total_frames: Some(self.files.len()),
            source: self.path.display().to_string(),
        })
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        Box::new(self.files.iter().enumerate().map(|(index, path)| {
            let rgb = image::open(path)
                .map_err(|e| format!("Failed to decode {}: {e}", path.display()))?
                .to_rgb8();
            let (width, height) = rgb.dimensions();
            Ok(Frame::new(rgb.into_raw(), width, height, 3, index))
        }))
    }

    fn close(&mut self) {
        self.files.clear();
    }
}

fn is_image_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_image(path: &Path, value: u8) {
        image::RgbImage::from_pixel(16, 12, image::Rgb([value, value, value]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_directory_plays_in_name_order() {
        let tmp = TempDir::new().unwrap();
        write_image(&tmp.path().join("002.png"), 200);
        write_image(&tmp.path().join("000.png"), 0);
        write_image(&tmp.path().join("001.png"), 100);
        std::fs::write(tmp.path().join("notes.txt"), "skip me").unwrap();

        let mut source = ImageSequenceSource::new(tmp.path(), 10.0);
        let meta = source.open().unwrap();
        assert_eq!((meta.width, meta.height), (16, 12));
        assert_eq!(meta.total_frames, Some(3));
        assert_eq!(meta.fps, 10.0);

        let frames: Vec<Frame> = source.frames().map(|f| f.unwrap()).collect();
        let firsts: Vec<u8> = frames.iter().map(|f| f.data()[0]).collect();
        assert_eq!(firsts, vec![0, 100, 200]);
        let indices: Vec<usize> = frames.iter().map(Frame::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_single_image_is_one_frame() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("still.png");
        write_image(&path, 42);

        let mut source = ImageSequenceSource::new(&path, 0.0);
        let meta = source.open().unwrap();
        assert_eq!(meta.total_frames, Some(1));
        assert_eq!(source.frames().count(), 1);
    }

    #[test]
    fn test_empty_directory_fails_to_open() {
        let tmp = TempDir::new().unwrap();
        let mut source = ImageSequenceSource::new(tmp.path(), 10.0);
        assert!(source.open().is_err());
    }

    #[test]
    fn test_corrupt_image_yields_error_item() {
        let tmp = TempDir::new().unwrap();
        write_image(&tmp.path().join("a.png"), 0);
        std::fs::write(tmp.path().join("b.png"), b"not a png").unwrap();

        let mut source = ImageSequenceSource::new(tmp.path(), 10.0);
        source.open().unwrap();
        let results: Vec<_> = source.frames().collect();
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_accepts() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("still.jpg");
        write_image(&path, 42);
        assert!(ImageSequenceSource::accepts(tmp.path()));
        assert!(ImageSequenceSource::accepts(&path));
        assert!(!ImageSequenceSource::accepts(Path::new("rtsp://cam/stream")));
    }
}
