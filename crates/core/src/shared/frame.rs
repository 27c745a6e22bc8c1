use image::imageops::FilterType;
use ndarray::{Array2, ArrayView3};

use crate::shared::region::BoundingBox;

/// A single camera/video frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the detection and
/// recognition layers treat pixel data as opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (
                self.height as usize,
                self.width as usize,
                self.channels as usize,
            ),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    /// Luma plane using the BT.601 weights (0.299 R + 0.587 G + 0.114 B).
    ///
    /// Single-channel frames are copied as-is; an alpha channel is ignored.
    pub fn to_gray(&self) -> Array2<u8> {
        let h = self.height as usize;
        let w = self.width as usize;
        let c = self.channels as usize;
        if c == 1 {
            return Array2::from_shape_vec((h, w), self.data.clone())
                .expect("Frame data length must match dimensions");
        }
        let luma: Vec<u8> = self
            .data
            .chunks_exact(c)
            .map(|px| {
                let y = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
                y.round().clamp(0.0, 255.0) as u8
            })
            .collect();
        Array2::from_shape_vec((h, w), luma).expect("Frame data length must match dimensions")
    }

    /// Copies the pixels inside `rect`, clipped to the frame.
    ///
    /// Returns `None` when the clipped rectangle is empty.
    pub fn crop(&self, rect: &BoundingBox) -> Option<Frame> {
        let clipped = rect.clamp_to(self.width, self.height)?;
        let c = self.channels as usize;
        let fw = self.width as usize;
        let (x, y) = (clipped.x as usize, clipped.y as usize);
        let (w, h) = (clipped.width as usize, clipped.height as usize);

        let mut pixels = Vec::with_capacity(w * h * c);
        for row in y..y + h {
            let start = (row * fw + x) * c;
            pixels.extend_from_slice(&self.data[start..start + w * c]);
        }
        Some(Frame::new(pixels, w as u32, h as u32, self.channels, self.index))
    }

    /// Rescales the frame to `target_width`, preserving aspect ratio.
    ///
    /// Frames already at the target width are returned unchanged.
    pub fn resize_to_width(self, target_width: u32) -> Frame {
        if self.width == target_width || self.width == 0 || target_width == 0 {
            return self;
        }
        let target_height =
            ((self.height as f64 * target_width as f64 / self.width as f64).round() as u32).max(1);
        let index = self.index;
        let channels = self.channels;

        let data = match channels {
            1 => {
                let img = image::GrayImage::from_raw(self.width, self.height, self.data)
                    .expect("Frame data length must match dimensions");
                image::imageops::resize(&img, target_width, target_height, FilterType::Triangle)
                    .into_raw()
            }
            4 => {
                let img = image::RgbaImage::from_raw(self.width, self.height, self.data)
                    .expect("Frame data length must match dimensions");
                image::imageops::resize(&img, target_width, target_height, FilterType::Triangle)
                    .into_raw()
            }
            _ => {
                let img = image::RgbImage::from_raw(self.width, self.height, self.data)
                    .expect("Frame data length must match dimensions");
                image::imageops::resize(&img, target_width, target_height, FilterType::Triangle)
                    .into_raw()
            }
        };
        Frame::new(data, target_width, target_height, channels, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        let mut data = vec![0u8; 12];
        data[6] = 255; // row=1, col=0, R
        let frame = Frame::new(data, 2, 2, 3, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 2, 3]);
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
    }

    #[test]
    fn test_to_gray_weights() {
        // red, green, blue, white
        let data = vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        let frame = Frame::new(data, 2, 2, 3, 0);
        let gray = frame.to_gray();
        assert_eq!(gray.dim(), (2, 2));
        assert_eq!(gray[[0, 0]], 76);
        assert_eq!(gray[[0, 1]], 150);
        assert_eq!(gray[[1, 0]], 29);
        assert_eq!(gray[[1, 1]], 255);
    }

    #[test]
    fn test_to_gray_single_channel_passthrough() {
        let frame = Frame::new(vec![1, 2, 3, 4, 5, 6], 3, 2, 1, 0);
        let gray = frame.to_gray();
        assert_eq!(gray[[1, 2]], 6);
    }

    #[test]
    fn test_crop_copies_rows() {
        // 4x3 single-channel frame with value = row * 10 + col
        let data: Vec<u8> = (0..3)
            .flat_map(|r| (0..4).map(move |c| (r * 10 + c) as u8))
            .collect();
        let frame = Frame::new(data, 4, 3, 1, 7);
        let crop = frame.crop(&BoundingBox::new(1, 1, 2, 2)).unwrap();
        assert_eq!(crop.width(), 2);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.index(), 7);
        assert_eq!(crop.data(), &[11, 12, 21, 22]);
    }

    #[test]
    fn test_crop_clips_to_frame() {
        let frame = Frame::new(vec![0u8; 10 * 10 * 3], 10, 10, 3, 0);
        let crop = frame.crop(&BoundingBox::new(-5, 8, 10, 10)).unwrap();
        assert_eq!(crop.width(), 5);
        assert_eq!(crop.height(), 2);
    }

    #[test]
    fn test_crop_outside_frame_is_none() {
        let frame = Frame::new(vec![0u8; 10 * 10 * 3], 10, 10, 3, 0);
        assert!(frame.crop(&BoundingBox::new(20, 20, 5, 5)).is_none());
    }

    #[test]
    fn test_resize_to_width_preserves_aspect() {
        let frame = Frame::new(vec![90u8; 1000 * 500 * 3], 1000, 500, 3, 3);
        let resized = frame.resize_to_width(500);
        assert_eq!(resized.width(), 500);
        assert_eq!(resized.height(), 250);
        assert_eq!(resized.index(), 3);
        assert!(resized.data().iter().all(|&v| v == 90));
    }

    #[test]
    fn test_resize_same_width_is_noop() {
        let frame = Frame::new(vec![1u8; 20 * 10 * 3], 20, 10, 3, 0);
        let resized = frame.resize_to_width(20);
        assert_eq!(resized.height(), 10);
    }
}
