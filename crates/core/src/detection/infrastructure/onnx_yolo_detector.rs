/// YOLO face detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, confidence filtering and NMS.
/// Any extra per-detection columns the model emits (pose keypoints) are
/// ignored.
use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;
use crate::shared::region::BoundingBox;

use super::nms::{nms, ScoredBox};
use super::onnx_session::{build_session, square_input_size};

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for face detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Letterbox padding value (YOLO convention).
const PAD_VALUE: f32 = 114.0 / 255.0;

/// YOLO face detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = build_session(model_path)?;
        let input_size = square_input_size(&session).unwrap_or(DEFAULT_INPUT_SIZE);
        log::info!("YOLO face detector ready (input {input_size}px, confidence {confidence})");
        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }
        let (input_tensor, geometry) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut candidates = decode_predictions(data, &shape, self.confidence, &geometry)?;
        let kept = nms(&mut candidates, NMS_IOU_THRESH);

        Ok(kept
            .iter()
            .filter_map(|d| d.to_bounding_box(frame.width(), frame.height()))
            .collect())
    }
}

/// How a frame was placed inside the square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn to_frame(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Parses a `[1, features, detections]` or `[1, detections, features]`
/// output whose rows start `[cx, cy, w, h, conf, ...]`.
fn decode_predictions(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
    geometry: &Letterbox,
) -> Result<Vec<ScoredBox>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 || data.len() < num_dets * num_feats {
        return Ok(Vec::new());
    }

    let value = |det: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_dets + det] as f64
        } else {
            data[det * num_feats + feat] as f64
        }
    };

    let mut boxes = Vec::new();
    for i in 0..num_dets {
        let conf = value(i, 4);
        if conf < confidence {
            continue;
        }
        let (cx, cy, w, h) = (value(i, 0), value(i, 1), value(i, 2), value(i, 3));
        let (x1, y1) = geometry.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = geometry.to_frame(cx + w / 2.0, cy + h / 2.0);
        boxes.push(ScoredBox {
            x1,
            y1,
            x2,
            y2,
            score: conf,
        });
    }
    Ok(boxes)
}

/// Letterbox-resize a frame to `target_size` × `target_size`, NCHW float32.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let mut tensor = ndarray::Array4::<f32>::from_elem(
        (1, 3, target_size as usize, target_size as usize),
        PAD_VALUE,
    );

    let src = frame.as_ndarray(); // [H, W, C] u8
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let gray = frame.channels() < 3;

    // Nearest-neighbor resize into the padded area
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                let sc = if gray { 0 } else { c };
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, sc]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 → scale 3.2, new 640x320, pad_y 160
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let (tensor, geometry) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(geometry.scale, 3.2, epsilon = 0.01);
        assert_eq!(geometry.pad_x, 0);
        assert_eq!(geometry.pad_y, 160);
    }

    #[test]
    fn test_letterbox_values_normalized_and_padded() {
        let frame = Frame::new(vec![255u8; 100 * 50 * 3], 100, 50, 3, 0);
        let (tensor, geometry) = letterbox(&frame, 640);

        let y = geometry.pad_y as usize + 1;
        assert_relative_eq!(tensor[[0, 0, y, 1]], 1.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], PAD_VALUE, epsilon = 0.01);
    }

    #[test]
    fn test_letterbox_accepts_grayscale() {
        let frame = Frame::new(vec![255u8; 64 * 64], 64, 64, 1, 0);
        let (tensor, _) = letterbox(&frame, 128);
        assert_relative_eq!(tensor[[0, 2, 10, 10]], 1.0, epsilon = 0.01);
    }

    #[test]
    fn test_decode_row_major_maps_back_through_letterbox() {
        let geometry = Letterbox {
            scale: 2.0,
            pad_x: 0,
            pad_y: 100,
        };
        // detections x features: 6 x 5, one confident row, one below threshold
        let mut data = vec![0.0f32; 6 * 5];
        data[..5].copy_from_slice(&[100.0, 200.0, 40.0, 60.0, 0.9]);
        data[5..10].copy_from_slice(&[10.0, 10.0, 5.0, 5.0, 0.1]);
        let boxes = decode_predictions(&data, &[1, 6, 5], 0.25, &geometry).unwrap();

        assert_eq!(boxes.len(), 1);
        assert_relative_eq!(boxes[0].x1, 40.0);
        assert_relative_eq!(boxes[0].y1, 35.0);
        assert_relative_eq!(boxes[0].x2, 60.0);
        assert_relative_eq!(boxes[0].y2, 65.0);
    }

    #[test]
    fn test_decode_transposed_layout() {
        let geometry = Letterbox {
            scale: 1.0,
            pad_x: 0,
            pad_y: 0,
        };
        // features x detections: 5 x 6, only detection 3 is confident
        let mut data = vec![0.0f32; 5 * 6];
        data[3] = 50.0; // cx
        data[6 + 3] = 50.0; // cy
        data[12 + 3] = 20.0; // w
        data[18 + 3] = 20.0; // h
        data[24 + 3] = 0.8; // conf
        let boxes = decode_predictions(&data, &[1, 5, 6], 0.25, &geometry).unwrap();

        assert_eq!(boxes.len(), 1);
        assert_relative_eq!(boxes[0].x1, 40.0);
        assert_relative_eq!(boxes[0].y2, 60.0);
    }

    #[test]
    fn test_decode_rejects_unexpected_rank() {
        let geometry = Letterbox {
            scale: 1.0,
            pad_x: 0,
            pad_y: 0,
        };
        assert!(decode_predictions(&[0.0; 5], &[5], 0.25, &geometry).is_err());
    }

    #[test]
    fn test_missing_model_fails_to_load() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(OnnxYoloDetector::new(&tmp.path().join("none.onnx"), DEFAULT_CONFIDENCE).is_err());
    }
}
