/// ArcFace embedding recognizer using ONNX Runtime.
///
/// Every reference image is embedded once at startup. A detected face votes
/// for each reference it resembles by cosine similarity and the identity
/// with the most votes wins.
use std::path::Path;

use crate::detection::infrastructure::onnx_session::build_session;
use crate::recognition::domain::face_recognizer::FaceRecognizer;
use crate::recognition::domain::identity::{most_common_identity, Identity};
use crate::shared::frame::Frame;
use crate::shared::region::BoundingBox;

use super::reference_gallery::ReferenceGallery;

pub const DEFAULT_THRESHOLD: f64 = 0.4;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct EmbeddingFaceRecognizer {
    session: ort::session::Session,
    threshold: f64,
    references: Vec<(Identity, Vec<f32>)>,
    names: Vec<String>,
}

impl EmbeddingFaceRecognizer {
    pub fn new(
        model_path: &Path,
        gallery: &ReferenceGallery,
        threshold: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut recognizer = Self {
            session: build_session(model_path)?,
            threshold,
            references: Vec::with_capacity(gallery.faces().len()),
            names: gallery.names().to_vec(),
        };
        for face in gallery.faces() {
            let embedding = recognizer.embed(&face.image)?;
            recognizer.references.push((face.identity, embedding));
        }
        log::info!(
            "Embedded {} reference faces for {} people",
            recognizer.references.len(),
            recognizer.names.len()
        );
        Ok(recognizer)
    }

    fn embed(&mut self, face: &Frame) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let input_value = ort::value::Tensor::from_array(preprocess(face))?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding_slice = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?;

        let mut embedding = embedding_slice.to_vec();
        l2_normalize(&mut embedding);
        Ok(embedding)
    }
}

impl FaceRecognizer for EmbeddingFaceRecognizer {
    fn encode_and_match(
        &mut self,
        frame: &Frame,
        faces: &[BoundingBox],
    ) -> Result<Vec<Identity>, Box<dyn std::error::Error>> {
        let mut identities = Vec::with_capacity(faces.len());
        for face in faces {
            let identity = match frame.crop(face) {
                Some(crop) => {
                    let embedding = self.embed(&crop)?;
                    match_embedding(&embedding, &self.references, self.threshold)
                }
                None => Identity::Unknown,
            };
            identities.push(identity);
        }
        Ok(identities)
    }

    fn identity_names(&self) -> &[String] {
        &self.names
    }
}

/// Votes among references whose similarity reaches `threshold`.
fn match_embedding(embedding: &[f32], references: &[(Identity, Vec<f32>)], threshold: f64) -> Identity {
    let matches: Vec<Identity> = references
        .iter()
        .filter(|(_, reference)| cosine_similarity(embedding, reference) >= threshold)
        .map(|(identity, _)| *identity)
        .collect();
    most_common_identity(&matches)
}

/// Resize crop to 112x112, normalize, NCHW layout.
fn preprocess(face: &Frame) -> ndarray::Array4<f32> {
    let src = face.as_ndarray();
    let src_w = face.width() as usize;
    let src_h = face.height() as usize;
    let gray = face.channels() < 3;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    if src_w == 0 || src_h == 0 {
        return tensor;
    }

    for y in 0..INPUT_SIZE {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / INPUT_SIZE as f64) as usize).min(src_h - 1);
        for x in 0..INPUT_SIZE {
            let src_x =
                (((x as f64 + 0.5) * src_w as f64 / INPUT_SIZE as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                let sc = if gray { 0 } else { c };
                tensor[[0, c, y, x]] = (src[[src_y, src_x, sc]] as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }

    tensor
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Dot product of L2-normalized vectors equals cosine similarity.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum()
}
