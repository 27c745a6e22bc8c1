pub mod embedding_face_recognizer;
pub mod histogram_face_recognizer;
pub mod recognizer_factory;
pub mod reference_gallery;
