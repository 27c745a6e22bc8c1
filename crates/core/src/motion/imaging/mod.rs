//! Single-channel image operations used by motion analysis.
//!
//! All functions operate on `ndarray::Array2` planes indexed `[[row, col]]`.

pub mod contours;
pub mod gaussian;
pub mod morphology;
