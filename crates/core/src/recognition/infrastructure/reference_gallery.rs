use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::recognition::domain::identity::Identity;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("reference directory {0} does not exist")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode reference image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("reference directory {0} contains no people")]
    Empty(PathBuf),
    #[error("{person} has {found} reference images, {required} required")]
    TooFewImages {
        person: String,
        found: usize,
        required: usize,
    },
}

/// One reference image, tightly cropped to a face.
#[derive(Clone, Debug)]
pub struct ReferenceFace {
    pub identity: Identity,
    pub image: Frame,
}

/// Known people loaded from `root/<person>/<image>`.
///
/// People are numbered from 1 in sorted directory order, so the mapping
/// from index to name is stable across runs.
#[derive(Clone, Debug)]
pub struct ReferenceGallery {
    names: Vec<String>,
    faces: Vec<ReferenceFace>,
}

impl ReferenceGallery {
    /// Loads the first `faces_per_identity` images (sorted by file name) of
    /// every person directory under `root`.
    pub fn load(root: &Path, faces_per_identity: usize) -> Result<Self, GalleryError> {
        if !root.is_dir() {
            return Err(GalleryError::NotFound(root.to_path_buf()));
        }
        let mut names = Vec::new();
        let mut faces = Vec::new();

        for (i, person_dir) in sorted_entries(root, |p| p.is_dir())?.iter().enumerate() {
            let identity = Identity::Known(i as u32 + 1);
            let name = person_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let images = sorted_entries(person_dir, is_image_file)?;
            if images.len() < faces_per_identity {
                return Err(GalleryError::TooFewImages {
                    person: name,
                    found: images.len(),
                    required: faces_per_identity,
                });
            }
            for path in images.iter().take(faces_per_identity) {
                faces.push(ReferenceFace {
                    identity,
                    image: load_rgb(path)?,
                });
            }
            log::debug!("Loaded {faces_per_identity} reference images for {name} as {identity}");
            names.push(name);
        }

        if names.is_empty() {
            return Err(GalleryError::Empty(root.to_path_buf()));
        }
        log::info!("Reference gallery: {} people from {}", names.len(), root.display());
        Ok(Self { names, faces })
    }

    /// Builds a gallery from in-memory faces.
    pub fn from_faces(names: Vec<String>, faces: Vec<ReferenceFace>) -> Self {
        Self { names, faces }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn faces(&self) -> &[ReferenceFace] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>, GalleryError> {
    let io_err = |source| GalleryError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if keep(&path) {
            entries.push(path);
        }
    }
    entries.sort();
    Ok(entries)
}

fn is_image_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn load_rgb(path: &Path) -> Result<Frame, GalleryError> {
    let rgb = image::open(path)
        .map_err(|source| GalleryError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::new(rgb.into_raw(), width, height, 3, 0))
}
