//! Image generator trait and shared types.
//!
//! Every implementation must honor two rules:
//!
//! 1. **Idempotent**: if the deterministic filename already exists in the
//!    images directory, return it without doing any work.
//! 2. **Contained**: failures come back as [`GeneratorError`], never as a
//!    panic. Callers treat every error as "unavailable" for that item.

use crate::naming::image_filename;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Image generation unavailable: {0}")]
    Unavailable(String),
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Produces a cached image for a `(label, category)` pair.
pub trait ImageGenerator: Send + Sync {
    /// Generate (or reuse) the image and return its bare filename.
    fn generate(&self, label: &str, category: &str) -> Result<String, GeneratorError>;

    /// Whether calls can succeed at all. `false` means every call that
    /// would need new work returns [`GeneratorError::Unavailable`].
    fn is_available(&self) -> bool {
        true
    }
}

/// Return the deterministic filename if it is already present in `images_dir`.
pub fn existing_image(images_dir: &Path, label: &str, category: &str) -> Option<String> {
    let filename = image_filename(label, category);
    images_dir.join(&filename).is_file().then_some(filename)
}

/// Generator used when no backend is configured.
///
/// Still honors idempotence through the images directory, so items whose
/// images were produced earlier keep resolving.
#[derive(Debug, Clone)]
pub struct DisabledGenerator {
    images_dir: PathBuf,
    reason: String,
}

impl DisabledGenerator {
    pub fn new(images_dir: &Path, reason: impl Into<String>) -> Self {
        Self {
            images_dir: images_dir.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl ImageGenerator for DisabledGenerator {
    fn generate(&self, label: &str, category: &str) -> Result<String, GeneratorError> {
        existing_image(&self.images_dir, label, category)
            .ok_or_else(|| GeneratorError::Unavailable(self.reason.clone()))
    }

    fn is_available(&self) -> bool {
        false
    }
}
