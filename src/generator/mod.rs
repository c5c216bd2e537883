//! Image generation for food items without a picture.
//!
//! The generator is an external collaborator with a narrow contract: given a
//! food label and its dining hall, either leave a PNG named
//! [`image_filename(label, category)`](crate::naming::image_filename) in the
//! images directory or report that it couldn't.
//!
//! The module is split into:
//! - **Backend**: [`ImageGenerator`] trait + [`DisabledGenerator`]
//! - **OpenAI**: [`OpenAiGenerator`], an OpenAI-compatible images API client
//! - **Stats**: [`GenerationStats`] for batch runs
//!
//! Which implementation runs is decided once at startup by [`from_config`].
//! A missing API key is a construction-time fact, not a per-call check.

pub mod backend;
pub mod openai;
mod stats;

pub use backend::{DisabledGenerator, GeneratorError, ImageGenerator, existing_image};
pub use openai::OpenAiGenerator;
pub use stats::GenerationStats;

use crate::config::ServiceConfig;
use std::sync::Arc;
use tracing::{info, warn};

/// Build the generator capability for this process.
///
/// Falls back to [`DisabledGenerator`] when generation is switched off, no
/// API key is available, or the HTTP client can't be constructed.
pub fn from_config(config: &ServiceConfig, api_key: Option<String>) -> Arc<dyn ImageGenerator> {
    if !config.generator.enabled {
        info!("image generation disabled in config");
        return Arc::new(DisabledGenerator::new(&config.images.dir, "disabled in config"));
    }
    let Some(api_key) = api_key else {
        return Arc::new(DisabledGenerator::new(&config.images.dir, "no API key configured"));
    };
    match OpenAiGenerator::new(&config.generator, &config.images.dir, api_key) {
        Ok(generator) => {
            info!(model = %config.generator.model, "image generation enabled");
            Arc::new(generator)
        }
        Err(e) => {
            warn!(error = %e, "failed to build image generator, generation disabled");
            Arc::new(DisabledGenerator::new(&config.images.dir, "client construction failed"))
        }
    }
}
