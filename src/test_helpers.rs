//! Shared test utilities for the dining-catalog test suite.
//!
//! Builds throwaway service layouts inside a temp directory:
//!
//! ```text
//! <tmp>/
//! ├── dataset/foods.csv
//! └── images/
//! ```
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let config = test_config(tmp.path());
//! write_dataset(tmp.path(), "name,diningHall,calories\nPizza,Gordon,450\n");
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{ImagesConfig, ServiceConfig};
use crate::types::RawItem;

/// Relative location of the dataset inside a test root.
pub const DATASET_PATH: &str = "dataset/foods.csv";

// =========================================================================
// Fixture setup
// =========================================================================

/// Images config rooted at `<root>/images`, with the directory created.
pub fn test_images_config(root: &Path) -> ImagesConfig {
    let dir = root.join("images");
    fs::create_dir_all(&dir).unwrap();
    ImagesConfig {
        dir,
        ..ImagesConfig::default()
    }
}

/// Full service config pointing at `<root>/dataset/foods.csv` and `<root>/images`.
///
/// Generation is left enabled in config; tests pick the generator they want.
pub fn test_config(root: &Path) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.dataset.path = root.join(DATASET_PATH);
    config.images = test_images_config(root);
    config.processing.max_workers = Some(2);
    config
}

/// Write `contents` as the dataset under `root` and return its path.
pub fn write_dataset(root: &Path, contents: &str) -> PathBuf {
    let path = root.join(DATASET_PATH);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

/// Drop a stub image into the images directory.
pub fn write_image(config: &ServiceConfig, filename: &str) -> PathBuf {
    let path = config.images.dir.join(filename);
    fs::write(&path, b"\x89PNG\r\n\x1a\nstub").unwrap();
    path
}

// =========================================================================
// Record builders
// =========================================================================

pub fn raw_item(name: &str, dining_hall: &str, calories: u32, image_path: Option<&str>) -> RawItem {
    RawItem {
        name: name.to_string(),
        dining_hall: dining_hall.to_string(),
        calories,
        image_path: image_path.map(String::from),
    }
}
