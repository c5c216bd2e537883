//! Image resolution for catalog items.
//!
//! Each item gets at most one image. Sources are tried in priority order and
//! the first match wins:
//!
//! 1. **Generated image**: `images/<food>_<hall>.png` already exists.
//! 2. **Row image**: `image_path` is usable (not blank, not `na`), the file
//!    exists and its bytes sniff as an image. A file already in the images
//!    directory is served under its own name. Anything else is copied in
//!    under a content-addressed name (`caesar-<sha256 prefix>.jpg`), so two
//!    sources never share a URL and an edited source gets a fresh one.
//! 3. **Generation**: `image_path` was given but names a missing file or one
//!    that isn't an image. The generator is asked for a new image.
//! 4. **Fallback**: a placeholder URL, or nothing, depending on
//!    [`Fallback`].
//!
//! Resolution is split in two halves so the pipeline can batch generator
//! calls: [`Resolver::plan`] only looks at the filesystem, and
//! [`Resolver::finish`] turns a plan plus the generator's answer into the
//! final [`ImageReference`]. [`Resolver::resolve`] runs both for one item.
//!
//! Every local reference names a file confirmed to exist in the images
//! directory at resolve time.

use crate::config::{Fallback, ImagesConfig};
use crate::generator::ImageGenerator;
use crate::naming::image_filename;
use crate::types::{ImageReference, RawItem};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Hex digits of the content hash kept in published filenames.
const HASH_PREFIX_LEN: usize = 12;

/// Filesystem-only decision for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Generated image already on disk.
    Generated(String),
    /// The row's own image, now present in the images directory.
    UserProvided(String),
    /// `image_path` names a file that isn't there or isn't an image; ask
    /// the generator.
    Generate { missing_path: String },
    /// No usable local image.
    Fallback,
}

impl Plan {
    pub fn needs_generation(&self) -> bool {
        matches!(self, Self::Generate { .. })
    }

    /// The unusable `image_path` behind a [`Plan::Generate`].
    pub fn missing_path(&self) -> Option<&str> {
        match self {
            Self::Generate { missing_path } => Some(missing_path),
            _ => None,
        }
    }
}

/// Applies the image priority policy against one images directory.
#[derive(Debug, Clone)]
pub struct Resolver {
    images_dir: PathBuf,
    mount: String,
    fallback: Fallback,
    placeholder_url: String,
}

impl Resolver {
    pub fn new(config: &ImagesConfig) -> Self {
        Self {
            images_dir: config.dir.clone(),
            mount: config.mount.clone(),
            fallback: config.fallback,
            placeholder_url: config.placeholder_url.clone(),
        }
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Decide what an item can get without calling the generator.
    pub fn plan(&self, item: &RawItem) -> Plan {
        let generated = image_filename(&item.name, &item.dining_hall);
        if self.images_dir.join(&generated).is_file() {
            return Plan::Generated(generated);
        }

        let Some(path) = item.usable_image_path() else {
            return Plan::Fallback;
        };
        let source = Path::new(path);
        if !source.is_file() {
            debug!(id = %item.id(), image_path = %path, "image path not found");
            return Plan::Generate {
                missing_path: path.to_string(),
            };
        }

        match self.publish(source) {
            Ok(filename) => Plan::UserProvided(filename),
            Err(e) => {
                warn!(id = %item.id(), image_path = %path, error = %e, "cannot use row image");
                Plan::Generate {
                    missing_path: path.to_string(),
                }
            }
        }
    }

    /// Turn a plan and the generator's answer into the item's image.
    ///
    /// `generated` is only consulted for [`Plan::Generate`]; `None` there
    /// means generation was unavailable and the fallback applies.
    pub fn finish(
        &self,
        item: &RawItem,
        plan: Plan,
        generated: Option<&str>,
    ) -> Option<ImageReference> {
        match plan {
            Plan::Generated(filename) => Some(self.generated_reference(filename)),
            Plan::UserProvided(filename) => Some(ImageReference::UserProvided {
                url: self.url_for(&filename),
                filename,
            }),
            Plan::Generate { .. } => match generated {
                Some(filename) if self.images_dir.join(filename).is_file() => {
                    Some(self.generated_reference(filename.to_string()))
                }
                _ => self.fallback(item),
            },
            Plan::Fallback => self.fallback(item),
        }
    }

    /// Resolve one item, calling the generator only when the plan needs it.
    pub fn resolve(
        &self,
        item: &RawItem,
        generator: &dyn ImageGenerator,
    ) -> Option<ImageReference> {
        let plan = self.plan(item);
        let generated = if plan.needs_generation() {
            generator
                .generate(&item.name, &item.dining_hall)
                .inspect_err(|e| warn!(id = %item.id(), error = %e, "image generation failed"))
                .ok()
        } else {
            None
        };
        self.finish(item, plan, generated.as_deref())
    }

    /// The reference an item gets when no local image exists.
    pub fn fallback(&self, item: &RawItem) -> Option<ImageReference> {
        match self.fallback {
            Fallback::Placeholder => Some(ImageReference::Placeholder {
                url: self.placeholder_url(&item.name),
            }),
            Fallback::None => None,
        }
    }

    pub fn placeholder_url(&self, food_name: &str) -> String {
        self.placeholder_url
            .replace("{query}", &food_name.replace(' ', "+"))
    }

    fn generated_reference(&self, filename: String) -> ImageReference {
        ImageReference::Generated {
            url: self.url_for(&filename),
            filename,
        }
    }

    fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.mount, filename)
    }

    /// Make `source` servable from the images directory and return its name.
    ///
    /// Fails with `InvalidData` when the bytes don't sniff as an image.
    fn publish(&self, source: &Path) -> io::Result<String> {
        let bytes = fs::read(source)?;
        let format = image::guess_format(&bytes)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "not an image"))?;

        if self.contains(source) {
            return source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| io::Error::other("image path has no file name"));
        }

        let filename = published_name(source, &bytes, format);
        let target = self.images_dir.join(&filename);
        if !target.is_file() {
            fs::create_dir_all(&self.images_dir)?;
            let partial = self.images_dir.join(format!(".{filename}.part"));
            fs::write(&partial, &bytes)?;
            fs::rename(&partial, &target)?;
            debug!(source = %source.display(), target = %target.display(), "copied row image");
        }
        Ok(filename)
    }

    /// Whether `path` sits directly in the images directory.
    fn contains(&self, path: &Path) -> bool {
        let parent = path.parent().map(|p| {
            if p.as_os_str().is_empty() {
                Path::new(".")
            } else {
                p
            }
        });
        match (parent.map(fs::canonicalize), fs::canonicalize(&self.images_dir)) {
            (Some(Ok(parent)), Ok(dir)) => parent == dir,
            _ => false,
        }
    }
}

/// `<stem>-<hash prefix>.<ext>` for a row image copied into the images
/// directory. The name changes whenever the content does.
fn published_name(source: &Path, bytes: &[u8], format: image::ImageFormat) -> String {
    let clean = |s: &str| -> String {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    };
    let stem = source
        .file_stem()
        .map(|s| clean(&s.to_string_lossy()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string());
    let ext = source
        .extension()
        .map(|e| clean(&e.to_string_lossy().to_lowercase()))
        .filter(|e| !e.is_empty())
        .or_else(|| format.extensions_str().first().map(|e| e.to_string()))
        .unwrap_or_else(|| "img".to_string());
    let digest = format!("{:x}", Sha256::digest(bytes));
    format!("{stem}-{}.{ext}", &digest[..HASH_PREFIX_LEN])
}
