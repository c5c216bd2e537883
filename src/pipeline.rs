//! Catalog load pipeline.
//!
//! Turns the dataset plus the images directory into the full set of
//! [`ResolvedItem`]s:
//!
//! ```text
//! dataset.csv ──read──▶ RawItem* ──plan──▶ Plan*
//!     ──generate (unique, parallel)──▶ finish ──▶ records
//! ```
//!
//! ## Generation batching
//!
//! Planning is filesystem-only. Rows whose plan needs the generator are
//! grouped by their deterministic image filename, and each filename is
//! generated exactly once, so two rows that normalize to the same name never
//! race on the same file. Unique filenames are generated in parallel on a
//! [rayon](https://docs.rs/rayon) pool capped by `processing.max_workers`.
//!
//! ## Events
//!
//! Every item produces one [`LoadEvent`], sent over an optional channel (for
//! CLI output) and logged as a structured `tracing` event keyed by item id.
//! Events are observations only; they never change what gets stored.
//!
//! ## Failure posture
//!
//! Only dataset-level errors abort a load. A bad row, a missing image path or
//! an unavailable generator degrade that one item and the load continues.

use crate::config::{ServiceConfig, effective_workers};
use crate::dataset::{DatasetError, read_dataset};
use crate::generator::{GenerationStats, GeneratorError, ImageGenerator};
use crate::naming::image_filename;
use crate::resolve::{Plan, Resolver};
use crate::types::{ImageReference, RawItem, ResolvedItem};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::Sender;
use tracing::{debug, info, warn};

/// How one item ended up with its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// A previously generated image was found on disk.
    Generated,
    /// The generator produced a new image during this load.
    NewlyGenerated,
    /// The row's own image file.
    UserProvided,
    /// Placeholder URL.
    Placeholder,
    /// No image.
    NoImage,
}

impl ItemOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::NewlyGenerated => "newly_generated",
            Self::UserProvided => "user",
            Self::Placeholder => "placeholder",
            Self::NoImage => "none",
        }
    }
}

/// Per-item record of a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadEvent {
    pub id: String,
    pub outcome: ItemOutcome,
    /// The row named a missing image and the generator could not replace it.
    pub generation_failed: bool,
    /// The row's `image_path` when it named a missing or non-image file.
    pub missing_path: Option<String>,
}

/// Counters for one load.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub rows: usize,
    pub generated: usize,
    pub newly_generated: usize,
    pub user_provided: usize,
    pub placeholder: usize,
    pub no_image: usize,
    pub generation_failed: usize,
}

impl LoadStats {
    fn record(&mut self, event: &LoadEvent) {
        self.rows += 1;
        match event.outcome {
            ItemOutcome::Generated => self.generated += 1,
            ItemOutcome::NewlyGenerated => self.newly_generated += 1,
            ItemOutcome::UserProvided => self.user_provided += 1,
            ItemOutcome::Placeholder => self.placeholder += 1,
            ItemOutcome::NoImage => self.no_image += 1,
        }
        if event.generation_failed {
            self.generation_failed += 1;
        }
    }
}

/// Result of a successful load.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Records keyed by id. Colliding ids keep the last row.
    pub items: BTreeMap<String, ResolvedItem>,
    pub stats: LoadStats,
}

/// Progress of a batch generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationEvent {
    pub label: String,
    pub category: String,
    pub filename: String,
    /// `Err` carries the generator's error message.
    pub result: Result<(), String>,
}

/// Run the full load: read, plan, generate, finish.
pub fn load(
    config: &ServiceConfig,
    generator: &dyn ImageGenerator,
    events: Option<Sender<LoadEvent>>,
) -> Result<LoadOutcome, DatasetError> {
    let rows = read_dataset(&config.dataset.path)?;
    info!(rows = rows.len(), path = %config.dataset.path.display(), "loaded dataset");

    let resolver = Resolver::new(&config.images);
    let plans: Vec<Plan> = rows.iter().map(|row| resolver.plan(row)).collect();

    let pending = unique_requests(
        rows.iter()
            .zip(&plans)
            .filter(|(_, plan)| plan.needs_generation())
            .map(|(row, _)| row),
    );
    let generated = generate_unique(config, generator, &pending);

    let mut outcome = LoadOutcome::default();
    for (row, plan) in rows.into_iter().zip(plans) {
        let needed_generation = plan.needs_generation();
        let fresh = needed_generation
            .then(|| generated.get(&image_filename(&row.name, &row.dining_hall)))
            .flatten()
            .and_then(|r| r.as_deref().ok());

        let from_disk = matches!(plan, Plan::Generated(_));
        let missing_path = plan.missing_path().map(String::from);
        let image = resolver.finish(&row, plan, fresh);
        let event = LoadEvent {
            id: row.id(),
            outcome: item_outcome(image.as_ref(), from_disk),
            generation_failed: needed_generation && fresh.is_none(),
            missing_path,
        };
        emit(&event, events.as_ref());
        outcome.stats.record(&event);

        let item = ResolvedItem::new(row, image);
        if let Some(previous) = outcome.items.insert(item.id.clone(), item) {
            debug!(id = %previous.id, "duplicate id, keeping the later row");
        }
    }

    info!(
        rows = outcome.stats.rows,
        items = outcome.items.len(),
        generated = outcome.stats.generated + outcome.stats.newly_generated,
        user = outcome.stats.user_provided,
        placeholder = outcome.stats.placeholder,
        none = outcome.stats.no_image,
        generation_failed = outcome.stats.generation_failed,
        "catalog resolved"
    );
    Ok(outcome)
}

/// Generate images for every dataset row that doesn't have one yet.
///
/// Unlike [`load`], this ignores `image_path`: every food gets a generated
/// image. Counts are per unique image filename.
pub fn generate_all(
    config: &ServiceConfig,
    generator: &dyn ImageGenerator,
    events: Option<Sender<GenerationEvent>>,
) -> Result<GenerationStats, DatasetError> {
    let rows = read_dataset(&config.dataset.path)?;
    let mut stats = GenerationStats::default();

    let mut pending = Vec::new();
    for (filename, row) in unique_requests(rows.iter()) {
        if config.images.dir.join(&filename).is_file() {
            stats.skipped();
        } else {
            pending.push((filename, row));
        }
    }
    info!(pending = pending.len(), skipped = stats.skipped, "starting image generation");

    let results = generate_unique(config, generator, &pending);
    for (filename, row) in &pending {
        let result = match results.get(filename) {
            Some(Ok(_)) => {
                stats.generated();
                Ok(())
            }
            Some(Err(e)) => {
                stats.error();
                Err(e.clone())
            }
            None => continue,
        };
        if let Some(tx) = &events {
            tx.send(GenerationEvent {
                label: row.name.clone(),
                category: row.dining_hall.clone(),
                filename: filename.clone(),
                result,
            })
            .ok();
        }
    }

    info!(%stats, "image generation finished");
    Ok(stats)
}

/// First row for every distinct image filename, in dataset order.
fn unique_requests<'a>(rows: impl Iterator<Item = &'a RawItem>) -> Vec<(String, &'a RawItem)> {
    let mut seen = std::collections::HashSet::new();
    rows.filter_map(|row| {
        let filename = image_filename(&row.name, &row.dining_hall);
        seen.insert(filename.clone()).then_some((filename, row))
    })
    .collect()
}

/// Call the generator once per filename on a bounded pool.
fn generate_unique(
    config: &ServiceConfig,
    generator: &dyn ImageGenerator,
    pending: &[(String, &RawItem)],
) -> HashMap<String, Result<String, String>> {
    if pending.is_empty() {
        return HashMap::new();
    }
    if !generator.is_available() {
        debug!(count = pending.len(), "generator unavailable, skipping generation");
        let reason = GeneratorError::Unavailable("no generator configured".into()).to_string();
        return pending
            .iter()
            .map(|(filename, _)| (filename.clone(), Err(reason.clone())))
            .collect();
    }

    let run = |(filename, row): &(String, &RawItem)| {
        let result = generator
            .generate(&row.name, &row.dining_hall)
            .map_err(|e| {
                warn!(id = %row.id(), error = %e, "image generation failed");
                e.to_string()
            });
        (filename.clone(), result)
    };

    let workers = effective_workers(&config.processing);
    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(|| pending.par_iter().map(run).collect()),
        Err(e) => {
            warn!(error = %e, "failed to build worker pool, generating sequentially");
            pending.iter().map(run).collect()
        }
    }
}

fn item_outcome(image: Option<&ImageReference>, from_disk: bool) -> ItemOutcome {
    match image {
        Some(ImageReference::Generated { .. }) if from_disk => ItemOutcome::Generated,
        Some(ImageReference::Generated { .. }) => ItemOutcome::NewlyGenerated,
        Some(ImageReference::UserProvided { .. }) => ItemOutcome::UserProvided,
        Some(ImageReference::Placeholder { .. }) => ItemOutcome::Placeholder,
        None => ItemOutcome::NoImage,
    }
}

fn emit(event: &LoadEvent, events: Option<&Sender<LoadEvent>>) {
    debug!(
        id = %event.id,
        outcome = event.outcome.as_str(),
        generation_failed = event.generation_failed,
        "resolved item"
    );
    if event.generation_failed {
        warn!(
            id = %event.id,
            image_path = event.missing_path.as_deref().unwrap_or_default(),
            "row image unusable and no image generated"
        );
    }
    if let Some(tx) = events {
        tx.send(event.clone()).ok();
    }
}
