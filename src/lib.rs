//! # Dining Catalog
//!
//! A small HTTP service that serves a catalog of dining-hall food items. A CSV
//! file is the data source: every row becomes one item, and every item is
//! given the best image it can get.
//!
//! # Architecture: Load Pipeline, Then Serve
//!
//! ```text
//! dataset.csv ──▶ dataset ──▶ resolve ──▶ store ──▶ catalog ──▶ server (axum)
//!                               │
//!                               └──▶ generator (optional, OpenAI images API)
//! ```
//!
//! The whole catalog is rebuilt on startup and on every reload request. A
//! rebuild produces a complete new map of items that is swapped into the store
//! in one step, so requests never see a half-loaded catalog.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`dataset`] | Lenient CSV reader: one [`types::RawItem`] per row |
//! | [`naming`] | Deterministic `<food>_<hall>.png` filenames for generated images |
//! | [`generator`] | Image generation capability: OpenAI backend, disabled backend, batch stats |
//! | [`resolve`] | Per-item image priority: generated, row image, generation, placeholder |
//! | [`pipeline`] | Read, plan, generate (deduplicated, parallel) and finish a full load |
//! | [`store`] | Snapshot store of resolved items keyed by id |
//! | [`catalog`] | Query surface: status, listing, serialized reload |
//! | [`server`] | axum router, static image mount, graceful shutdown |
//! | [`config`] | `config.toml` loading, stock defaults, validation |
//! | [`types`] | Shared record types and their JSON shape |
//! | [`output`] | CLI output formatting for `check` and `generate-images` |
//!
//! # Design Decisions
//!
//! ## The Images Directory Is the Index
//!
//! A generated image is named after its food and dining hall, so whether an
//! item already has one is a single `is_file` check. Nothing else records which
//! images exist; deleting a file is enough to have it regenerated on the next
//! load.
//!
//! ## Generation Is Optional
//!
//! Without an `OPENAI_API_KEY` (or with `generator.enabled = false`) the
//! service still runs. Items fall back to a placeholder URL or to no image, and
//! images already on disk keep being served.

pub mod catalog;
pub mod config;
pub mod dataset;
pub mod generator;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod resolve;
pub mod server;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
