//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Catalog
//! 001 Caesar Salad (Four Lakes)
//!     Calories: 220
//!     Image: placeholder https://source.unsplash.com/400x400/?Caesar+Salad,food
//! 002 Pizza (Gordon)
//!     Calories: 450
//!     Image: generated /images/pizza_gordon.png
//!
//! Missing images
//!     Tacos_Gordon: photos/tacos.jpg is missing or not an image, no image generated
//!
//! Loaded 2 items from 3 rows: 1 generated, 0 user, 1 placeholder, 0 none
//! ```
//!
//! ## Generate images
//!
//! ```text
//! 001 Pizza (Gordon) → pizza_gordon.png
//! 002 Tacos (Gordon) failed: API error: billing limit reached
//!
//! Images: 1 generated, 3 already present, 1 failed (5 total)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::generator::GenerationStats;
use crate::pipeline::{GenerationEvent, LoadEvent, LoadStats};
use crate::types::ResolvedItem;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// `001 Pizza (Gordon)`
fn item_header(index: usize, name: &str, dining_hall: &str) -> String {
    format!("{} {} ({})", format_index(index), name, dining_hall)
}

// ============================================================================
// Check
// ============================================================================

/// Format the resolved catalog, one entity block per item.
pub fn format_catalog_output(items: &[ResolvedItem]) -> Vec<String> {
    let mut lines = vec!["Catalog".to_string()];
    for (i, item) in items.iter().enumerate() {
        lines.push(item_header(i + 1, &item.name, &item.dining_hall));
        lines.push(format!("    Calories: {}", item.calories));
        match &item.image {
            Some(image) => lines.push(format!("    Image: {} {}", image.kind(), image.url())),
            None => lines.push("    Image: none".to_string()),
        }
    }
    lines
}

/// One line for a load event that needs attention, `None` otherwise.
pub fn format_load_event(event: &LoadEvent) -> Option<String> {
    if !event.generation_failed {
        return None;
    }
    Some(match &event.missing_path {
        Some(path) => format!(
            "    {}: {} is missing or not an image, no image generated",
            event.id, path
        ),
        None => format!("    {}: no image generated", event.id),
    })
}

/// Closing summary of a load.
pub fn format_load_summary(stats: &LoadStats, items: usize) -> String {
    format!(
        "Loaded {} items from {} rows: {} generated, {} user, {} placeholder, {} none",
        items,
        stats.rows,
        stats.generated + stats.newly_generated,
        stats.user_provided,
        stats.placeholder,
        stats.no_image
    )
}

/// Full `check` report.
pub fn format_check_output(
    items: &[ResolvedItem],
    events: &[LoadEvent],
    stats: &LoadStats,
) -> Vec<String> {
    let mut lines = format_catalog_output(items);

    let missing: Vec<String> = events.iter().filter_map(format_load_event).collect();
    if !missing.is_empty() {
        lines.push(String::new());
        lines.push("Missing images".to_string());
        lines.extend(missing);
    }

    lines.push(String::new());
    lines.push(format_load_summary(stats, items.len()));
    lines
}

pub fn print_check_output(
    items: &[ResolvedItem],
    events: &[LoadEvent],
    stats: &LoadStats,
) {
    for line in format_check_output(items, events, stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Generate images
// ============================================================================

/// Format one batch generation attempt.
pub fn format_generation_event(index: usize, event: &GenerationEvent) -> String {
    let header = item_header(index, &event.label, &event.category);
    match &event.result {
        Ok(()) => format!("{} \u{2192} {}", header, event.filename),
        Err(message) => format!("{} failed: {}", header, message),
    }
}

pub fn format_generation_summary(stats: &GenerationStats) -> String {
    format!("Images: {}", stats)
}

pub fn print_generation_summary(stats: &GenerationStats) {
    println!();
    println!("{}", format_generation_summary(stats));
}
