//! Deterministic image filenames for food items.
//!
//! Every food item maps to exactly one generated image on disk. The name is
//! derived from the item's label and dining hall, so the images directory is
//! the only index: no manifest, no database. A file either exists under the
//! derived name or it doesn't.
//!
//! ## Normalization
//!
//! Both parts are lower-cased and every character that is not an ASCII
//! letter or digit becomes `_`, one underscore per character:
//!
//! - `("Pizza", "Gordon")` → `pizza_gordon.png`
//! - `("Mac & Cheese", "Four Lakes")` → `mac___cheese_four_lakes.png`
//! - `("Crème Brûlée", "Rheta's")` → `cr_me_br_l_e_rheta_s.png`
//!
//! Two distinct pairs can collapse onto the same name (`"A-B"` and `"A B"`).
//! They then share one generated image.

/// Extension of every generated image.
pub const IMAGE_EXTENSION: &str = "png";

/// Build the generated-image filename for a `(label, category)` pair.
pub fn image_filename(label: &str, category: &str) -> String {
    format!(
        "{}_{}.{IMAGE_EXTENSION}",
        clean_component(label),
        clean_component(category)
    )
}

/// Lower-case `input` and replace anything outside `[a-z0-9]` with `_`.
fn clean_component(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c
            } else {
                '_'
            }
        })
        .collect()
}
