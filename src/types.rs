//! Records shared by the dataset reader, the resolver and the HTTP layer.
//!
//! A [`RawItem`] is one dataset row and only lives for the duration of a
//! load. A [`ResolvedItem`] is what the catalog stores and serves; its JSON
//! shape is the public `/api/foods` contract:
//!
//! ```json
//! {
//!   "id": "Pizza_Gordon",
//!   "name": "Pizza",
//!   "diningHall": "Gordon",
//!   "calories": 450,
//!   "image_url": "/images/pizza_gordon.png",
//!   "filename": "pizza_gordon.png"
//! }
//! ```

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

/// One dataset row, before image resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub name: String,
    pub dining_hall: String,
    pub calories: u32,
    /// Raw `image_path` cell. `None` when the column or cell is missing.
    pub image_path: Option<String>,
}

impl RawItem {
    /// Catalog key: `"{name}_{dining_hall}"`.
    pub fn id(&self) -> String {
        item_id(&self.name, &self.dining_hall)
    }

    /// The `image_path` cell if it names something worth checking on disk.
    ///
    /// Blank cells and the literal `na` (any case) are treated as absent.
    pub fn usable_image_path(&self) -> Option<&str> {
        self.image_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty() && !p.eq_ignore_ascii_case("na"))
    }
}

/// Catalog key for a `(name, dining_hall)` pair.
pub fn item_id(name: &str, dining_hall: &str) -> String {
    format!("{name}_{dining_hall}")
}

/// Where an item's picture comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    /// Cached output of the image generator, served from the images mount.
    Generated { filename: String, url: String },
    /// Image named by the dataset row, served from the images mount.
    UserProvided { filename: String, url: String },
    /// External placeholder image keyed by the food name.
    Placeholder { url: String },
}

impl ImageReference {
    pub fn url(&self) -> &str {
        match self {
            Self::Generated { url, .. }
            | Self::UserProvided { url, .. }
            | Self::Placeholder { url } => url,
        }
    }

    /// Bare filename backing the reference. `None` for placeholders.
    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::Generated { filename, .. } | Self::UserProvided { filename, .. } => {
                Some(filename)
            }
            Self::Placeholder { .. } => None,
        }
    }

    /// Short label used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Generated { .. } => "generated",
            Self::UserProvided { .. } => "user",
            Self::Placeholder { .. } => "placeholder",
        }
    }
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    pub id: String,
    pub name: String,
    pub dining_hall: String,
    pub calories: u32,
    pub image: Option<ImageReference>,
}

impl ResolvedItem {
    pub fn new(raw: RawItem, image: Option<ImageReference>) -> Self {
        Self {
            id: raw.id(),
            name: raw.name,
            dining_hall: raw.dining_hall,
            calories: raw.calories,
            image,
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image.as_ref().map(ImageReference::url)
    }

    pub fn filename(&self) -> Option<&str> {
        self.image.as_ref().and_then(ImageReference::filename)
    }
}

impl Serialize for ResolvedItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ResolvedItem", 6)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("diningHall", &self.dining_hall)?;
        s.serialize_field("calories", &self.calories)?;
        s.serialize_field("image_url", &self.image_url())?;
        s.serialize_field("filename", &self.filename())?;
        s.end()
    }
}
