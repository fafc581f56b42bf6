//! Catalog item domain model.
//!
//! # Responsibility
//! - Define the canonical item record together with its rating and tracks.
//! - Derive item identity and seed rating state at creation time.
//! - Describe partial updates as a typed document.
//!
//! # Invariants
//! - `id` is `"{artist}-{item_name}"` when created and never changes after.
//! - `rating.value` and `rating.actual_value` stay within `1..=5`.
//! - `rating.number_of_votes` is at least one.
//! - Required text fields (`item_name`, `artist`, `catalog_category`) are
//!   never empty.

use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Primary key of an item.
///
/// Kept as a type alias so signatures read as ids rather than free text.
pub type ItemId = String;

/// Lowest accepted star rating.
pub const RATING_MIN: u8 = 1;
/// Highest accepted star rating.
pub const RATING_MAX: u8 = 5;

/// Builds the stable item id from artist and item name.
pub fn derive_item_id(artist: &str, item_name: &str) -> ItemId {
    format!("{artist}-{item_name}")
}

/// Composite star rating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    /// Displayed star count.
    pub value: u8,
    /// Running average across votes; may be fractional.
    pub actual_value: f64,
    /// Votes counted so far.
    pub number_of_votes: u32,
}

impl Rating {
    /// Seeds a rating from the initial star value with a single vote.
    pub fn seeded(stars: u8) -> Self {
        Self {
            value: stars,
            actual_value: f64::from(stars),
            number_of_votes: 1,
        }
    }

    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if !(RATING_MIN..=RATING_MAX).contains(&self.value) {
            return Err(ItemValidationError::RatingOutOfRange {
                field: "value",
                value: f64::from(self.value),
            });
        }

        // NaN fails `contains`, so it is rejected here as well.
        let bounds = f64::from(RATING_MIN)..=f64::from(RATING_MAX);
        if !bounds.contains(&self.actual_value) {
            return Err(ItemValidationError::RatingOutOfRange {
                field: "actualValue",
                value: self.actual_value,
            });
        }

        if self.number_of_votes < 1 {
            return Err(ItemValidationError::NoVotes);
        }

        Ok(())
    }
}

/// One entry of an item's track list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
}

impl Track {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            duration_secs: None,
        }
    }

    pub fn with_duration(title: impl Into<String>, duration_secs: u32) -> Self {
        Self {
            title: title.into(),
            duration_secs: Some(duration_secs),
        }
    }
}

/// Canonical catalog record, e.g. one album.
///
/// Serialized with camelCase field names; absent optionals are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub item_name: String,
    pub artist: String,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_label: Option<String>,
    /// Genre tag used as a filter dimension.
    pub catalog_category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub rating: Rating,
    /// Ordered as released.
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Item {
    /// Checks schema-level constraints of a full record.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        require_text("id", &self.id)?;
        require_text("itemName", &self.item_name)?;
        require_text("artist", &self.artist)?;
        require_text("catalogCategory", &self.catalog_category)?;
        self.rating.validate()?;
        validate_tracks(&self.tracks)
    }
}

/// Creation input for a new item.
///
/// `rating` is the initial star value; it seeds both `value` and
/// `actual_value` with a single vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub item_name: String,
    pub artist: String,
    pub year: i32,
    #[serde(default)]
    pub record_label: Option<String>,
    pub catalog_category: String,
    #[serde(default)]
    pub description: Option<String>,
    pub rating: u8,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl NewItem {
    /// Creates an input with the required fields set and no optional data.
    pub fn new(
        item_name: impl Into<String>,
        artist: impl Into<String>,
        year: i32,
        catalog_category: impl Into<String>,
        rating: u8,
    ) -> Self {
        Self {
            item_name: item_name.into(),
            artist: artist.into(),
            year,
            record_label: None,
            catalog_category: catalog_category.into(),
            description: None,
            rating,
            tracks: Vec::new(),
        }
    }

    /// Id the item will be stored under.
    pub fn id(&self) -> ItemId {
        derive_item_id(&self.artist, &self.item_name)
    }

    /// Materializes the stored record: derives the id and seeds the rating.
    pub fn into_item(self) -> Item {
        Item {
            id: self.id(),
            item_name: self.item_name,
            artist: self.artist,
            year: self.year,
            record_label: self.record_label,
            catalog_category: self.catalog_category,
            description: self.description,
            rating: Rating::seeded(self.rating),
            tracks: self.tracks,
        }
    }
}

/// Partial update document.
///
/// Absent fields are left untouched. `record_label` and `description` use
/// `Some(None)` (JSON `null`) to clear the stored value. There is no `id`
/// field: identity cannot be changed, and unknown fields are rejected when
/// deserializing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ItemUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(
        default,
        deserialize_with = "deserialize_clearable",
        skip_serializing_if = "Option::is_none"
    )]
    pub record_label: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_category: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_clearable",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracks: Option<Vec<Track>>,
}

impl ItemUpdate {
    /// Returns whether applying this update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.item_name.is_none()
            && self.artist.is_none()
            && self.year.is_none()
            && self.record_label.is_none()
            && self.catalog_category.is_none()
            && self.description.is_none()
            && self.rating.is_none()
            && self.tracks.is_none()
    }

    /// Checks constraints on the fields that are present.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if let Some(item_name) = &self.item_name {
            require_text("itemName", item_name)?;
        }
        if let Some(artist) = &self.artist {
            require_text("artist", artist)?;
        }
        if let Some(category) = &self.catalog_category {
            require_text("catalogCategory", category)?;
        }
        if let Some(rating) = &self.rating {
            rating.validate()?;
        }
        if let Some(tracks) = &self.tracks {
            validate_tracks(tracks)?;
        }
        Ok(())
    }
}

/// Schema-level constraint failure for items and updates.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValidationError {
    /// A required text field is empty or whitespace only.
    EmptyField(&'static str),
    RatingOutOfRange {
        field: &'static str,
        value: f64,
    },
    NoVotes,
    /// Zero-based position of the offending track.
    EmptyTrackTitle {
        position: usize,
    },
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "required field `{field}` is empty"),
            Self::RatingOutOfRange { field, value } => write!(
                f,
                "rating.{field} must be within {RATING_MIN}..={RATING_MAX}, got {value}"
            ),
            Self::NoVotes => write!(f, "rating.numberOfVotes must be at least 1"),
            Self::EmptyTrackTitle { position } => {
                write!(f, "track at position {position} has an empty title")
            }
        }
    }
}

impl Error for ItemValidationError {}

fn require_text(field: &'static str, value: &str) -> Result<(), ItemValidationError> {
    if value.trim().is_empty() {
        return Err(ItemValidationError::EmptyField(field));
    }
    Ok(())
}

fn validate_tracks(tracks: &[Track]) -> Result<(), ItemValidationError> {
    match tracks.iter().position(|track| track.title.trim().is_empty()) {
        Some(position) => Err(ItemValidationError::EmptyTrackTitle { position }),
        None => Ok(()),
    }
}

/// Maps a present JSON `null` to `Some(None)` so it can clear a field.
fn deserialize_clearable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
