//! Clothing items and outfits, plus the request payloads that create or
//! patch them.
//!
//! Payloads are loose: tag lists accept a single string or an array and
//! unknown tags are dropped. [`ClothingInput::validate`] and
//! [`OutfitInput::validate`] return the first problem as a user-facing
//! message; the `into_*` conversions trim, truncate and fill defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_BRAND_LEN: usize = 100;
pub const MAX_SIZE_LEN: usize = 50;
pub const MAX_MATERIAL_LEN: usize = 100;
pub const MAX_NOTES_LEN: usize = 500;
/// Upper bound for an encoded image, in bytes of data URI.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const IMAGE_PREFIX: &str = "data:image/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
    All,
}

impl Season {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "spring" => Some(Self::Spring),
            "summer" => Some(Self::Summer),
            "autumn" => Some(Self::Autumn),
            "winter" => Some(Self::Winter),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occasion {
    Casual,
    Date,
    Work,
    Party,
    Formal,
    Sport,
    All,
}

impl Occasion {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "casual" => Some(Self::Casual),
            "date" => Some(Self::Date),
            "work" => Some(Self::Work),
            "party" => Some(Self::Party),
            "formal" => Some(Self::Formal),
            "sport" => Some(Self::Sport),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClothingKind {
    #[default]
    Clothes,
    Accessories,
}

impl ClothingKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "clothes" => Some(Self::Clothes),
            "accessories" => Some(Self::Accessories),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClothingItem {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ClothingKind,
    #[serde(deserialize_with = "one_or_many")]
    pub season: Vec<Season>,
    #[serde(deserialize_with = "one_or_many")]
    pub occasion: Vec<Occasion>,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub notes: String,
    pub image: String,
    #[serde(default)]
    pub original_image: String,
    #[serde(default)]
    pub wearing_photo: String,
    pub date_added: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutfitItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outfit {
    pub id: i64,
    pub name: String,
    #[serde(deserialize_with = "one_or_many")]
    pub season: Vec<Season>,
    #[serde(deserialize_with = "one_or_many")]
    pub occasion: Vec<Occasion>,
    #[serde(default)]
    pub notes: String,
    pub items: Vec<OutfitItem>,
    pub date_created: DateTime<Utc>,
}

/// Older files stored a lone tag as a plain string.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// Body of a clothing create or update request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClothingInput {
    pub id: Option<i64>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub season: Option<Value>,
    pub occasion: Option<Value>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub material: Option<String>,
    pub notes: Option<String>,
    pub image: Option<String>,
    pub original_image: Option<String>,
    pub wearing_photo: Option<String>,
    pub date_added: Option<DateTime<Utc>>,
}

impl ClothingInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            return Err("Name is required".into());
        }
        let Some(image) = self.image.as_deref().filter(|i| !i.is_empty()) else {
            return Err("Image is required".into());
        };
        if self.kind.as_deref().is_some_and(|k| ClothingKind::parse(k).is_none()) {
            return Err(r#"Type must be either "clothes" or "accessories""#.into());
        }

        if image.len() > MAX_IMAGE_BYTES {
            return Err("Image data is too large (maximum 10MB)".into());
        }
        if exceeds_bytes(&self.original_image, MAX_IMAGE_BYTES) {
            return Err("Original image data is too large (maximum 10MB)".into());
        }
        if exceeds_bytes(&self.wearing_photo, MAX_IMAGE_BYTES) {
            return Err("Wearing photo data is too large (maximum 10MB)".into());
        }
        if !image.starts_with(IMAGE_PREFIX) {
            return Err("Invalid image format".into());
        }

        check_len(&self.name, MAX_NAME_LEN, "Name")?;
        check_len(&self.brand, MAX_BRAND_LEN, "Brand")?;
        check_len(&self.size, MAX_SIZE_LEN, "Size")?;
        check_len(&self.material, MAX_MATERIAL_LEN, "Material")?;
        check_len(&self.notes, MAX_NOTES_LEN, "Notes")?;
        Ok(())
    }

    /// Fill every field this patch leaves out from `existing`.
    pub fn merged_over(self, existing: &ClothingItem) -> Self {
        Self {
            id: Some(existing.id),
            name: self.name.or_else(|| Some(existing.name.clone())),
            kind: self.kind.or_else(|| serde_json::to_value(existing.kind).ok().and_then(as_string)),
            season: self.season.or_else(|| serde_json::to_value(&existing.season).ok()),
            occasion: self.occasion.or_else(|| serde_json::to_value(&existing.occasion).ok()),
            brand: self.brand.or_else(|| Some(existing.brand.clone())),
            size: self.size.or_else(|| Some(existing.size.clone())),
            material: self.material.or_else(|| Some(existing.material.clone())),
            notes: self.notes.or_else(|| Some(existing.notes.clone())),
            image: self.image.or_else(|| Some(existing.image.clone())),
            original_image: self.original_image.or_else(|| Some(existing.original_image.clone())),
            wearing_photo: self.wearing_photo.or_else(|| Some(existing.wearing_photo.clone())),
            date_added: Some(existing.date_added),
        }
    }

    pub fn into_item(self, id: i64, now: DateTime<Utc>) -> ClothingItem {
        ClothingItem {
            id,
            name: clean(self.name, MAX_NAME_LEN),
            kind: self
                .kind
                .as_deref()
                .and_then(ClothingKind::parse)
                .unwrap_or_default(),
            season: parse_tags(self.season.as_ref(), Season::parse, Season::All),
            occasion: parse_tags(self.occasion.as_ref(), Occasion::parse, Occasion::Casual),
            brand: clean(self.brand, MAX_BRAND_LEN),
            size: clean(self.size, MAX_SIZE_LEN),
            material: clean(self.material, MAX_MATERIAL_LEN),
            notes: clean(self.notes, MAX_NOTES_LEN),
            image: self.image.unwrap_or_default(),
            original_image: self.original_image.unwrap_or_default(),
            wearing_photo: self.wearing_photo.unwrap_or_default(),
            date_added: self.date_added.unwrap_or(now),
        }
    }
}

/// Body of an outfit create or update request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitInput {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub season: Option<Value>,
    pub occasion: Option<Value>,
    pub notes: Option<String>,
    pub items: Option<Vec<Value>>,
    pub date_created: Option<DateTime<Utc>>,
}

impl OutfitInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            return Err("Name is required".into());
        }
        let items = match self.items.as_deref() {
            Some(items) if !items.is_empty() => items,
            _ => return Err("At least one item is required".into()),
        };

        check_len(&self.name, MAX_NAME_LEN, "Name")?;
        check_len(&self.notes, MAX_NOTES_LEN, "Notes")?;

        for (index, item) in items.iter().enumerate() {
            if !item.is_object() {
                return Err(format!("Item at index {index} is invalid"));
            }
            if item_id(item).is_none() {
                return Err(format!("Item at index {index} must have a valid id"));
            }
        }
        Ok(())
    }

    pub fn merged_over(self, existing: &Outfit) -> Self {
        Self {
            id: Some(existing.id),
            name: self.name.or_else(|| Some(existing.name.clone())),
            season: self.season.or_else(|| serde_json::to_value(&existing.season).ok()),
            occasion: self.occasion.or_else(|| serde_json::to_value(&existing.occasion).ok()),
            notes: self.notes.or_else(|| Some(existing.notes.clone())),
            items: self.items.or_else(|| {
                existing
                    .items
                    .iter()
                    .map(serde_json::to_value)
                    .collect::<Result<Vec<_>, _>>()
                    .ok()
            }),
            date_created: Some(existing.date_created),
        }
    }

    pub fn into_outfit(self, id: i64, now: DateTime<Utc>) -> Outfit {
        let items = self
            .items
            .unwrap_or_default()
            .iter()
            .filter_map(|item| {
                Some(OutfitItem {
                    id: item_id(item)?,
                    name: Some(clean(item.get("name").and_then(Value::as_str).map(str::to_string), MAX_NAME_LEN))
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    image: item
                        .get("image")
                        .and_then(Value::as_str)
                        .map(|i| truncate_chars(i, MAX_IMAGE_BYTES))
                        .unwrap_or_default(),
                })
            })
            .collect();

        Outfit {
            id,
            name: clean(self.name, MAX_NAME_LEN),
            season: parse_tags(self.season.as_ref(), Season::parse, Season::All),
            occasion: parse_tags(self.occasion.as_ref(), Occasion::parse, Occasion::Casual),
            notes: clean(self.notes, MAX_NOTES_LEN),
            items,
            date_created: self.date_created.unwrap_or(now),
        }
    }
}

fn item_id(item: &Value) -> Option<i64> {
    item.get("id").and_then(Value::as_i64).filter(|id| *id > 0)
}

fn as_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

/// Keep the recognised tags from a string or array; fall back to `default`.
fn parse_tags<T>(raw: Option<&Value>, parse: fn(&str) -> Option<T>, default: T) -> Vec<T>
where
    T: PartialEq,
{
    let mut tags = Vec::new();
    let candidates: Vec<&str> = match raw {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    for tag in candidates.into_iter().filter_map(parse) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    if tags.is_empty() {
        tags.push(default);
    }
    tags
}

fn check_len(value: &Option<String>, max: usize, field: &str) -> Result<(), String> {
    match value {
        Some(v) if v.chars().count() > max => {
            Err(format!("{field} is too long (maximum {max} characters)"))
        }
        _ => Ok(()),
    }
}

fn exceeds_bytes(value: &Option<String>, max: usize) -> bool {
    value.as_ref().is_some_and(|v| v.len() > max)
}

fn clean(value: Option<String>, max: usize) -> String {
    value
        .map(|v| truncate_chars(v.trim(), max))
        .unwrap_or_default()
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
