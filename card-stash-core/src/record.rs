//! Record documents: one JSON file per item, holding its cards.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::asset::{Asset, AssetState, sanitize_id, sanitize_name};
use crate::error::DocumentError;
use crate::util::is_remote;

/// Lower-cased record key (`Pikachu` and `pikachu` name the same record).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordName(String);

impl RecordName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    /// Derive the name from a document path (`data/Pikachu.json` -> `pikachu`).
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Image references of a card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardImages {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small: Option<String>,
    /// Mirrors `small` once the asset is resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large: Option<String>,
    /// Remote URI the small image was acquired from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Marketplace block; only the card page URL is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardMarket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One card. Fields this crate does not interpret are kept in `extra` and
/// written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Card {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<CardImages>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardmarket: Option<CardMarket>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Card {
    pub fn small_image(&self) -> Option<&str> {
        self.images
            .as_ref()
            .and_then(|i| i.small.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn page_url(&self) -> Option<&str> {
        self.cardmarket
            .as_ref()
            .and_then(|c| c.url.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// How the cards were laid out in the file, so writes keep the same shape.
#[derive(Debug, Clone, PartialEq)]
enum Layout {
    /// `{"data": [...], ...}`
    Wrapped { extra: Map<String, Value> },
    /// `{"data": {...}, ...}`
    WrappedSingle { extra: Map<String, Value> },
    /// `[...]`
    Bare,
}

/// A loaded record document.
///
/// The record is the single owner of its cards; acquisition mutates it only
/// through [`Record::set_image`], which tracks whether anything changed.
#[derive(Debug, Clone)]
pub struct Record {
    name: RecordName,
    path: PathBuf,
    layout: Layout,
    cards: Vec<Card>,
    dirty: bool,
}

impl Record {
    /// Parse a record document.
    pub fn from_json(name: RecordName, path: PathBuf, text: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(text)?;
        let (layout, cards) = match value {
            Value::Array(_) => (Layout::Bare, serde_json::from_value(value)?),
            Value::Object(mut map) => {
                let data = map
                    .remove("data")
                    .ok_or_else(|| DocumentError::shape("object without a \"data\" key"))?;
                match data {
                    Value::Array(_) => (Layout::Wrapped { extra: map }, serde_json::from_value(data)?),
                    Value::Object(_) => {
                        let card: Card = serde_json::from_value(data)?;
                        (Layout::WrappedSingle { extra: map }, vec![card])
                    }
                    other => {
                        return Err(DocumentError::shape(format!(
                            "\"data\" must be an array or object, found {}",
                            json_kind(&other)
                        )));
                    }
                }
            }
            other => {
                return Err(DocumentError::shape(format!(
                    "top-level {} is not a record",
                    json_kind(&other)
                )));
            }
        };

        Ok(Self {
            name,
            path,
            layout,
            cards,
            dirty: false,
        })
    }

    /// Serialize back to pretty JSON in the layout the document was read with.
    pub fn to_json(&self) -> Result<String, DocumentError> {
        let value = self.to_value()?;
        let mut text = serde_json::to_string_pretty(&value)?;
        text.push('\n');
        Ok(text)
    }

    /// The document as a JSON value, always in the `{"data": ...}` form for
    /// wrapped layouts.
    pub fn to_value(&self) -> Result<Value, DocumentError> {
        let value = match &self.layout {
            Layout::Bare => serde_json::to_value(&self.cards)?,
            Layout::Wrapped { extra } => {
                let mut map = extra.clone();
                map.insert("data".to_string(), serde_json::to_value(&self.cards)?);
                Value::Object(map)
            }
            Layout::WrappedSingle { extra } => {
                let mut map = extra.clone();
                let card = self.cards.first().cloned().unwrap_or_default();
                map.insert("data".to_string(), serde_json::to_value(card)?);
                Value::Object(map)
            }
        };
        Ok(value)
    }

    pub fn name(&self) -> &RecordName {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Called by the store after a successful write.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// The acquirable assets of this record, in card order.
    ///
    /// A card contributes an asset when it references a small image or an
    /// originating page; cards with neither are ignored.
    pub fn assets(&self, placeholder_link: &str) -> Vec<Asset> {
        (0..self.cards.len())
            .filter_map(|i| self.asset(i, placeholder_link))
            .collect()
    }

    /// The asset view of card `index`.
    pub fn asset(&self, index: usize, placeholder_link: &str) -> Option<Asset> {
        let card = self.cards.get(index)?;
        let small = card.small_image();
        let page_url = card.page_url().map(str::to_string);
        if small.is_none() && page_url.is_none() {
            return None;
        }

        let state = match small {
            Some(s) if s == placeholder_link => AssetState::Placeholder,
            Some(s) if !is_remote(s) => AssetState::LocalPath(s.to_string()),
            _ => AssetState::Remote,
        };

        let origin = card
            .images
            .as_ref()
            .and_then(|i| i.origin.as_deref())
            .filter(|o| is_remote(o));
        let source = match small {
            Some(s) if is_remote(s) => Some(s.trim().to_string()),
            _ => origin.map(str::to_string),
        };

        let id = card
            .id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(sanitize_id)
            .or_else(|| {
                card.name
                    .as_deref()
                    .map(sanitize_name)
                    .filter(|n| !n.is_empty())
            })
            .unwrap_or_else(|| format!("card_{}_{}", self.name, index));

        Some(Asset {
            index,
            id,
            source,
            page_url,
            state,
        })
    }

    /// Point card `index` at a resolved local reference.
    ///
    /// Sets the small reference, mirrors it into `large` when the card has a
    /// large reference, and remembers `origin` the first time a remote
    /// source is replaced. Returns whether the document changed.
    pub fn set_image(&mut self, index: usize, link: &str, origin: Option<&str>) -> bool {
        let Some(card) = self.cards.get_mut(index) else {
            return false;
        };
        let images = card.images.get_or_insert_with(CardImages::default);
        let mut changed = false;

        if images.small.as_deref() != Some(link) {
            images.small = Some(link.to_string());
            changed = true;
        }
        if let Some(large) = images.large.as_mut() {
            if large != link {
                *large = link.to_string();
                changed = true;
            }
        }
        if let Some(origin) = origin {
            if images.origin.is_none() {
                images.origin = Some(origin.to_string());
                changed = true;
            }
        }

        self.dirty |= changed;
        changed
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "tests/record_tests.rs"]
mod tests;
