//! Candidate records and normalization.
//!
//! A candidate is an identity (`id`, `name`) plus an open-ended profile map.
//! Normalization makes sure every profile key the prompt refers to exists,
//! so prompt construction never has to deal with absent fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::Document;

/// Profile keys guaranteed to exist after [`normalize_candidate`].
pub const PROFILE_KEYS: [&str; 5] = [
    "education",
    "skills",
    "general_skills",
    "personal_information",
    "available_types_of_work",
];

/// Number of hex characters kept from a document for `pdf_preview`.
pub const PREVIEW_HEX_CHARS: usize = 100;

fn empty_value(key: &str) -> Value {
    match key {
        "general_skills" | "available_types_of_work" => Value::Array(Vec::new()),
        _ => Value::Object(Map::new()),
    }
}

/// Return a copy of `raw` with every key in [`PROFILE_KEYS`] present.
///
/// Missing keys default to an empty object (`education`, `skills`,
/// `personal_information`) or an empty array (`general_skills`,
/// `available_types_of_work`). Existing values are kept untouched, even when
/// their type is unexpected. The input is never mutated.
pub fn normalize_candidate(raw: &Map<String, Value>) -> Map<String, Value> {
    let mut normalized = raw.clone();
    for key in PROFILE_KEYS {
        normalized
            .entry(key)
            .or_insert_with(|| empty_value(key));
    }
    normalized
}

/// One candidate to be scored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    /// Stable identifier (typically the source path)
    pub id: String,

    /// Display name
    pub name: String,

    /// Structured profile fields or opaque excerpts
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            profile: Map::new(),
        }
    }

    /// Build a candidate from a loaded document, keeping a short hex preview.
    pub fn from_document(
        id: impl Into<String>,
        name: impl Into<String>,
        document: &Document,
    ) -> Self {
        Self::new(id, name).with_field("pdf_preview", document.hex_preview(PREVIEW_HEX_CHARS))
    }

    /// Set a profile field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.profile.insert(key.into(), value.into());
        self
    }

    /// Name to show in progress output and reports.
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else if !self.id.is_empty() {
            &self.id
        } else {
            "Unknown"
        }
    }

    /// Flat record: `id`, `name`, then the profile in insertion order.
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("id".to_string(), Value::String(self.id.clone()));
        record.insert("name".to_string(), Value::String(self.name.clone()));
        for (key, value) in &self.profile {
            if key != "id" && key != "name" {
                record.insert(key.clone(), value.clone());
            }
        }
        record
    }

    /// The record as the scorer sees it.
    pub fn normalized(&self) -> Map<String, Value> {
        normalize_candidate(&self.to_record())
    }
}
