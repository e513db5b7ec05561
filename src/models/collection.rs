use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Deck model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub id: Option<i64>,
    pub name: String,
    pub created_ts: i64,
}

impl Deck {
    pub fn new(name: String) -> Self {
        Self {
            id: None,
            name,
            created_ts: chrono::Utc::now().timestamp(),
        }
    }
}

/// Card template (card type) of a note type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTemplate {
    pub name: String,
    /// Question side format
    pub qfmt: String,
    /// Answer side format
    pub afmt: String,
}

/// Note type (model): ordered field names, card templates and shared CSS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteType {
    pub id: Option<i64>,
    pub name: String,
    pub fields: Vec<String>,
    pub templates: Vec<CardTemplate>,
    pub css: String,
    /// Deck new notes of this type go to by default
    pub deck_id: Option<i64>,
    pub created_ts: i64,
    pub modified_ts: i64,
}

impl NoteType {
    pub fn new(name: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: None,
            name,
            fields: Vec::new(),
            templates: Vec::new(),
            css: String::new(),
            deck_id: None,
            created_ts: now,
            modified_ts: now,
        }
    }

    pub fn template(&self, name: &str) -> Option<&CardTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }
}

/// Note model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Option<i64>,
    pub guid: String,
    pub note_type_id: i64,
    pub deck_id: i64,
    /// Field values keyed by field name
    pub fields: BTreeMap<String, String>,
    pub tags: Vec<String>,
    pub created_ts: i64,
    pub modified_ts: i64,
}

impl Note {
    /// Create a new note with every field of the note type present and empty
    pub fn new(note_type: &NoteType, deck_id: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: None,
            guid: uuid::Uuid::new_v4().to_string(),
            note_type_id: note_type.id.unwrap_or_default(),
            deck_id,
            fields: note_type
                .fields
                .iter()
                .map(|f| (f.clone(), String::new()))
                .collect(),
            tags: Vec::new(),
            created_ts: now,
            modified_ts: now,
        }
    }

    /// Field value, or "" when the field is absent
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.fields.insert(field.to_string(), value.into());
    }

    /// Add a tag unless an equal tag (case-insensitive) is already present
    pub fn add_tag(&mut self, tag: &str) {
        let tag = tag.trim();
        if tag.is_empty() {
            return;
        }
        for part in tag.split_whitespace() {
            if !self.tags.iter().any(|t| t.eq_ignore_ascii_case(part)) {
                self.tags.push(part.to_string());
            }
        }
    }

    pub fn tags_string(&self) -> String {
        self.tags.join(" ")
    }
}
