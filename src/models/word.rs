use serde::{Deserialize, Serialize};
use std::fmt;

/// A term plus its brief translation and word-book metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleWord {
    pub term: String,
    pub trans: String,
    pub modified_time: i64,
    pub book_id: i64,
    pub book_name: String,
}

impl SimpleWord {
    /// Create a word with only its term set
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            trans: String::new(),
            modified_time: 0,
            book_id: 0,
            book_name: String::new(),
        }
    }

    /// Build a word from the columns of a word-list line:
    /// term, translation, modified time, book id, book name.
    ///
    /// Returns `None` for an empty line. Numeric columns that do not parse are 0.
    pub fn from_values(values: &[String]) -> Option<Self> {
        let term = values.first()?.clone();
        let mut word = Self::new(term);
        if let Some(trans) = values.get(1) {
            word.trans = trans.clone();
        }
        if let Some(ts) = values.get(2) {
            word.modified_time = ts.parse().unwrap_or(0);
        }
        if let Some(id) = values.get(3) {
            word.book_id = id.parse().unwrap_or(0);
        }
        if let Some(name) = values.get(4) {
            word.book_name = name.clone();
        }
        Some(word)
    }

    /// One-line description with metadata, for debug logging
    pub fn describe(&self) -> String {
        format!(
            "{} {} modified_time={}, book_id={}, book_name={}",
            self.term, self.trans, self.modified_time, self.book_id, self.book_name
        )
    }
}

impl fmt::Display for SimpleWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.term)
    }
}
