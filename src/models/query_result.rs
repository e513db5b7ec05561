use serde::{Deserialize, Serialize};

/// Pronunciation variant for downloaded audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PronunciationVariant {
    None,
    Us,
    Uk,
}

impl PronunciationVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            PronunciationVariant::None => "none",
            PronunciationVariant::Us => "US",
            PronunciationVariant::Uk => "UK",
        }
    }
}

/// Dictionary data returned by a query API for one term
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub term: String,
    pub definition: Option<String>,
    pub part_of_speech: Option<String>,
    pub original: Option<String>,
    pub chinese_definition: Option<String>,
    pub ipa: Option<String>,
    pub context: Option<String>,
    pub collocation: Option<String>,
    pub context_audio_url: Option<String>,
    pub term_audio_url: Option<String>,
    /// Form of the term as it appears in `context`, used for highlighting
    pub replacing: Option<String>,
}

impl QueryResult {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Default::default()
        }
    }

    /// Preferred audio URL: the context recording first, then the term recording
    pub fn audio_url(&self) -> Option<&str> {
        self.context_audio_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.term_audio_url.as_deref().filter(|u| !u.is_empty()))
    }
}
