//! Translation APIs that turn a term into a `QueryResult`.

pub mod apora;

use crate::config::AppConfig;
use crate::models::{PronunciationVariant, QueryResult, SimpleWord};
use thiserror::Error;

pub use apora::Apora;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("API token cannot be empty")]
    MissingToken,

    #[error("Insufficient API balance")]
    InsufficientBalance,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown query API index {0}")]
    UnknownIndex(usize),
}

/// A translation API
pub trait QueryApi: Send + Sync {
    fn name(&self) -> &'static str;

    /// Query one word. `Ok(None)` means the API had no usable result for it.
    fn query(&self, word: &SimpleWord) -> Result<Option<QueryResult>, QueryError>;
}

pub struct QueryApiEntry {
    pub name: &'static str,
    pub create: fn(&AppConfig) -> Result<Box<dyn QueryApi>, QueryError>,
}

fn create_apora(config: &AppConfig) -> Result<Box<dyn QueryApi>, QueryError> {
    Ok(Box::new(Apora::new(config)?))
}

/// Query APIs indexed by the `selectedApi` setting
pub const QUERY_APIS: &[QueryApiEntry] = &[QueryApiEntry {
    name: apora::NAME,
    create: create_apora,
}];

pub fn create_query_api(index: usize, config: &AppConfig) -> Result<Box<dyn QueryApi>, QueryError> {
    let entry = QUERY_APIS.get(index).ok_or(QueryError::UnknownIndex(index))?;
    (entry.create)(config)
}

/// Pronunciation to use for a result: `(variant, is_fallback)`.
///
/// Falls back to no pronunciation when the result carries no audio.
pub fn get_pronunciation(
    result: &QueryResult,
    preferred: PronunciationVariant,
) -> (PronunciationVariant, bool) {
    if preferred == PronunciationVariant::None {
        return (PronunciationVariant::None, false);
    }
    if result.audio_url().is_some() {
        (preferred, false)
    } else {
        (PronunciationVariant::None, true)
    }
}
