//! Remote dictionary services that keep per-user word books.

pub mod eudic;
pub mod youdao;

use crate::config::{CredentialPlatform, Language};
use crate::http::Cookie;
use crate::models::SimpleWord;
use std::sync::RwLock;
use thiserror::Error;

pub use eudic::Eudic;
pub use youdao::Youdao;

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response from {service}: {message}")]
    Parse { service: &'static str, message: String },

    #[error("Not logged in to {0}")]
    NotLoggedIn(&'static str),

    #[error("Unknown dictionary index {0}")]
    UnknownIndex(usize),
}

/// A dictionary service with word-book groups
///
/// Implementations remember the cookie accepted by `check_cookie` and use it
/// for the later calls.
pub trait Dictionary: Send + Sync {
    fn name(&self) -> &'static str;

    fn platform(&self) -> CredentialPlatform;

    /// Page where the user signs in to obtain a session cookie
    fn login_url(&self) -> String;

    /// Whether a cookie set collected after signing in proves a login
    fn login_check(&self, cookie: &Cookie, content: &str) -> bool;

    /// Verify the cookie against the service and keep it for the session
    fn check_cookie(&self, cookie: &Cookie) -> Result<bool, DictionaryError>;

    /// Word-book groups as (name, id)
    fn groups(&self) -> Result<Vec<(String, i64)>, DictionaryError>;

    fn total_pages(&self, group_name: &str, group_id: i64) -> Result<usize, DictionaryError>;

    fn words_by_page(
        &self,
        page: usize,
        group_name: &str,
        group_id: i64,
    ) -> Result<Vec<SimpleWord>, DictionaryError>;
}

/// Registry entry: display name and constructor
pub struct DictionaryEntry {
    pub name: &'static str,
    pub platform: CredentialPlatform,
    pub create: fn(Language) -> Result<Box<dyn Dictionary>, DictionaryError>,
}

/// Dictionaries indexed by the `selectedDict` setting
pub const DICTIONARIES: &[DictionaryEntry] = &[
    DictionaryEntry {
        name: youdao::NAME,
        platform: CredentialPlatform::Youdao,
        create: create_youdao,
    },
    DictionaryEntry {
        name: eudic::NAME,
        platform: CredentialPlatform::Eudic,
        create: create_eudic,
    },
];

fn create_youdao(_language: Language) -> Result<Box<dyn Dictionary>, DictionaryError> {
    Ok(Box::new(Youdao::new()?))
}

fn create_eudic(language: Language) -> Result<Box<dyn Dictionary>, DictionaryError> {
    Ok(Box::new(Eudic::new(language)?))
}

pub fn create_dictionary(index: usize, language: Language) -> Result<Box<dyn Dictionary>, DictionaryError> {
    let entry = DICTIONARIES
        .get(index)
        .ok_or(DictionaryError::UnknownIndex(index))?;
    (entry.create)(language)
}

/// Session state shared by the dictionary implementations
#[derive(Debug, Default)]
pub(crate) struct Session {
    cookie: RwLock<Option<Cookie>>,
}

impl Session {
    pub(crate) fn set(&self, cookie: &Cookie) {
        let mut guard = self.cookie.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(cookie.clone());
    }

    pub(crate) fn header(&self, service: &'static str) -> Result<String, DictionaryError> {
        let guard = self.cookie.read().unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .map(crate::http::cookie_header)
            .ok_or(DictionaryError::NotLoggedIn(service))
    }
}

/// Pages needed to hold `total` words at `per_page` words each
pub(crate) fn page_count(total: u64, per_page: u64) -> usize {
    total.div_ceil(per_page) as usize
}
