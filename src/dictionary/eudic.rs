use super::{page_count, Dictionary, DictionaryError, Session};
use crate::config::{CredentialPlatform, Language};
use crate::http::{build_client, cookie_header, Cookie, RetryPolicy};
use crate::models::SimpleWord;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::COOKIE;
use serde::Deserialize;
use std::sync::{OnceLock, RwLock};
use std::time::Duration;

pub const NAME: &str = "欧陆词典";

const WORDS_PER_PAGE: u64 = 100;
const SESSION_COOKIE: &str = "EudicWebSession";
const GROUP_LINK_CLASS: &str = "media_heading_a new_cateitem_click";

/// Study-list host and the host that serves the login page, per language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Hosts {
    base: &'static str,
    check: &'static str,
}

fn hosts(language: Language) -> Hosts {
    match language {
        Language::English => Hosts {
            base: "my.eudic.net",
            check: "dict.eudic.net",
        },
        Language::French => Hosts {
            base: "my.frdic.com",
            check: "www.frdic.com",
        },
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordCount {
    records_total: u64,
}

#[derive(Debug, Deserialize)]
struct WordRows {
    data: Vec<WordRow>,
}

#[derive(Debug, Deserialize)]
struct WordRow {
    uuid: String,
}

fn parse_error(e: impl ToString) -> DictionaryError {
    DictionaryError::Parse {
        service: NAME,
        message: e.to_string(),
    }
}

/// Extract (name, id) of the word-book group links in the study-list page
fn parse_groups(html: &str) -> Vec<(String, i64)> {
    static LINK: OnceLock<Regex> = OnceLock::new();
    static DATA_ID: OnceLock<Regex> = OnceLock::new();
    static CLASS: OnceLock<Regex> = OnceLock::new();
    static NESTED: OnceLock<Regex> = OnceLock::new();
    static TAG: OnceLock<Regex> = OnceLock::new();
    let link = LINK.get_or_init(|| Regex::new(r"(?is)<a\s([^>]*)>(.*?)</a>").expect("valid regex"));
    let data_id = DATA_ID.get_or_init(|| Regex::new(r#"data-id\s*=\s*["']?(-?\d+)"#).expect("valid regex"));
    let class = CLASS.get_or_init(|| Regex::new(r#"class\s*=\s*["']([^"']*)["']"#).expect("valid regex"));
    // Nested elements such as word-count badges are not part of the name
    let nested = NESTED.get_or_init(|| {
        Regex::new(r"(?is)<([a-z][a-z0-9]*)\b[^>]*>[^<]*</[a-z][a-z0-9]*\s*>").expect("valid regex")
    });
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"));

    link.captures_iter(html)
        .filter_map(|caps| {
            let attrs = &caps[1];
            let classes = class.captures(attrs)?;
            if classes[1].trim() != GROUP_LINK_CLASS {
                return None;
            }
            let id = data_id.captures(attrs)?[1].parse().ok()?;
            let own_text = nested.replace_all(&caps[2], "");
            let name = tag.replace_all(&own_text, "");
            Some((decode_entities(name.trim()), id))
        })
        .collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Eudic (English) / Frdic (French) study list
pub struct Eudic {
    client: Client,
    retry: RetryPolicy,
    hosts: Hosts,
    session: Session,
    study_list: RwLock<Option<String>>,
}

impl Eudic {
    pub fn new(language: Language) -> Result<Self, DictionaryError> {
        Ok(Self {
            client: build_client(Duration::from_secs(10))?,
            retry: RetryPolicy::default(),
            hosts: hosts(language),
            session: Session::default(),
            study_list: RwLock::new(None),
        })
    }

    fn data_source_url(&self) -> String {
        format!("https://{}/StudyList/WordsDataSource", self.hosts.base)
    }

    fn post_data_source(&self, form: &[(&str, String)]) -> Result<String, DictionaryError> {
        let cookie = self.session.header(NAME)?;
        let url = self.data_source_url();
        let body = self
            .retry
            .send(|| self.client.post(&url).header(COOKIE, &cookie).form(form))?
            .text()?;
        Ok(body)
    }
}

impl Dictionary for Eudic {
    fn name(&self) -> &'static str {
        NAME
    }

    fn platform(&self) -> CredentialPlatform {
        CredentialPlatform::Eudic
    }

    fn login_url(&self) -> String {
        format!("https://{}/account/login", self.hosts.check)
    }

    fn login_check(&self, cookie: &Cookie, _content: &str) -> bool {
        cookie.contains_key(SESSION_COOKIE)
    }

    fn check_cookie(&self, cookie: &Cookie) -> Result<bool, DictionaryError> {
        if cookie.is_empty() {
            return Ok(false);
        }
        let header = cookie_header(cookie);
        let url = format!("https://{}/studylist", self.hosts.base);
        let resp = self
            .retry
            .send(|| self.client.get(&url).header(COOKIE, &header))?;

        let login_page = format!("{}/account/login", self.hosts.check);
        if resp.url().as_str().contains(&login_page) {
            log::info!("Cookie is invalid");
            return Ok(false);
        }

        let html = resp.text()?;
        *self.study_list.write().unwrap_or_else(|e| e.into_inner()) = Some(html);
        self.session.set(cookie);
        log::info!("Cookie is valid");
        Ok(true)
    }

    fn groups(&self) -> Result<Vec<(String, i64)>, DictionaryError> {
        let guard = self.study_list.read().unwrap_or_else(|e| e.into_inner());
        let html = guard.as_deref().ok_or(DictionaryError::NotLoggedIn(NAME))?;
        let groups = parse_groups(html);
        log::info!("Word book groups: {:?}", groups);
        Ok(groups)
    }

    fn total_pages(&self, group_name: &str, group_id: i64) -> Result<usize, DictionaryError> {
        let body = self.post_data_source(&[("categoryid", group_id.to_string())])?;
        let count: RecordCount = serde_json::from_str(&body).map_err(parse_error)?;
        let pages = page_count(count.records_total, WORDS_PER_PAGE);
        log::info!("Group {}({}) has {} pages", group_name, group_id, pages);
        Ok(pages)
    }

    fn words_by_page(
        &self,
        page: usize,
        group_name: &str,
        group_id: i64,
    ) -> Result<Vec<SimpleWord>, DictionaryError> {
        log::info!("Fetching group {}({}) page {}", group_name, group_id, page + 1);
        let form = [
            ("columns[2][data]", "word".to_string()),
            ("start", (page as u64 * WORDS_PER_PAGE).to_string()),
            ("length", WORDS_PER_PAGE.to_string()),
            ("categoryid", group_id.to_string()),
            ("_", (chrono::Utc::now().timestamp() * 1000).to_string()),
        ];
        let body = self.post_data_source(&form)?;
        let rows: WordRows = serde_json::from_str(&body).map_err(parse_error)?;
        let words: Vec<SimpleWord> = rows.data.into_iter().map(|r| SimpleWord::new(r.uuid)).collect();
        log::debug!("Group {}({}) page {}: {:?}", group_name, group_id, page + 1, words);
        Ok(words)
    }
}
