use super::{QueryApi, QueryError};
use crate::config::AppConfig;
use crate::http::{build_client, RetryPolicy};
use crate::models::{QueryResult, SimpleWord};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const NAME: &str = "Apora API";

const BASE_URL: &str = "https://apora.sumku.cc/api";

#[derive(Debug, Serialize, PartialEq)]
struct Request<'a> {
    inquire: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    variant: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Data>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Data {
    meaning: Option<String>,
    part_of_speech: Option<String>,
    original: Option<String>,
    chinese_meaning: Option<String>,
    ipa: Option<String>,
    context: Option<String>,
    file_name_tag: Option<String>,
    replacing: Option<String>,
}

/// Apora dictionary API (bearer token auth)
pub struct Apora {
    client: Client,
    retry: RetryPolicy,
    base_url: String,
    token: String,
    term_speaking: bool,
    context_speaking: bool,
    us_speaking: bool,
    gb_speaking: bool,
    enable_context: bool,
}

impl Apora {
    pub fn new(config: &AppConfig) -> Result<Self, QueryError> {
        Ok(Self {
            client: build_client(Duration::from_secs(60))?,
            retry: RetryPolicy::default(),
            base_url: BASE_URL.to_string(),
            token: config.apora_api_token.clone(),
            term_speaking: config.term_speaking,
            context_speaking: config.context_speaking,
            us_speaking: config.us_speaking,
            gb_speaking: config.great_britain_speaking,
            enable_context: config.enable_context,
        })
    }

    fn request<'a>(&self, term: &'a str) -> Request<'a> {
        let speech = if self.term_speaking {
            Some("tts_words")
        } else if self.context_speaking {
            Some("tts_sentence")
        } else {
            None
        };
        let variant = if self.gb_speaking {
            Some("GB")
        } else if self.us_speaking {
            Some("US")
        } else {
            None
        };
        Request {
            inquire: term,
            speech,
            variant,
        }
    }

    fn audio_url(&self, tag: &str) -> String {
        format!("{}/audio/{}/{}.wav", self.base_url, self.token, tag)
    }

    fn parse_response(&self, term: &str, status: u16, body: &str) -> Result<Option<QueryResult>, QueryError> {
        if status == 402 {
            return Err(QueryError::InsufficientBalance);
        }

        let resp: Response = match serde_json::from_str(body) {
            Ok(resp) => resp,
            Err(e) if (200..300).contains(&status) => return Err(QueryError::Parse(e.to_string())),
            Err(_) => {
                return Err(QueryError::Api {
                    status,
                    message: body.chars().take(200).collect(),
                })
            }
        };

        let message = resp.message.unwrap_or_default();
        if message.to_lowercase().contains("balance") && !resp.success {
            return Err(QueryError::InsufficientBalance);
        }
        if !(200..300).contains(&status) {
            return Err(QueryError::Api { status, message });
        }

        let data = match resp.data {
            Some(data) if resp.success => data,
            _ => {
                log::warn!("Query for '{}' failed: {}", term, message);
                return Ok(None);
            }
        };

        let speaking = self.term_speaking || self.context_speaking;
        let audio = data
            .file_name_tag
            .as_deref()
            .filter(|tag| speaking && !tag.is_empty())
            .map(|tag| self.audio_url(tag));

        Ok(Some(QueryResult {
            term: term.to_string(),
            definition: data.meaning,
            part_of_speech: data.part_of_speech,
            original: data.original,
            chinese_definition: data.chinese_meaning,
            ipa: data.ipa,
            context: data.context,
            collocation: None,
            context_audio_url: audio.clone(),
            term_audio_url: audio,
            replacing: data.replacing.filter(|_| self.enable_context),
        }))
    }
}

impl QueryApi for Apora {
    fn name(&self) -> &'static str {
        NAME
    }

    fn query(&self, word: &SimpleWord) -> Result<Option<QueryResult>, QueryError> {
        if self.token.is_empty() {
            return Err(QueryError::MissingToken);
        }

        let url = format!("{}/dict", self.base_url);
        let payload = self.request(&word.term);
        let resp = self
            .retry
            .send(|| self.client.post(&url).bearer_auth(&self.token).json(&payload))?;
        let status = resp.status().as_u16();
        let body = resp.text()?;
        log::debug!("code: {} word: {} text: {}", status, word.term, body);

        let result = self.parse_response(&word.term, status, &body)?;
        log::debug!("{:?}", result);
        Ok(result)
    }
}
