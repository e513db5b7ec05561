//! Shared HTTP plumbing: client construction, retry policy, cookie parsing
//! and the asset fetcher used by downloads.

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use std::collections::BTreeMap;
use std::time::Duration;

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_13_6) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/104.0.0.0 Safari/537.36";

/// Session cookie jar as sent to dictionary services
pub type Cookie = BTreeMap<String, String>;

/// Retry policy applied on connection errors and transient server errors
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub total: u32,
    pub backoff_factor: f64,
    pub status_forcelist: &'static [u16],
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            total: 5,
            backoff_factor: 1.0,
            status_forcelist: &[500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn with_backoff(backoff_factor: f64) -> Self {
        Self {
            backoff_factor,
            ..Default::default()
        }
    }

    /// Sleep before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let secs = self.backoff_factor * 2f64.powi(retry as i32 - 1);
        Duration::from_secs_f64(secs.max(0.0))
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }

    /// Send a request, rebuilding it for each attempt
    pub fn send<F>(&self, mut build: F) -> reqwest::Result<Response>
    where
        F: FnMut() -> RequestBuilder,
    {
        let attempts = self.total.max(1);
        let mut attempt = 1;
        loop {
            let last = attempt >= attempts;
            match build().send() {
                Ok(resp) if !last && self.should_retry_status(resp.status().as_u16()) => {
                    log::warn!(
                        "{} returned {}, retrying ({}/{})",
                        resp.url(),
                        resp.status(),
                        attempt,
                        attempts - 1
                    );
                }
                Ok(resp) => return Ok(resp),
                Err(e) if !last && (e.is_connect() || e.is_timeout()) => {
                    log::warn!("Request failed: {}, retrying ({}/{})", e, attempt, attempts - 1);
                }
                Err(e) => return Err(e),
            }
            std::thread::sleep(self.backoff(attempt));
            attempt += 1;
        }
    }
}

/// Blocking client with a browser user agent
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .cookie_store(true)
        .build()
}

/// Parse a cookie given either as a JSON object or as a `name=value; ...` header
pub fn parse_cookie(input: &str) -> Result<Cookie> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Cookie::new());
    }
    if input.starts_with('{') {
        return serde_json::from_str(input).context("Cookie JSON must map names to string values");
    }

    let mut cookie = Cookie::new();
    for pair in input.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        match pair.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                cookie.insert(name.trim().to_string(), value.trim().to_string());
            }
            _ => bail!("Malformed cookie pair: '{}'", pair),
        }
    }
    Ok(cookie)
}

/// Render a cookie as a `Cookie` request header value
pub fn cookie_header(cookie: &Cookie) -> String {
    cookie
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Source of media asset bytes
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches assets over HTTP with the retry policy applied per request
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = build_client(Duration::from_secs(60)).context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            policy: RetryPolicy::with_backoff(3.0),
        })
    }
}

impl AssetFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .policy
            .send(|| self.client.get(url))
            .with_context(|| format!("Failed to fetch {}", url))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("Failed to fetch {}: HTTP {}", url, status);
        }
        let bytes = resp.bytes().with_context(|| format!("Failed to read body of {}", url))?;
        Ok(bytes.to_vec())
    }
}
