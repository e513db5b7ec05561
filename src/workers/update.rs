use crate::http::{build_client, RetryPolicy};
use anyhow::{Context, Result};
use rayon::ThreadPool;
use serde::Deserialize;
use std::time::Duration;

pub const RELEASE_URL: &str = "https://github.com/dict2deck/dict2deck/releases";
const VERSION_CHECK_API: &str = "https://api.github.com/repos/dict2deck/dict2deck/releases/latest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
    pub version: String,
    pub changelog: String,
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    body: Option<String>,
}

fn normalize(version: &str) -> &str {
    version.trim().trim_start_matches('v')
}

/// Compare a release payload against the running version
fn newer_release(body: &str, current_version: &str) -> Result<Option<NewVersion>> {
    let release: Release = serde_json::from_str(body).context("Malformed release response")?;
    if normalize(&release.tag_name) == normalize(current_version) {
        return Ok(None);
    }
    Ok(Some(NewVersion {
        version: release.tag_name,
        changelog: release.body.unwrap_or_default().trim().to_string(),
    }))
}

/// Look up the latest published release on the update pool
pub fn check_for_update(pool: &ThreadPool, current_version: &str) -> Result<Option<NewVersion>> {
    pool.install(|| -> Result<Option<NewVersion>> {
        let client = build_client(Duration::from_secs(10)).context("Failed to build HTTP client")?;
        let resp = RetryPolicy::default()
            .send(|| client.get(VERSION_CHECK_API).header("Accept", "application/vnd.github+json"))
            .context("Failed to query latest release")?;
        if !resp.status().is_success() {
            anyhow::bail!("Latest release lookup returned HTTP {}", resp.status());
        }
        let body = resp.text().context("Failed to read release response")?;
        let found = newer_release(&body, current_version)?;
        match &found {
            Some(new) => log::info!("New version available: {}", new.version),
            None => log::info!("Already on the latest version {}", current_version),
        }
        Ok(found)
    })
}
