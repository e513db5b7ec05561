use super::CancelToken;
use crate::http::AssetFetcher;
use anyhow::Context;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    Tick,
    Done,
}

/// Assets to download as `(filename, url)` pairs
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub target_dir: PathBuf,
    pub images: Vec<(String, String)>,
    pub audios: Vec<(String, String)>,
    pub overwrite: bool,
    pub max_retry: usize,
}

impl DownloadRequest {
    pub fn new(target_dir: impl Into<PathBuf>, images: Vec<(String, String)>, audios: Vec<(String, String)>) -> Self {
        Self {
            target_dir: target_dir.into(),
            images,
            audios,
            overwrite: false,
            max_retry: 3,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len() + self.audios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub downloaded: usize,
    /// Already present and not overwritten
    pub skipped: usize,
    /// File names that could not be downloaded
    pub failed: Vec<String>,
}

enum Status {
    Downloaded,
    Skipped,
}

enum Failure {
    /// The fetch failed; a later attempt may succeed
    Fetch(anyhow::Error),
    /// The file could not be written; retrying cannot help
    Write(anyhow::Error),
}

fn download(fetcher: &dyn AssetFetcher, path: &Path, url: &str, overwrite: bool) -> Result<Status, Failure> {
    if path.exists() {
        if !overwrite {
            log::info!("[SKIP] {} already exists", path.display());
            return Ok(Status::Skipped);
        }
        log::warn!("Overwriting file {}", path.display());
    }

    log::info!("Downloading {}...", path.display());
    let data = fetcher.fetch(url).map_err(Failure::Fetch)?;
    std::fs::write(path, data)
        .with_context(|| format!("Failed to write {}", path.display()))
        .map_err(Failure::Write)?;
    log::info!("[OK] {} downloaded", path.display());
    Ok(Status::Downloaded)
}

fn download_with_retry(
    fetcher: &dyn AssetFetcher,
    path: &Path,
    url: &str,
    request: &DownloadRequest,
    cancel: &CancelToken,
) -> Option<Status> {
    for attempt in 1..=request.max_retry {
        if cancel.is_cancelled() {
            return None;
        }
        match download(fetcher, path, url, request.overwrite) {
            Ok(status) => return Some(status),
            Err(Failure::Fetch(e)) => log::warn!("Download of {} failed: {:#}", url, e),
            Err(Failure::Write(e)) => {
                log::error!("{:#}", e);
                return None;
            }
        }
        if attempt < request.max_retry && !cancel.is_cancelled() {
            log::info!("Retrying {} time...", attempt);
        }
    }
    None
}

/// Download images and audio files into the target directory.
///
/// Each asset gets at most `max_retry` attempts; a `Tick` follows every asset
/// that ends up present.
pub fn download_assets<F>(
    pool: &ThreadPool,
    fetcher: &dyn AssetFetcher,
    request: &DownloadRequest,
    cancel: &CancelToken,
    on_event: F,
) -> DownloadSummary
where
    F: Fn(DownloadEvent) + Sync,
{
    log::info!("Image download tasks({}): {:?}", request.images.len(), request.images);
    log::info!("Audio download tasks({}): {:?}", request.audios.len(), request.audios);

    let summary = Mutex::new(DownloadSummary::default());
    let tasks: Vec<&(String, String)> = request.images.iter().chain(request.audios.iter()).collect();

    pool.install(|| {
        tasks.par_iter().for_each(|(filename, url)| {
            let path = request.target_dir.join(filename);
            let status = download_with_retry(fetcher, &path, url, request, cancel);

            let mut summary = summary.lock().unwrap_or_else(|e| e.into_inner());
            match status {
                Some(Status::Downloaded) => summary.downloaded += 1,
                Some(Status::Skipped) => summary.skipped += 1,
                None => {
                    log::error!("FAILED to download {}", filename);
                    summary.failed.push(filename.clone());
                    return;
                }
            }
            drop(summary);
            on_event(DownloadEvent::Tick);
        });
    });

    on_event(DownloadEvent::Done);
    let mut summary = summary.into_inner().unwrap_or_else(|e| e.into_inner());
    summary.failed.sort();
    summary
}
