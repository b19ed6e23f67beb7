//! Acquisition collaborator: fetch raw reach documents and cache them as
//! files. The core never touches the network; everything here feeds the
//! cache directory the `publish` command reads from.

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::ErrorDetail;

/// The upstream sits behind a CDN that rejects non-browser agents.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.1.0.dev0 Safari/537.36";

const MAX_ATTEMPTS: usize = 10;

static CACHE_FILE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"reach_(\d+)\.json$").unwrap());

pub fn build_client() -> Result<reqwest::Client, ErrorDetail> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()?)
}

pub fn document_url(base_url: &Url, reach_id: u64) -> Result<Url, ErrorDetail> {
    base_url
        .join(&format!("{reach_id}/.json"))
        .map_err(|e| ErrorDetail::Service(format!("invalid document URL for reach {reach_id}: {e}")))
}

/// Fetch the raw JSON document for one reach.
///
/// The upstream intermittently serves empty bodies and transient failures;
/// those are retried up to [`MAX_ATTEMPTS`] times before giving up.
pub async fn fetch_reach_document(
    client: &reqwest::Client,
    base_url: &Url,
    reach_id: u64,
) -> Result<serde_json::Value, ErrorDetail> {
    let url = document_url(base_url, reach_id)?;
    for attempt in 1..=MAX_ATTEMPTS {
        let response = match client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(error) => {
                debug!(reach_id, attempt, %error, "request failed");
                continue;
            }
        };
        if !response.status().is_success() {
            debug!(reach_id, attempt, status = %response.status(), "non-success response");
            continue;
        }
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(error) => {
                debug!(reach_id, attempt, %error, "failed to read body");
                continue;
            }
        };
        if body.is_empty() {
            debug!(reach_id, attempt, "empty body");
            continue;
        }
        return serde_json::from_slice(&body).map_err(ErrorDetail::ParseJson);
    }
    Err(ErrorDetail::Download {
        reach_id,
        attempts: MAX_ATTEMPTS,
    })
}

pub fn cache_file_name(reach_id: u64) -> String {
    format!("reach_{reach_id:08}.json")
}

pub fn cache_path(cache_dir: &Path, reach_id: u64) -> PathBuf {
    cache_dir.join(cache_file_name(reach_id))
}

/// Reach ids already present in the cache directory, sorted ascending.
pub fn cached_reach_ids(cache_dir: &Path) -> Vec<u64> {
    let pattern = cache_dir.join("reach_*.json");
    let Some(pattern) = pattern.to_str() else {
        return Vec::new();
    };
    let Ok(entries) = glob::glob(pattern) else {
        return Vec::new();
    };
    let mut ids: Vec<u64> = entries
        .flatten()
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?;
            let caps = CACHE_FILE.captures(name)?;
            caps[1].parse().ok()
        })
        .collect();
    ids.sort_unstable();
    ids
}

/// All cached document paths, sorted by file name so runs are repeatable.
pub fn cached_document_paths(cache_dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = cache_dir
        .to_str()
        .and_then(|dir| glob::glob(&format!("{dir}/reach_*.json")).ok())
        .map(|entries| entries.flatten().collect())
        .unwrap_or_default();
    paths.sort();
    paths
}
