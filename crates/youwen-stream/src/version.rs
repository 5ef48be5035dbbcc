//! Background check for a newer published release.
//!
//! The check never blocks the main request: it runs as a detached task that only
//! writes a cache file, which later invocations read to print an update notice.
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub const VERSION_ENDPOINT: &str = "/api/skill/version";
pub const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
pub const VERSION_CACHE_FILE: &str = "version-cache.json";

/// Remote release metadata. Both fields are empty when the lookup failed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: Option<String>,
    pub download_url: Option<String>,
}

impl VersionInfo {
    pub fn from_json(value: &Value) -> Self {
        Self {
            version: first_text(value, &["version", "latest_version"]),
            download_url: first_text(value, &["downloadUrl", "download_url"]),
        }
    }
}

fn first_text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

/// Compares dotted versions numerically on the first three components.
///
/// Missing or non-numeric components count as zero.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts = |v: &str| -> [u64; 3] {
        let mut out = [0; 3];
        for (slot, part) in out.iter_mut().zip(v.trim().split('.')) {
            *slot = part.trim().parse().unwrap_or(0);
        }
        out
    };
    parts(a).cmp(&parts(b))
}

/// Asks the backend for the latest version of `skill_name`. Never fails.
pub async fn fetch_remote_version(
    base_url: &str,
    skill_name: &str,
    token: Option<&str>,
) -> VersionInfo {
    let url = format!("{}{}", base_url.trim_end_matches('/'), VERSION_ENDPOINT);
    let client = reqwest::Client::new();
    let mut request = client
        .get(&url)
        .query(&[("name", skill_name)])
        .header(reqwest::header::ACCEPT, "application/json")
        .timeout(VERSION_CHECK_TIMEOUT);
    if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
        request = request.bearer_auth(token);
    }
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            debug!(url = %url, error = %e, "version check request failed");
            return VersionInfo::default();
        }
    };
    match response.json::<Value>().await {
        Ok(json) => VersionInfo::from_json(&json),
        Err(e) => {
            debug!(url = %url, error = %e, "version check returned no JSON");
            VersionInfo::default()
        }
    }
}

/// Last known result of a version check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionCache {
    pub last_check: DateTime<Utc>,
    pub local_version: String,
    pub remote_version: Option<String>,
    pub download_url: Option<String>,
}

impl VersionCache {
    pub fn new(local_version: impl Into<String>, remote: VersionInfo) -> Self {
        Self {
            last_check: Utc::now(),
            local_version: local_version.into(),
            remote_version: remote.version,
            download_url: remote.download_url,
        }
    }

    /// Reads a cache file. Missing or unparsable files yield `None`.
    pub fn load(path: &Path) -> Option<Self> {
        let text = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&text).ok()
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Newer remote version, if one is known.
    pub fn update_available(&self) -> Option<&str> {
        self.remote_version
            .as_deref()
            .filter(|remote| compare_versions(&self.local_version, remote) == Ordering::Less)
    }
}

/// Default location of the cache file under the user cache directory.
pub fn default_cache_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("youwen").join(VERSION_CACHE_FILE))
}

/// Inputs of one background version check.
#[derive(Clone, Debug)]
pub struct VersionCheck {
    pub base_url: String,
    pub skill_name: String,
    pub local_version: String,
    pub token: Option<String>,
    pub cache_path: PathBuf,
}

/// Starts the check as a detached task. Callers may drop the handle; failures are
/// logged at debug level and otherwise ignored.
pub fn spawn_version_check(check: VersionCheck) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let remote =
            fetch_remote_version(&check.base_url, &check.skill_name, check.token.as_deref()).await;
        let cache = VersionCache::new(check.local_version, remote);
        match cache.save(&check.cache_path) {
            Ok(()) => debug!(
                path = %check.cache_path.display(),
                remote = ?cache.remote_version,
                "version cache updated"
            ),
            Err(e) => debug!(path = %check.cache_path.display(), error = %e, "version cache not written"),
        }
    })
}
