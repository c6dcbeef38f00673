// ABOUTME: Checks the GitHub releases feed for a newer launcher build and downloads it.
// ABOUTME: Applies the update by renaming the running executable aside and moving the download into place.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::Config;

type DynError = Box<dyn std::error::Error + Send + Sync>;

const USER_AGENT: &str = concat!("ol2launch/", env!("CARGO_PKG_VERSION"));

/// `major.minor.patch`, each below 1000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl Version {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let text = text
            .strip_prefix('v')
            .or_else(|| text.strip_prefix('V'))
            .unwrap_or(text);
        let mut parts = text.split('.').map(|part| {
            part.parse::<u16>().ok().filter(|n| *n < 1000)
        });
        let version = Version {
            major: parts.next()??,
            minor: parts.next()??,
            patch: parts.next()??,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    UpToDate,
    Available { tag: String, url: String },
}

/// Tag and download URL of `executable_name` in the newest release.
pub fn latest_asset(releases: &[Release], executable_name: &str) -> Option<(String, String)> {
    let Some(latest) = releases.first() else {
        tracing::info!("No releases found.");
        return None;
    };
    let asset = latest.assets.iter().find(|a| a.name == executable_name);
    if asset.is_none() {
        tracing::warn!("Executable {executable_name} not found in release {}", latest.tag_name);
    }
    asset.map(|a| (latest.tag_name.clone(), a.browser_download_url.clone()))
}

/// Strictly newer. Unparsable versions never require an update.
pub fn is_update_required(current: &str, latest: &str) -> bool {
    match (Version::parse(current), Version::parse(latest)) {
        (Some(current), Some(latest)) => current.cmp(&latest) == Ordering::Less,
        _ => {
            tracing::warn!("Can't compare versions {current:?} and {latest:?}");
            false
        }
    }
}

pub struct Updater {
    client: reqwest::Client,
    feed_url: String,
    executable_name: String,
    current_version: String,
}

impl Updater {
    pub fn new(config: &Config, current_version: &str) -> Result<Self, DynError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            feed_url: config.update.feed_url.clone(),
            executable_name: config.update.executable_name.clone(),
            current_version: current_version.to_string(),
        })
    }

    pub fn executable_name(&self) -> &str {
        &self.executable_name
    }

    pub async fn fetch_releases(&self) -> Result<Vec<Release>, DynError> {
        let response = self.client.get(&self.feed_url).send().await?;
        if !response.status().is_success() {
            return Err(format!("HTTP {} fetching {}", response.status(), self.feed_url).into());
        }
        Ok(response.json().await?)
    }

    pub async fn check(&self) -> Result<UpdateCheck, DynError> {
        tracing::info!("Checking for updates...");
        let releases = self.fetch_releases().await?;
        let Some((tag, url)) = latest_asset(&releases, &self.executable_name) else {
            return Ok(UpdateCheck::UpToDate);
        };
        tracing::debug!("Current version: {}, latest: {tag}", self.current_version);
        if is_update_required(&self.current_version, &tag) {
            Ok(UpdateCheck::Available { tag, url })
        } else {
            Ok(UpdateCheck::UpToDate)
        }
    }

    /// Stream `url` into `dest` through a `.part` file.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<(), DynError> {
        use futures_util::StreamExt;
        use tokio::io::AsyncWriteExt;

        tracing::info!("Downloading {} from {url}", self.executable_name);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(format!("HTTP {} downloading {url}", response.status()).into());
        }

        let total_size = response.content_length();
        let mut stream = response.bytes_stream();
        let tmp_path = with_suffix(dest, ".part");
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        let mut downloaded: u64 = 0;
        let mut last_pct = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if let Some(total) = total_size.filter(|t| *t > 0) {
                let pct = downloaded * 100 / total;
                if pct >= last_pct + 10 {
                    tracing::info!("Downloaded {pct}%");
                    last_pct = pct;
                }
            }
        }

        file.flush().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, dest).await?;
        tracing::info!("{} downloaded to {}", self.executable_name, dest.display());
        Ok(())
    }
}

/// `path` with `suffix` appended to the whole file name.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

pub fn previous_path(current_exe: &Path) -> PathBuf {
    with_suffix(current_exe, ".old")
}

/// Swap `downloaded` in for `current_exe`. The running binary is renamed to `<exe>.old`
/// and put back if the move fails.
pub fn apply_update(downloaded: &Path, current_exe: &Path) -> Result<(), DynError> {
    let previous = previous_path(current_exe);
    if previous.exists() {
        std::fs::remove_file(&previous)?;
    }
    std::fs::rename(current_exe, &previous)?;
    if let Err(e) = std::fs::rename(downloaded, current_exe) {
        tracing::error!("Could not move the update into place: {e}");
        std::fs::rename(&previous, current_exe)?;
        return Err(e.into());
    }
    tracing::info!("Launcher updated; restart to use the new version");
    Ok(())
}

/// Remove the executable left behind by the last update. Returns true if one was removed.
pub fn cleanup_previous(current_exe: &Path) -> bool {
    let previous = previous_path(current_exe);
    match std::fs::remove_file(&previous) {
        Ok(()) => {
            tracing::info!("Removed {}", previous.display());
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!("Could not remove {}: {e}", previous.display());
            false
        }
    }
}

/// Store `current` as the last version run. Returns true when a different version ran before,
/// meaning the launcher was just updated.
pub fn record_version(config: &mut Config, current: &str) -> bool {
    let updated = !config.update.version.is_empty() && config.update.version != current;
    if updated {
        tracing::info!(
            "Launcher updated from {} to {current}",
            config.update.version
        );
    }
    config.update.version = current.to_string();
    updated
}
