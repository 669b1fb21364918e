use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use crate::installer::Installer;
use crate::{Error, Result};

pub const VERSIONS_DIR: &str = "versions";
pub const MANIFEST_FILE: &str = "version_manifest.json";

/// Release types hidden from the available list. Matched as substrings,
/// case-insensitively, so `old_alpha` and `old_beta` are caught too.
const UNSTABLE_MARKERS: &[&str] = &["snapshot", "pre", "alpha", "beta"];

pub type VersionId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    pub id: VersionId,
    #[serde(rename = "type")]
    pub release_type: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub time: String,
    #[serde(default, rename = "releaseTime")]
    pub release_time: String,
}

impl VersionMetadata {
    pub fn new(id: impl Into<String>, release_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            release_type: release_type.into(),
            url: String::new(),
            time: String::new(),
            release_time: String::new(),
        }
    }

    pub fn is_stable(&self) -> bool {
        let release_type = self.release_type.to_lowercase();
        !UNSTABLE_MARKERS
            .iter()
            .any(|marker| release_type.contains(marker))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionManifest {
    pub latest: Latest,
    pub versions: Vec<VersionMetadata>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Latest {
    pub release: String,
    pub snapshot: String,
}

/// One all-digit part of a dotted id, kept as its digits without leading
/// zeros so parts of any length compare by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumericPart(String);

impl NumericPart {
    pub fn parse(part: &str) -> Option<Self> {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let digits = part.trim_start_matches('0');
        let digits = if digits.is_empty() { "0" } else { digits };
        Some(Self(digits.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for NumericPart {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for NumericPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Numeric key for dotted ids: `"1.20.1"` becomes `[1, 20, 1]`. Any part
/// that is not a base-10 integer collapses the whole id to the empty key,
/// which orders before every numeric id.
pub fn sort_key(id: &str) -> Vec<NumericPart> {
    id.split('.')
        .map(NumericPart::parse)
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}

/// Stable sort by [`sort_key`]; ids sharing a key keep their input order.
pub fn sort_versions(ids: &mut [VersionId]) {
    ids.sort_by_key(|id| sort_key(id));
}

pub struct VersionCatalog {
    installer: Arc<dyn Installer>,
    install_root: PathBuf,
}

impl VersionCatalog {
    pub fn new(installer: Arc<dyn Installer>, install_root: PathBuf) -> Self {
        Self {
            installer,
            install_root,
        }
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Stable releases known to the installer, filtered by type before sorting.
    pub async fn list_available(&self) -> Result<Vec<VersionId>> {
        let metadata = self.installer.list_version_metadata().await?;
        let mut ids: Vec<VersionId> = metadata
            .into_iter()
            .filter(VersionMetadata::is_stable)
            .map(|version| version.id)
            .collect();

        sort_versions(&mut ids);
        log::debug!("{} available versions", ids.len());
        Ok(ids)
    }

    pub async fn list_downloaded(&self) -> Result<Vec<VersionId>> {
        list_downloaded(&self.install_root).await
    }
}

/// Directory names under `<root>/versions`, sorted by [`sort_key`] with no
/// type filtering.
pub async fn list_downloaded(root: &Path) -> Result<Vec<VersionId>> {
    let versions_dir = root.join(VERSIONS_DIR);

    let mut entries = match fs::read_dir(&versions_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound(versions_dir));
        }
        Err(e) => return Err(e.into()),
    };

    let mut ids = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            ids.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    // read_dir order is platform-defined; start from a deterministic order
    // so the stable sort below is reproducible for non-numeric names.
    ids.sort();
    sort_versions(&mut ids);
    Ok(ids)
}
