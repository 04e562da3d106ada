//! Disk cache of derived tables
//!
//! Every derivation is memoized on disk as one JSON artifact, named after the
//! derivation and its parameters. Once an artifact exists, it is trusted
//! until someone deletes it: there is no expiration and no fingerprint of the
//! raw input files, so artifacts go stale silently when the raw data changes.
//! Use [`DataCache::clear()`] after updating the dataset.

use crate::{
    error::{Error, Result},
    table::Table,
};
use sha2::{Digest, Sha256};
use std::{
    fmt::{self, Display},
    future::Future,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::fs;

/// Identity of a derived table
///
/// Two keys are equal if and only if they designate the same derivation with
/// the same parameters, so that a parametrized derivation can never be served
/// a result that was computed for other parameters.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ArtifactKey {
    /// Name of the derivation
    derivation: &'static str,

    /// Parameters of the derivation, in the order they were specified
    params: Vec<(&'static str, Box<str>)>,
}
//
impl ArtifactKey {
    /// Identify a derivation without parameters
    pub fn new(derivation: &'static str) -> Self {
        debug_assert!(
            (derivation.chars()).all(|c| c.is_ascii_alphanumeric() || c == '_'),
            "derivation names are used as file names"
        );
        Self {
            derivation,
            params: Vec::new(),
        }
    }

    /// Add a parameter
    pub fn param(mut self, name: &'static str, value: impl Display) -> Self {
        self.params.push((name, value.to_string().into()));
        self
    }

    /// Add a list-valued parameter
    ///
    /// The order of list elements is significant.
    pub fn list_param<T: Display>(self, name: &'static str, values: &[T]) -> Self {
        let joined = (values.iter())
            .map(|v| {
                // Escape the separator so that ["a,b"] and ["a", "b"] differ
                v.to_string().replace('\\', "\\\\").replace(',', "\\,")
            })
            .collect::<Vec<_>>()
            .join(",");
        self.param(name, format!("[{joined}]"))
    }

    /// File stem under which the artifact is stored
    ///
    /// Parameters are hashed rather than spelled out, as they may contain
    /// characters that are not valid in file names.
    pub fn file_stem(&self) -> String {
        if self.params.is_empty() {
            return self.derivation.to_owned();
        }
        let mut hasher = Sha256::new();
        for (name, value) in &self.params {
            hasher.update(name.as_bytes());
            hasher.update([0]);
            hasher.update(value.as_bytes());
            hasher.update([0]);
        }
        let digest = hex::encode(hasher.finalize());
        format!("{}-{}", self.derivation, &digest[..16])
    }
}
//
impl Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.derivation)?;
        if !self.params.is_empty() {
            f.write_str("(")?;
            for (idx, (name, value)) in self.params.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{name}={value}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Directory of derived table artifacts
#[derive(Clone, Debug)]
pub struct DataCache {
    /// Location of the artifacts
    dir: PathBuf,
}
//
impl DataCache {
    /// Set up a cache in some directory, which is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Location of the artifact associated with some key
    pub fn path(&self, key: &ArtifactKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.file_stem()))
    }

    /// Get a derived table from the cache, computing and saving it on a miss
    ///
    /// `compute` is only called if there is no artifact for `key` yet. If its
    /// result cannot be saved, the failure is logged and the freshly computed
    /// table is returned anyway.
    pub async fn get_or_compute<F, Fut>(&self, key: &ArtifactKey, compute: F) -> Result<Table>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Table>>,
    {
        if let Some(table) = self.load(key).await? {
            log::debug!("Cache hit for {key}");
            return Ok(table);
        }
        log::debug!("Cache miss for {key}, computing it");
        let table = compute().await?;
        match self.save(key, &table).await {
            Ok(()) => log::info!("Saved {key} to {}", self.path(key).display()),
            Err(e) => log::warn!("Failed to cache {key}: {e}"),
        }
        Ok(table)
    }

    /// Truth that an artifact exists for some key
    pub async fn contains(&self, key: &ArtifactKey) -> bool {
        fs::try_exists(self.path(key)).await.unwrap_or(false)
    }

    /// Delete the artifact associated with some key, if any
    pub async fn invalidate(&self, key: &ArtifactKey) -> Result<()> {
        let path = self.path(key);
        match fs::remove_file(&path).await {
            Ok(()) => {
                log::info!("Invalidated {key}");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Error::Cache { path, source }),
        }
    }

    /// Delete every artifact, returning how many there were
    pub async fn clear(&self) -> Result<usize> {
        let cache_error = |source| Error::Cache {
            path: self.dir.clone(),
            source,
        };
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(cache_error(e)),
        };
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await.map_err(cache_error)? {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let is_artifact = name.ends_with(".json");
            if !is_artifact && !name.ends_with(".json.tmp") {
                continue;
            }
            if let Err(source) = fs::remove_file(&path).await {
                return Err(Error::Cache { path, source });
            }
            if is_artifact {
                removed += 1;
            } else {
                log::debug!("Removed leftover temporary file {}", path.display());
            }
        }
        log::info!("Removed {removed} artifacts from {}", self.dir.display());
        Ok(removed)
    }

    /// Load an artifact, if it exists and can be read
    ///
    /// An artifact that cannot be read is treated like a missing one, but an
    /// artifact that can be read and is not a table is an error.
    async fn load(&self, key: &ArtifactKey) -> Result<Option<Table>> {
        let path = self.path(key);
        let json = match fs::read(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                log::warn!("Failed to read cached {key} from {}: {e}", path.display());
                return Ok(None);
            }
        };
        serde_json::from_slice(&json)
            .map(Some)
            .map_err(|source| Error::CorruptArtifact { path, source })
    }

    /// Save an artifact
    async fn save(&self, key: &ArtifactKey, table: &Table) -> Result<()> {
        let path = self.path(key);
        let cache_error = |source| Error::Cache {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).await.map_err(cache_error)?;
        let json = serde_json::to_vec(table).map_err(|source| Error::CorruptArtifact {
            path: path.clone(),
            source,
        })?;
        write_atomically(&path, &json).await.map_err(cache_error)
    }
}

/// Write a file through a temporary `.tmp` sibling that is then renamed into
/// place, so that readers never observe a partially written file
pub async fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);
    fs::write(&tmp_path, contents).await?;
    fs::rename(&tmp_path, path).await
}
