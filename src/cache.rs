//! Spec fetching and time-bounded on-disk persistence.
//!
//! One file per spec location, named by a SHA-256 digest of the location so
//! filenames stay filesystem-safe and fixed-length. File mtime is the
//! freshness clock; expiry is lazy (a stale entry is deleted at the access
//! that notices it, then refetched). Writes go to a temp file in the same
//! directory and are renamed into place, so a concurrent reader never sees a
//! half-written entry and duplicate fetches from racing processes stay benign.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::GuardConfig;
use crate::error::SpecGuardError;
use crate::spec::SpecIndex;

const CACHE_EXTENSION: &str = "spec.json";

// Distinguishes concurrent writers within one process; the pid in the temp
// name keeps concurrent processes apart.
static WRITER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Fetches, parses, and caches OpenAPI documents, returning a queryable index.
#[derive(Debug, Clone)]
pub struct SpecCache {
    cache_dir: PathBuf,
    ttl: Duration,
    client: reqwest::Client,
}

impl SpecCache {
    pub fn new(config: &GuardConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .expect("Failed to construct spec fetch client");
        SpecCache {
            cache_dir: config.cache_dir.clone(),
            ttl: config.cache_ttl,
            client,
        }
    }

    /// Return the index for `spec_url`, from disk when fresh, over HTTP
    /// otherwise. Performs at most one fetch attempt per miss.
    pub async fn load(&self, spec_url: &str) -> Result<SpecIndex, SpecGuardError> {
        let entry = self.entry_path(spec_url);

        let document = match self.read_fresh(&entry)? {
            Some(document) => {
                debug!(spec_url, entry = %entry.display(), "spec cache hit");
                document
            }
            None => {
                debug!(spec_url, "spec cache miss, fetching");
                let document = self.fetch_and_parse(spec_url).await?;
                self.persist(&entry, &document)?;
                document
            }
        };

        SpecIndex::from_document(&document, spec_url)
    }

    /// Cache file for a spec location: digest of the location, fixed extension.
    pub fn entry_path(&self, spec_url: &str) -> PathBuf {
        let digest = Sha256::digest(spec_url.as_bytes());
        self.cache_dir.join(format!("{digest:x}.{CACHE_EXTENSION}"))
    }

    /// Read a cache entry if it exists and is within TTL.
    ///
    /// A stale or corrupt entry is deleted and reported as a miss; only a
    /// failing read of a fresh entry is an error.
    fn read_fresh(&self, entry: &Path) -> Result<Option<Value>, SpecGuardError> {
        let metadata = match fs::metadata(entry) {
            Ok(metadata) => metadata,
            Err(_) => return Ok(None),
        };

        let age = metadata.modified().ok().and_then(|m| m.elapsed().ok());
        if !matches!(age, Some(age) if age <= self.ttl) {
            let _ = fs::remove_file(entry);
            return Ok(None);
        }

        let bytes = fs::read(entry).map_err(|source| SpecGuardError::Cache {
            path: entry.to_path_buf(),
            source,
        })?;
        match serde_json::from_slice(&bytes) {
            Ok(document) => Ok(Some(document)),
            Err(_) => {
                let _ = fs::remove_file(entry);
                Ok(None)
            }
        }
    }

    async fn fetch_and_parse(&self, spec_url: &str) -> Result<Value, SpecGuardError> {
        let response =
            self.client
                .get(spec_url)
                .send()
                .await
                .map_err(|e| SpecGuardError::Fetch {
                    url: spec_url.to_string(),
                    reason: e.to_string(),
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpecGuardError::Fetch {
                url: spec_url.to_string(),
                reason: format!("unexpected status {status}"),
            });
        }

        let text = response.text().await.map_err(|e| SpecGuardError::Fetch {
            url: spec_url.to_string(),
            reason: e.to_string(),
        })?;

        // YAML is a superset of JSON, so one parser covers both spec forms.
        serde_yaml::from_str(&text).map_err(|e| SpecGuardError::Parse {
            url: spec_url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Persist via write-to-temp-then-rename so no reader observes a partial
    /// entry. Every writer gets its own temp file, so racing cache misses for
    /// the same key (parallel test threads, or separate processes) each
    /// publish a complete document; last rename wins. Overwrites any stale
    /// entry for the same key.
    fn persist(&self, entry: &Path, document: &Value) -> Result<(), SpecGuardError> {
        let cache_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| SpecGuardError::Cache { path, source }
        };

        fs::create_dir_all(&self.cache_dir).map_err(cache_err(&self.cache_dir))?;

        let bytes = serde_json::to_vec(document)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            .map_err(cache_err(entry))?;

        let tmp = temp_path(entry);
        fs::write(&tmp, bytes).map_err(cache_err(&tmp))?;
        fs::rename(&tmp, entry).map_err(cache_err(entry))?;
        Ok(())
    }
}

/// Temp file for one write of `entry`, unique per writer.
fn temp_path(entry: &Path) -> PathBuf {
    let seq = WRITER_SEQ.fetch_add(1, Ordering::Relaxed);
    entry.with_extension(format!("tmp.{}.{seq}", std::process::id()))
}
