// On-disk bucket persistence
// Author: kelexine (https://github.com/kelexine)

use super::models::BucketSnapshot;
use crate::error::Result;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One JSON file per bucket, named by the SHA-256 of the bucket name so
/// arbitrary version strings map to safe file names.
#[derive(Debug)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        debug!("Cache storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        let digest = Sha256::digest(name.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Write via a temp file and rename so a crash never leaves a torn bucket.
    pub async fn save(&self, snapshot: &BucketSnapshot) -> Result<()> {
        let path = self.path_for(&snapshot.name);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec(snapshot)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(
            "Persisted bucket '{}' ({} entries)",
            snapshot.name,
            snapshot.entries.len()
        );
        Ok(())
    }

    pub async fn remove(&self, name: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load every bucket file, oldest bucket first. Unreadable files are
    /// skipped with a warning.
    pub async fn load_all(&self) -> Result<Vec<BucketSnapshot>> {
        let mut snapshots = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping unreadable bucket file {}: {}", path.display(), e);
                    continue;
                }
            };
            match serde_json::from_slice::<BucketSnapshot>(&bytes) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => warn!("Skipping unreadable bucket file {}: {}", path.display(), e),
            }
        }

        snapshots.sort_by_key(|s| s.created_at);
        Ok(snapshots)
    }
}
