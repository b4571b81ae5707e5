// Cache storage - the process-wide set of named buckets
// Author: kelexine (https://github.com/kelexine)

use super::bucket::CacheBucket;
use super::persist::DiskStore;
use crate::error::Result;
use crate::network::{FetchRequest, FetchResponse};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// All cache buckets for the origin, in creation order.
pub struct CacheStorage {
    buckets: RwLock<Vec<Arc<CacheBucket>>>,
    disk: Option<Arc<DiskStore>>,
}

impl CacheStorage {
    /// Storage that lives for the lifetime of the process.
    pub fn in_memory() -> Self {
        Self {
            buckets: RwLock::new(Vec::new()),
            disk: None,
        }
    }

    /// Storage backed by `dir`, reloading whatever buckets a previous run
    /// left there.
    pub async fn persistent(dir: impl AsRef<Path>) -> Result<Self> {
        let disk = Arc::new(DiskStore::open(dir).await?);
        let buckets: Vec<Arc<CacheBucket>> = disk
            .load_all()
            .await?
            .into_iter()
            .map(|snapshot| Arc::new(CacheBucket::from_snapshot(snapshot, Some(Arc::clone(&disk)))))
            .collect();

        info!(
            "Loaded {} cache bucket(s) from {}",
            buckets.len(),
            disk.dir().display()
        );

        Ok(Self {
            buckets: RwLock::new(buckets),
            disk: Some(disk),
        })
    }

    pub fn is_persistent(&self) -> bool {
        self.disk.is_some()
    }

    /// Open the bucket called `name`, creating it if absent.
    pub async fn open(&self, name: &str) -> Result<Arc<CacheBucket>> {
        let created = {
            let mut buckets = self.buckets.write();
            if let Some(bucket) = buckets.iter().find(|b| b.name() == name) {
                return Ok(Arc::clone(bucket));
            }
            let bucket = Arc::new(CacheBucket::new(name.to_string(), self.disk.clone()));
            buckets.push(Arc::clone(&bucket));
            bucket
        };

        debug!("Created cache bucket '{}'", name);
        created.persist().await?;
        Ok(created)
    }

    pub fn get(&self, name: &str) -> Option<Arc<CacheBucket>> {
        self.buckets
            .read()
            .iter()
            .find(|b| b.name() == name)
            .cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Bucket names, oldest first.
    pub fn keys(&self) -> Vec<String> {
        self.buckets
            .read()
            .iter()
            .map(|b| b.name().to_string())
            .collect()
    }

    /// Destroy a bucket and its entries. Returns whether it existed.
    ///
    /// The on-disk copy goes first; if removing it fails the bucket stays
    /// listed.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let Some(bucket) = self.get(name) else {
            return Ok(false);
        };
        bucket.destroy().await?;

        let removed = {
            let mut buckets = self.buckets.write();
            match buckets.iter().position(|b| Arc::ptr_eq(b, &bucket)) {
                Some(idx) => {
                    buckets.remove(idx);
                    true
                }
                None => false,
            }
        };
        if removed {
            info!("Deleted cache bucket '{}' ({} entries)", name, bucket.len());
        }
        Ok(removed)
    }

    /// Search every bucket, oldest first, for a stored response to
    /// `request`.
    pub fn match_request(&self, request: &FetchRequest) -> Option<FetchResponse> {
        self.buckets
            .read()
            .iter()
            .find_map(|bucket| bucket.match_request(request))
    }
}

impl std::fmt::Debug for CacheStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStorage")
            .field("buckets", &self.keys())
            .field("persistent", &self.is_persistent())
            .finish()
    }
}
