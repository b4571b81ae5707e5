// Cache bucket - one named URL → response store
// Author: kelexine (https://github.com/kelexine)

use super::models::{BucketSnapshot, CacheEntry, StoredEntry};
use super::persist::DiskStore;
use crate::error::{OfflineError, Result};
use crate::network::{FetchRequest, FetchResponse, Network};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A named cache bucket.
///
/// Every operation takes the entry lock once and never holds it across an
/// await, so individual operations are atomic with respect to each other.
pub struct CacheBucket {
    name: String,
    created_at: DateTime<Utc>,
    entries: RwLock<HashMap<String, CacheEntry>>,
    disk: Option<Arc<DiskStore>>,
    /// Serializes snapshot writes so the last mutation always wins on disk
    persist_lock: tokio::sync::Mutex<()>,
    deleted: AtomicBool,
}

impl CacheBucket {
    pub(crate) fn new(name: String, disk: Option<Arc<DiskStore>>) -> Self {
        Self {
            name,
            created_at: Utc::now(),
            entries: RwLock::new(HashMap::new()),
            disk,
            persist_lock: tokio::sync::Mutex::new(()),
            deleted: AtomicBool::new(false),
        }
    }

    pub(crate) fn from_snapshot(snapshot: BucketSnapshot, disk: Option<Arc<DiskStore>>) -> Self {
        let entries = snapshot
            .entries
            .into_iter()
            .filter_map(StoredEntry::into_entry)
            .collect();

        Self {
            name: snapshot.name,
            created_at: snapshot.created_at,
            entries: RwLock::new(entries),
            disk,
            persist_lock: tokio::sync::Mutex::new(()),
            deleted: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Stored URLs, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.read().contains_key(url)
    }

    pub fn get(&self, url: &str) -> Option<CacheEntry> {
        self.entries.read().get(url).cloned()
    }

    /// Look up a stored response. Only GET requests ever match.
    pub fn match_request(&self, request: &FetchRequest) -> Option<FetchResponse> {
        if !request.is_get() {
            return None;
        }
        self.entries
            .read()
            .get(&request.url)
            .map(|entry| entry.response.clone())
    }

    /// Store a response under `url`, replacing any previous entry.
    pub async fn put(&self, url: &str, response: FetchResponse) -> Result<()> {
        if response.status == 206 {
            return Err(OfflineError::Cache(format!(
                "Refusing to cache partial response (206) for {}",
                url
            )));
        }
        self.commit(vec![(url.to_string(), CacheEntry::new(response))])
            .await
    }

    /// Fetch every URL concurrently and store them all, or none.
    ///
    /// A transport failure or a non-2xx status on any URL fails the whole
    /// batch before anything is written, and so does a failed disk write.
    pub async fn add_all<N>(&self, network: &N, urls: &[String]) -> Result<usize>
    where
        N: Network + ?Sized,
    {
        let fetches = urls.iter().map(|url| async move {
            let response = network.fetch_for_cache(url).await?;
            if !response.ok() {
                return Err(OfflineError::Cache(format!(
                    "{} returned HTTP {}",
                    url, response.status
                )));
            }
            Ok((url.clone(), response))
        });
        let fetched = try_join_all(fetches).await?;

        let count = fetched.len();
        let staged = fetched
            .into_iter()
            .map(|(url, response)| (url, CacheEntry::new(response)))
            .collect();
        self.commit(staged).await?;

        debug!("Stored {} responses in bucket '{}'", count, self.name);
        Ok(count)
    }

    /// Remove one entry. Returns whether it existed.
    pub async fn delete(&self, url: &str) -> Result<bool> {
        let removed = self.entries.write().remove(url).is_some();
        if removed {
            self.persist().await?;
        }
        Ok(removed)
    }

    pub fn snapshot(&self) -> BucketSnapshot {
        self.snapshot_with(&[])
    }

    /// The current entries with `staged` laid over them.
    fn snapshot_with(&self, staged: &[(String, CacheEntry)]) -> BucketSnapshot {
        let entries = self.entries.read();
        let mut stored: Vec<StoredEntry> = entries
            .iter()
            .filter(|(url, _)| !staged.iter().any(|(staged_url, _)| staged_url == *url))
            .chain(staged.iter().map(|(url, entry)| (url, entry)))
            .map(|(url, entry)| StoredEntry::from_entry(url, entry))
            .collect();
        stored.sort_by(|a, b| a.url.cmp(&b.url));

        BucketSnapshot {
            name: self.name.clone(),
            created_at: self.created_at,
            entries: stored,
        }
    }

    /// Write `staged` to disk together with the current entries, and only
    /// then make it visible. A failed write leaves the bucket as it was.
    async fn commit(&self, staged: Vec<(String, CacheEntry)>) -> Result<()> {
        let _guard = self.persist_lock.lock().await;
        self.write_snapshot(&staged).await?;
        self.entries.write().extend(staged);
        Ok(())
    }

    pub(crate) async fn persist(&self) -> Result<()> {
        let _guard = self.persist_lock.lock().await;
        self.write_snapshot(&[]).await
    }

    /// Caller holds `persist_lock`.
    async fn write_snapshot(&self, staged: &[(String, CacheEntry)]) -> Result<()> {
        match &self.disk {
            Some(disk) if !self.deleted.load(Ordering::SeqCst) => {
                disk.save(&self.snapshot_with(staged)).await
            }
            _ => Ok(()),
        }
    }

    /// Remove the bucket's file. No write started afterwards can bring it
    /// back.
    pub(crate) async fn destroy(&self) -> Result<()> {
        let _guard = self.persist_lock.lock().await;
        if let Some(disk) = &self.disk {
            disk.remove(&self.name).await?;
        }
        self.deleted.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl std::fmt::Debug for CacheBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheBucket")
            .field("name", &self.name)
            .field("entry_count", &self.len())
            .field("persistent", &self.disk.is_some())
            .finish()
    }
}
