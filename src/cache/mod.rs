// Cache storage module
// Author: kelexine (https://github.com/kelexine)

pub mod bucket;
pub mod models;
pub mod persist;
pub mod storage;

pub use bucket::CacheBucket;
pub use models::{BucketSnapshot, CacheEntry, StoredEntry};
pub use persist::DiskStore;
pub use storage::CacheStorage;
