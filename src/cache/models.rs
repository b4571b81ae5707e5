//! Stored entries and their on-disk representation.

// Author: kelexine (https://github.com/kelexine)

use crate::network::FetchResponse;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

/// A response held by a cache bucket.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub response: FetchResponse,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(response: FetchResponse) -> Self {
        Self {
            response,
            stored_at: Utc::now(),
        }
    }
}

/// Serialized form of one bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketSnapshot {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<StoredEntry>,
}

/// Serialized form of one entry. Bodies are base64 so binary assets
/// (icons, logos) survive JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub stored_at: DateTime<Utc>,
}

impl StoredEntry {
    pub fn from_entry(url: &str, entry: &CacheEntry) -> Self {
        let headers = entry
            .response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        Self {
            url: url.to_string(),
            status: entry.response.status,
            headers,
            body: STANDARD.encode(&entry.response.body),
            stored_at: entry.stored_at,
        }
    }

    /// Returns `None` for an entry whose body no longer decodes.
    pub fn into_entry(self) -> Option<(String, CacheEntry)> {
        let body = STANDARD.decode(self.body.as_bytes()).ok()?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }

        let response = FetchResponse::new(self.status, body).with_headers(headers);
        Some((
            self.url,
            CacheEntry {
                response,
                stored_at: self.stored_at,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_body_survives_serialization() {
        let png_header = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("image/png"));
        let entry = CacheEntry::new(FetchResponse::new(200, png_header.clone()).with_headers(headers));

        let stored = StoredEntry::from_entry("/static/images/logo.png", &entry);
        let json = serde_json::to_string(&stored).unwrap();
        let restored: StoredEntry = serde_json::from_str(&json).unwrap();
        let (url, restored) = restored.into_entry().unwrap();

        assert_eq!(url, "/static/images/logo.png");
        assert_eq!(restored.response.body.as_ref(), png_header.as_slice());
        assert_eq!(restored.response.headers["content-type"], "image/png");
        assert_eq!(restored.stored_at, entry.stored_at);
    }

    #[test]
    fn test_corrupt_body_is_dropped() {
        let stored = StoredEntry {
            url: "/".to_string(),
            status: 200,
            headers: vec![],
            body: "***not base64***".to_string(),
            stored_at: Utc::now(),
        };
        assert!(stored.into_entry().is_none());
    }
}
