//! Document storage abstraction
//!
//! Uploaded binaries live in an external object store; the core only ever
//! needs a time-limited read URL and the bytes behind it.

use crate::config::StorageConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Trait for time-limited read access to stored documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Produce a signed read URL for a stored object
    async fn signed_read_url(&self, path: &str, ttl_secs: u64) -> Result<String>;

    /// Download the bytes behind a (signed) URL
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// Object storage client speaking the Supabase storage REST dialect
pub struct ObjectStorageClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

#[derive(Serialize)]
struct SignRequest {
    #[serde(rename = "expiresIn")]
    expires_in: u64,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl ObjectStorageClient {
    /// Create a client from configuration; base URL and service key are
    /// required for the signing endpoint.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "storage.base_url is not set".to_string(),
            })?;
        let service_key = config
            .service_key
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "storage.service_key is not set".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl DocumentStore for ObjectStorageClient {
    async fn signed_read_url(&self, path: &str, ttl_secs: u64) -> Result<String> {
        let url = format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url, self.bucket, path
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .json(&SignRequest {
                expires_in: ttl_secs,
            })
            .send()
            .await
            .map_err(|e| AppError::Storage {
                message: format!("sign request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage {
                message: format!("sign failed {}: {}", status, body),
            });
        }

        let signed: SignResponse = response.json().await.map_err(|e| AppError::Storage {
            message: format!("sign response parse failed: {}", e),
        })?;

        // The signing endpoint returns a path relative to the storage root
        Ok(format!(
            "{}/storage/v1{}",
            self.base_url,
            signed.signed_url
        ))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await.map_err(|e| {
            AppError::Storage {
                message: format!("download failed: {}", e),
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Storage {
                message: format!("download failed with status {}", status),
            });
        }

        let bytes = response.bytes().await.map_err(|e| AppError::Storage {
            message: format!("download body read failed: {}", e),
        })?;

        Ok(bytes.to_vec())
    }
}

/// In-memory store for tests
#[derive(Default)]
pub struct MemoryStore {
    objects: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.objects.insert(path.to_string(), bytes);
        self
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn signed_read_url(&self, path: &str, ttl_secs: u64) -> Result<String> {
        if !self.objects.contains_key(path) {
            return Err(AppError::Storage {
                message: format!("object not found: {}", path),
            });
        }
        Ok(format!("mem://{}?ttl={}", path, ttl_secs))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let path = url
            .strip_prefix("mem://")
            .and_then(|rest| rest.split('?').next())
            .ok_or_else(|| AppError::Storage {
                message: format!("not a memory url: {}", url),
            })?;

        self.objects
            .get(path)
            .cloned()
            .ok_or_else(|| AppError::Storage {
                message: format!("object not found: {}", path),
            })
    }
}

/// Create a document store from configuration
pub fn create_document_store(config: &StorageConfig) -> Result<Arc<dyn DocumentStore>> {
    Ok(Arc::new(ObjectStorageClient::from_config(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new().with_object("user/doc.pdf", vec![1, 2, 3]);

        let url = store.signed_read_url("user/doc.pdf", 600).await.unwrap();
        assert!(url.starts_with("mem://"));

        let bytes = store.download(&url).await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_memory_store_missing_object() {
        let store = MemoryStore::new();
        let err = store.signed_read_url("nope.pdf", 600).await.unwrap_err();
        assert!(matches!(err, AppError::Storage { .. }));
    }
}
