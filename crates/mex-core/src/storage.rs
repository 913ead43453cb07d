//! Image storage collaborator.
//!
//! Generated menu-item photos are uploaded to a Supabase Storage bucket and
//! referenced by public URL afterwards, so tool results and chat payloads
//! never carry raw image bytes. The store also offers a cleanup pass for
//! stale generated images, intended for a scheduled job.

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AssistantError;

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub url: String,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Uploads base64-encoded PNG data (with or without a `data:` URL
    /// prefix) and returns its public URL.
    async fn store_image(&self, image_data: &str) -> Result<StoredImage, AssistantError>;
}

pub struct SupabaseStorage {
    base_url: String,
    api_key: String,
    bucket: String,
    client: Client,
}

impl SupabaseStorage {
    pub fn new(base_url: String, api_key: String, bucket: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            bucket,
            client: Client::new(),
        }
    }

    /// Deletes generated images older than the given number of days.
    /// Returns the number of objects removed. Nothing in the request path
    /// calls this; it is meant to be invoked from a scheduled job.
    pub async fn cleanup_old_images(&self, older_than_days: i64) -> Result<usize, AssistantError> {
        let list_url = format!("{}/storage/v1/object/list/{}", self.base_url, self.bucket);
        let response = self
            .client
            .post(&list_url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({ "prefix": "", "limit": 1000 }))
            .send()
            .await
            .map_err(|e| AssistantError::StorageError(format!("Failed to list bucket: {}", e)))?;

        if !response.status().is_success() {
            return Err(AssistantError::StorageError(format!(
                "Bucket listing failed with status {}",
                response.status()
            )));
        }

        let entries: Vec<ObjectEntry> = response
            .json()
            .await
            .map_err(|e| AssistantError::StorageError(format!("Failed to parse listing: {}", e)))?;

        let cutoff = Utc::now() - Duration::days(older_than_days);
        let stale = stale_object_names(entries, cutoff);

        if stale.is_empty() {
            return Ok(0);
        }

        log::info!("Removing {} stale generated images", stale.len());
        let delete_url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);
        let response = self
            .client
            .delete(&delete_url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({ "prefixes": stale }))
            .send()
            .await
            .map_err(|e| AssistantError::StorageError(format!("Delete request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AssistantError::StorageError(format!(
                "Object deletion failed with status {}",
                response.status()
            )));
        }

        Ok(stale.len())
    }
}

/// One row of a bucket listing.
#[derive(Debug, Deserialize)]
struct ObjectEntry {
    name: String,
    created_at: Option<DateTime<Utc>>,
}

/// Names of objects created strictly before the cutoff. Entries without a
/// creation timestamp are never selected for deletion.
fn stale_object_names(entries: Vec<ObjectEntry>, cutoff: DateTime<Utc>) -> Vec<String> {
    entries
        .into_iter()
        .filter(|e| e.created_at.map(|t| t < cutoff).unwrap_or(false))
        .map(|e| e.name)
        .collect()
}

/// Strips an optional `data:image/...;base64,` prefix.
fn strip_data_url_prefix(image_data: &str) -> &str {
    match image_data.split_once("base64,") {
        Some((_, rest)) => rest,
        None => image_data,
    }
}

#[async_trait]
impl ImageStore for SupabaseStorage {
    async fn store_image(&self, image_data: &str) -> Result<StoredImage, AssistantError> {
        let encoded = strip_data_url_prefix(image_data);
        if encoded.is_empty() {
            return Err(AssistantError::StorageError(
                "Empty image data".to_string(),
            ));
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| AssistantError::StorageError(format!("Invalid base64 image: {}", e)))?;

        let filename = format!("{}.png", Uuid::new_v4());
        let upload_url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, filename
        );
        log::debug!("Uploading {} bytes to {}", bytes.len(), upload_url);

        let response = self
            .client
            .post(&upload_url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "image/png")
            .header("Cache-Control", "max-age=3600")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AssistantError::StorageError(format!("Image upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AssistantError::StorageError(format!(
                "Image upload failed with status {}: {}",
                status, body
            )));
        }

        let url = format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, filename
        );
        Ok(StoredImage { url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_selects_only_objects_older_than_cutoff() {
        let cutoff = Utc::now();
        let entries = vec![
            ObjectEntry {
                name: "old.png".to_string(),
                created_at: Some(cutoff - Duration::days(10)),
            },
            ObjectEntry {
                name: "fresh.png".to_string(),
                created_at: Some(cutoff + Duration::hours(1)),
            },
            ObjectEntry {
                name: "undated.png".to_string(),
                created_at: None,
            },
        ];

        assert_eq!(stale_object_names(entries, cutoff), vec!["old.png"]);
    }

    #[test]
    fn data_url_prefix_is_stripped() {
        assert_eq!(
            strip_data_url_prefix("data:image/png;base64,aGVsbG8="),
            "aGVsbG8="
        );
        assert_eq!(strip_data_url_prefix("aGVsbG8="), "aGVsbG8=");
    }
}
