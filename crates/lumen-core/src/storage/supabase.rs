//! Supabase Storage backend using the REST API.
//!
//! Objects are uploaded with `POST /storage/v1/object/{bucket}/{path}` and
//! addressed either through the public bucket URL or a signed URL. Folders
//! are listed page by page with `POST /storage/v1/object/list/{bucket}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ObjectEntry, ObjectStore, StoredObject};
use crate::config::{StorageConfig, UrlMode};
use crate::error::{StorageError, StorageResult};

/// Supabase Storage client.
pub struct SupabaseStore {
    base_url: String,
    api_key: String,
    url_mode: UrlMode,
    signed_url_ttl_secs: u64,
    client: reqwest::Client,
}

/// Entries requested per listing call.
const LIST_PAGE_SIZE: usize = 1000;

// --- Request/response types ---

#[derive(Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: usize,
    offset: usize,
    #[serde(rename = "sortBy")]
    sort_by: SortBy,
}

#[derive(Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

/// Folders come back with `id` and `metadata` set to null.
#[derive(Deserialize)]
struct ListItem {
    name: String,
    id: Option<String>,
    metadata: Option<ListMetadata>,
}

#[derive(Deserialize)]
struct ListMetadata {
    size: Option<u64>,
}

impl From<ListItem> for ObjectEntry {
    fn from(item: ListItem) -> Self {
        match item.id {
            Some(_) => ObjectEntry::file(item.name, item.metadata.and_then(|m| m.size)),
            None => ObjectEntry::folder(item.name),
        }
    }
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

impl SupabaseStore {
    /// Build a client for the project at `base_url` authenticated with `api_key`.
    pub fn new(base_url: &str, api_key: &str, config: &StorageConfig) -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| StorageError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            url_mode: config.url_mode,
            signed_url_ttl_secs: config.signed_url_ttl_secs,
            client,
        })
    }

    fn object_endpoint(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{bucket}/{path}", self.base_url)
    }

    fn public_object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{path}", self.base_url)
    }

    fn list_endpoint(&self, bucket: &str) -> String {
        format!("{}/storage/v1/object/list/{bucket}", self.base_url)
    }

    fn sign_endpoint(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/sign/{bucket}/{path}", self.base_url)
    }

    /// Turn the relative `signedURL` returned by the API into an absolute URL.
    fn absolute_signed_url(&self, signed: &str) -> String {
        if signed.starts_with("http://") || signed.starts_with("https://") {
            signed.to_string()
        } else {
            format!(
                "{}/storage/v1/{}",
                self.base_url,
                signed.trim_start_matches('/')
            )
        }
    }

    async fn signed_url(&self, bucket: &str, path: &str) -> StorageResult<String> {
        let url_error = |message: String| StorageError::Url {
            bucket: bucket.to_string(),
            path: path.to_string(),
            message,
        };

        let resp = self
            .client
            .post(self.sign_endpoint(bucket, path))
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .json(&SignRequest {
                expires_in: self.signed_url_ttl_secs,
            })
            .send()
            .await
            .map_err(|e| url_error(format!("sign request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(url_error(format!("HTTP {status}: {text}")));
        }

        let body: SignResponse = resp
            .json()
            .await
            .map_err(|e| url_error(format!("failed to parse sign response: {e}")))?;
        Ok(self.absolute_signed_url(&body.signed_url))
    }
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        let size = bytes.len();
        let upload_error = |message: String, status_code: Option<u16>| StorageError::Upload {
            bucket: bucket.to_string(),
            path: path.to_string(),
            message,
            status_code,
        };

        let resp = self
            .client
            .post(self.object_endpoint(bucket, path))
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header("content-type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| upload_error(format!("request failed: {e}"), None))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(upload_error(
                format!("HTTP {status}: {text}"),
                Some(status.as_u16()),
            ));
        }

        tracing::debug!("Uploaded {} bytes to {}/{}", size, bucket, path);
        Ok(StoredObject {
            bucket: bucket.to_string(),
            path: path.to_string(),
            content_type: content_type.to_string(),
            size,
        })
    }

    async fn public_url(&self, bucket: &str, path: &str) -> StorageResult<String> {
        match self.url_mode {
            UrlMode::Public => Ok(self.public_object_url(bucket, path)),
            UrlMode::Signed => self.signed_url(bucket, path).await,
        }
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectEntry>> {
        let prefix = prefix.trim_matches('/');
        let list_error = |message: String| StorageError::List {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            message,
        };

        let mut entries = Vec::new();
        loop {
            let resp = self
                .client
                .post(self.list_endpoint(bucket))
                .bearer_auth(&self.api_key)
                .header("apikey", &self.api_key)
                .json(&ListRequest {
                    prefix,
                    limit: LIST_PAGE_SIZE,
                    offset: entries.len(),
                    sort_by: SortBy {
                        column: "name",
                        order: "asc",
                    },
                })
                .send()
                .await
                .map_err(|e| list_error(format!("request failed: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(list_error(format!("HTTP {status}: {text}")));
            }

            let page: Vec<ListItem> = resp
                .json()
                .await
                .map_err(|e| list_error(format!("failed to parse listing: {e}")))?;
            let page_len = page.len();
            entries.extend(page.into_iter().map(ObjectEntry::from));
            if page_len < LIST_PAGE_SIZE {
                break;
            }
        }

        tracing::debug!("Listed {} entries under {}/{}", entries.len(), bucket, prefix);
        Ok(entries)
    }

    async fn remove(&self, bucket: &str, path: &str) -> StorageResult<()> {
        let remove_error = |message: String| StorageError::Remove {
            bucket: bucket.to_string(),
            path: path.to_string(),
            message,
        };

        let resp = self
            .client
            .delete(self.object_endpoint(bucket, path))
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| remove_error(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(remove_error(format!("HTTP {status}: {text}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(url_mode: UrlMode) -> SupabaseStore {
        let config = StorageConfig {
            url_mode,
            ..StorageConfig::default()
        };
        SupabaseStore::new("https://project.supabase.co/", "key", &config).unwrap()
    }

    #[test]
    fn test_endpoints() {
        let store = store(UrlMode::Public);
        assert_eq!(
            store.object_endpoint("fotos", "processadas/2024/01/02/ab.png"),
            "https://project.supabase.co/storage/v1/object/fotos/processadas/2024/01/02/ab.png"
        );
        assert_eq!(
            store.sign_endpoint("fotos", "x.png"),
            "https://project.supabase.co/storage/v1/object/sign/fotos/x.png"
        );
    }

    #[tokio::test]
    async fn test_public_url_needs_no_request() {
        let store = store(UrlMode::Public);
        assert_eq!(
            store.public_url("fotos", "x.png").await.unwrap(),
            "https://project.supabase.co/storage/v1/object/public/fotos/x.png"
        );
    }

    #[test]
    fn test_absolute_signed_url() {
        let store = store(UrlMode::Signed);
        assert_eq!(
            store.absolute_signed_url("/object/sign/fotos/x.png?token=abc"),
            "https://project.supabase.co/storage/v1/object/sign/fotos/x.png?token=abc"
        );
        assert_eq!(
            store.absolute_signed_url("https://cdn.example.com/x.png?token=abc"),
            "https://cdn.example.com/x.png?token=abc"
        );
    }

    #[test]
    fn test_list_request_body() {
        let body = serde_json::to_value(ListRequest {
            prefix: "processadas/2024",
            limit: 1000,
            offset: 0,
            sort_by: SortBy {
                column: "name",
                order: "asc",
            },
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "prefix": "processadas/2024",
                "limit": 1000,
                "offset": 0,
                "sortBy": {"column": "name", "order": "asc"}
            })
        );
        assert_eq!(
            store(UrlMode::Public).list_endpoint("fotos"),
            "https://project.supabase.co/storage/v1/object/list/fotos"
        );
    }

    #[test]
    fn test_list_items_to_entries() {
        let items: Vec<ListItem> = serde_json::from_str(
            r#"[
                {"name": "2024", "id": null, "metadata": null},
                {"name": "a.png", "id": "9f1c", "metadata": {"size": 512, "mimetype": "image/png"}}
            ]"#,
        )
        .unwrap();
        let entries: Vec<ObjectEntry> = items.into_iter().map(ObjectEntry::from).collect();
        assert_eq!(
            entries,
            vec![
                ObjectEntry::folder("2024"),
                ObjectEntry::file("a.png", Some(512))
            ]
        );
    }

    #[test]
    fn test_sign_request_body() {
        let body = serde_json::to_string(&SignRequest { expires_in: 60 }).unwrap();
        assert_eq!(body, r#"{"expiresIn":60}"#);
    }
}
