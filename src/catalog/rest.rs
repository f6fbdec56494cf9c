use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use super::backend::{ObjectStorage, Query, TableBackend};
use super::upload::{encode_object_path, public_object_url};
use crate::config::BackendConfig;
use crate::error::{PortalError, PortalResult};

/// Hosted backend over HTTP: PostgREST tables plus the storage API
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> PortalResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.anon_key.clone(),
        })
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    pub fn object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            bucket,
            encode_object_path(path)
        )
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Turn a non-success response into `PortalError::Backend`
    async fn check(response: Response) -> PortalResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        // PostgREST and storage both answer with `{ "message": ... }`
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .and_then(|m| m.as_str())
                    .map(String::from)
            })
            .unwrap_or(body);

        warn!("Backend request failed with {}: {}", status, message);
        Err(PortalError::Backend {
            status: status.as_u16(),
            message,
        })
    }

    fn first_row(rows: Value, table: &str) -> PortalResult<Value> {
        match rows {
            Value::Array(mut rows) if !rows.is_empty() => Ok(rows.swap_remove(0)),
            Value::Array(_) => Err(PortalError::Backend {
                status: 404,
                message: format!("no row returned from {table}"),
            }),
            row => Ok(row),
        }
    }
}

#[async_trait]
impl TableBackend for RestBackend {
    async fn select(&self, table: &str, query: &Query) -> PortalResult<Vec<Value>> {
        debug!("SELECT {} {:?}", table, query);
        let request = self
            .client
            .get(self.table_url(table))
            .query(&query.to_params());
        let response = Self::check(self.authorized(request).send().await?).await?;
        Ok(response.json::<Vec<Value>>().await?)
    }

    async fn insert(&self, table: &str, row: Value) -> PortalResult<Value> {
        debug!("INSERT into {}", table);
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&row);
        let response = Self::check(self.authorized(request).send().await?).await?;
        Self::first_row(response.json::<Value>().await?, table)
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> PortalResult<Value> {
        debug!("UPDATE {} id={}", table, id);
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = Self::check(self.authorized(request).send().await?).await?;
        Self::first_row(response.json::<Value>().await?, table)
    }

    async fn delete(&self, table: &str, id: &str) -> PortalResult<()> {
        debug!("DELETE from {} id={}", table, id);
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))]);
        Self::check(self.authorized(request).send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for RestBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> PortalResult<()> {
        debug!("Uploading {} bytes to {}/{}", bytes.len(), bucket, path);
        let request = self
            .client
            .post(self.object_url(bucket, path))
            .header("Content-Type", content_type)
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes);
        Self::check(self.authorized(request).send().await?).await?;
        Ok(())
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> PortalResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        debug!("Removing {} objects from {}", paths.len(), bucket);
        let request = self
            .client
            .delete(format!("{}/storage/v1/object/{}", self.base_url, bucket))
            .json(&json!({ "prefixes": paths }));
        Self::check(self.authorized(request).send().await?).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        public_object_url(&self.base_url, bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> RestBackend {
        let config = BackendConfig {
            url: "https://demo.supabase.co/".to_string(),
            anon_key: "anon".to_string(),
            ..Default::default()
        };
        RestBackend::new(&config).unwrap()
    }

    #[test]
    fn test_urls() {
        let backend = backend();
        assert_eq!(
            backend.table_url("resources"),
            "https://demo.supabase.co/rest/v1/resources"
        );
        assert_eq!(
            backend.object_url("ai-apps", "apps/1_abc.html"),
            "https://demo.supabase.co/storage/v1/object/ai-apps/apps/1_abc.html"
        );
        assert_eq!(
            backend.public_url("ai-apps", "images/封面.webp"),
            "https://demo.supabase.co/storage/v1/object/public/ai-apps/images/%E5%B0%81%E9%9D%A2.webp"
        );
    }

    #[test]
    fn test_first_row() {
        let row = RestBackend::first_row(json!([{ "id": "1" }, { "id": "2" }]), "resources").unwrap();
        assert_eq!(row["id"], "1");

        let err = RestBackend::first_row(json!([]), "resources").unwrap_err();
        assert!(matches!(err, PortalError::Backend { status: 404, .. }));
    }
}
