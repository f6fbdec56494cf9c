use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use tokio::sync::Mutex;
use tracing::info;

use super::backend::{ObjectStorage, Query, TableBackend};
use super::upload::public_object_url;
use crate::error::{PortalError, PortalResult};

const MEMORY_BASE_URL: &str = "https://memory.supabase.co";

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-process tables and object storage.
///
/// Used by tests and by offline mode, where the catalog is seeded from a
/// JSON file of `{ "<table>": [rows...] }`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    next_id: AtomicUsize,
    select_calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            next_id: AtomicUsize::new(1),
            ..Default::default()
        }
    }

    pub fn with_tables(tables: HashMap<String, Vec<Value>>) -> Self {
        let backend = Self::new();
        let max_id = tables
            .values()
            .flatten()
            .filter_map(|row| row.get("id").and_then(value_as_id))
            .max()
            .unwrap_or(0);
        backend.next_id.store(max_id + 1, AtomicOrdering::SeqCst);
        Self {
            tables: Mutex::new(tables),
            ..backend
        }
    }

    pub fn from_seed_json(json: &str) -> Result<Self> {
        let tables: HashMap<String, Vec<Value>> =
            serde_json::from_str(json).context("Failed to parse seed JSON")?;
        Ok(Self::with_tables(tables))
    }

    pub fn load_seed(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {path:?}"))?;
        let backend = Self::from_seed_json(&content)?;
        info!("Loaded offline catalog seed from {:?}", path);
        Ok(backend)
    }

    /// Number of `select` calls served so far
    pub fn select_calls(&self) -> usize {
        self.select_calls.load(AtomicOrdering::SeqCst)
    }

    pub async fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        let objects = self.objects.lock().await;
        objects.get(&(bucket.to_string(), path.to_string())).cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }

    fn not_found(table: &str, id: &str) -> PortalError {
        PortalError::Backend {
            status: 404,
            message: format!("no row with id {id} in {table}"),
        }
    }
}

fn value_as_id(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        _ => None,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .unwrap_or_default()
            .total_cmp(&y.as_f64().unwrap_or_default()),
        (Some(x), Some(y)) => value_text(x).cmp(&value_text(y)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn row_id_matches(row: &Value, id: &str) -> bool {
    row.get("id").map(value_text).as_deref() == Some(id)
}

#[async_trait]
impl TableBackend for MemoryBackend {
    async fn select(&self, table: &str, query: &Query) -> PortalResult<Vec<Value>> {
        self.select_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let tables = self.tables.lock().await;

        let mut rows: Vec<Value> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        query.filters.iter().all(|(column, expected)| {
                            row.get(column).map(value_text).as_deref() == Some(expected.as_str())
                        })
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> PortalResult<Value> {
        let Value::Object(mut fields) = row else {
            return Err(PortalError::validation("row must be a JSON object"));
        };

        if !fields.contains_key("id") {
            let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
            fields.insert("id".to_string(), Value::String(id.to_string()));
        }
        if !fields.contains_key("created_at") {
            fields.insert(
                "created_at".to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        }

        let row = Value::Object(fields);
        let mut tables = self.tables.lock().await;
        tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> PortalResult<Value> {
        let Value::Object(patch) = patch else {
            return Err(PortalError::validation("patch must be a JSON object"));
        };

        let mut tables = self.tables.lock().await;
        let row = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| row_id_matches(row, id)))
            .ok_or_else(|| Self::not_found(table, id))?;

        let fields: &mut Map<String, Value> = row
            .as_object_mut()
            .ok_or_else(|| Self::not_found(table, id))?;
        for (key, value) in patch {
            fields.insert(key, value);
        }
        Ok(row.clone())
    }

    async fn delete(&self, table: &str, id: &str) -> PortalResult<()> {
        let mut tables = self.tables.lock().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| Self::not_found(table, id))?;
        let before = rows.len();
        rows.retain(|row| !row_id_matches(row, id));
        if rows.len() == before {
            return Err(Self::not_found(table, id));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> PortalResult<()> {
        let mut objects = self.objects.lock().await;
        let key = (bucket.to_string(), path.to_string());
        if objects.contains_key(&key) {
            return Err(PortalError::Backend {
                status: 409,
                message: format!("object {bucket}/{path} already exists"),
            });
        }
        objects.insert(
            key,
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> PortalResult<()> {
        let mut objects = self.objects.lock().await;
        for path in paths {
            objects.remove(&(bucket.to_string(), path.clone()));
        }
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        public_object_url(MEMORY_BASE_URL, bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_select_order_limit() {
        let backend = MemoryBackend::new();
        for (title, created) in [("a", "2024-01-01"), ("b", "2024-03-01"), ("c", "2024-02-01")] {
            backend
                .insert("resources", json!({ "title": title, "created_at": created }))
                .await
                .unwrap();
        }

        let rows = backend
            .select(
                "resources",
                &Query::new().order_by("created_at", false).limit(2),
            )
            .await
            .unwrap();
        let titles: Vec<&str> = rows.iter().map(|r| r["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["b", "c"]);
        assert_eq!(backend.select_calls(), 1);
    }

    #[tokio::test]
    async fn test_filter_update_delete() {
        let backend = MemoryBackend::new();
        let row = backend
            .insert("teaching_resources", json!({ "title": "x", "zone": "plan" }))
            .await
            .unwrap();
        let id = row["id"].as_str().unwrap().to_string();

        let rows = backend
            .select("teaching_resources", &Query::new().eq("zone", "plan"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        let updated = backend
            .update("teaching_resources", &id, json!({ "title": "y" }))
            .await
            .unwrap();
        assert_eq!(updated["title"], "y");

        backend.delete("teaching_resources", &id).await.unwrap();
        assert!(backend.delete("teaching_resources", &id).await.is_err());
    }

    #[tokio::test]
    async fn test_seed_continues_ids() {
        let backend =
            MemoryBackend::from_seed_json(r#"{ "resources": [ { "id": "7", "title": "t" } ] }"#)
                .unwrap();
        let row = backend.insert("resources", json!({ "title": "u" })).await.unwrap();
        assert_eq!(row["id"], "8");
    }

    #[tokio::test]
    async fn test_objects() {
        let backend = MemoryBackend::new();
        backend
            .upload("ai-apps", "apps/a.html", b"<html></html>".to_vec(), "text/html")
            .await
            .unwrap();
        assert!(
            backend
                .upload("ai-apps", "apps/a.html", vec![], "text/html")
                .await
                .is_err()
        );
        assert_eq!(backend.object_count().await, 1);

        backend
            .remove("ai-apps", &["apps/a.html".to_string()])
            .await
            .unwrap();
        assert!(backend.object("ai-apps", "apps/a.html").await.is_none());
    }
}
