use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;

use crate::error::PortalResult;

/// Sort order for a select
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Select parameters: equality filters, ordering and a row limit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub filters: Vec<(String, String)>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// PostgREST query-string parameters
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        for (column, value) in &self.filters {
            params.push((column.clone(), format!("eq.{value}")));
        }
        if let Some(order) = &self.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{direction}", order.column)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    /// Stable key identifying this query, used for caching and dedup
    pub fn cache_key(&self) -> String {
        let mut filters = self.filters.clone();
        filters.sort();
        let filters: Vec<String> = filters.iter().map(|(c, v)| format!("{c}={v}")).collect();
        let order = self
            .order
            .as_ref()
            .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
            .unwrap_or_default();
        let limit = self.limit.map(|l| l.to_string()).unwrap_or_default();
        format!("{}|{}|{}", filters.join("&"), order, limit)
    }
}

/// Remote relational table interface
#[async_trait]
pub trait TableBackend: Send + Sync + Debug {
    async fn select(&self, table: &str, query: &Query) -> PortalResult<Vec<Value>>;

    /// Insert one row and return it as stored
    async fn insert(&self, table: &str, row: Value) -> PortalResult<Value>;

    /// Apply `patch` to the row with `id` and return the updated row
    async fn update(&self, table: &str, id: &str, patch: Value) -> PortalResult<Value>;

    async fn delete(&self, table: &str, id: &str) -> PortalResult<()>;
}

/// Object storage interface
#[async_trait]
pub trait ObjectStorage: Send + Sync + Debug {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> PortalResult<()>;

    async fn remove(&self, bucket: &str, paths: &[String]) -> PortalResult<()>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}
