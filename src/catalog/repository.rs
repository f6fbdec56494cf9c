use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::backend::{ObjectStorage, Query, TableBackend};
use super::cache::QueryCache;
use super::model::{
    NewResource, NewTeachingResource, RESOURCES_TABLE, Resource, ResourcePatch, ResourceType,
    TEACHING_TABLE, TeachingPatch, TeachingResource, Zone,
};
use super::rest::RestBackend;
use super::upload::{UploadFile, content_type_for, safe_file_name, storage_path_from_public_url};
use crate::config::Config;
use crate::error::{PortalError, PortalResult};

/// An interactive HTML document with its cover image
#[derive(Debug, Clone)]
pub struct HtmlUpload {
    pub title: String,
    pub description: String,
    pub category: String,
    pub grade: String,
    pub document: UploadFile,
    pub cover: UploadFile,
}

/// An in-app tool registered under an existing route
#[derive(Debug, Clone)]
pub struct ToolUpload {
    pub title: String,
    pub description: String,
    pub category: String,
    pub grade: String,
    pub route_path: String,
    pub cover: UploadFile,
}

#[derive(Debug, Clone)]
pub struct TeachingUpload {
    pub title: String,
    pub description: String,
    pub zone: Zone,
    pub file: UploadFile,
}

/// Catalog reads and admin mutations over a table backend and object storage.
///
/// Listings go through per-query TTL caches; every mutation clears them.
#[derive(Debug)]
pub struct CatalogRepository {
    tables: Arc<dyn TableBackend>,
    storage: Arc<dyn ObjectStorage>,
    resources: QueryCache<Vec<Resource>>,
    teaching: QueryCache<Vec<TeachingResource>>,
    apps_bucket: String,
    teaching_bucket: String,
}

impl CatalogRepository {
    pub fn new(
        tables: Arc<dyn TableBackend>,
        storage: Arc<dyn ObjectStorage>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            tables,
            storage,
            resources: QueryCache::new(cache_ttl),
            teaching: QueryCache::new(cache_ttl),
            apps_bucket: "ai-apps".to_string(),
            teaching_bucket: "teaching".to_string(),
        }
    }

    pub fn with_buckets(mut self, apps: impl Into<String>, teaching: impl Into<String>) -> Self {
        self.apps_bucket = apps.into();
        self.teaching_bucket = teaching.into();
        self
    }

    /// Repository against the hosted backend described by `config`
    pub fn from_config(config: &Config) -> PortalResult<Self> {
        let rest = Arc::new(RestBackend::new(&config.backend)?);
        info!("Catalog backend: {}", config.backend.url);
        Ok(Self::new(rest.clone(), rest, config.cache.ttl()).with_buckets(
            config.backend.apps_bucket.clone(),
            config.backend.teaching_bucket.clone(),
        ))
    }

    pub fn apps_bucket(&self) -> &str {
        &self.apps_bucket
    }

    pub fn teaching_bucket(&self) -> &str {
        &self.teaching_bucket
    }

    /// All resources, newest first
    pub async fn list_resources(&self, force: bool) -> PortalResult<Vec<Resource>> {
        let query = Query::new().order_by("created_at", false);
        let key = format!("resources:{}", query.cache_key());

        self.resources
            .get_or_load(&key, force, || async {
                let rows = self.tables.select(RESOURCES_TABLE, &query).await?;
                let resources: Vec<Resource> = listing_rows(RESOURCES_TABLE, rows);
                debug!("Loaded {} resources", resources.len());
                Ok(resources)
            })
            .await
    }

    /// Teaching documents, newest first, optionally limited to one zone
    pub async fn list_teaching(
        &self,
        zone: Option<Zone>,
        force: bool,
    ) -> PortalResult<Vec<TeachingResource>> {
        let mut query = Query::new().order_by("created_at", false);
        if let Some(zone) = zone {
            query = query.eq("zone", zone.id());
        }
        let key = format!("teaching:{}", query.cache_key());

        self.teaching
            .get_or_load(&key, force, || async {
                let rows = self.tables.select(TEACHING_TABLE, &query).await?;
                Ok(listing_rows(TEACHING_TABLE, rows))
            })
            .await
    }

    pub async fn find_resource(&self, id: &str) -> PortalResult<Resource> {
        let rows = self
            .tables
            .select(RESOURCES_TABLE, &Query::new().eq("id", id).limit(1))
            .await?;
        rows_into::<Resource>(rows)?
            .pop()
            .ok_or_else(|| PortalError::Backend {
                status: 404,
                message: format!("resource {id} not found"),
            })
    }

    pub async fn find_teaching(&self, id: &str) -> PortalResult<TeachingResource> {
        let rows = self
            .tables
            .select(TEACHING_TABLE, &Query::new().eq("id", id).limit(1))
            .await?;
        rows_into::<TeachingResource>(rows)?
            .pop()
            .ok_or_else(|| PortalError::Backend {
                status: 404,
                message: format!("teaching document {id} not found"),
            })
    }

    pub async fn create_resource(&self, mut resource: NewResource) -> PortalResult<Resource> {
        resource.title = require_title(&resource.title)?;
        let row = self.tables.insert(RESOURCES_TABLE, to_row(&resource)?).await?;
        self.invalidate().await;
        info!("Created resource '{}'", resource.title);
        Ok(serde_json::from_value(row)?)
    }

    /// Store the document under `apps/` and the cover under `images/`, then
    /// insert an `html` resource pointing at both.
    pub async fn upload_html_resource(&self, upload: HtmlUpload) -> PortalResult<Resource> {
        let title = require_title(&upload.title)?;

        let document_path = format!("apps/{}", safe_file_name(&upload.document.name));
        self.put_object(&self.apps_bucket, &document_path, &upload.document)
            .await?;
        let cover_path = match self.upload_cover(&upload.cover).await {
            Ok(path) => path,
            Err(e) => {
                self.remove_objects(&self.apps_bucket, vec![document_path])
                    .await;
                return Err(e);
            }
        };

        let resource = NewResource {
            title,
            category: upload.category,
            grade: upload.grade,
            image_url: self.storage.public_url(&self.apps_bucket, &cover_path),
            description: upload.description,
            file_path: Some(self.storage.public_url(&self.apps_bucket, &document_path)),
            route_path: None,
            resource_type: ResourceType::Html,
        };

        match self.create_resource(resource).await {
            Ok(created) => Ok(created),
            Err(e) => {
                self.remove_objects(&self.apps_bucket, vec![document_path, cover_path])
                    .await;
                Err(e)
            }
        }
    }

    /// Register an in-app routed tool with an uploaded cover
    pub async fn create_tool_resource(&self, upload: ToolUpload) -> PortalResult<Resource> {
        let title = require_title(&upload.title)?;
        let route_path = upload.route_path.trim().to_string();
        if route_path.is_empty() {
            return Err(PortalError::validation("route path is required"));
        }

        let cover_path = self.upload_cover(&upload.cover).await?;
        let resource = NewResource {
            title,
            category: upload.category,
            grade: upload.grade,
            image_url: self.storage.public_url(&self.apps_bucket, &cover_path),
            description: upload.description,
            file_path: None,
            route_path: Some(route_path),
            resource_type: ResourceType::React,
        };

        match self.create_resource(resource).await {
            Ok(created) => Ok(created),
            Err(e) => {
                self.remove_objects(&self.apps_bucket, vec![cover_path]).await;
                Err(e)
            }
        }
    }

    /// Apply `patch`; a new cover replaces `image_url`
    pub async fn update_resource(
        &self,
        id: &str,
        mut patch: ResourcePatch,
        cover: Option<UploadFile>,
    ) -> PortalResult<Resource> {
        if let Some(title) = &patch.title {
            patch.title = Some(require_title(title)?);
        }
        let cover_path = match &cover {
            Some(cover) => {
                let cover_path = self.upload_cover(cover).await?;
                patch.image_url = Some(self.storage.public_url(&self.apps_bucket, &cover_path));
                Some(cover_path)
            }
            None => None,
        };
        if patch.is_empty() {
            return Err(PortalError::validation("nothing to update"));
        }

        let updated = match to_row(&patch) {
            Ok(row) => self.tables.update(RESOURCES_TABLE, id, row).await,
            Err(e) => Err(e),
        };
        let row = match updated {
            Ok(row) => row,
            Err(e) => {
                self.remove_objects(&self.apps_bucket, cover_path.into_iter().collect())
                    .await;
                return Err(e);
            }
        };
        self.invalidate().await;
        info!("Updated resource {}", id);
        Ok(serde_json::from_value(row)?)
    }

    /// Delete the row and the storage objects its URLs point at.
    ///
    /// Storage removal failures are logged and do not stop the row delete.
    pub async fn delete_resource(&self, resource: &Resource) -> PortalResult<()> {
        let paths: Vec<String> = [resource.file_path.as_deref(), Some(resource.image_url.as_str())]
            .into_iter()
            .flatten()
            .filter_map(|url| storage_path_from_public_url(url, &self.apps_bucket))
            .collect();
        self.remove_objects(&self.apps_bucket, paths).await;

        self.tables.delete(RESOURCES_TABLE, &resource.id).await?;
        self.invalidate().await;
        info!("Deleted resource '{}'", resource.title);
        Ok(())
    }

    pub async fn create_teaching(
        &self,
        mut document: NewTeachingResource,
    ) -> PortalResult<TeachingResource> {
        document.title = require_title(&document.title)?;
        let row = self.tables.insert(TEACHING_TABLE, to_row(&document)?).await?;
        self.invalidate().await;
        info!("Created teaching document '{}' in {}", document.title, document.zone);
        Ok(serde_json::from_value(row)?)
    }

    /// Store the file under `<zone>/` and insert its row
    pub async fn upload_teaching(&self, upload: TeachingUpload) -> PortalResult<TeachingResource> {
        let title = require_title(&upload.title)?;
        let object_path = format!("{}/{}", upload.zone.id(), safe_file_name(&upload.file.name));
        self.put_object(&self.teaching_bucket, &object_path, &upload.file)
            .await?;

        let document = NewTeachingResource {
            title,
            description: upload.description,
            zone: upload.zone,
            file_url: self.storage.public_url(&self.teaching_bucket, &object_path),
            file_type: upload.file.extension(),
        };

        match self.create_teaching(document).await {
            Ok(created) => Ok(created),
            Err(e) => {
                self.remove_objects(&self.teaching_bucket, vec![object_path])
                    .await;
                Err(e)
            }
        }
    }

    pub async fn update_teaching(
        &self,
        id: &str,
        mut patch: TeachingPatch,
    ) -> PortalResult<TeachingResource> {
        if let Some(title) = &patch.title {
            patch.title = Some(require_title(title)?);
        }
        if patch.is_empty() {
            return Err(PortalError::validation("nothing to update"));
        }

        let row = self.tables.update(TEACHING_TABLE, id, to_row(&patch)?).await?;
        self.invalidate().await;
        Ok(serde_json::from_value(row)?)
    }

    pub async fn delete_teaching(&self, document: &TeachingResource) -> PortalResult<()> {
        let paths: Vec<String> = storage_path_from_public_url(&document.file_url, &self.teaching_bucket)
            .into_iter()
            .collect();
        self.remove_objects(&self.teaching_bucket, paths).await;

        self.tables.delete(TEACHING_TABLE, &document.id).await?;
        self.invalidate().await;
        info!("Deleted teaching document '{}'", document.title);
        Ok(())
    }

    /// Drop every cached listing
    pub async fn invalidate(&self) {
        self.resources.invalidate().await;
        self.teaching.invalidate().await;
    }

    async fn upload_cover(&self, cover: &UploadFile) -> PortalResult<String> {
        let cover_path = format!("images/{}", safe_file_name(&cover.name));
        self.put_object(&self.apps_bucket, &cover_path, cover).await?;
        Ok(cover_path)
    }

    async fn put_object(&self, bucket: &str, path: &str, file: &UploadFile) -> PortalResult<()> {
        if file.bytes.is_empty() {
            return Err(PortalError::validation(format!("{} is empty", file.name)));
        }
        self.storage
            .upload(bucket, path, file.bytes.clone(), content_type_for(&file.name))
            .await?;
        debug!("Stored {} as {}/{}", file.name, bucket, path);
        Ok(())
    }

    async fn remove_objects(&self, bucket: &str, paths: Vec<String>) {
        if paths.is_empty() {
            return;
        }
        if let Err(e) = self.storage.remove(bucket, &paths).await {
            warn!("Failed to remove {:?} from {}: {}", paths, bucket, e);
        }
    }
}

fn require_title(title: &str) -> PortalResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PortalError::validation("title is required"));
    }
    Ok(title.to_string())
}

fn to_row<T: Serialize>(value: &T) -> PortalResult<Value> {
    Ok(serde_json::to_value(value)?)
}

fn rows_into<T: DeserializeOwned>(rows: Vec<Value>) -> PortalResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(PortalError::from))
        .collect()
}

/// Decode a listing, skipping rows that do not fit the model
fn listing_rows<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").cloned().unwrap_or(Value::Null);
            match serde_json::from_value(row) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!("Skipping malformed {} row {}: {}", table, id, e);
                    None
                }
            }
        })
        .collect()
}
