pub mod backend;
pub mod cache;
pub mod filter;
pub mod memory;
pub mod model;
pub mod repository;
pub mod rest;
pub mod upload;

pub use backend::{ObjectStorage, Order, Query, TableBackend};
pub use cache::{CacheEntry, QueryCache};
pub use filter::{
    CATEGORIES, CatalogFilter, CatalogView, EMPOWERMENT_CATEGORY, FilterOption, GRADES,
    UNIVERSAL_GRADE, find_category, find_grade,
};
pub use memory::MemoryBackend;
pub use model::{
    NewResource, NewTeachingResource, Resource, ResourcePatch, ResourceType, TeachingPatch,
    TeachingResource, Zone,
};
pub use repository::{CatalogRepository, HtmlUpload, TeachingUpload, ToolUpload};
pub use rest::RestBackend;
pub use upload::{UploadFile, content_type_for, safe_file_name, storage_path_from_public_url};
