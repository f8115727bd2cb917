pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;
pub mod jobs;

use std::sync::Arc;

use crate::infra::{db::Db, storage::BlobStore};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub storage: Arc<dyn BlobStore>,
    pub storage_public_url: String,
    pub original_container: String,
    pub thumbnail_container: String,
    pub session_ttl_hours: u64,
    pub upload_max_bytes: usize,
}
