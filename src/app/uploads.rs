use anyhow::Result;
use bytes::Bytes;
use sqlx::Row;
use std::sync::Arc;

use crate::domain::image::ImageRecord;
use crate::infra::db::Db;
use crate::infra::storage::{public_url, BlobStore};

#[derive(Clone)]
pub struct UploadService {
    db: Db,
    storage: Arc<dyn BlobStore>,
    storage_public_url: String,
    original_container: String,
}

impl UploadService {
    pub fn new(
        db: Db,
        storage: Arc<dyn BlobStore>,
        storage_public_url: String,
        original_container: String,
    ) -> Self {
        Self {
            db,
            storage,
            storage_public_url,
            original_container,
        }
    }

    /// Write the full bytes under the literal filename (overwrite semantics:
    /// a repeated filename replaces the blob while every row persists) and
    /// append the metadata row with a NULL thumbnail URL.
    pub async fn store_original(
        &self,
        owner_id: i64,
        filename: &str,
        content_type: &str,
        caption: Option<String>,
        data: Bytes,
    ) -> Result<ImageRecord> {
        self.storage
            .put(&self.original_container, filename, data, content_type)
            .await?;

        let original_url = public_url(&self.storage_public_url, &self.original_container, filename);

        // RETURNING leaves the implicit transaction pending once the row is
        // fetched; commit explicitly so the row is durable before we respond.
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(
            "INSERT INTO images (owner_user_id, original_url, caption) \
             VALUES (?1, ?2, ?3) \
             RETURNING id, owner_user_id, original_url, thumbnail_url, caption",
        )
        .bind(owner_id)
        .bind(&original_url)
        .bind(caption.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ImageRecord {
            id: row.get("id"),
            owner_user_id: row.get("owner_user_id"),
            original_url: row.get("original_url"),
            thumbnail_url: row.get("thumbnail_url"),
            caption: row.get("caption"),
        })
    }
}
