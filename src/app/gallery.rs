use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::image::ImageRecord;
use crate::infra::db::Db;

#[derive(Debug)]
pub struct Gallery {
    pub originals: Vec<ImageRecord>,
    pub thumbnails: Vec<ImageRecord>,
}

#[derive(Clone)]
pub struct GalleryService {
    db: Db,
}

impl GalleryService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Two queries, both most-recent-first: every row the user owns, and the
    /// subset that already has a thumbnail.
    pub async fn list_for_owner(&self, owner_id: i64) -> Result<Gallery> {
        let originals = sqlx::query(
            "SELECT id, owner_user_id, original_url, thumbnail_url, caption \
             FROM images WHERE owner_user_id = ?1 \
             ORDER BY id DESC",
        )
        .bind(owner_id)
        .fetch_all(self.db.pool())
        .await?
        .into_iter()
        .map(record_from_row)
        .collect();

        let thumbnails = sqlx::query(
            "SELECT id, owner_user_id, original_url, thumbnail_url, caption \
             FROM images WHERE owner_user_id = ?1 AND thumbnail_url IS NOT NULL \
             ORDER BY id DESC",
        )
        .bind(owner_id)
        .fetch_all(self.db.pool())
        .await?
        .into_iter()
        .map(record_from_row)
        .collect();

        Ok(Gallery {
            originals,
            thumbnails,
        })
    }
}

fn record_from_row(row: SqliteRow) -> ImageRecord {
    ImageRecord {
        id: row.get("id"),
        owner_user_id: row.get("owner_user_id"),
        original_url: row.get("original_url"),
        thumbnail_url: row.get("thumbnail_url"),
        caption: row.get("caption"),
    }
}
