use anyhow::{anyhow, Result};
use image::{GenericImageView, ImageFormat};
use std::collections::HashSet;
use std::io::Cursor;
use tracing::{info, warn};

use crate::infra::storage::public_url;
use crate::AppState;

pub const THUMB_PREFIX: &str = "thumb_";
pub const THUMB_MAX_DIM: u32 = 150;

/// Bring the thumbnail container and the images table into sync with the
/// original container, once per original object. Safe to re-run: an object
/// whose thumbnail name is already present is skipped. There is no locking,
/// so two simultaneous runs can double-process the same object; the second
/// upload overwrites the first with identical content.
pub async fn run(state: &AppState) -> Result<()> {
    let processed: HashSet<String> = state
        .storage
        .list_names(&state.thumbnail_container)
        .await?
        .into_iter()
        .collect();

    let originals = state.storage.list_names(&state.original_container).await?;

    for name in originals {
        let thumb_name = format!("{}{}", THUMB_PREFIX, name);
        if processed.contains(&thumb_name) {
            info!(object = %name, "skipping already processed file");
            continue;
        }
        // Any failure aborts the whole run; this is a batch-and-exit job
        // with no per-object isolation.
        process_object(state, &name, &thumb_name).await?;
    }

    info!("all images processed");
    Ok(())
}

async fn process_object(state: &AppState, name: &str, thumb_name: &str) -> Result<()> {
    info!(object = %name, "generating thumbnail");

    let data = state.storage.get(&state.original_container, name).await?;
    let decoded = image::load_from_memory(&data)
        .map_err(|err| anyhow!("failed to decode image {}: {}", name, err))?;

    // Aspect-preserving containment within 150x150, not an exact fit.
    // Originals already inside the bounds are re-encoded as-is, never
    // scaled up.
    let (width, height) = decoded.dimensions();
    let thumb = if width <= THUMB_MAX_DIM && height <= THUMB_MAX_DIM {
        decoded
    } else {
        decoded.thumbnail(THUMB_MAX_DIM, THUMB_MAX_DIM)
    };

    let mut encoded = Cursor::new(Vec::new());
    thumb.write_to(&mut encoded, ImageFormat::Png)?;

    state
        .storage
        .put(
            &state.thumbnail_container,
            thumb_name,
            encoded.into_inner().into(),
            "image/png",
        )
        .await?;

    let original_url = public_url(&state.storage_public_url, &state.original_container, name);
    let thumbnail_url = public_url(&state.storage_public_url, &state.thumbnail_container, thumb_name);

    let result = sqlx::query("UPDATE images SET thumbnail_url = ?1 WHERE original_url = ?2")
        .bind(&thumbnail_url)
        .bind(&original_url)
        .execute(state.db.pool())
        .await?;

    if result.rows_affected() == 0 {
        warn!(object = %name, "no image row matched the original URL");
    }

    Ok(())
}
