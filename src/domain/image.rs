use serde::Serialize;

/// Metadata row linking a user to an uploaded original and, once the batch
/// job has run, its generated thumbnail.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    pub id: i64,
    pub owner_user_id: i64,
    pub original_url: String,
    pub thumbnail_url: Option<String>,
    pub caption: Option<String>,
}
