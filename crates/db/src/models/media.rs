//! Media entity model and DTO.

use geti_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const MEDIA_TYPE_IMAGE: &str = "image";
pub const MEDIA_TYPE_VIDEO: &str = "video";

/// A row from the `media` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Media {
    pub id: DbId,
    pub dataset_storage_id: DbId,
    pub media_type: String,
    pub name: String,
    pub created_at: Timestamp,
}

/// DTO for creating a new media entry. `media_type` is `image` or `video`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMedia {
    pub dataset_storage_id: DbId,
    pub media_type: String,
    pub name: String,
}
