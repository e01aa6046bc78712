use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Table;

/// Metadata for an object held in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Media {
    pub id: Uuid,
    /// Bucket-relative path of the stored object
    pub storage_path: String,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: i64,
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    /// References `profiles.id`
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMedia {
    pub storage_path: String,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub uploaded_by: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<Option<String>>,
}

impl Table for Media {
    const NAME: &'static str = "media";
}
