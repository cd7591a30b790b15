//! Upload entity - one submitted source document

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Upload lifecycle status
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Queued,
    Processing,
    Done,
    Error,
}

impl From<String> for UploadStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => UploadStatus::Queued,
            "processing" => UploadStatus::Processing,
            "done" => UploadStatus::Done,
            "error" => UploadStatus::Error,
            _ => UploadStatus::Queued,
        }
    }
}

impl From<UploadStatus> for String {
    fn from(status: UploadStatus) -> Self {
        match status {
            UploadStatus::Queued => "queued".to_string(),
            UploadStatus::Processing => "processing".to_string(),
            UploadStatus::Done => "done".to_string(),
            UploadStatus::Error => "error".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "uploads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    pub subject_id: Option<Uuid>,

    #[sea_orm(column_type = "Text")]
    pub file_name: String,

    /// Path of the binary inside the document store bucket
    #[sea_orm(column_type = "Text")]
    pub storage_path: String,

    pub size_bytes: i64,

    /// Filled after text extraction
    pub page_count: Option<i32>,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the upload status as an enum
    pub fn upload_status(&self) -> UploadStatus {
        UploadStatus::from(self.status.clone())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::generation_job::Entity")]
    GenerationJobs,

    #[sea_orm(has_many = "super::card::Entity")]
    Cards,

    #[sea_orm(has_many = "super::suggestion::Entity")]
    Suggestions,
}

impl Related<super::generation_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GenerationJobs.def()
    }
}

impl Related<super::card::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cards.def()
    }
}

impl Related<super::suggestion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Suggestions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
