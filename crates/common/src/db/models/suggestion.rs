//! Suggestion entity - a candidate flashcard awaiting review

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Review status of a persisted suggestion
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    New,
    Accepted,
    Edited,
    Discarded,
}

impl From<String> for SuggestionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "accepted" => SuggestionStatus::Accepted,
            "edited" => SuggestionStatus::Edited,
            "discarded" => SuggestionStatus::Discarded,
            _ => SuggestionStatus::New,
        }
    }
}

impl From<SuggestionStatus> for String {
    fn from(status: SuggestionStatus) -> Self {
        match status {
            SuggestionStatus::New => "new".to_string(),
            SuggestionStatus::Accepted => "accepted".to_string(),
            SuggestionStatus::Edited => "edited".to_string(),
            SuggestionStatus::Discarded => "discarded".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "suggestions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub upload_id: Uuid,

    pub user_id: Uuid,

    pub deck_id: Option<Uuid>,

    #[sea_orm(column_name = "type", column_type = "Text")]
    pub card_type: String,

    #[sea_orm(column_type = "Text")]
    pub front: String,

    #[sea_orm(column_type = "Text")]
    pub back: String,

    /// JSON array of positive page numbers
    #[sea_orm(column_type = "JsonBinary")]
    pub page_refs: serde_json::Value,

    #[sea_orm(column_type = "Double", nullable)]
    pub confidence: Option<f64>,

    #[sea_orm(column_type = "Text")]
    pub difficulty: String,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the review status as an enum
    pub fn suggestion_status(&self) -> SuggestionStatus {
        SuggestionStatus::from(self.status.clone())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::upload::Entity",
        from = "Column::UploadId",
        to = "super::upload::Column::Id"
    )]
    Upload,
}

impl Related<super::upload::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Upload.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
