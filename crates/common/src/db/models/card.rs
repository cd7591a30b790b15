//! Card entity - a durable flashcard

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Card kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    Qa,
    Cloze,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Qa => "qa",
            CardType::Cloze => "cloze",
        }
    }
}

impl From<String> for CardType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "cloze" => CardType::Cloze,
            _ => CardType::Qa,
        }
    }
}

/// Card provenance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardSource {
    Manual,
    Pdf,
}

impl CardSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardSource::Manual => "manual",
            CardSource::Pdf => "pdf",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    pub deck_id: Uuid,

    #[sea_orm(column_name = "type", column_type = "Text")]
    pub card_type: String,

    #[sea_orm(column_type = "Text")]
    pub front: String,

    #[sea_orm(column_type = "Text")]
    pub back: String,

    /// Free-form tags as a JSON array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: serde_json::Value,

    /// Provenance: never mutated after creation
    #[sea_orm(column_type = "Text")]
    pub prov_source: String,

    pub prov_upload_id: Option<Uuid>,

    /// Ordered page references as a JSON array of integers
    #[sea_orm(column_type = "JsonBinary")]
    pub prov_page_refs: serde_json::Value,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::deck::Entity",
        from = "Column::DeckId",
        to = "super::deck::Column::Id"
    )]
    Deck,

    #[sea_orm(
        belongs_to = "super::upload::Entity",
        from = "Column::ProvUploadId",
        to = "super::upload::Column::Id"
    )]
    Upload,

    #[sea_orm(has_many = "super::srs_state::Entity")]
    SrsStates,
}

impl Related<super::deck::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deck.def()
    }
}

impl Related<super::upload::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Upload.def()
    }
}

impl Related<super::srs_state::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SrsStates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_type_defaults_to_qa() {
        assert_eq!(CardType::from("qa".to_string()), CardType::Qa);
        assert_eq!(CardType::from("cloze".to_string()), CardType::Cloze);
        assert_eq!(CardType::from("something".to_string()), CardType::Qa);
    }
}
