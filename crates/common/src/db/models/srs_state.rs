//! Spaced-repetition state entity - one row per card

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Default ease factor for a freshly created card
pub const DEFAULT_EASE: f64 = 2.5;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "srs_states")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub card_id: Uuid,

    /// Ease factor, floored at 1.3 by the grading rule
    #[sea_orm(column_type = "Double")]
    pub ease: f64,

    pub interval_days: i32,

    pub due: Option<Date>,

    pub last_reviewed: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::card::Entity",
        from = "Column::CardId",
        to = "super::card::Column::Id"
    )]
    Card,
}

impl Related<super::card::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Card.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
