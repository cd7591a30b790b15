//! Deck content handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use cardforge_common::{
    auth::AuthContext,
    db::models::Card,
    db::Repository,
    errors::{AppError, Result},
};

#[derive(Serialize)]
pub struct CardResponse {
    pub id: Uuid,
    pub deck_id: Uuid,
    #[serde(rename = "type")]
    pub card_type: String,
    pub front: String,
    pub back: String,
    pub tags: serde_json::Value,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<Uuid>,
    pub page_refs: serde_json::Value,
    pub created_at: String,
}

impl From<Card> for CardResponse {
    fn from(card: Card) -> Self {
        Self {
            id: card.id,
            deck_id: card.deck_id,
            card_type: card.card_type,
            front: card.front,
            back: card.back,
            tags: card.tags,
            source: card.prov_source,
            upload_id: card.prov_upload_id,
            page_refs: card.prov_page_refs,
            created_at: card.created_at.to_rfc3339(),
        }
    }
}

/// List the cards in a deck, newest first
pub async fn list_cards(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(deck_id): Path<Uuid>,
) -> Result<Json<Vec<CardResponse>>> {
    let repo = Repository::new(state.db.clone());

    let deck = repo
        .find_deck_by_id(deck_id)
        .await?
        .ok_or_else(|| AppError::DeckNotFound {
            id: deck_id.to_string(),
        })?;

    if deck.user_id != auth.user_id {
        return Err(AppError::Forbidden {
            message: "deck belongs to another user".to_string(),
        });
    }

    let cards = repo.list_cards_by_deck(deck_id).await?;
    Ok(Json(cards.into_iter().map(Into::into).collect()))
}
