//! Suggestion triage handlers (async review workflow)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use cardforge_common::{
    auth::AuthContext,
    db::models::{Suggestion, SuggestionStatus},
    db::Repository,
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub upload_id: Option<Uuid>,
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct SuggestionResponse {
    pub id: Uuid,
    pub upload_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deck_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub card_type: String,
    pub front: String,
    pub back: String,
    pub page_refs: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub difficulty: String,
    pub status: String,
    pub created_at: String,
}

impl From<Suggestion> for SuggestionResponse {
    fn from(s: Suggestion) -> Self {
        Self {
            id: s.id,
            upload_id: s.upload_id,
            deck_id: s.deck_id,
            card_type: s.card_type,
            front: s.front,
            back: s.back,
            page_refs: s.page_refs,
            confidence: s.confidence,
            difficulty: s.difficulty,
            status: s.status,
            created_at: s.created_at.to_rfc3339(),
        }
    }
}

fn parse_status(status: &str) -> Result<SuggestionStatus> {
    match status {
        "new" => Ok(SuggestionStatus::New),
        "accepted" => Ok(SuggestionStatus::Accepted),
        "edited" => Ok(SuggestionStatus::Edited),
        "discarded" => Ok(SuggestionStatus::Discarded),
        other => Err(AppError::Validation {
            message: format!("unknown suggestion status: {}", other),
            field: Some("status".to_string()),
        }),
    }
}

/// List suggestions, filtered by upload and status
pub async fn list_suggestions(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SuggestionResponse>>> {
    let status = query.status.as_deref().map(parse_status).transpose()?;

    let repo = Repository::new(state.db.clone());
    let suggestions = repo.list_suggestions(query.upload_id, status).await?;

    Ok(Json(
        suggestions
            .into_iter()
            .filter(|s| s.user_id == auth.user_id)
            .map(Into::into)
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct AcceptRequest {
    pub deck_id: Uuid,
}

#[derive(Serialize)]
pub struct AcceptResponse {
    pub card_id: Uuid,
    pub deck_id: Uuid,
}

/// Accept a suggestion: materialize it as a card with scheduling state
pub async fn accept_suggestion(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(suggestion_id): Path<Uuid>,
    Json(request): Json<AcceptRequest>,
) -> Result<(StatusCode, Json<AcceptResponse>)> {
    let repo = Repository::new(state.db.clone());

    let suggestion = repo
        .find_suggestion_by_id(suggestion_id)
        .await?
        .ok_or_else(|| AppError::SuggestionNotFound {
            id: suggestion_id.to_string(),
        })?;

    if suggestion.user_id != auth.user_id {
        return Err(AppError::Forbidden {
            message: "suggestion belongs to another user".to_string(),
        });
    }

    let card = repo.accept_suggestion(suggestion_id, request.deck_id).await?;

    tracing::info!(
        suggestion_id = %suggestion_id,
        card_id = %card.id,
        deck_id = %card.deck_id,
        "Suggestion accepted"
    );

    Ok((
        StatusCode::CREATED,
        Json(AcceptResponse {
            card_id: card.id,
            deck_id: card.deck_id,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub status: String,
    pub front: Option<String>,
    pub back: Option<String>,
}

/// Update a suggestion's review status (edited/discarded) and optionally its
/// text
pub async fn update_suggestion(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(suggestion_id): Path<Uuid>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<SuggestionResponse>> {
    let status = parse_status(&request.status)?;

    let repo = Repository::new(state.db.clone());

    let suggestion = repo
        .find_suggestion_by_id(suggestion_id)
        .await?
        .ok_or_else(|| AppError::SuggestionNotFound {
            id: suggestion_id.to_string(),
        })?;

    if suggestion.user_id != auth.user_id {
        return Err(AppError::Forbidden {
            message: "suggestion belongs to another user".to_string(),
        });
    }

    let updated = repo
        .update_suggestion(suggestion_id, status, request.front, request.back)
        .await?;

    Ok(Json(updated.into()))
}
