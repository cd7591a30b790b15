//! Review grading handler

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use cardforge_common::{
    auth::AuthContext,
    db::Repository,
    errors::{AppError, Result},
    srs::Grade,
};

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// 1=Again, 2=Hard, 3=Good, 4=Easy
    pub grade: i64,
}

#[derive(Serialize)]
pub struct ReviewResponse {
    pub card_id: Uuid,
    pub ease: f64,
    pub interval_days: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<String>,
}

/// Grade a card review and return the updated scheduling state.
///
/// The grade is validated at this boundary; the scheduler itself is total
/// over the four valid grades.
pub async fn review_card(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(card_id): Path<Uuid>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<ReviewResponse>> {
    let grade =
        Grade::try_from(request.grade).map_err(|grade| AppError::InvalidGrade { grade })?;

    let repo = Repository::new(state.db.clone());

    let card = repo
        .find_card_by_id(card_id)
        .await?
        .ok_or_else(|| AppError::CardNotFound {
            id: card_id.to_string(),
        })?;

    if card.user_id != auth.user_id {
        return Err(AppError::Forbidden {
            message: "card belongs to another user".to_string(),
        });
    }

    let srs_state = repo.apply_review(card_id, grade).await?;

    tracing::info!(
        card_id = %card_id,
        grade = request.grade,
        ease = srs_state.ease,
        interval_days = srs_state.interval_days,
        "Card reviewed"
    );

    Ok(Json(ReviewResponse {
        card_id: srs_state.card_id,
        ease: srs_state.ease,
        interval_days: srs_state.interval_days,
        due: srs_state.due.map(|d| d.to_string()),
        last_reviewed: srs_state.last_reviewed.map(|d| d.to_string()),
    }))
}
