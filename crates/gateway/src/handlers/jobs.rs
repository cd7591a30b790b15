//! Job status handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use cardforge_common::{
    auth::AuthContext,
    db::Repository,
    errors::{AppError, Result},
};

/// Job status response
#[derive(Serialize)]
pub struct JobResponse {
    pub job_id: Uuid,
    pub upload_id: Uuid,
    pub status: String,
    pub priority: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    pub created_at: String,
}

/// Get the generation job for an upload
pub async fn get_job(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(upload_id): Path<Uuid>,
) -> Result<Json<JobResponse>> {
    let repo = Repository::new(state.db.clone());

    let job = repo
        .find_job_by_upload(upload_id)
        .await?
        .ok_or_else(|| AppError::JobNotFound {
            id: upload_id.to_string(),
        })?;

    // Verify ownership
    if job.user_id != auth.user_id {
        return Err(AppError::Forbidden {
            message: "job belongs to another user".to_string(),
        });
    }

    Ok(Json(JobResponse {
        job_id: job.id,
        upload_id: job.upload_id,
        status: job.status.clone(),
        priority: job.priority,
        error: job.error,
        started_at: job.started_at.map(|dt| dt.to_rfc3339()),
        finished_at: job.finished_at.map(|dt| dt.to_rfc3339()),
        created_at: job.created_at.to_rfc3339(),
    }))
}
