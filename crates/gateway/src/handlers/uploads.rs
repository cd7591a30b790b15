//! Upload registration and progress handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use cardforge_common::{
    auth::AuthContext,
    db::models::Upload,
    db::Repository,
    errors::{AppError, Result},
};

/// Request to register an uploaded document.
///
/// The binary itself goes to the document store; this endpoint records the
/// metadata row and creates the generation job alongside it.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUploadRequest {
    #[validate(length(min = 1, max = 512))]
    pub file_name: String,

    #[validate(length(min = 1, max = 1024))]
    pub storage_path: String,

    #[validate(range(min = 0))]
    pub size_bytes: i64,

    pub page_count: Option<i32>,

    pub subject_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub id: Uuid,
    pub file_name: String,
    pub storage_path: String,
    pub size_bytes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<Uuid>,
    pub status: String,
    pub created_at: String,
}

impl From<Upload> for UploadResponse {
    fn from(upload: Upload) -> Self {
        Self {
            id: upload.id,
            file_name: upload.file_name,
            storage_path: upload.storage_path,
            size_bytes: upload.size_bytes,
            page_count: upload.page_count,
            subject_id: upload.subject_id,
            status: upload.status,
            created_at: upload.created_at.to_rfc3339(),
        }
    }
}

/// Composite progress view for polling clients
#[derive(Serialize)]
pub struct UploadStatusResponse {
    pub upload: UploadResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobView>,
    pub cards_created: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
}

#[derive(Serialize)]
pub struct JobView {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

/// Register an upload and its generation job
pub async fn create_upload(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateUploadRequest>,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());

    let (upload, job) = repo
        .create_upload_with_job(
            auth.user_id,
            request.subject_id,
            request.file_name,
            request.storage_path,
            request.size_bytes,
            request.page_count,
        )
        .await?;

    tracing::info!(
        upload_id = %upload.id,
        job_id = %job.id,
        user_id = %auth.user_id,
        file_name = %upload.file_name,
        "Upload registered"
    );

    Ok((StatusCode::CREATED, Json(upload.into())))
}

/// List the caller's uploads, newest first
pub async fn list_uploads(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<UploadResponse>>> {
    let repo = Repository::new(state.db.clone());
    let uploads = repo.list_uploads_by_user(auth.user_id).await?;
    Ok(Json(uploads.into_iter().map(Into::into).collect()))
}

/// Composite progress: upload, job, and cards created so far
pub async fn upload_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(upload_id): Path<Uuid>,
) -> Result<Json<UploadStatusResponse>> {
    let repo = Repository::new(state.db.clone());
    let progress = repo.upload_progress(upload_id).await?;

    if progress.upload.user_id != auth.user_id {
        return Err(AppError::Forbidden {
            message: "upload belongs to another user".to_string(),
        });
    }

    let duration_seconds = progress
        .job
        .as_ref()
        .and_then(|job| job.running_secs(chrono::Utc::now()));

    let job = progress.job.map(|job| JobView {
        status: job.status,
        error: job.error,
        started_at: job.started_at.map(|dt| dt.to_rfc3339()),
        finished_at: job.finished_at.map(|dt| dt.to_rfc3339()),
    });

    Ok(Json(UploadStatusResponse {
        upload: progress.upload.into(),
        job,
        cards_created: progress.cards_created,
        duration_seconds,
    }))
}
