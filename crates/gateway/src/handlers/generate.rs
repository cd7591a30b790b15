//! Generation kickoff handlers: synchronous in-process pipeline and
//! remote-worker dispatch

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use cardforge_common::{
    auth::AuthContext,
    db::Repository,
    errors::{AppError, Result},
    llm::create_model_client,
};
use cardforge_generation::dispatch::{DispatchParams, Dispatcher};
use cardforge_generation::pipeline::{GenerationParams, Generator};

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Cards to aim for; defaults from configuration
    pub target_count: Option<u32>,

    /// Route to the vision-capable model
    #[serde(default)]
    pub prefer_vision: bool,

    /// Model provider override: "local" or "cloud"
    pub provider: Option<String>,

    pub subject_id: Option<Uuid>,

    /// Persist suggestions for review instead of materializing cards
    #[serde(default)]
    pub review_mode: bool,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub created: u32,
    pub deck_id: Uuid,
    pub deck_name: String,
    pub model: String,
}

#[derive(Serialize)]
pub struct DispatchResponse {
    pub ok: bool,
}

async fn authorize_upload(
    repo: &Repository,
    upload_id: Uuid,
    user_id: Uuid,
) -> Result<()> {
    let upload = repo
        .find_upload_by_id(upload_id)
        .await?
        .ok_or_else(|| AppError::UploadNotFound {
            id: upload_id.to_string(),
        })?;

    if upload.user_id != user_id {
        return Err(AppError::Forbidden {
            message: "upload belongs to another user".to_string(),
        });
    }
    Ok(())
}

/// Run the in-process generation pipeline for an upload.
///
/// Synchronous: responds when generation finishes. Clients that cannot wait
/// should use the dispatch endpoint and poll job status instead.
pub async fn generate(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(upload_id): Path<Uuid>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>> {
    let repo = Repository::new(state.db.clone());
    authorize_upload(&repo, upload_id, auth.user_id).await?;

    let provider = request
        .provider
        .as_deref()
        .unwrap_or(&state.config.llm.provider);
    let model = create_model_client(provider, &state.config.llm)?;

    let generator = Generator::new(repo, state.store.clone(), model, &state.config);

    let outcome = generator
        .run(
            upload_id,
            GenerationParams {
                target_count: request
                    .target_count
                    .unwrap_or(state.config.generation.default_target_count),
                prefer_vision: request.prefer_vision,
                subject_id: request.subject_id,
                review_mode: request.review_mode,
            },
        )
        .await?;

    Ok(Json(GenerateResponse {
        created: outcome.created,
        deck_id: outcome.deck_id,
        deck_name: outcome.deck_name,
        model: outcome.model,
    }))
}

/// Hand the job to the remote worker.
///
/// Returns 202 once the worker acknowledges receipt; completion arrives via
/// the callback. No automatic retry on failure - the caller decides.
pub async fn dispatch(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(upload_id): Path<Uuid>,
    Json(request): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<DispatchResponse>)> {
    let repo = Repository::new(state.db.clone());
    authorize_upload(&repo, upload_id, auth.user_id).await?;

    let dispatcher = Dispatcher::new(repo, state.store.clone(), &state.config)?;

    dispatcher
        .dispatch(
            upload_id,
            DispatchParams {
                target_count: request
                    .target_count
                    .unwrap_or(state.config.generation.default_target_count),
                prefer_vision: request.prefer_vision,
                subject_id: request.subject_id,
            },
        )
        .await?;

    Ok((StatusCode::ACCEPTED, Json(DispatchResponse { ok: true })))
}
