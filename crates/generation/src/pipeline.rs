//! Generation orchestrator
//!
//! Owns the ingestion -> generation -> completion lifecycle for one upload:
//! loads the source through a signed URL, extracts and chunks page text,
//! iterates chunks against the model client with a fair-share quota, and
//! materializes validated suggestions as cards. Job status advances
//! queued -> processing -> {done, error}; the error path writes status best
//! effort and never masks the original failure.

use crate::chunker::{chunk_pages, ChunkingConfig};
use crate::extract;
use crate::prompt::{self, SYSTEM_PROMPT};
use crate::validate::{self, Suggestion};
use cardforge_common::config::{AppConfig, GenerationConfig, LlmConfig};
use cardforge_common::db::models::{CardSource, JobStatus, Upload};
use cardforge_common::db::{NewCard, NewSuggestion, Repository};
use cardforge_common::errors::{AppError, Result};
use cardforge_common::llm::{CompletionOptions, ModelClient};
use cardforge_common::metrics;
use cardforge_common::storage::DocumentStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Parameters for one generation run
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Number of cards to aim for
    pub target_count: u32,
    /// Route to the vision-capable model regardless of the scanned heuristic
    pub prefer_vision: bool,
    /// Subject the created deck belongs to (falls back to the upload's)
    pub subject_id: Option<Uuid>,
    /// Persist suggestions for review instead of materializing cards
    pub review_mode: bool,
}

/// Result of a completed generation run
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub deck_id: Uuid,
    pub deck_name: String,
    /// Cards (or pending suggestions) created. Zero is a valid success:
    /// a job that ran but produced nothing completes as `done`.
    pub created: u32,
    /// Model the run was routed to
    pub model: String,
}

/// Generation orchestrator
pub struct Generator {
    repo: Repository,
    store: Arc<dyn DocumentStore>,
    model: Arc<dyn ModelClient>,
    llm: LlmConfig,
    generation: GenerationConfig,
    signed_url_ttl_secs: u64,
}

impl Generator {
    pub fn new(
        repo: Repository,
        store: Arc<dyn DocumentStore>,
        model: Arc<dyn ModelClient>,
        config: &AppConfig,
    ) -> Self {
        Self {
            repo,
            store,
            model,
            llm: config.llm.clone(),
            generation: config.generation.clone(),
            signed_url_ttl_secs: config.storage.signed_url_ttl_secs,
        }
    }

    /// Run generation for one upload.
    ///
    /// Safe to invoke twice for the same upload: status transitions are
    /// idempotent and a terminal job is never reopened.
    #[instrument(skip(self, params), fields(upload_id = %upload_id, target = params.target_count))]
    pub async fn run(&self, upload_id: Uuid, params: GenerationParams) -> Result<GenerationOutcome> {
        let upload = self
            .repo
            .find_upload_by_id(upload_id)
            .await?
            .ok_or_else(|| AppError::UploadNotFound {
                id: upload_id.to_string(),
            })?;

        // Mark processing early so pollers are not stuck on "queued"
        self.repo
            .set_job_status(upload_id, JobStatus::Processing, None)
            .await?;

        let started = Instant::now();
        match self.generate(&upload, &params).await {
            Ok(outcome) => {
                self.repo
                    .set_job_status(upload_id, JobStatus::Done, None)
                    .await?;
                metrics::record_generation(
                    started.elapsed().as_secs_f64(),
                    outcome.created as u64,
                    &outcome.model,
                    true,
                );
                info!(
                    created = outcome.created,
                    deck_id = %outcome.deck_id,
                    model = %outcome.model,
                    "Generation complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                // Best-effort status write; a failure here is logged and
                // swallowed so the original error reaches the caller.
                if let Err(status_err) = self
                    .repo
                    .set_job_status(upload_id, JobStatus::Error, Some(e.to_string()))
                    .await
                {
                    error!(error = %status_err, "Failed to record error status");
                }
                metrics::record_generation(
                    started.elapsed().as_secs_f64(),
                    0,
                    self.model.model_name(),
                    false,
                );
                Err(e)
            }
        }
    }

    async fn generate(
        &self,
        upload: &Upload,
        params: &GenerationParams,
    ) -> Result<GenerationOutcome> {
        // Fetch the source document
        let signed_url = self
            .store
            .signed_read_url(&upload.storage_path, self.signed_url_ttl_secs)
            .await?;
        let bytes = self.store.download(&signed_url).await?;

        // Extract page text
        let pages = extract::extract_pages(&bytes).map_err(AppError::from)?;
        if pages.is_empty() {
            return Err(AppError::EmptyDocument {
                message: "no text extracted (scanned PDF? try the vision model)".to_string(),
            });
        }
        self.repo
            .set_upload_page_count(upload.id, pages.len() as i32)
            .await?;

        // Near-zero text across non-zero pages means the source is image-only
        let use_vision = params.prefer_vision
            || looks_scanned(&pages, self.generation.scanned_char_threshold);
        let model_override = use_vision.then(|| self.llm.vision_model.clone());
        let model_label = model_override
            .clone()
            .unwrap_or_else(|| self.model.model_name().to_string());
        if use_vision && !params.prefer_vision {
            info!(model = %model_label, "Document looks scanned, routing to vision model");
        }

        let chunks = chunk_pages(
            &pages,
            &ChunkingConfig {
                max_chars: self.generation.max_chars,
                window_pages: self.generation.window_pages,
            },
        )
        .map_err(AppError::from)?;

        // One deck per generation run
        let deck_name = deck_name_from_file(&upload.file_name);
        let deck = self
            .repo
            .create_deck(
                upload.user_id,
                params.subject_id.or(upload.subject_id),
                deck_name.clone(),
            )
            .await?;

        let options = CompletionOptions {
            model: model_override,
            temperature: self.llm.temperature,
            num_ctx: self.llm.num_ctx,
            force_json: true,
            images: Vec::new(),
        };

        // Sequential chunk loop: the fair-share quota for each chunk depends
        // on how many suggestions earlier chunks already produced.
        let mut made: u32 = 0;
        for (index, chunk) in chunks.iter().enumerate() {
            if made >= params.target_count {
                break;
            }

            let requested = prompt::fair_share(params.target_count, made, chunks.len(), index);
            let user = prompt::user_prompt(chunk, requested);

            let call_started = Instant::now();
            let raw = match self.model.complete(SYSTEM_PROMPT, &user, &options).await {
                Ok(value) => {
                    metrics::record_model_call(
                        call_started.elapsed().as_secs_f64(),
                        self.model.name(),
                        true,
                    );
                    value
                }
                Err(AppError::MalformedOutput { message }) => {
                    // One bad chunk must not abort the whole job
                    warn!(
                        chunk = index,
                        pages = %format!("{}-{}", chunk.page_start, chunk.page_end),
                        error = %message,
                        "Model output was not valid JSON, skipping chunk"
                    );
                    metrics::record_model_call(
                        call_started.elapsed().as_secs_f64(),
                        self.model.name(),
                        false,
                    );
                    metrics::record_chunk_skipped("malformed_output");
                    continue;
                }
                Err(e) => {
                    // Backend/network failures are fatal for the invocation
                    metrics::record_model_call(
                        call_started.elapsed().as_secs_f64(),
                        self.model.name(),
                        false,
                    );
                    return Err(e);
                }
            };

            let suggestions = match validate::validate_payload(&raw) {
                Ok(suggestions) => suggestions,
                Err(e) => {
                    warn!(chunk = index, error = %e, "Validation failed, skipping chunk");
                    metrics::record_chunk_skipped("validation");
                    continue;
                }
            };

            made += self
                .materialize(upload, deck.id, &suggestions, params, made)
                .await?;
        }

        Ok(GenerationOutcome {
            deck_id: deck.id,
            deck_name,
            created: made,
            model: model_label,
        })
    }

    /// Turn validated suggestions into cards (or pending review rows),
    /// stopping at the remaining target budget.
    async fn materialize(
        &self,
        upload: &Upload,
        deck_id: Uuid,
        suggestions: &[Suggestion],
        params: &GenerationParams,
        made: u32,
    ) -> Result<u32> {
        let budget = params.target_count.saturating_sub(made) as usize;
        let batch = &suggestions[..suggestions.len().min(budget)];

        if params.review_mode {
            let rows: Vec<NewSuggestion> = batch
                .iter()
                .map(|s| NewSuggestion {
                    card_type: s.kind.as_str().to_string(),
                    front: s.front.clone(),
                    back: s.back.clone(),
                    page_refs: s.page_refs.clone(),
                    confidence: s.confidence,
                    difficulty: s.difficulty.as_str().to_string(),
                })
                .collect();
            let inserted = self
                .repo
                .insert_suggestions(upload.id, upload.user_id, rows)
                .await?;
            return Ok(inserted as u32);
        }

        let mut created = 0;
        for s in batch {
            self.repo
                .create_card_with_srs(NewCard {
                    user_id: upload.user_id,
                    deck_id,
                    card_type: s.kind.as_str().to_string(),
                    front: s.front.clone(),
                    back: s.back.clone(),
                    tags: vec![s.difficulty_tag()],
                    source: CardSource::Pdf,
                    upload_id: Some(upload.id),
                    page_refs: s.page_refs.clone(),
                })
                .await?;
            created += 1;
        }
        Ok(created)
    }
}

/// A document whose pages yield almost no text is treated as image-only
pub fn looks_scanned(pages: &[String], char_threshold: usize) -> bool {
    let total_chars: usize = pages.iter().map(|p| p.chars().count()).sum();
    !pages.is_empty() && total_chars < char_threshold
}

/// Deck name from the source file name, extension stripped
pub fn deck_name_from_file(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(index) => &file_name[..index],
    };
    let stem = stem.trim();
    if stem.is_empty() {
        "Untitled Deck".to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deck_name_strips_extension() {
        assert_eq!(deck_name_from_file("Biology 101.pdf"), "Biology 101");
        assert_eq!(deck_name_from_file("archive.tar.gz"), "archive.tar");
        assert_eq!(deck_name_from_file("no-extension"), "no-extension");
    }

    #[test]
    fn test_deck_name_falls_back_when_empty() {
        assert_eq!(deck_name_from_file(".pdf"), ".pdf");
        assert_eq!(deck_name_from_file(""), "Untitled Deck");
        assert_eq!(deck_name_from_file("   .pdf"), "Untitled Deck");
    }

    #[test]
    fn test_looks_scanned_threshold() {
        let sparse = vec!["a few words".to_string(), "more".to_string()];
        assert!(looks_scanned(&sparse, 400));

        let dense = vec!["x".repeat(500)];
        assert!(!looks_scanned(&dense, 400));

        // Zero pages never count as scanned
        assert!(!looks_scanned(&[], 400));
    }

    #[test]
    fn test_looks_scanned_boundary() {
        let exactly = vec!["y".repeat(400)];
        assert!(!looks_scanned(&exactly, 400));
        let just_under = vec!["y".repeat(399)];
        assert!(looks_scanned(&just_under, 400));
    }
}
