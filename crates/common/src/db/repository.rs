//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations with proper
//! error handling. Writes are per-row atomic; the generation pipeline does
//! not rely on multi-row transactions across upload/job/deck/card writes.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::srs::{self, Grade, SrsSnapshot};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

/// Input for creating a card together with its scheduling state
#[derive(Debug, Clone)]
pub struct NewCard {
    pub user_id: Uuid,
    pub deck_id: Uuid,
    pub card_type: String,
    pub front: String,
    pub back: String,
    pub tags: Vec<String>,
    pub source: CardSource,
    pub upload_id: Option<Uuid>,
    pub page_refs: Vec<u32>,
}

/// Input for persisting a suggestion in the review workflow
#[derive(Debug, Clone)]
pub struct NewSuggestion {
    pub card_type: String,
    pub front: String,
    pub back: String,
    pub page_refs: Vec<u32>,
    pub confidence: Option<f64>,
    pub difficulty: String,
}

/// Composite progress view over an upload and its generation job
#[derive(Debug, Clone)]
pub struct UploadProgress {
    pub upload: Upload,
    pub job: Option<GenerationJob>,
    pub cards_created: u64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Upload Operations
    // ========================================================================

    /// Create an upload together with its generation job (both `queued`).
    ///
    /// The two inserts are individually atomic, not transactional: a crash
    /// between them leaves an upload without a job, surfaced later as
    /// `JobNotFound`.
    pub async fn create_upload_with_job(
        &self,
        user_id: Uuid,
        subject_id: Option<Uuid>,
        file_name: String,
        storage_path: String,
        size_bytes: i64,
        page_count: Option<i32>,
    ) -> Result<(Upload, GenerationJob)> {
        let now = chrono::Utc::now();

        let upload = UploadActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            subject_id: Set(subject_id),
            file_name: Set(file_name),
            storage_path: Set(storage_path),
            size_bytes: Set(size_bytes),
            page_count: Set(page_count),
            status: Set(String::from(UploadStatus::Queued)),
            created_at: Set(now.into()),
        };
        let upload = upload.insert(self.write_conn()).await?;

        let job = GenerationJobActiveModel {
            id: Set(Uuid::new_v4()),
            upload_id: Set(upload.id),
            user_id: Set(user_id),
            status: Set(String::from(JobStatus::Queued)),
            priority: Set(0),
            error: Set(None),
            created_at: Set(now.into()),
            started_at: Set(None),
            finished_at: Set(None),
        };
        let job = job.insert(self.write_conn()).await?;

        Ok((upload, job))
    }

    /// Find upload by ID
    pub async fn find_upload_by_id(&self, id: Uuid) -> Result<Option<Upload>> {
        UploadEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List uploads for a user, newest first
    pub async fn list_uploads_by_user(&self, user_id: Uuid) -> Result<Vec<Upload>> {
        UploadEntity::find()
            .filter(UploadColumn::UserId.eq(user_id))
            .order_by_desc(UploadColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Record the page count discovered during text extraction
    pub async fn set_upload_page_count(&self, upload_id: Uuid, page_count: i32) -> Result<()> {
        let mut upload: UploadActiveModel = UploadEntity::find_by_id(upload_id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::UploadNotFound {
                id: upload_id.to_string(),
            })?
            .into();

        upload.page_count = Set(Some(page_count));
        upload.update(self.write_conn()).await?;
        Ok(())
    }

    /// Composite progress view: upload row, its job, and cards created so far
    pub async fn upload_progress(&self, upload_id: Uuid) -> Result<UploadProgress> {
        let upload = self
            .find_upload_by_id(upload_id)
            .await?
            .ok_or_else(|| AppError::UploadNotFound {
                id: upload_id.to_string(),
            })?;

        let job = self.find_job_by_upload(upload_id).await?;
        let cards_created = self.count_cards_by_upload(upload_id).await?;

        Ok(UploadProgress {
            upload,
            job,
            cards_created,
        })
    }

    // ========================================================================
    // Generation Job Operations
    // ========================================================================

    /// Find the generation job for an upload
    pub async fn find_job_by_upload(&self, upload_id: Uuid) -> Result<Option<GenerationJob>> {
        GenerationJobEntity::find()
            .filter(GenerationJobColumn::UploadId.eq(upload_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Set the generation job status for an upload, mirroring it onto the
    /// upload row.
    ///
    /// Idempotent and monotonic: re-setting the current status only refreshes
    /// timestamp fields, and a job that has reached `done` or `error` never
    /// leaves that state. `started_at` is set on the first transition to
    /// `processing`; `finished_at` is set on every terminal write.
    pub async fn set_job_status(
        &self,
        upload_id: Uuid,
        status: JobStatus,
        error: Option<String>,
    ) -> Result<GenerationJob> {
        let now = chrono::Utc::now();

        let current = GenerationJobEntity::find()
            .filter(GenerationJobColumn::UploadId.eq(upload_id))
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::JobNotFound {
                id: upload_id.to_string(),
            })?;

        let current_status = current.job_status();
        if !current_status.allows_transition_to(&status) {
            tracing::warn!(
                upload_id = %upload_id,
                current = %String::from(current_status.clone()),
                requested = %String::from(status),
                "Ignoring status transition out of a terminal state"
            );
            return Ok(current);
        }

        let started_at = current.started_at;
        let mut job: GenerationJobActiveModel = current.into();

        job.status = Set(String::from(status.clone()));
        job.error = Set(error);

        if status == JobStatus::Processing && started_at.is_none() {
            job.started_at = Set(Some(now.into()));
        }
        if status.is_terminal() {
            job.finished_at = Set(Some(now.into()));
        }

        let job = job.update(self.write_conn()).await?;

        let upload_status = match status {
            JobStatus::Queued => UploadStatus::Queued,
            JobStatus::Processing => UploadStatus::Processing,
            JobStatus::Done => UploadStatus::Done,
            JobStatus::Error => UploadStatus::Error,
        };
        self.mirror_upload_status(upload_id, upload_status).await?;

        Ok(job)
    }

    async fn mirror_upload_status(&self, upload_id: Uuid, status: UploadStatus) -> Result<()> {
        let mut upload: UploadActiveModel = UploadEntity::find_by_id(upload_id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::UploadNotFound {
                id: upload_id.to_string(),
            })?
            .into();

        upload.status = Set(String::from(status));
        upload.update(self.write_conn()).await?;
        Ok(())
    }

    // ========================================================================
    // Deck Operations
    // ========================================================================

    /// Create a new deck
    pub async fn create_deck(
        &self,
        user_id: Uuid,
        subject_id: Option<Uuid>,
        name: String,
    ) -> Result<Deck> {
        let deck = DeckActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            subject_id: Set(subject_id),
            name: Set(name),
            created_at: Set(chrono::Utc::now().into()),
        };

        deck.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find deck by ID
    pub async fn find_deck_by_id(&self, id: Uuid) -> Result<Option<Deck>> {
        DeckEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Card Operations
    // ========================================================================

    /// Create a card and its default scheduling state.
    ///
    /// Every card gets an SRS row in the same call; no card exists without
    /// scheduling state.
    pub async fn create_card_with_srs(&self, new: NewCard) -> Result<Card> {
        let now = chrono::Utc::now();
        let today = now.date_naive();

        let card = CardActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(new.user_id),
            deck_id: Set(new.deck_id),
            card_type: Set(new.card_type),
            front: Set(new.front),
            back: Set(new.back),
            tags: Set(serde_json::json!(new.tags)),
            prov_source: Set(new.source.as_str().to_string()),
            prov_upload_id: Set(new.upload_id),
            prov_page_refs: Set(serde_json::json!(new.page_refs)),
            created_at: Set(now.into()),
        };
        let card = card.insert(self.write_conn()).await?;

        let state = SrsStateActiveModel {
            card_id: Set(card.id),
            ease: Set(DEFAULT_EASE),
            interval_days: Set(0),
            due: Set(Some(today)),
            last_reviewed: Set(Some(today)),
        };
        state.insert(self.write_conn()).await?;

        Ok(card)
    }

    /// Count cards generated from an upload
    pub async fn count_cards_by_upload(&self, upload_id: Uuid) -> Result<u64> {
        CardEntity::find()
            .filter(CardColumn::ProvUploadId.eq(upload_id))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List cards in a deck, newest first
    pub async fn list_cards_by_deck(&self, deck_id: Uuid) -> Result<Vec<Card>> {
        CardEntity::find()
            .filter(CardColumn::DeckId.eq(deck_id))
            .order_by_desc(CardColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find card by ID
    pub async fn find_card_by_id(&self, id: Uuid) -> Result<Option<Card>> {
        CardEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Suggestion Operations (async review workflow)
    // ========================================================================

    /// Persist a batch of suggestions as `new` for later review
    pub async fn insert_suggestions(
        &self,
        upload_id: Uuid,
        user_id: Uuid,
        suggestions: Vec<NewSuggestion>,
    ) -> Result<u64> {
        let now = chrono::Utc::now();
        let mut inserted = 0;

        for s in suggestions {
            let row = SuggestionActiveModel {
                id: Set(Uuid::new_v4()),
                upload_id: Set(upload_id),
                user_id: Set(user_id),
                deck_id: Set(None),
                card_type: Set(s.card_type),
                front: Set(s.front),
                back: Set(s.back),
                page_refs: Set(serde_json::json!(s.page_refs)),
                confidence: Set(s.confidence),
                difficulty: Set(s.difficulty),
                status: Set(String::from(SuggestionStatus::New)),
                created_at: Set(now.into()),
            };
            row.insert(self.write_conn()).await?;
            inserted += 1;
        }

        Ok(inserted)
    }

    /// List suggestions, optionally filtered by upload and status
    pub async fn list_suggestions(
        &self,
        upload_id: Option<Uuid>,
        status: Option<SuggestionStatus>,
    ) -> Result<Vec<Suggestion>> {
        let mut query = SuggestionEntity::find();

        if let Some(upload_id) = upload_id {
            query = query.filter(SuggestionColumn::UploadId.eq(upload_id));
        }
        if let Some(status) = status {
            query = query.filter(SuggestionColumn::Status.eq(String::from(status)));
        }

        query
            .order_by_desc(SuggestionColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find suggestion by ID
    pub async fn find_suggestion_by_id(&self, id: Uuid) -> Result<Option<Suggestion>> {
        SuggestionEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Update a suggestion's review status and, optionally, its text
    pub async fn update_suggestion(
        &self,
        id: Uuid,
        status: SuggestionStatus,
        front: Option<String>,
        back: Option<String>,
    ) -> Result<Suggestion> {
        let mut suggestion: SuggestionActiveModel = SuggestionEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::SuggestionNotFound { id: id.to_string() })?
            .into();

        suggestion.status = Set(String::from(status));
        if let Some(front) = front {
            suggestion.front = Set(front);
        }
        if let Some(back) = back {
            suggestion.back = Set(back);
        }

        suggestion.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Accept a suggestion: materialize it as a card (with scheduling state)
    /// in the target deck and mark the suggestion accepted.
    pub async fn accept_suggestion(&self, id: Uuid, deck_id: Uuid) -> Result<Card> {
        let suggestion = self
            .find_suggestion_by_id(id)
            .await?
            .ok_or_else(|| AppError::SuggestionNotFound { id: id.to_string() })?;

        let deck = self
            .find_deck_by_id(deck_id)
            .await?
            .ok_or_else(|| AppError::DeckNotFound {
                id: deck_id.to_string(),
            })?;

        let page_refs: Vec<u32> =
            serde_json::from_value(suggestion.page_refs.clone()).unwrap_or_default();

        let card = self
            .create_card_with_srs(NewCard {
                user_id: suggestion.user_id,
                deck_id: deck.id,
                card_type: CardType::from(suggestion.card_type.clone())
                    .as_str()
                    .to_string(),
                front: suggestion.front.clone(),
                back: suggestion.back.clone(),
                tags: vec![format!("difficulty:{}", suggestion.difficulty)],
                source: CardSource::Pdf,
                upload_id: Some(suggestion.upload_id),
                page_refs,
            })
            .await?;

        self.update_suggestion(id, SuggestionStatus::Accepted, None, None)
            .await?;

        Ok(card)
    }

    // ========================================================================
    // SRS Operations
    // ========================================================================

    /// Get the scheduling state for a card
    pub async fn find_srs_by_card(&self, card_id: Uuid) -> Result<Option<SrsState>> {
        SrsStateEntity::find_by_id(card_id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Apply a review grade to a card's scheduling state.
    ///
    /// Computes the pure update rule, then persists the new ease/interval
    /// with `last_reviewed = today` and `due = today + interval` days.
    pub async fn apply_review(&self, card_id: Uuid, grade: Grade) -> Result<SrsState> {
        let current = SrsStateEntity::find_by_id(card_id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::CardNotFound {
                id: card_id.to_string(),
            })?;

        let next = srs::grade(
            &SrsSnapshot {
                ease: current.ease,
                interval_days: current.interval_days,
            },
            grade,
        );

        let today = chrono::Utc::now().date_naive();
        let due = srs::next_due(today, next.interval_days);

        let mut state: SrsStateActiveModel = current.into();
        state.ease = Set(next.ease);
        state.interval_days = Set(next.interval_days);
        state.due = Set(Some(due));
        state.last_reviewed = Set(Some(today));

        state.update(self.write_conn()).await.map_err(Into::into)
    }
}
