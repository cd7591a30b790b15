//! Remote worker dispatch and callback reconciliation
//!
//! The remote strategy hands a whole job to an external worker: a signed
//! document URL and the generation parameters go out in one authenticated
//! request, and the worker later reports back through an authenticated
//! callback carrying either suggestions or an error. Dispatch never retries
//! on its own; retry policy belongs to the caller.

use crate::pipeline::deck_name_from_file;
use crate::validate::Suggestion;
use cardforge_common::auth::verify_shared_secret;
use cardforge_common::config::{AppConfig, WorkerConfig};
use cardforge_common::db::models::{CardSource, JobStatus};
use cardforge_common::db::{NewCard, Repository};
use cardforge_common::errors::{AppError, Result};
use cardforge_common::metrics;
use cardforge_common::storage::DocumentStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Wire payload sent to the remote worker
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerJobRequest {
    pub job_id: Uuid,
    pub upload: WorkerUpload,
    pub subject_id: Option<Uuid>,
    pub target_count: u32,
    #[serde(rename = "preferVL")]
    pub prefer_vl: bool,
    pub callback_url: String,
    pub callback_secret: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerUpload {
    pub signed_url: String,
    pub file_name: String,
}

/// Payload the worker posts back to the callback endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    pub job_id: Uuid,
    #[serde(default)]
    pub deck: Option<CallbackDeck>,
    #[serde(default)]
    pub suggestions: Vec<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackDeck {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub subject_id: Option<Uuid>,
}

/// Parameters for a remote dispatch
#[derive(Debug, Clone)]
pub struct DispatchParams {
    pub target_count: u32,
    pub prefer_vision: bool,
    pub subject_id: Option<Uuid>,
}

/// Result of a reconciled callback
#[derive(Debug, Clone)]
pub struct CallbackAck {
    pub deck_id: Option<Uuid>,
    pub created: u32,
}

/// Dispatch and callback gateway
pub struct Dispatcher {
    repo: Repository,
    store: Arc<dyn DocumentStore>,
    client: reqwest::Client,
    worker: WorkerConfig,
    callback_url: String,
    dispatch_url_ttl_secs: u64,
}

impl Dispatcher {
    pub fn new(
        repo: Repository,
        store: Arc<dyn DocumentStore>,
        config: &AppConfig,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.worker.dispatch_timeout_secs))
            .build()?;

        Ok(Self {
            repo,
            store,
            client,
            worker: config.worker.clone(),
            callback_url: config.callback_url(),
            dispatch_url_ttl_secs: config.storage.dispatch_url_ttl_secs,
        })
    }

    /// All three dispatch secrets are required; a missing one is a
    /// configuration error raised before any side effect.
    fn required_config(&self) -> Result<(&str, &str, &str)> {
        let endpoint = self
            .worker
            .endpoint
            .as_deref()
            .ok_or_else(|| AppError::Configuration {
                message: "worker.endpoint is not set".to_string(),
            })?;
        let token = self
            .worker
            .token
            .as_deref()
            .ok_or_else(|| AppError::Configuration {
                message: "worker.token is not set".to_string(),
            })?;
        let secret = self
            .worker
            .callback_secret
            .as_deref()
            .ok_or_else(|| AppError::Configuration {
                message: "worker.callback_secret is not set".to_string(),
            })?;
        Ok((endpoint, token, secret))
    }

    /// Hand a job to the remote worker.
    ///
    /// Returns once the worker acknowledges receipt; generation completes
    /// later through the callback. Timeout or connection failure marks the
    /// job `error` and surfaces `WorkerUnreachable` to the caller.
    #[instrument(skip(self, params), fields(upload_id = %upload_id, target = params.target_count))]
    pub async fn dispatch(&self, upload_id: Uuid, params: DispatchParams) -> Result<()> {
        let (endpoint, token, secret) = self.required_config()?;

        let upload = self
            .repo
            .find_upload_by_id(upload_id)
            .await?
            .ok_or_else(|| AppError::UploadNotFound {
                id: upload_id.to_string(),
            })?;

        // Workers fetch later, so the signed URL gets a longer TTL
        let signed_url = self
            .store
            .signed_read_url(&upload.storage_path, self.dispatch_url_ttl_secs)
            .await?;

        self.repo
            .set_job_status(upload_id, JobStatus::Processing, None)
            .await?;

        let request = WorkerJobRequest {
            job_id: upload_id,
            upload: WorkerUpload {
                signed_url,
                file_name: upload.file_name.clone(),
            },
            subject_id: params.subject_id.or(upload.subject_id),
            target_count: params.target_count,
            prefer_vl: params.prefer_vision,
            callback_url: self.callback_url.clone(),
            callback_secret: secret.to_string(),
        };

        let url = format!("{}/v1/jobs", endpoint.trim_end_matches('/'));
        info!(worker = %url, "Dispatching job to remote worker");

        let response = match self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let message = if e.is_timeout() {
                    format!(
                        "worker did not respond within {}s",
                        self.worker.dispatch_timeout_secs
                    )
                } else {
                    e.to_string()
                };
                self.mark_error(
                    upload_id,
                    format!("cannot reach worker at {}: {}", endpoint, message),
                )
                .await;
                metrics::record_dispatch(false);
                return Err(AppError::WorkerUnreachable {
                    endpoint: endpoint.to_string(),
                    message,
                });
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            self.mark_error(upload_id, format!("worker {} {}", status, body))
                .await;
            metrics::record_dispatch(false);
            return Err(AppError::Worker {
                status: status.as_u16(),
                body,
            });
        }

        metrics::record_dispatch(true);
        info!(status = status.as_u16(), "Worker accepted job");
        Ok(())
    }

    /// Reconcile a worker callback against its job.
    ///
    /// The shared-secret check runs before the body is parsed; a mismatch
    /// rejects the request with the job state untouched.
    #[instrument(skip_all)]
    pub async fn handle_callback(
        &self,
        secret_header: Option<&str>,
        raw_body: &str,
    ) -> Result<CallbackAck> {
        let expected = self
            .worker
            .callback_secret
            .as_deref()
            .ok_or_else(|| AppError::Configuration {
                message: "worker.callback_secret is not set".to_string(),
            })?;

        if !verify_shared_secret(secret_header.unwrap_or_default(), expected) {
            metrics::record_callback("forbidden");
            return Err(AppError::Forbidden {
                message: "invalid callback secret".to_string(),
            });
        }

        let payload: CallbackPayload =
            serde_json::from_str(raw_body).map_err(|e| AppError::InvalidFormat {
                message: format!("callback payload: {}", e),
            })?;

        info!(
            job_id = %payload.job_id,
            suggestions = payload.suggestions.len(),
            has_error = payload.error.is_some(),
            "Callback received"
        );

        // A worker-side failure just finalizes the job
        if let Some(worker_error) = payload.error {
            self.repo
                .set_job_status(payload.job_id, JobStatus::Error, Some(worker_error))
                .await?;
            metrics::record_callback("error");
            return Ok(CallbackAck {
                deck_id: None,
                created: 0,
            });
        }

        let upload = self
            .repo
            .find_upload_by_id(payload.job_id)
            .await?
            .ok_or_else(|| AppError::UploadNotFound {
                id: payload.job_id.to_string(),
            })?;

        let deck_name = payload
            .deck
            .as_ref()
            .and_then(|d| d.name.clone())
            .unwrap_or_else(|| deck_name_from_file(&upload.file_name));
        let subject_id = payload
            .deck
            .as_ref()
            .and_then(|d| d.subject_id)
            .or(upload.subject_id);

        let deck = match self
            .repo
            .create_deck(upload.user_id, subject_id, deck_name)
            .await
        {
            Ok(deck) => deck,
            Err(e) => {
                self.mark_error(payload.job_id, format!("deck insert: {}", e))
                    .await;
                metrics::record_callback("error");
                return Err(e);
            }
        };

        // Best-effort inserts: a failure marks the job as errored but cards
        // already written stay.
        let mut created = 0;
        for (index, value) in payload.suggestions.iter().enumerate() {
            let suggestion = match Suggestion::from_value(value) {
                Ok(suggestion) => suggestion,
                Err(reason) => {
                    warn!(index, reason = %reason, "Skipping malformed callback suggestion");
                    continue;
                }
            };

            let result = self
                .repo
                .create_card_with_srs(NewCard {
                    user_id: upload.user_id,
                    deck_id: deck.id,
                    card_type: suggestion.kind.as_str().to_string(),
                    front: suggestion.front.clone(),
                    back: suggestion.back.clone(),
                    tags: vec![suggestion.difficulty_tag()],
                    source: CardSource::Pdf,
                    upload_id: Some(upload.id),
                    page_refs: suggestion.page_refs.clone(),
                })
                .await;

            match result {
                Ok(_) => created += 1,
                Err(e) => {
                    self.mark_error(payload.job_id, format!("cards insert: {}", e))
                        .await;
                    metrics::record_callback("error");
                    return Err(e);
                }
            }
        }

        self.repo
            .set_job_status(payload.job_id, JobStatus::Done, None)
            .await?;

        metrics::record_callback("done");
        info!(deck_id = %deck.id, created, "Callback reconciled");

        Ok(CallbackAck {
            deck_id: Some(deck.id),
            created,
        })
    }

    /// Best-effort error status write that never throws past the original
    /// failure path.
    async fn mark_error(&self, upload_id: Uuid, message: String) {
        if let Err(e) = self
            .repo
            .set_job_status(upload_id, JobStatus::Error, Some(message))
            .await
        {
            error!(upload_id = %upload_id, error = %e, "Failed to record error status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_worker_request_wire_shape() {
        let job_id = Uuid::new_v4();
        let request = WorkerJobRequest {
            job_id,
            upload: WorkerUpload {
                signed_url: "https://store/signed".to_string(),
                file_name: "notes.pdf".to_string(),
            },
            subject_id: None,
            target_count: 40,
            prefer_vl: true,
            callback_url: "https://app/v1/remote/callback".to_string(),
            callback_secret: "s3cret".to_string(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["jobId"], job_id.to_string());
        assert_eq!(value["upload"]["signedUrl"], "https://store/signed");
        assert_eq!(value["upload"]["fileName"], "notes.pdf");
        assert_eq!(value["targetCount"], 40);
        assert_eq!(value["preferVL"], true);
        assert_eq!(value["callbackUrl"], "https://app/v1/remote/callback");
        assert_eq!(value["callbackSecret"], "s3cret");
    }

    #[test]
    fn test_callback_payload_with_error_only() {
        let job_id = Uuid::new_v4();
        let raw = json!({
            "jobId": job_id.to_string(),
            "error": "worker exploded"
        })
        .to_string();

        let payload: CallbackPayload = serde_json::from_str(&raw).unwrap();
        assert_eq!(payload.job_id, job_id);
        assert_eq!(payload.error.as_deref(), Some("worker exploded"));
        assert!(payload.suggestions.is_empty());
        assert!(payload.deck.is_none());
    }

    #[test]
    fn test_callback_payload_full() {
        let job_id = Uuid::new_v4();
        let raw = json!({
            "jobId": job_id.to_string(),
            "deck": { "name": "Chapter 1" },
            "suggestions": [
                { "front": "f", "back": "b", "pageRefs": [1] }
            ]
        })
        .to_string();

        let payload: CallbackPayload = serde_json::from_str(&raw).unwrap();
        assert!(payload.error.is_none());
        assert_eq!(payload.deck.unwrap().name.as_deref(), Some("Chapter 1"));
        assert_eq!(payload.suggestions.len(), 1);
    }

    #[test]
    fn test_callback_payload_rejects_missing_job_id() {
        let raw = json!({ "error": "no job id" }).to_string();
        assert!(serde_json::from_str::<CallbackPayload>(&raw).is_err());
    }
}
