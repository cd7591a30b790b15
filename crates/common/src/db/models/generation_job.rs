//! Generation job entity - the authoritative lifecycle record for one upload

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Job status enum
///
/// Transitions are monotonic: queued -> processing -> {done, error}.
/// Terminal states are final.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Error,
}

impl JobStatus {
    /// Whether this status ends the job lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    /// Whether a transition to `next` is allowed. Terminal states only
    /// permit re-setting the same status (an idempotent refresh); they are
    /// never reopened.
    pub fn allows_transition_to(&self, next: &JobStatus) -> bool {
        !self.is_terminal() || self == next
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => JobStatus::Queued,
            "processing" => JobStatus::Processing,
            "done" => JobStatus::Done,
            "error" => JobStatus::Error,
            _ => JobStatus::Queued,
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Queued => "queued".to_string(),
            JobStatus::Processing => "processing".to_string(),
            JobStatus::Done => "done".to_string(),
            JobStatus::Error => "error".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "generation_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// One job per upload
    #[sea_orm(unique)]
    pub upload_id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    /// Stored for future queue ordering, unused by core logic
    pub priority: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub error: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub started_at: Option<DateTimeWithTimeZone>,

    pub finished_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Get the job status as an enum
    pub fn job_status(&self) -> JobStatus {
        JobStatus::from(self.status.clone())
    }

    /// Check if the job is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.job_status().is_terminal()
    }

    /// Seconds elapsed since the job started, while it is still running
    pub fn running_secs(&self, now: chrono::DateTime<chrono::Utc>) -> Option<i64> {
        match (self.job_status(), self.started_at) {
            (JobStatus::Processing, Some(started)) => {
                Some((now - started.with_timezone(&chrono::Utc)).num_seconds())
            }
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::upload::Entity",
        from = "Column::UploadId",
        to = "super::upload::Column::Id"
    )]
    Upload,
}

impl Related<super::upload::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Upload.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for s in ["queued", "processing", "done", "error"] {
            let status = JobStatus::from(s.to_string());
            assert_eq!(String::from(status), s);
        }
    }

    #[test]
    fn test_unknown_status_defaults_to_queued() {
        assert_eq!(JobStatus::from("bogus".to_string()), JobStatus::Queued);
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_transitions_are_monotonic() {
        // processing after done must not regress the job
        assert!(!JobStatus::Done.allows_transition_to(&JobStatus::Processing));
        assert!(!JobStatus::Error.allows_transition_to(&JobStatus::Queued));
        assert!(!JobStatus::Done.allows_transition_to(&JobStatus::Error));

        // re-setting the same terminal status is an idempotent refresh
        assert!(JobStatus::Done.allows_transition_to(&JobStatus::Done));
        assert!(JobStatus::Error.allows_transition_to(&JobStatus::Error));

        // non-terminal states move freely
        assert!(JobStatus::Queued.allows_transition_to(&JobStatus::Processing));
        assert!(JobStatus::Processing.allows_transition_to(&JobStatus::Done));
        assert!(JobStatus::Processing.allows_transition_to(&JobStatus::Error));
        assert!(JobStatus::Processing.allows_transition_to(&JobStatus::Processing));
    }
}
