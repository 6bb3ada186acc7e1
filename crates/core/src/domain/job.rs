use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A row in the durable job queue. Exactly one worker may move a row from
/// `pending` to `running`; the claim also bumps `attempts`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub tenant_id: String,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    /// Higher runs first.
    pub priority: i32,
    pub attempts: i32,
    pub max_attempts: i32,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Job {
    /// Idempotency key embedded in the payload, if the producer set one.
    pub fn idempotency_key(&self) -> Option<&str> {
        self.payload.get("idempotency_key").and_then(serde_json::Value::as_str)
    }
}

pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;

/// Job type names as persisted in the queue.
pub mod job_types {
    pub const OUTBOUND_REPLY: &str = "outbound_reply";
    pub const PROCESS_MEDIA: &str = "process_media";
    pub const NOTIFY_OPERATOR: &str = "notify_operator";
    pub const NOTIFY_CREW_FALLBACK: &str = "notify_crew_fallback";
    pub const MEDIA_CLEANUP: &str = "media_cleanup";
    pub const SESSION_CLEANUP: &str = "session_cleanup";
}

/// Which job types a worker process claims.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerRole {
    Core,
    Dispatch,
    All,
}

impl WorkerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Dispatch => "dispatch",
            Self::All => "all",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "core" => Some(Self::Core),
            "dispatch" => Some(Self::Dispatch),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    /// Job types this role is allowed to claim and execute.
    pub fn job_types(&self) -> Vec<&'static str> {
        use job_types::*;
        match self {
            Self::Core => {
                vec![OUTBOUND_REPLY, PROCESS_MEDIA, NOTIFY_OPERATOR, MEDIA_CLEANUP, SESSION_CLEANUP]
            }
            Self::Dispatch => vec![NOTIFY_CREW_FALLBACK],
            Self::All => {
                let mut types = Self::Core.job_types();
                types.extend(Self::Dispatch.job_types());
                types
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_all_is_the_union_of_core_and_dispatch() {
        let all = WorkerRole::All.job_types();
        for t in WorkerRole::Core.job_types() {
            assert!(all.contains(&t));
        }
        for t in WorkerRole::Dispatch.job_types() {
            assert!(all.contains(&t));
        }
    }

    #[test]
    fn crew_fallback_is_dispatch_only() {
        assert!(!WorkerRole::Core.job_types().contains(&job_types::NOTIFY_CREW_FALLBACK));
        assert!(WorkerRole::Dispatch.job_types().contains(&job_types::NOTIFY_CREW_FALLBACK));
    }

    #[test]
    fn idempotency_key_reads_from_payload() {
        let job = Job {
            id: "j-1".to_string(),
            tenant_id: "t-1".to_string(),
            job_type: job_types::NOTIFY_OPERATOR.to_string(),
            payload: serde_json::json!({
                "lead_id": "abc",
                "idempotency_key": "abc:notify_operator_v1",
            }),
            status: JobStatus::Pending,
            priority: 0,
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            scheduled_at: Utc::now(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
        };
        assert_eq!(job.idempotency_key(), Some("abc:notify_operator_v1"));
    }
}
