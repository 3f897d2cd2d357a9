// Job Domain Model

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Job UUID
pub type JobId = String;

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Draft,
    Pending,
    Started,
    Paused,
    Success,
    Failure,
    Aborted,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Draft => "DRAFT",
            JobStatus::Pending => "PENDING",
            JobStatus::Started => "STARTED",
            JobStatus::Paused => "PAUSED",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failure => "FAILURE",
            JobStatus::Aborted => "ABORTED",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DRAFT" => Ok(JobStatus::Draft),
            "PENDING" => Ok(JobStatus::Pending),
            "STARTED" => Ok(JobStatus::Started),
            "PAUSED" => Ok(JobStatus::Paused),
            "SUCCESS" => Ok(JobStatus::Success),
            "FAILURE" => Ok(JobStatus::Failure),
            "ABORTED" => Ok(JobStatus::Aborted),
            other => Err(DomainError::UnknownStatus {
                kind: "job",
                value: other.to_string(),
            }),
        }
    }
}

/// Scheduled or one-off job owned by a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub job_uuid: JobId,
    pub project_uuid: String,
    pub pipeline_uuid: String,
    pub name: String,
    pub schedule: Option<String>, // cron expression for recurring jobs
    pub status: JobStatus,
}
