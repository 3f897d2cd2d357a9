// Pipeline Run Domain Model

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Run UUID
pub type RunId = String;

/// Pipeline UUID
pub type PipelineId = String;

/// Run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Started,
    Success,
    Failure,
    Aborted,
}

impl RunStatus {
    /// Statuses that still represent running infrastructure
    pub const LIVE: [RunStatus; 2] = [RunStatus::Pending, RunStatus::Started];

    pub fn is_live(self) -> bool {
        Self::LIVE.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "PENDING",
            RunStatus::Started => "STARTED",
            RunStatus::Success => "SUCCESS",
            RunStatus::Failure => "FAILURE",
            RunStatus::Aborted => "ABORTED",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(RunStatus::Pending),
            "STARTED" => Ok(RunStatus::Started),
            "SUCCESS" => Ok(RunStatus::Success),
            "FAILURE" => Ok(RunStatus::Failure),
            "ABORTED" => Ok(RunStatus::Aborted),
            other => Err(DomainError::UnknownStatus {
                kind: "run",
                value: other.to_string(),
            }),
        }
    }
}

/// Pipeline run (interactive when `job_uuid` is `None`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_uuid: RunId,
    pub project_uuid: String,
    pub pipeline_uuid: PipelineId,
    pub job_uuid: Option<String>,
    pub status: RunStatus,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
}

impl PipelineRun {
    pub fn is_interactive(&self) -> bool {
        self.job_uuid.is_none()
    }

    /// Transition a live run to ABORTED
    pub fn abort(&mut self, now_millis: i64) -> Result<()> {
        if !self.status.is_live() {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: RunStatus::Aborted.to_string(),
            });
        }
        self.status = RunStatus::Aborted;
        self.finished_at = Some(now_millis);
        Ok(())
    }
}
