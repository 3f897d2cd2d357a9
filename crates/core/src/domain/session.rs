// Interactive Session Domain Model

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Session identity: at most one session per (project, pipeline)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub project_uuid: String,
    pub pipeline_uuid: String,
}

impl SessionKey {
    pub fn new(project_uuid: impl Into<String>, pipeline_uuid: impl Into<String>) -> Self {
        Self {
            project_uuid: project_uuid.into(),
            pipeline_uuid: pipeline_uuid.into(),
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.project_uuid, self.pipeline_uuid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Launching,
    Running,
    Stopping,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Launching => "LAUNCHING",
            SessionStatus::Running => "RUNNING",
            SessionStatus::Stopping => "STOPPING",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LAUNCHING" => Ok(SessionStatus::Launching),
            "RUNNING" => Ok(SessionStatus::Running),
            "STOPPING" => Ok(SessionStatus::Stopping),
            other => Err(DomainError::UnknownStatus {
                kind: "session",
                value: other.to_string(),
            }),
        }
    }
}

/// Live compute context bound to a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveSession {
    pub key: SessionKey,
    pub status: SessionStatus,
}
