// Collateral Action - a deferred infrastructure call with resolved arguments

use serde::{Deserialize, Serialize};

/// Post-commit side effect captured at enqueue time
///
/// Serializable so that failed actions can be persisted and replayed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollateralAction {
    /// Terminate the workload of a pipeline run
    AbortRun { run_uuid: String },
    /// Tear down the live compute context of a session
    StopSession {
        project_uuid: String,
        pipeline_uuid: String,
    },
    /// Cancel outstanding scheduled invocations of a job
    CancelJob { job_uuid: String },
    /// Delete every built image of a project from the registry
    DeleteImages { project_uuid: String },
}

impl CollateralAction {
    pub fn kind(&self) -> &'static str {
        match self {
            CollateralAction::AbortRun { .. } => "abort_run",
            CollateralAction::StopSession { .. } => "stop_session",
            CollateralAction::CancelJob { .. } => "cancel_job",
            CollateralAction::DeleteImages { .. } => "delete_images",
        }
    }

    /// Identifier of the external resource the action targets
    pub fn target(&self) -> String {
        match self {
            CollateralAction::AbortRun { run_uuid } => run_uuid.clone(),
            CollateralAction::StopSession {
                project_uuid,
                pipeline_uuid,
            } => format!("{}/{}", project_uuid, pipeline_uuid),
            CollateralAction::CancelJob { job_uuid } => job_uuid.clone(),
            CollateralAction::DeleteImages { project_uuid } => project_uuid.clone(),
        }
    }
}

impl std::fmt::Display for CollateralAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind(), self.target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_form_is_tagged() {
        let action = CollateralAction::StopSession {
            project_uuid: "p1".to_string(),
            pipeline_uuid: "pl1".to_string(),
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["kind"], "stop_session");
        assert_eq!(value["pipeline_uuid"], "pl1");

        let back: CollateralAction = serde_json::from_value(value).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn test_display() {
        let action = CollateralAction::AbortRun {
            run_uuid: "r9".to_string(),
        };
        assert_eq!(action.to_string(), "abort_run(r9)");
    }
}
