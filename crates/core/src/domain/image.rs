// Environment Image Domain Model

use serde::{Deserialize, Serialize};

/// Environment UUID
pub type EnvironmentId = String;

/// Built container image of a project environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentImage {
    pub project_uuid: String,
    pub environment_uuid: EnvironmentId,
    pub tag: i64,
}
