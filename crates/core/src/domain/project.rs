// Project Domain Model

use serde::{Deserialize, Serialize};

/// Project UUID (opaque)
pub type ProjectId = String;

/// Row counts of everything a project owns, as seen by the metadata store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFootprint {
    pub exists: bool,
    pub runs: i64,
    pub live_runs: i64,
    pub sessions: i64,
    pub jobs: i64,
    pub images: i64,
}

impl ProjectFootprint {
    /// True when neither the project nor any dependent row remains
    pub fn is_gone(&self) -> bool {
        !self.exists && self.runs == 0 && self.sessions == 0 && self.jobs == 0 && self.images == 0
    }
}
