// Domain Layer - Entities owned by a project

pub mod collateral;
pub mod error;
pub mod image;
pub mod job;
pub mod project;
pub mod run;
pub mod session;

// Re-exports
pub use collateral::CollateralAction;
pub use error::DomainError;
pub use image::{EnvironmentId, EnvironmentImage};
pub use job::{Job, JobId, JobStatus};
pub use project::{ProjectFootprint, ProjectId};
pub use run::{PipelineId, PipelineRun, RunId, RunStatus};
pub use session::{InteractiveSession, SessionKey, SessionStatus};
