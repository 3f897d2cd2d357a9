// Application Layer - Two-phase coordination and cascading deletion

pub mod collateral;
pub mod retry;
pub mod scope;
pub mod service;
pub mod unit;
pub mod units;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use collateral::{
    ActionOutcome, CollateralExecutor, CollateralFailure, CollateralPolicy, CollateralQueue,
    CollateralReport,
};
pub use retry::{CollateralRetryService, RetryScheduler, RetryStats};
pub use scope::{Coordinator, TransactionScope};
pub use service::ProjectService;
pub use unit::UnitOfWork;
pub use units::{AbortRun, DeleteEnvironmentImages, DeleteJob, DeleteProject, StopSession};
