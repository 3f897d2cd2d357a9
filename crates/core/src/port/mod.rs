// Port Layer - Interfaces for external dependencies

pub mod backend;
pub mod collateral_ledger;
pub mod id_provider; // For deterministic testing
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use backend::{BackendError, ExecutionBackend, ImageRegistry, JobScheduler};
pub use collateral_ledger::{CollateralLedger, LedgerEntry, LedgerStatus, NewLedgerEntry};
pub use id_provider::IdProvider;
pub use time_provider::TimeProvider;
pub use transaction::{MetadataStore, MetadataTransaction, Transaction};
