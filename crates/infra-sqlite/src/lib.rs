// Cascade Infrastructure - SQLite Adapter
// Implements: MetadataStore, MetadataTransaction, CollateralLedger

mod collateral_ledger;
mod connection;
mod error;
mod metadata_store;
mod migration;
mod transaction;

pub use collateral_ledger::SqliteCollateralLedger;
pub use connection::create_pool;
pub use metadata_store::SqliteMetadataStore;
pub use migration::run_migrations;
pub use transaction::SqliteMetadataTransaction;

// Note: sqlx::Error conversion is handled by map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
