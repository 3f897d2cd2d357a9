// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unknown {kind} status: {value}")]
    UnknownStatus { kind: &'static str, value: String },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, DomainError>;
