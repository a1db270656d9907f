//! Error types for core value parsing.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown risk level: {0}")]
    UnknownRisk(String),
    #[error("Unknown direction: {0}")]
    UnknownDirection(String),
    #[error("Unknown signal status: {0}")]
    UnknownStatus(String),
    #[error("Invalid price: {0}")]
    InvalidPrice(String),
}
