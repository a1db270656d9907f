//! Error types for the client state layer.

use signaldesk_gateway::GatewayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("No user identity available")]
    MissingIdentity,

    #[error("Subscription toggle already in progress for {0}")]
    ToggleInProgress(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid init data: {0}")]
    InvalidInitData(String),

    #[error("Invalid edit: {0}")]
    InvalidEdit(String),
}

impl ClientError {
    /// Failures the user can retry by hand.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Gateway(e) => e.is_transient(),
            ClientError::ToggleInProgress(_) => true,
            _ => false,
        }
    }
}
