//! Error types for the engine.

use thiserror::Error;

use attune_controller::ControllerError;
use attune_ledger::{LedgerError, StoreError};

/// Engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A precondition check failed during initialization. Not retryable
    /// without external remediation.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The requested operation is not valid in the current state.
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: String,
    },

    /// Controller subsystem error.
    #[error("controller error: {0}")]
    Controller(#[from] ControllerError),

    /// Ledger subsystem error.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
