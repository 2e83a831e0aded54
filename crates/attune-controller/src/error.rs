//! Error types for the controller.

use thiserror::Error;

use attune_ledger::{LedgerError, StoreError};
use attune_predictor::PredictorError;

/// Controller error type.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The tick exceeded its configured deadline.
    #[error("tick deadline exceeded")]
    DeadlineExceeded,

    /// Backup through the ledger failed before any write.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A store write failed mid-batch; no numeric state was committed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Predictor training failed.
    #[error("predictor error: {0}")]
    Predictor(#[from] PredictorError),
}

/// Result type for controller operations.
pub type Result<T> = std::result::Result<T, ControllerError>;
