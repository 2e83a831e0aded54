//! Error types for the ledger.

use attune_types::EntryId;
use thiserror::Error;

use crate::store::StoreError;

/// Ledger error type.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No entry with the given ID exists.
    #[error("unknown ledger entry: {0}")]
    UnknownEntry(EntryId),

    /// The entry was already restored; restoring is terminal.
    #[error("ledger entry already restored: {0}")]
    AlreadyRestored(EntryId),

    /// The backing store rejected an operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
