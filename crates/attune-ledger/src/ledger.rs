//! The reversible-mutation ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use attune_types::EntryId;

use crate::error::{LedgerError, Result};
use crate::store::{KeyValueStore, StoreAddress, StoreValue};

/// A recorded pre-mutation value.
///
/// Entries are append-only until restored; restoring is terminal for the
/// entry (a later mutation of the same address creates a new entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry identifier.
    pub id: EntryId,
    /// The store address the entry protects.
    pub address: StoreAddress,
    /// The value read before mutation; `None` means the address did not
    /// exist and restore will delete it.
    pub original_value: Option<StoreValue>,
    /// When the backup was captured.
    pub captured_at: DateTime<Utc>,
    /// Whether the entry has been restored.
    pub restored: bool,
    /// When the entry was restored.
    pub restored_at: Option<DateTime<Utc>>,
}

/// Outcome of a bulk restore. Partial failure is a valid terminal
/// outcome, not an exception.
#[derive(Debug, Clone, Default)]
pub struct RestoreReport {
    /// Entries restored in this pass.
    pub restored: Vec<EntryId>,
    /// Entries that failed, with the failure text. They remain pending.
    pub failed: Vec<(EntryId, String)>,
}

impl RestoreReport {
    /// Number of entries restored.
    pub fn restored_count(&self) -> usize {
        self.restored.len()
    }

    /// Number of entries that failed to restore.
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Whether every attempted entry restored.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Records pre-mutation values and restores them on demand.
///
/// The ledger does not assume exclusive access to the store: its
/// guarantee is "what I backed up, I can restore", and a restore writes
/// the captured value regardless of concurrent external changes.
pub struct MutationLedger {
    store: Arc<dyn KeyValueStore>,
    entries: RwLock<Vec<LedgerEntry>>,
}

impl MutationLedger {
    /// Create a ledger over the given store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Capture the current value at `address` before it is mutated.
    ///
    /// Idempotent: if a non-restored entry for the address already
    /// exists, its ID is returned without re-reading the store.
    #[instrument(skip(self), fields(address = %address))]
    pub async fn backup(&self, address: &StoreAddress) -> Result<EntryId> {
        let mut entries = self.entries.write().await;

        if let Some(existing) = entries
            .iter()
            .find(|e| !e.restored && &e.address == address)
        {
            debug!(entry_id = %existing.id, "address already backed up");
            return Ok(existing.id.clone());
        }

        let original_value = self.store.read(address).await?;
        let entry = LedgerEntry {
            id: EntryId::generate(),
            address: address.clone(),
            original_value,
            captured_at: Utc::now(),
            restored: false,
            restored_at: None,
        };
        let id = entry.id.clone();

        info!(entry_id = %id, "captured pre-mutation value");
        entries.push(entry);

        Ok(id)
    }

    /// Restore one entry, writing its original value back (or deleting
    /// the address if it did not previously exist).
    ///
    /// Restoring an unknown or already-restored entry is an error.
    #[instrument(skip(self), fields(entry_id = %entry_id))]
    pub async fn restore(&self, entry_id: &EntryId) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .iter_mut()
            .find(|e| &e.id == entry_id)
            .ok_or_else(|| LedgerError::UnknownEntry(entry_id.clone()))?;

        if entry.restored {
            return Err(LedgerError::AlreadyRestored(entry_id.clone()));
        }

        Self::apply(self.store.as_ref(), entry).await?;

        entry.restored = true;
        entry.restored_at = Some(Utc::now());
        info!(address = %entry.address, "entry restored");

        Ok(())
    }

    /// Restore every non-restored entry, continuing past individual
    /// failures. Always completes; failed entries remain pending and can
    /// be retried.
    #[instrument(skip(self))]
    pub async fn restore_all(&self) -> RestoreReport {
        let mut entries = self.entries.write().await;
        let mut report = RestoreReport::default();

        for entry in entries.iter_mut().filter(|e| !e.restored) {
            match Self::apply(self.store.as_ref(), entry).await {
                Ok(()) => {
                    entry.restored = true;
                    entry.restored_at = Some(Utc::now());
                    report.restored.push(entry.id.clone());
                }
                Err(e) => {
                    warn!(
                        entry_id = %entry.id,
                        address = %entry.address,
                        error = %e,
                        "restore failed; entry remains pending"
                    );
                    report.failed.push((entry.id.clone(), e.to_string()));
                }
            }
        }

        info!(
            restored = report.restored_count(),
            failed = report.failed_count(),
            "bulk restore finished"
        );

        report
    }

    /// Snapshot of all entries, in capture order.
    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.read().await.clone()
    }

    /// Number of entries not yet restored.
    pub async fn pending_count(&self) -> usize {
        self.entries.read().await.iter().filter(|e| !e.restored).count()
    }

    async fn apply(store: &dyn KeyValueStore, entry: &LedgerEntry) -> Result<()> {
        match &entry.original_value {
            Some(value) => store.write(&entry.address, value.clone()).await?,
            None => store.delete(&entry.address).await?,
        }
        Ok(())
    }
}
