//! Attune Ledger - Reversible mutation of an external key-value store
//!
//! Before the controller changes any persistent configuration entry, the
//! [`MutationLedger`] captures the entry's pre-mutation value. Any entry,
//! or all of them, can later be restored, which makes tuning safe to
//! undo at deactivation or on demand.
//!
//! The backing store is abstracted behind [`KeyValueStore`]: a hierarchical
//! addressable store of typed values that distinguishes "permission
//! denied" from "not found". The store is shared, externally-synchronized
//! state; the ledger's guarantee is only "what I backed up, I can
//! restore", never "nobody else touched it meanwhile".
//!
//! Ledger entries live for the process lifetime only; persisting them
//! across restarts is an explicit non-goal.

pub mod error;
pub mod ledger;
pub mod store;

pub use error::{LedgerError, Result};
pub use ledger::{LedgerEntry, MutationLedger, RestoreReport};
pub use store::{InMemoryStore, KeyValueStore, StoreAddress, StoreError, StoreValue, StoreValueKind};
