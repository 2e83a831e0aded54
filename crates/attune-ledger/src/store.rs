//! The external key-value store interface.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hierarchical address of one store entry: a key path plus a value name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreAddress {
    /// Hierarchical key path, segments separated by `\`.
    pub path: String,
    /// Value name within the key.
    pub name: String,
}

impl StoreAddress {
    /// Create an address from a path and value name.
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for StoreAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\\{}", self.path, self.name)
    }
}

/// The type tag of a store value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreValueKind {
    Integer32,
    Integer64,
    Text,
    ExpandableText,
    Binary,
    MultiText,
}

/// A typed store value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreValue {
    Integer32(i32),
    Integer64(i64),
    Text(String),
    ExpandableText(String),
    Binary(Vec<u8>),
    MultiText(Vec<String>),
}

impl StoreValue {
    /// The value's type tag.
    pub fn kind(&self) -> StoreValueKind {
        match self {
            StoreValue::Integer32(_) => StoreValueKind::Integer32,
            StoreValue::Integer64(_) => StoreValueKind::Integer64,
            StoreValue::Text(_) => StoreValueKind::Text,
            StoreValue::ExpandableText(_) => StoreValueKind::ExpandableText,
            StoreValue::Binary(_) => StoreValueKind::Binary,
            StoreValue::MultiText(_) => StoreValueKind::MultiText,
        }
    }
}

/// Store errors. Permission failures are distinguishable from absence:
/// `read` reports absence as `Ok(None)` and reserves errors for actual
/// failures.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The address does not exist (writes/deletes that require presence).
    #[error("store address not found: {0}")]
    NotFound(StoreAddress),

    /// The caller may not access the address.
    #[error("store access denied: {0}")]
    PermissionDenied(StoreAddress),

    /// Underlying I/O failure.
    #[error("store i/o failure: {0}")]
    Io(String),
}

/// An addressable, typed, externally-synchronized key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value at an address. `Ok(None)` means the address does
    /// not exist.
    async fn read(&self, address: &StoreAddress) -> Result<Option<StoreValue>, StoreError>;

    /// Write a value, creating the address if needed.
    async fn write(&self, address: &StoreAddress, value: StoreValue) -> Result<(), StoreError>;

    /// Delete an address. Deleting an absent address is not an error.
    async fn delete(&self, address: &StoreAddress) -> Result<(), StoreError>;
}

/// In-memory store for tests and local runs.
///
/// Supports denying individual addresses (permission failures) and
/// injecting blanket write failures, so collaborators can exercise the
/// ledger's partial-failure paths.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: DashMap<StoreAddress, StoreValue>,
    denied: DashSet<StoreAddress>,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an address with a value.
    pub fn seed(&self, address: StoreAddress, value: StoreValue) {
        self.entries.insert(address, value);
    }

    /// Deny all access to an address from now on.
    pub fn deny(&self, address: StoreAddress) {
        self.denied.insert(address);
    }

    /// Make every subsequent write fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current value at an address, for assertions.
    pub fn get(&self, address: &StoreAddress) -> Option<StoreValue> {
        self.entries.get(address).map(|v| v.clone())
    }

    fn check_denied(&self, address: &StoreAddress) -> Result<(), StoreError> {
        if self.denied.contains(address) {
            Err(StoreError::PermissionDenied(address.clone()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn read(&self, address: &StoreAddress) -> Result<Option<StoreValue>, StoreError> {
        self.check_denied(address)?;
        Ok(self.entries.get(address).map(|v| v.clone()))
    }

    async fn write(&self, address: &StoreAddress, value: StoreValue) -> Result<(), StoreError> {
        self.check_denied(address)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io("injected write failure".to_string()));
        }
        self.entries.insert(address.clone(), value);
        Ok(())
    }

    async fn delete(&self, address: &StoreAddress) -> Result<(), StoreError> {
        self.check_denied(address)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io("injected write failure".to_string()));
        }
        self.entries.remove(address);
        Ok(())
    }
}
