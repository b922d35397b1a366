#![allow(dead_code)]

//! Common test utilities shared across integration tests.

use std::sync::{Arc, Mutex};

use keychainkit_core::query::Query;
use keychainkit_core::{
    CredentialStore, ItemRecord, MemoryVault, VaultBackend, VaultError, VaultResult,
};

/// Creates a fresh, unlocked vault.
pub fn vault() -> Arc<MemoryVault> {
    Arc::new(MemoryVault::new())
}

/// Creates a store over `vault`.
pub fn store(vault: &Arc<MemoryVault>, service: &str, group: Option<&str>) -> CredentialStore {
    CredentialStore::new(
        Arc::clone(vault) as Arc<dyn VaultBackend>,
        service,
        group.map(str::to_owned),
    )
}

/// Backend that fails every call with the same error.
pub struct FailingVault {
    error: VaultError,
    calls: Mutex<usize>,
}

impl FailingVault {
    /// Creates a backend that always fails with `error`.
    pub fn new(error: VaultError) -> Self {
        Self {
            error,
            calls: Mutex::new(0),
        }
    }

    /// Number of backend calls made so far.
    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("lock")
    }

    fn fail<T>(&self) -> VaultResult<T> {
        *self.calls.lock().expect("lock") += 1;
        Err(self.error.clone())
    }
}

impl VaultBackend for FailingVault {
    fn copy_matching(&self, _query: &Query) -> VaultResult<Vec<ItemRecord>> {
        self.fail()
    }

    fn add(&self, _attributes: &Query) -> VaultResult<()> {
        self.fail()
    }

    fn update(&self, _query: &Query, _changes: &Query) -> VaultResult<()> {
        self.fail()
    }

    fn delete(&self, _query: &Query) -> VaultResult<()> {
        self.fail()
    }
}
