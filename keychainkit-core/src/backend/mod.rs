//! Vault backends.
//!
//! A backend executes [`Query`] values against a secret vault. The contract
//! mirrors the four Keychain Services primitives (`SecItemCopyMatching`,
//! `SecItemAdd`, `SecItemUpdate`, `SecItemDelete`), so any store with the same
//! matching semantics can sit behind a [`CredentialStore`](crate::CredentialStore).
//!
//! # Implementations
//!
//! - [`MemoryVault`]: in-process vault with Keychain matching rules and a
//!   simulated device lock state. Used for tests and as the fallback on
//!   platforms without a native vault.
//! - `AppleKeychain`: Keychain Services, behind the `platform-apple` feature
//!   on Apple targets.

use std::sync::Arc;

use crate::accessibility::Accessibility;
use crate::error::VaultResult;
use crate::query::Query;

pub mod memory;

#[cfg(all(feature = "platform-apple", target_vendor = "apple"))]
mod apple;

#[cfg(all(feature = "platform-apple", target_vendor = "apple"))]
pub use apple::AppleKeychain;
pub use memory::MemoryVault;

/// Primitive operations of a secret vault.
///
/// Implementations must be internally synchronized: a single backend is
/// shared by every store bound to it and may be called from any thread.
pub trait VaultBackend: Send + Sync {
    /// Searches for items matching `query`.
    ///
    /// Honors the query's match limit and fills each [`ItemRecord`] according
    /// to its result-shape flags.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NotFound`](crate::VaultError::NotFound) when
    /// nothing matches, or the vault's error when the search is refused.
    fn copy_matching(&self, query: &Query) -> VaultResult<Vec<ItemRecord>>;

    /// Inserts an item described by `attributes`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Duplicate`](crate::VaultError::Duplicate) when an
    /// item with the same primary key exists.
    fn add(&self, attributes: &Query) -> VaultResult<()>;

    /// Applies `changes` to every item matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NotFound`](crate::VaultError::NotFound) when
    /// nothing matches.
    fn update(&self, query: &Query, changes: &Query) -> VaultResult<()>;

    /// Deletes every item matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NotFound`](crate::VaultError::NotFound) when
    /// nothing matches.
    fn delete(&self, query: &Query) -> VaultResult<()>;
}

/// One search result.
///
/// Only the parts requested by the query's result-shape flags are populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemRecord {
    /// Item payload (`ReturnData`).
    pub data: Option<Vec<u8>>,
    /// Persistent reference (`ReturnPersistentRef`).
    pub persistent_ref: Option<Vec<u8>>,
    /// Item attributes (`ReturnAttributes`).
    pub attributes: Option<ItemAttributes>,
}

/// Attributes of a stored item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemAttributes {
    /// Service namespace.
    pub service: Option<String>,
    /// Raw account identifier.
    pub account: Option<Vec<u8>>,
    /// Sharing group.
    pub access_group: Option<String>,
    /// Stored accessibility policy, if it is one this crate models.
    pub accessibility: Option<Accessibility>,
    /// Whether the item synchronizes across devices.
    pub synchronizable: bool,
}

/// Returns the default backend for the running platform.
///
/// With the `platform-apple` feature on Apple targets this is the system
/// keychain. Elsewhere it is a [`MemoryVault`] shared by every caller in the
/// process, so stores created through this function see each other's items
/// the way they would on a real vault.
#[must_use]
pub fn platform_backend() -> Arc<dyn VaultBackend> {
    #[cfg(all(feature = "platform-apple", target_vendor = "apple"))]
    {
        Arc::new(AppleKeychain::new())
    }

    #[cfg(not(all(feature = "platform-apple", target_vendor = "apple")))]
    {
        memory::shared_vault()
    }
}
