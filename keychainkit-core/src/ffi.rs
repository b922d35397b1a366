//! Foreign-language surface.
//!
//! Generic typed accessors do not cross the FFI boundary; foreign callers get
//! the byte, string and primitive accessors and encode anything else
//! themselves.

use crate::accessibility::Accessibility;
use crate::backend::platform_backend;
use crate::error::VaultError;
use crate::store::{CredentialStore, ItemOptions};

/// A credential store over the platform vault.
///
/// ## Swift
///
/// ```swift
/// let store = KeychainStore(serviceName: "com.example.app", accessGroup: nil)
/// _ = store.setString(key: "token", value: "s3cr3t", accessibility: .afterFirstUnlock, synchronizable: false)
/// let token = store.string(key: "token", accessibility: nil, synchronizable: false)
/// ```
#[derive(Debug, uniffi::Object)]
pub struct KeychainStore {
    inner: CredentialStore,
}

impl KeychainStore {
    /// Wraps an existing store.
    #[must_use]
    pub const fn from_store(inner: CredentialStore) -> Self {
        Self { inner }
    }
}

const fn options(accessibility: Option<Accessibility>, synchronizable: bool) -> ItemOptions {
    ItemOptions {
        accessibility,
        synchronizable,
    }
}

#[uniffi::export]
impl KeychainStore {
    /// Creates a store for `service_name` over the platform vault.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(service_name: &str, access_group: Option<String>) -> Self {
        Self::from_store(CredentialStore::new(
            platform_backend(),
            service_name,
            access_group,
        ))
    }

    /// Service namespace of this store.
    #[must_use]
    pub fn service_name(&self) -> String {
        self.inner.service_name().to_string()
    }

    /// Access group of this store.
    #[must_use]
    pub fn access_group(&self) -> Option<String> {
        self.inner.access_group().map(str::to_owned)
    }

    /// Returns `true` if a payload can be read for `key`.
    #[must_use]
    pub fn exists(
        &self,
        key: &str,
        accessibility: Option<Accessibility>,
        synchronizable: bool,
    ) -> bool {
        self.inner.exists(key, options(accessibility, synchronizable))
    }

    /// Returns the payload for `key`, or `None` if it is missing or unreadable.
    #[must_use]
    pub fn data(
        &self,
        key: &str,
        accessibility: Option<Accessibility>,
        synchronizable: bool,
    ) -> Option<Vec<u8>> {
        self.inner.get(key, options(accessibility, synchronizable))
    }

    /// Returns the payload for `key`, distinguishing a missing key (`None`)
    /// from a vault error.
    ///
    /// # Errors
    ///
    /// Returns the vault's error for anything other than a missing key.
    pub fn try_data(
        &self,
        key: &str,
        accessibility: Option<Accessibility>,
        synchronizable: bool,
    ) -> Result<Option<Vec<u8>>, VaultError> {
        self.inner.try_get(key, options(accessibility, synchronizable))
    }

    /// Returns the payload for `key` as UTF-8 text.
    #[must_use]
    pub fn string(
        &self,
        key: &str,
        accessibility: Option<Accessibility>,
        synchronizable: bool,
    ) -> Option<String> {
        self.inner.get_string(key, options(accessibility, synchronizable))
    }

    /// Returns an integer.
    #[must_use]
    pub fn int(
        &self,
        key: &str,
        accessibility: Option<Accessibility>,
        synchronizable: bool,
    ) -> Option<i64> {
        self.inner.get_int(key, options(accessibility, synchronizable))
    }

    /// Returns a double-precision float.
    #[must_use]
    pub fn double(
        &self,
        key: &str,
        accessibility: Option<Accessibility>,
        synchronizable: bool,
    ) -> Option<f64> {
        self.inner.get_double(key, options(accessibility, synchronizable))
    }

    /// Returns a boolean.
    #[must_use]
    pub fn bool(
        &self,
        key: &str,
        accessibility: Option<Accessibility>,
        synchronizable: bool,
    ) -> Option<bool> {
        self.inner.get_bool(key, options(accessibility, synchronizable))
    }

    /// Returns the vault's persistent reference for `key`.
    #[must_use]
    pub fn persistent_ref(
        &self,
        key: &str,
        accessibility: Option<Accessibility>,
        synchronizable: bool,
    ) -> Option<Vec<u8>> {
        self.inner
            .get_persistent_ref(key, options(accessibility, synchronizable))
    }

    /// Stores `value` under `key`.
    #[must_use]
    pub fn set_data(
        &self,
        key: &str,
        value: &[u8],
        accessibility: Option<Accessibility>,
        synchronizable: bool,
    ) -> bool {
        self.inner
            .set(key, value, options(accessibility, synchronizable))
    }

    /// Stores `value` as UTF-8 text.
    #[must_use]
    pub fn set_string(
        &self,
        key: &str,
        value: &str,
        accessibility: Option<Accessibility>,
        synchronizable: bool,
    ) -> bool {
        self.inner
            .set_string(key, value, options(accessibility, synchronizable))
    }

    /// Stores an integer.
    #[must_use]
    pub fn set_int(
        &self,
        key: &str,
        value: i64,
        accessibility: Option<Accessibility>,
        synchronizable: bool,
    ) -> bool {
        self.inner
            .set_int(key, value, options(accessibility, synchronizable))
    }

    /// Stores a double-precision float.
    #[must_use]
    pub fn set_double(
        &self,
        key: &str,
        value: f64,
        accessibility: Option<Accessibility>,
        synchronizable: bool,
    ) -> bool {
        self.inner
            .set_double(key, value, options(accessibility, synchronizable))
    }

    /// Stores a boolean.
    #[must_use]
    pub fn set_bool(
        &self,
        key: &str,
        value: bool,
        accessibility: Option<Accessibility>,
        synchronizable: bool,
    ) -> bool {
        self.inner
            .set_bool(key, value, options(accessibility, synchronizable))
    }

    /// Deletes the entry for `key`.
    pub fn remove(
        &self,
        key: &str,
        accessibility: Option<Accessibility>,
        synchronizable: bool,
    ) -> bool {
        self.inner.remove(key, options(accessibility, synchronizable))
    }

    /// Deletes every entry of this store.
    pub fn remove_all(&self) -> bool {
        self.inner.remove_all()
    }

    /// Returns every key of this store, sorted.
    #[must_use]
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.all_keys().into_iter().collect();
        keys.sort_unstable();
        keys
    }

    /// Returns the accessibility policy stored for `key`.
    #[must_use]
    pub fn accessibility_of(&self, key: &str) -> Option<Accessibility> {
        self.inner.accessibility_of(key)
    }
}

/// Deletes every item of every class from the platform vault, including
/// items this library did not create.
#[uniffi::export]
pub fn wipe_keychain() {
    crate::store::wipe_vault(platform_backend().as_ref());
}
