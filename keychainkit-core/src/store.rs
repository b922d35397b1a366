//! Typed key/value access to a secret vault.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use strum::IntoEnumIterator;

use crate::accessibility::Accessibility;
use crate::backend::VaultBackend;
use crate::codec::ValueCodec;
use crate::config::StoreConfig;
use crate::error::{VaultError, VaultResult};
use crate::query::{Attribute, AttributeValue, ItemClass, MatchLimit, Query};

/// Per-call options for key operations.
///
/// `accessibility` is a filter on reads and deletes, and the policy to store on
/// writes. `synchronizable` selects cloud-synchronized items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ItemOptions {
    /// Accessibility policy, if constrained.
    pub accessibility: Option<Accessibility>,
    /// Whether the item synchronizes across the user's devices.
    pub synchronizable: bool,
}

impl ItemOptions {
    /// No accessibility constraint, not synchronizable.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            accessibility: None,
            synchronizable: false,
        }
    }

    /// Sets the accessibility policy.
    #[must_use]
    pub const fn with_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = Some(accessibility);
        self
    }

    /// Sets the synchronizable flag.
    #[must_use]
    pub const fn synchronizable(mut self, synchronizable: bool) -> Self {
        self.synchronizable = synchronizable;
        self
    }
}

impl From<Accessibility> for ItemOptions {
    fn from(accessibility: Accessibility) -> Self {
        Self::new().with_accessibility(accessibility)
    }
}

/// A credential store bound to a service namespace and optional access group.
///
/// Keys are unique within `(service_name, access_group)`. Stores with
/// different service names never see each other's entries even when they
/// share a backend.
///
/// A store without an access group sends no group filter, so the vault
/// matches entries of every group under its service name. Reads, removals and
/// enumeration see grouped entries, and when `set` falls back to an update it
/// overwrites the payload of a grouped entry with the same key as well. Give
/// every store of an application an explicit group if it shares keys across
/// groups.
///
/// The plain accessors (`get`, `set`, `remove`, ...) collapse every failure
/// into `None`/`false`: a missing entry and a vault error look the same. The
/// `try_*` accessors return the underlying [`VaultError`] instead.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use keychainkit_core::{Accessibility, CredentialStore, ItemOptions, MemoryVault};
///
/// let store = CredentialStore::new(Arc::new(MemoryVault::new()), "com.example.app", None);
///
/// assert!(store.set_string("token", "s3cr3t", ItemOptions::new()));
/// assert_eq!(store.get_string("token", ItemOptions::new()).as_deref(), Some("s3cr3t"));
///
/// assert!(store.set_object(&42_i64, "answer", Accessibility::AfterFirstUnlock.into()));
/// assert_eq!(store.get_int("answer", ItemOptions::new()), Some(42));
/// assert_eq!(store.accessibility_of("answer"), Some(Accessibility::AfterFirstUnlock));
/// ```
#[derive(Clone)]
pub struct CredentialStore {
    service_name: String,
    access_group: Option<String>,
    codec: ValueCodec,
    backend: Arc<dyn VaultBackend>,
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("service_name", &self.service_name)
            .field("access_group", &self.access_group)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Creates a store for `service_name` and an optional shared `access_group`.
    #[must_use]
    pub fn new(
        backend: Arc<dyn VaultBackend>,
        service_name: impl Into<String>,
        access_group: Option<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            access_group,
            codec: ValueCodec::default(),
            backend,
        }
    }

    /// Creates a store from an explicit configuration.
    #[must_use]
    pub fn from_config(backend: Arc<dyn VaultBackend>, config: &StoreConfig) -> Self {
        Self {
            service_name: config.service_name.clone(),
            access_group: config.access_group.clone(),
            codec: config.codec,
            backend,
        }
    }

    /// Creates the application's default store, bound to
    /// [`StoreConfig::default`].
    #[must_use]
    pub fn standard(backend: Arc<dyn VaultBackend>) -> Self {
        Self::from_config(backend, &StoreConfig::default())
    }

    /// Returns a copy of this store that encodes typed values with `codec`.
    #[must_use]
    pub fn with_codec(mut self, codec: ValueCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Service namespace of this store.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Access group of this store, if any.
    #[must_use]
    pub fn access_group(&self) -> Option<&str> {
        self.access_group.as_deref()
    }

    /// Codec used for typed values.
    #[must_use]
    pub const fn codec(&self) -> ValueCodec {
        self.codec
    }

    /// Backend this store issues queries to.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn VaultBackend> {
        &self.backend
    }

    // -- Reads ---------------------------------------------------------------

    /// Returns `true` if a payload can be read for `key`.
    #[must_use]
    pub fn exists(&self, key: &str, options: ItemOptions) -> bool {
        self.get(key, options).is_some()
    }

    /// Returns the payload stored under `key`.
    ///
    /// Returns `None` both when the key is missing and when the vault reports
    /// an error; use [`CredentialStore::try_get`] to tell them apart.
    #[must_use]
    pub fn get(&self, key: &str, options: ItemOptions) -> Option<Vec<u8>> {
        collapse(key, "get", self.try_get(key, options))
    }

    /// Returns the payload stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns the vault's error for anything other than a missing key, which
    /// is reported as `Ok(None)`.
    pub fn try_get(&self, key: &str, options: ItemOptions) -> VaultResult<Option<Vec<u8>>> {
        let query = self
            .key_query(key, options)?
            .with(Attribute::MatchLimit, AttributeValue::MatchLimit(MatchLimit::One))
            .with(Attribute::ReturnData, AttributeValue::Bool(true));

        Ok(self
            .search_one(&query)?
            .and_then(|record| record.data))
    }

    /// Returns the vault's persistent reference to the entry for `key`.
    #[must_use]
    pub fn get_persistent_ref(&self, key: &str, options: ItemOptions) -> Option<Vec<u8>> {
        let result = self.key_query(key, options).and_then(|query| {
            let query = query
                .with(Attribute::MatchLimit, AttributeValue::MatchLimit(MatchLimit::One))
                .with(Attribute::ReturnPersistentRef, AttributeValue::Bool(true));
            Ok(self
                .search_one(&query)?
                .and_then(|record| record.persistent_ref))
        });
        collapse(key, "get_persistent_ref", result)
    }

    /// Decodes the payload under `key` with the store's codec.
    ///
    /// A payload that does not decode as `T` reads as `None`.
    #[must_use]
    pub fn get_object<T: DeserializeOwned>(&self, key: &str, options: ItemOptions) -> Option<T> {
        let bytes = self.get(key, options)?;
        collapse(key, "decode", self.codec.decode(&bytes).map(Some))
    }

    /// Returns the payload under `key` as UTF-8 text.
    #[must_use]
    pub fn get_string(&self, key: &str, options: ItemOptions) -> Option<String> {
        String::from_utf8(self.get(key, options)?).ok()
    }

    /// Returns an integer written with [`CredentialStore::set_int`] or
    /// [`CredentialStore::set_object`].
    #[must_use]
    pub fn get_int(&self, key: &str, options: ItemOptions) -> Option<i64> {
        self.get_object(key, options)
    }

    /// Returns a single-precision float.
    #[must_use]
    pub fn get_float(&self, key: &str, options: ItemOptions) -> Option<f32> {
        self.get_object(key, options)
    }

    /// Returns a double-precision float.
    #[must_use]
    pub fn get_double(&self, key: &str, options: ItemOptions) -> Option<f64> {
        self.get_object(key, options)
    }

    /// Returns a boolean.
    #[must_use]
    pub fn get_bool(&self, key: &str, options: ItemOptions) -> Option<bool> {
        self.get_object(key, options)
    }

    /// Returns the accessibility policy stored for `key` without reading its
    /// payload.
    #[must_use]
    pub fn accessibility_of(&self, key: &str) -> Option<Accessibility> {
        let result = self.key_query(key, ItemOptions::new()).and_then(|mut query| {
            query.remove(Attribute::Accessible);
            let query = query
                .with(Attribute::MatchLimit, AttributeValue::MatchLimit(MatchLimit::One))
                .with(Attribute::ReturnAttributes, AttributeValue::Bool(true));
            Ok(self
                .search_one(&query)?
                .and_then(|record| record.attributes)
                .and_then(|attributes| attributes.accessibility))
        });
        collapse(key, "accessibility_of", result)
    }

    /// Returns every key stored in this store's scope.
    ///
    /// Entries whose account identifier is not valid UTF-8 are skipped.
    #[must_use]
    pub fn all_keys(&self) -> HashSet<String> {
        self.try_all_keys().unwrap_or_else(|err| {
            log::debug!("listing keys for '{}' failed: {err}", self.service_name);
            HashSet::new()
        })
    }

    /// Returns every key stored in this store's scope.
    ///
    /// # Errors
    ///
    /// Returns the vault's error for anything other than an empty scope.
    pub fn try_all_keys(&self) -> VaultResult<HashSet<String>> {
        let query = self
            .scope_query()
            .with(Attribute::ReturnAttributes, AttributeValue::Bool(true))
            .with(Attribute::MatchLimit, AttributeValue::MatchLimit(MatchLimit::All));

        let records = match self.backend.copy_matching(&query) {
            Ok(records) => records,
            Err(VaultError::NotFound) => return Ok(HashSet::new()),
            Err(err) => return Err(err),
        };

        Ok(records
            .into_iter()
            .filter_map(|record| record.attributes?.account)
            .filter_map(|account| String::from_utf8(account).ok())
            .collect())
    }

    // -- Writes --------------------------------------------------------------

    /// Stores `value` under `key`, replacing any existing payload.
    ///
    /// A new entry gets `options.accessibility`, or
    /// [`Accessibility::WhenUnlocked`] when none is given. An existing entry
    /// only has its accessibility changed when one is given. On a store
    /// without an access group the update also reaches entries with the same
    /// key in other groups.
    #[must_use = "a failed write is only reported through the return value"]
    pub fn set(&self, key: &str, value: &[u8], options: ItemOptions) -> bool {
        collapse_bool(key, "set", self.try_set(key, value, options))
    }

    /// Stores `value` under `key`, replacing any existing payload.
    ///
    /// The insert and the fallback update are two separate vault calls; a
    /// concurrent delete between them surfaces as [`VaultError::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns the vault's error if neither the insert nor the update succeed.
    pub fn try_set(&self, key: &str, value: &[u8], options: ItemOptions) -> VaultResult<()> {
        let attributes = self
            .key_query(key, options)?
            .with(Attribute::ValueData, AttributeValue::Data(value.to_vec()))
            .with(
                Attribute::Accessible,
                AttributeValue::Accessibility(options.accessibility.unwrap_or_default()),
            );

        match self.backend.add(&attributes) {
            Err(VaultError::Duplicate) => {
                log::debug!("'{key}' exists in '{}', updating in place", self.service_name);
                self.update(key, value, options)
            }
            result => result,
        }
    }

    /// Encodes `value` with the store's codec and stores it under `key`.
    ///
    /// Returns `false` if the value cannot be encoded.
    #[must_use = "a failed write is only reported through the return value"]
    pub fn set_object<T: Serialize + ?Sized>(
        &self,
        value: &T,
        key: &str,
        options: ItemOptions,
    ) -> bool {
        let result = self
            .codec
            .encode(value)
            .and_then(|bytes| self.try_set(key, &bytes, options));
        collapse_bool(key, "set_object", result)
    }

    /// Stores `value` as raw UTF-8 bytes.
    #[must_use = "a failed write is only reported through the return value"]
    pub fn set_string(&self, key: &str, value: &str, options: ItemOptions) -> bool {
        self.set(key, value.as_bytes(), options)
    }

    /// Stores an integer.
    #[must_use = "a failed write is only reported through the return value"]
    pub fn set_int(&self, key: &str, value: i64, options: ItemOptions) -> bool {
        self.set_object(&value, key, options)
    }

    /// Stores a single-precision float.
    #[must_use = "a failed write is only reported through the return value"]
    pub fn set_float(&self, key: &str, value: f32, options: ItemOptions) -> bool {
        self.set_object(&value, key, options)
    }

    /// Stores a double-precision float.
    #[must_use = "a failed write is only reported through the return value"]
    pub fn set_double(&self, key: &str, value: f64, options: ItemOptions) -> bool {
        self.set_object(&value, key, options)
    }

    /// Stores a boolean.
    #[must_use = "a failed write is only reported through the return value"]
    pub fn set_bool(&self, key: &str, value: bool, options: ItemOptions) -> bool {
        self.set_object(&value, key, options)
    }

    // -- Deletes -------------------------------------------------------------

    /// Deletes the entry for `key`.
    ///
    /// Returns `true` only if the vault deleted something. An entry written
    /// with a different accessibility than `options.accessibility` is not
    /// matched.
    pub fn remove(&self, key: &str, options: ItemOptions) -> bool {
        collapse_bool(key, "remove", self.try_remove(key, options))
    }

    /// Deletes the entry for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NotFound`] if there was nothing to delete.
    pub fn try_remove(&self, key: &str, options: ItemOptions) -> VaultResult<()> {
        self.backend.delete(&self.key_query(key, options)?)
    }

    /// Deletes every entry in this store's `(service_name, access_group)`
    /// scope.
    pub fn remove_all(&self) -> bool {
        self.try_remove_all()
            .map_err(|err| {
                log::debug!("removing all keys for '{}' failed: {err}", self.service_name);
            })
            .is_ok()
    }

    /// Deletes every entry in this store's scope.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NotFound`] if the scope was already empty.
    pub fn try_remove_all(&self) -> VaultResult<()> {
        self.backend.delete(&self.scope_query())
    }

    // -- Query construction --------------------------------------------------

    /// Builds the attribute set selecting this store's generic passwords.
    fn scope_query(&self) -> Query {
        let mut query = Query::new(ItemClass::GenericPassword).with(
            Attribute::Service,
            AttributeValue::String(self.service_name.clone()),
        );
        if let Some(group) = &self.access_group {
            query.set(Attribute::AccessGroup, AttributeValue::String(group.clone()));
        }
        query
    }

    /// Builds the attribute set selecting the entry for `key`.
    ///
    /// The key is written to both the account and the generic attribute; the
    /// vault matches on both.
    fn key_query(&self, key: &str, options: ItemOptions) -> VaultResult<Query> {
        if key.is_empty() {
            return Err(VaultError::InvalidKey("key must not be empty".to_string()));
        }

        let identifier = key.as_bytes().to_vec();
        let mut query = self
            .scope_query()
            .with(Attribute::Generic, AttributeValue::Data(identifier.clone()))
            .with(Attribute::Account, AttributeValue::Data(identifier))
            .with(
                Attribute::Synchronizable,
                AttributeValue::Bool(options.synchronizable),
            );
        if let Some(accessibility) = options.accessibility {
            query.set(
                Attribute::Accessible,
                AttributeValue::Accessibility(accessibility),
            );
        }
        Ok(query)
    }

    fn update(&self, key: &str, value: &[u8], options: ItemOptions) -> VaultResult<()> {
        // The accessibility is a change, not a filter: the existing entry is
        // matched whatever policy it was written with.
        let filter = ItemOptions {
            accessibility: None,
            ..options
        };
        let query = self.key_query(key, filter)?;

        let mut changes =
            Query::default().with(Attribute::ValueData, AttributeValue::Data(value.to_vec()));
        if let Some(accessibility) = options.accessibility {
            changes.set(
                Attribute::Accessible,
                AttributeValue::Accessibility(accessibility),
            );
        }

        self.backend.update(&query, &changes)
    }

    fn search_one(&self, query: &Query) -> VaultResult<Option<crate::backend::ItemRecord>> {
        match self.backend.copy_matching(query) {
            Ok(records) => Ok(records.into_iter().next()),
            Err(VaultError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Deletes every item of every class from `backend`.
///
/// This is not scoped to any store: it removes credentials, keys,
/// certificates and identities written by other code in the same
/// application or access group. There is no way to undo it.
pub fn wipe_vault(backend: &dyn VaultBackend) {
    for class in ItemClass::iter() {
        match backend.delete(&Query::new(class)) {
            Ok(()) | Err(VaultError::NotFound) => {}
            Err(err) => log::warn!("wiping {class} items failed: {err}"),
        }
    }
}

fn collapse<T>(key: &str, operation: &str, result: VaultResult<Option<T>>) -> Option<T> {
    result.unwrap_or_else(|err| {
        log::debug!("{operation} '{key}' failed: {err}");
        None
    })
}

fn collapse_bool(key: &str, operation: &str, result: VaultResult<()>) -> bool {
    result
        .map_err(|err| log::debug!("{operation} '{key}' failed: {err}"))
        .is_ok()
}
