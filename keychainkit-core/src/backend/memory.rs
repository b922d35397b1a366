//! In-memory vault with Keychain matching semantics.
//!
//! Items live only for the lifetime of the process. The vault reproduces the
//! rules callers observe on Keychain Services:
//!
//! - the primary key of an item is `(class, service, account, access group,
//!   synchronizable)`; adding a second item with the same key fails with
//!   [`VaultError::Duplicate`];
//! - every attribute present in a query filters the result, and a query
//!   without a synchronizable attribute only matches non-synchronizable items;
//! - payloads are only released when the item's [`Accessibility`] permits it
//!   under the current [`LockState`].

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use uuid::Uuid;
use zeroize::Zeroizing;

use super::{ItemAttributes, ItemRecord, VaultBackend};
use crate::accessibility::{Accessibility, LockState};
use crate::error::{VaultError, VaultResult, STATUS_INTERACTION_NOT_ALLOWED, STATUS_PARAM};
use crate::query::{Attribute, AttributeValue, ItemClass, MatchLimit, Query};

#[derive(Clone)]
struct StoredItem {
    class: ItemClass,
    service: Option<String>,
    account: Option<Vec<u8>>,
    generic: Option<Vec<u8>>,
    access_group: Option<String>,
    accessibility: Accessibility,
    synchronizable: bool,
    data: Zeroizing<Vec<u8>>,
    persistent_ref: Vec<u8>,
}

impl StoredItem {
    fn from_attributes(attributes: &Query) -> VaultResult<Self> {
        let class = attributes
            .class()
            .ok_or(VaultError::Rejected { code: STATUS_PARAM })?;

        Ok(Self {
            class,
            service: attributes.string(Attribute::Service).map(str::to_owned),
            account: attributes.data(Attribute::Account).map(<[u8]>::to_vec),
            generic: attributes.data(Attribute::Generic).map(<[u8]>::to_vec),
            access_group: attributes.string(Attribute::AccessGroup).map(str::to_owned),
            accessibility: attributes.accessibility().unwrap_or_default(),
            synchronizable: attributes.flag(Attribute::Synchronizable).unwrap_or(false),
            data: Zeroizing::new(
                attributes
                    .data(Attribute::ValueData)
                    .map(<[u8]>::to_vec)
                    .unwrap_or_default(),
            ),
            persistent_ref: Uuid::new_v4().as_bytes().to_vec(),
        })
    }

    fn same_primary_key(&self, other: &Self) -> bool {
        self.class == other.class
            && self.service == other.service
            && self.account == other.account
            && self.access_group == other.access_group
            && self.synchronizable == other.synchronizable
    }

    fn matches(&self, query: &Query) -> bool {
        if !query.contains(Attribute::Synchronizable) && self.synchronizable {
            return false;
        }

        query.iter().all(|(attribute, value)| match (attribute, value) {
            (Attribute::Class, AttributeValue::Class(class)) => self.class == *class,
            (Attribute::Service, AttributeValue::String(service)) => {
                self.service.as_deref() == Some(service.as_str())
            }
            (Attribute::Account, AttributeValue::Data(account)) => {
                self.account.as_deref() == Some(account.as_slice())
            }
            (Attribute::Generic, AttributeValue::Data(generic)) => {
                self.generic.as_deref() == Some(generic.as_slice())
            }
            (Attribute::AccessGroup, AttributeValue::String(group)) => {
                self.access_group.as_deref() == Some(group.as_str())
            }
            (Attribute::Accessible, AttributeValue::Accessibility(accessibility)) => {
                self.accessibility == *accessibility
            }
            (Attribute::Synchronizable, AttributeValue::Bool(synchronizable)) => {
                self.synchronizable == *synchronizable
            }
            (
                Attribute::ValueData
                | Attribute::ReturnData
                | Attribute::ReturnAttributes
                | Attribute::ReturnPersistentRef
                | Attribute::MatchLimit,
                _,
            ) => true,
            // A value of the wrong type for its attribute matches nothing.
            _ => false,
        })
    }

    fn record(&self, query: &Query) -> ItemRecord {
        ItemRecord {
            data: query
                .returns(Attribute::ReturnData)
                .then(|| self.data.to_vec()),
            persistent_ref: query
                .returns(Attribute::ReturnPersistentRef)
                .then(|| self.persistent_ref.clone()),
            attributes: query
                .returns(Attribute::ReturnAttributes)
                .then(|| ItemAttributes {
                    service: self.service.clone(),
                    account: self.account.clone(),
                    access_group: self.access_group.clone(),
                    accessibility: Some(self.accessibility),
                    synchronizable: self.synchronizable,
                }),
        }
    }

    fn apply(&mut self, changes: &Query) -> VaultResult<()> {
        for (attribute, value) in changes.iter() {
            match (attribute, value) {
                (Attribute::ValueData, AttributeValue::Data(data)) => {
                    self.data = Zeroizing::new(data.clone());
                }
                (Attribute::Accessible, AttributeValue::Accessibility(accessibility)) => {
                    self.accessibility = *accessibility;
                }
                (Attribute::Generic, AttributeValue::Data(generic)) => {
                    self.generic = Some(generic.clone());
                }
                _ => return Err(VaultError::Rejected { code: STATUS_PARAM }),
            }
        }
        Ok(())
    }
}

/// Process-local vault.
///
/// Thread-safe; clone the surrounding `Arc` to share one vault between
/// several stores.
pub struct MemoryVault {
    items: RwLock<Vec<StoredItem>>,
    lock_state: RwLock<LockState>,
}

impl MemoryVault {
    /// Creates an empty, unlocked vault.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            lock_state: RwLock::new(LockState::Unlocked),
        }
    }

    /// Returns the simulated device lock state.
    #[must_use]
    pub fn lock_state(&self) -> LockState {
        *self.lock_state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Changes the simulated device lock state.
    pub fn set_lock_state(&self, state: LockState) {
        *self.lock_state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Returns the number of stored items across all classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if the vault holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every item.
    pub fn clear(&self) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for MemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryVault")
            .field("items", &self.len())
            .field("lock_state", &self.lock_state())
            .finish()
    }
}

impl VaultBackend for MemoryVault {
    fn copy_matching(&self, query: &Query) -> VaultResult<Vec<ItemRecord>> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        let limit = match query.match_limit() {
            MatchLimit::One => 1,
            MatchLimit::All => usize::MAX,
        };
        let matched: Vec<&StoredItem> = items
            .iter()
            .filter(|item| item.matches(query))
            .take(limit)
            .collect();

        if matched.is_empty() {
            return Err(VaultError::NotFound);
        }

        if query.returns(Attribute::ReturnData) {
            let state = self.lock_state();
            if matched.iter().any(|item| !item.accessibility.permits(state)) {
                return Err(VaultError::Denied {
                    code: STATUS_INTERACTION_NOT_ALLOWED,
                });
            }
        }

        Ok(matched.into_iter().map(|item| item.record(query)).collect())
    }

    fn add(&self, attributes: &Query) -> VaultResult<()> {
        let item = StoredItem::from_attributes(attributes)?;
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        if items.iter().any(|existing| existing.same_primary_key(&item)) {
            return Err(VaultError::Duplicate);
        }
        items.push(item);
        Ok(())
    }

    fn update(&self, query: &Query, changes: &Query) -> VaultResult<()> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated: Vec<StoredItem> = Vec::new();
        let mut positions = Vec::new();
        for (position, item) in items.iter().enumerate() {
            if item.matches(query) {
                let mut item = item.clone();
                item.apply(changes)?;
                updated.push(item);
                positions.push(position);
            }
        }

        if positions.is_empty() {
            return Err(VaultError::NotFound);
        }

        // Changes are staged first so a rejected attribute leaves every item untouched.
        for (position, item) in positions.into_iter().zip(updated) {
            items[position] = item;
        }
        Ok(())
    }

    fn delete(&self, query: &Query) -> VaultResult<()> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let before = items.len();
        items.retain(|item| !item.matches(query));
        if items.len() == before {
            return Err(VaultError::NotFound);
        }
        Ok(())
    }
}

/// Returns the process-wide vault used when no native backend is available.
#[must_use]
pub fn shared_vault() -> Arc<MemoryVault> {
    static SHARED: OnceLock<Arc<MemoryVault>> = OnceLock::new();
    Arc::clone(SHARED.get_or_init(|| Arc::new(MemoryVault::new())))
}
