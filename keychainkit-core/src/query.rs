//! Attribute vocabulary and query values understood by vault backends.
//!
//! Every request sent to a [`VaultBackend`](crate::backend::VaultBackend) is a
//! [`Query`]: an ordered map from a closed set of [`Attribute`] tags to typed
//! [`AttributeValue`]s. Each tag and each enumerated value resolves to the
//! string constant Keychain Services uses for it, so a backend can translate a
//! query without a lookup table of its own.

use std::collections::BTreeMap;

use strum::{Display, EnumIter};

use crate::accessibility::Accessibility;

/// Query attribute tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
pub enum Attribute {
    /// Item class (`kSecClass`).
    Class,
    /// Service namespace (`kSecAttrService`).
    Service,
    /// Generic identifier (`kSecAttrGeneric`).
    Generic,
    /// Account identifier (`kSecAttrAccount`).
    Account,
    /// Sharing group (`kSecAttrAccessGroup`).
    AccessGroup,
    /// Accessibility policy (`kSecAttrAccessible`).
    Accessible,
    /// Cross-device synchronization flag (`kSecAttrSynchronizable`).
    Synchronizable,
    /// Item payload (`kSecValueData`).
    ValueData,
    /// Ask for the payload in results (`kSecReturnData`).
    ReturnData,
    /// Ask for attributes in results (`kSecReturnAttributes`).
    ReturnAttributes,
    /// Ask for a persistent reference in results (`kSecReturnPersistentRef`).
    ReturnPersistentRef,
    /// Maximum number of results (`kSecMatchLimit`).
    MatchLimit,
}

impl Attribute {
    /// Returns the vault constant for this attribute key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Service => "svce",
            Self::Generic => "gena",
            Self::Account => "acct",
            Self::AccessGroup => "agrp",
            Self::Accessible => "pdmn",
            Self::Synchronizable => "sync",
            Self::ValueData => "v_Data",
            Self::ReturnData => "r_Data",
            Self::ReturnAttributes => "r_Attributes",
            Self::ReturnPersistentRef => "r_PersistentRef",
            Self::MatchLimit => "m_Limit",
        }
    }
}

/// Vault item classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
pub enum ItemClass {
    /// Generic password items. Every entry written by a
    /// [`CredentialStore`](crate::CredentialStore) has this class.
    GenericPassword,
    /// Internet password items.
    InternetPassword,
    /// Certificates.
    Certificate,
    /// Cryptographic keys.
    Key,
    /// Identities (certificate plus private key).
    Identity,
}

impl ItemClass {
    /// Returns the vault constant for this class.
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::GenericPassword => "genp",
            Self::InternetPassword => "inet",
            Self::Certificate => "cert",
            Self::Key => "keys",
            Self::Identity => "idnt",
        }
    }
}

/// How many items a search may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatchLimit {
    /// At most one item.
    #[default]
    One,
    /// Every matching item.
    All,
}

impl MatchLimit {
    /// Returns the vault constant for this limit.
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::One => "m_LimitOne",
            Self::All => "m_LimitAll",
        }
    }
}

/// A typed value bound to an [`Attribute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// An item class.
    Class(ItemClass),
    /// A text value.
    String(String),
    /// A byte value.
    Data(Vec<u8>),
    /// A boolean flag.
    Bool(bool),
    /// An accessibility policy.
    Accessibility(Accessibility),
    /// A match limit.
    MatchLimit(MatchLimit),
}

/// A vault request: attribute tags mapped to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    entries: BTreeMap<Attribute, AttributeValue>,
}

impl Query {
    /// Creates a query selecting items of `class`.
    #[must_use]
    pub fn new(class: ItemClass) -> Self {
        Self::default().with(Attribute::Class, AttributeValue::Class(class))
    }

    /// Sets `attribute`, replacing any previous value.
    pub fn set(&mut self, attribute: Attribute, value: AttributeValue) {
        self.entries.insert(attribute, value);
    }

    /// Builder form of [`Query::set`].
    #[must_use]
    pub fn with(mut self, attribute: Attribute, value: AttributeValue) -> Self {
        self.set(attribute, value);
        self
    }

    /// Removes `attribute` from the query, returning its value.
    pub fn remove(&mut self, attribute: Attribute) -> Option<AttributeValue> {
        self.entries.remove(&attribute)
    }

    /// Returns the value bound to `attribute`.
    #[must_use]
    pub fn get(&self, attribute: Attribute) -> Option<&AttributeValue> {
        self.entries.get(&attribute)
    }

    /// Returns `true` if `attribute` is present.
    #[must_use]
    pub fn contains(&self, attribute: Attribute) -> bool {
        self.entries.contains_key(&attribute)
    }

    /// Iterates over the attributes in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (Attribute, &AttributeValue)> {
        self.entries.iter().map(|(attribute, value)| (*attribute, value))
    }

    /// Returns the item class, if set.
    #[must_use]
    pub fn class(&self) -> Option<ItemClass> {
        match self.get(Attribute::Class) {
            Some(AttributeValue::Class(class)) => Some(*class),
            _ => None,
        }
    }

    /// Returns a text attribute.
    #[must_use]
    pub fn string(&self, attribute: Attribute) -> Option<&str> {
        match self.get(attribute) {
            Some(AttributeValue::String(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns a byte attribute.
    #[must_use]
    pub fn data(&self, attribute: Attribute) -> Option<&[u8]> {
        match self.get(attribute) {
            Some(AttributeValue::Data(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns a boolean attribute.
    #[must_use]
    pub fn flag(&self, attribute: Attribute) -> Option<bool> {
        match self.get(attribute) {
            Some(AttributeValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Returns the accessibility filter or value, if set.
    #[must_use]
    pub fn accessibility(&self) -> Option<Accessibility> {
        match self.get(Attribute::Accessible) {
            Some(AttributeValue::Accessibility(value)) => Some(*value),
            _ => None,
        }
    }

    /// Returns the match limit, defaulting to [`MatchLimit::One`].
    #[must_use]
    pub fn match_limit(&self) -> MatchLimit {
        match self.get(Attribute::MatchLimit) {
            Some(AttributeValue::MatchLimit(limit)) => *limit,
            _ => MatchLimit::One,
        }
    }

    /// Returns `true` if a result-shape flag is set to `true`.
    #[must_use]
    pub fn returns(&self, attribute: Attribute) -> bool {
        self.flag(attribute).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_vault_constants_are_distinct() {
        let keys: HashSet<_> = Attribute::iter().map(Attribute::key).collect();
        assert_eq!(keys.len(), Attribute::iter().count());
        let classes: HashSet<_> = ItemClass::iter().map(ItemClass::value).collect();
        assert_eq!(classes.len(), ItemClass::iter().count());
    }

    #[test]
    fn test_typed_accessors() {
        let query = Query::new(ItemClass::GenericPassword)
            .with(Attribute::Service, AttributeValue::String("svc".into()))
            .with(Attribute::Account, AttributeValue::Data(b"k".to_vec()))
            .with(Attribute::Synchronizable, AttributeValue::Bool(false))
            .with(
                Attribute::Accessible,
                AttributeValue::Accessibility(Accessibility::Always),
            );

        assert_eq!(query.class(), Some(ItemClass::GenericPassword));
        assert_eq!(query.string(Attribute::Service), Some("svc"));
        assert_eq!(query.data(Attribute::Account), Some(&b"k"[..]));
        assert_eq!(query.flag(Attribute::Synchronizable), Some(false));
        assert_eq!(query.accessibility(), Some(Accessibility::Always));
        assert_eq!(query.match_limit(), MatchLimit::One);
        assert!(!query.returns(Attribute::ReturnData));
        // Wrong type reads as absent.
        assert_eq!(query.string(Attribute::Account), None);
    }

    #[test]
    fn test_set_replaces_and_remove() {
        let mut query = Query::new(ItemClass::Key);
        query.set(Attribute::MatchLimit, AttributeValue::MatchLimit(MatchLimit::One));
        query.set(Attribute::MatchLimit, AttributeValue::MatchLimit(MatchLimit::All));
        assert_eq!(query.match_limit(), MatchLimit::All);
        assert_eq!(query.iter().count(), 2);

        assert!(query.remove(Attribute::MatchLimit).is_some());
        assert!(!query.contains(Attribute::MatchLimit));
    }
}
