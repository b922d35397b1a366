//! Keychain Services backend.
//!
//! Queries are translated into Core Foundation dictionaries keyed by the
//! Security framework's `kSec*` constants; every tag and enumerated value of
//! [`crate::query`] maps to its exported symbol.

use std::ptr;

use core_foundation::array::CFArray;
use core_foundation::base::{CFType, CFTypeRef, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::data::CFData;
use core_foundation::dictionary::CFDictionary;
use core_foundation::number::CFNumber;
use core_foundation::string::{CFString, CFStringRef};
use security_framework_sys::item::{
    kSecAttrAccessGroup, kSecAttrAccount, kSecAttrService, kSecAttrSynchronizable, kSecClass,
    kSecClassCertificate, kSecClassGenericPassword, kSecClassIdentity, kSecClassInternetPassword,
    kSecClassKey, kSecMatchLimit, kSecMatchLimitAll, kSecReturnAttributes, kSecReturnData,
    kSecValueData, SecItemAdd, SecItemCopyMatching, SecItemDelete, SecItemUpdate,
};
use strum::IntoEnumIterator;

use super::{ItemAttributes, ItemRecord, VaultBackend};
use crate::accessibility::Accessibility;
use crate::error::{VaultError, VaultResult, STATUS_DECODE};
use crate::query::{Attribute, AttributeValue, ItemClass, MatchLimit, Query};

// Constants `security-framework-sys` does not export.
#[link(name = "Security", kind = "framework")]
extern "C" {
    static kSecAttrGeneric: CFStringRef;
    static kSecAttrAccessible: CFStringRef;
    static kSecAttrAccessibleAlways: CFStringRef;
    static kSecAttrAccessibleAfterFirstUnlock: CFStringRef;
    static kSecAttrAccessibleWhenUnlocked: CFStringRef;
    static kSecMatchLimitOne: CFStringRef;
    static kSecReturnPersistentRef: CFStringRef;
    static kSecValuePersistentRef: CFStringRef;
}

/// The system keychain.
///
/// Stateless: every call is a single `SecItem*` request and Keychain Services
/// does its own synchronization.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppleKeychain;

impl AppleKeychain {
    /// Creates a handle to the system keychain.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl VaultBackend for AppleKeychain {
    fn copy_matching(&self, query: &Query) -> VaultResult<Vec<ItemRecord>> {
        let dictionary = to_dictionary(query);
        let mut result: CFTypeRef = ptr::null();
        // SAFETY: `dictionary` outlives the call and `result` is a valid out pointer.
        let status = unsafe { SecItemCopyMatching(dictionary.as_concrete_TypeRef(), &mut result) };
        check("copy_matching", status)?;
        if result.is_null() {
            return Err(VaultError::Corrupt { code: STATUS_DECODE });
        }

        // SAFETY: a successful search returns an owned reference.
        let result = unsafe { CFType::wrap_under_create_rule(result) };
        if query.match_limit() == MatchLimit::All {
            let array = result
                .downcast::<CFArray>()
                .ok_or(VaultError::Corrupt { code: STATUS_DECODE })?;
            array
                .iter()
                // SAFETY: array elements are valid CF objects for the array's lifetime.
                .map(|value| parse_record(query, &unsafe { CFType::wrap_under_get_rule(*value) }))
                .collect()
        } else {
            parse_record(query, &result).map(|record| vec![record])
        }
    }

    fn add(&self, attributes: &Query) -> VaultResult<()> {
        let dictionary = to_dictionary(attributes);
        // SAFETY: `dictionary` outlives the call; no result is requested.
        let status = unsafe { SecItemAdd(dictionary.as_concrete_TypeRef(), ptr::null_mut()) };
        check("add", status)
    }

    fn update(&self, query: &Query, changes: &Query) -> VaultResult<()> {
        let query = to_dictionary(query);
        let changes = to_dictionary(changes);
        // SAFETY: both dictionaries outlive the call.
        let status = unsafe {
            SecItemUpdate(query.as_concrete_TypeRef(), changes.as_concrete_TypeRef())
        };
        check("update", status)
    }

    fn delete(&self, query: &Query) -> VaultResult<()> {
        let query = to_dictionary(query);
        // SAFETY: `query` outlives the call.
        let status = unsafe { SecItemDelete(query.as_concrete_TypeRef()) };
        check("delete", status)
    }
}

fn check(operation: &str, status: i32) -> VaultResult<()> {
    VaultError::check(status).map_err(|err| {
        if !err.is_not_found() {
            log::debug!(
                "SecItem {operation} failed: {}",
                security_framework::base::Error::from_code(status)
            );
        }
        err
    })
}

fn to_dictionary(query: &Query) -> CFDictionary<CFString, CFType> {
    let pairs: Vec<(CFString, CFType)> = query
        .iter()
        .map(|(attribute, value)| (attribute_key(attribute), to_cf(value)))
        .collect();
    CFDictionary::from_CFType_pairs(&pairs)
}

fn to_cf(value: &AttributeValue) -> CFType {
    match value {
        AttributeValue::Class(class) => class_value(*class).into_CFType(),
        AttributeValue::String(text) => CFString::new(text).into_CFType(),
        AttributeValue::Data(bytes) => CFData::from_buffer(bytes).into_CFType(),
        AttributeValue::Bool(flag) => CFBoolean::from(*flag).into_CFType(),
        AttributeValue::Accessibility(accessibility) => {
            accessibility_value(*accessibility).into_CFType()
        }
        AttributeValue::MatchLimit(limit) => limit_value(*limit).into_CFType(),
    }
}

fn constant(symbol: CFStringRef) -> CFString {
    // SAFETY: Security framework constants are immutable strings that live for
    // the whole process.
    unsafe { CFString::wrap_under_get_rule(symbol) }
}

fn attribute_key(attribute: Attribute) -> CFString {
    // SAFETY: reads of immutable framework statics.
    constant(unsafe {
        match attribute {
            Attribute::Class => kSecClass,
            Attribute::Service => kSecAttrService,
            Attribute::Generic => kSecAttrGeneric,
            Attribute::Account => kSecAttrAccount,
            Attribute::AccessGroup => kSecAttrAccessGroup,
            Attribute::Accessible => kSecAttrAccessible,
            Attribute::Synchronizable => kSecAttrSynchronizable,
            Attribute::ValueData => kSecValueData,
            Attribute::ReturnData => kSecReturnData,
            Attribute::ReturnAttributes => kSecReturnAttributes,
            Attribute::ReturnPersistentRef => kSecReturnPersistentRef,
            Attribute::MatchLimit => kSecMatchLimit,
        }
    })
}

fn class_value(class: ItemClass) -> CFString {
    // SAFETY: reads of immutable framework statics.
    constant(unsafe {
        match class {
            ItemClass::GenericPassword => kSecClassGenericPassword,
            ItemClass::InternetPassword => kSecClassInternetPassword,
            ItemClass::Certificate => kSecClassCertificate,
            ItemClass::Key => kSecClassKey,
            ItemClass::Identity => kSecClassIdentity,
        }
    })
}

fn limit_value(limit: MatchLimit) -> CFString {
    // SAFETY: reads of immutable framework statics.
    constant(unsafe {
        match limit {
            MatchLimit::One => kSecMatchLimitOne,
            MatchLimit::All => kSecMatchLimitAll,
        }
    })
}

fn accessibility_value(accessibility: Accessibility) -> CFString {
    // SAFETY: reads of immutable framework statics.
    constant(unsafe {
        match accessibility {
            Accessibility::Always => kSecAttrAccessibleAlways,
            Accessibility::AfterFirstUnlock => kSecAttrAccessibleAfterFirstUnlock,
            Accessibility::WhenUnlocked => kSecAttrAccessibleWhenUnlocked,
        }
    })
}

fn persistent_ref_key() -> CFString {
    // SAFETY: read of an immutable framework static.
    constant(unsafe { kSecValuePersistentRef })
}

fn accessibility_from(value: &CFString) -> Option<Accessibility> {
    Accessibility::iter().find(|accessibility| accessibility_value(*accessibility) == *value)
}

/// Reads one result object according to the query's result-shape flags.
///
/// With a single flag set Keychain Services returns the bare value; with
/// attributes requested it returns a dictionary that also carries the payload
/// (`kSecValueData`) and the persistent reference (`kSecValuePersistentRef`).
fn parse_record(query: &Query, value: &CFType) -> VaultResult<ItemRecord> {
    let wants_data = query.returns(Attribute::ReturnData);
    let wants_ref = query.returns(Attribute::ReturnPersistentRef);
    let wants_attributes = query.returns(Attribute::ReturnAttributes);

    if wants_attributes {
        let dictionary = value
            .downcast::<CFDictionary>()
            .ok_or(VaultError::Corrupt { code: STATUS_DECODE })?;
        return Ok(ItemRecord {
            data: wants_data
                .then(|| find(&dictionary, &attribute_key(Attribute::ValueData)))
                .flatten()
                .and_then(|v| bytes(&v)),
            persistent_ref: wants_ref
                .then(|| find(&dictionary, &persistent_ref_key()))
                .flatten()
                .and_then(|v| bytes(&v)),
            attributes: Some(parse_attributes(&dictionary)),
        });
    }

    let payload = bytes(value).ok_or(VaultError::Corrupt { code: STATUS_DECODE })?;
    Ok(if wants_ref {
        ItemRecord {
            persistent_ref: Some(payload),
            ..ItemRecord::default()
        }
    } else {
        ItemRecord {
            data: Some(payload),
            ..ItemRecord::default()
        }
    })
}

fn parse_attributes(dictionary: &CFDictionary) -> ItemAttributes {
    ItemAttributes {
        service: find(dictionary, &attribute_key(Attribute::Service)).and_then(|v| text(&v)),
        // Accounts written as data come back as data; accounts written by other
        // code may come back as strings.
        account: find(dictionary, &attribute_key(Attribute::Account))
            .and_then(|v| bytes(&v).or_else(|| text(&v).map(String::into_bytes))),
        access_group: find(dictionary, &attribute_key(Attribute::AccessGroup))
            .and_then(|v| text(&v)),
        accessibility: find(dictionary, &attribute_key(Attribute::Accessible))
            .and_then(|v| v.downcast::<CFString>())
            .and_then(|value| accessibility_from(&value)),
        synchronizable: find(dictionary, &attribute_key(Attribute::Synchronizable))
            .and_then(|v| flag(&v))
            .unwrap_or(false),
    }
}

fn find(dictionary: &CFDictionary, key: &CFString) -> Option<CFType> {
    let value = dictionary.find(key.as_CFTypeRef())?;
    // SAFETY: dictionary values are valid CF objects; get rule retains.
    Some(unsafe { CFType::wrap_under_get_rule(*value) })
}

fn bytes(value: &CFType) -> Option<Vec<u8>> {
    value.downcast::<CFData>().map(|data| data.bytes().to_vec())
}

fn text(value: &CFType) -> Option<String> {
    value.downcast::<CFString>().map(|string| string.to_string())
}

fn flag(value: &CFType) -> Option<bool> {
    value
        .downcast::<CFBoolean>()
        .map(bool::from)
        .or_else(|| {
            value
                .downcast::<CFNumber>()
                .and_then(|number| number.to_i64())
                .map(|number| number != 0)
        })
}
