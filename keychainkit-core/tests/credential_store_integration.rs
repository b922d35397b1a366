//! End-to-end tests for `CredentialStore` over the in-memory vault.

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use keychainkit_core::query::{Attribute, AttributeValue, ItemClass, Query};
use keychainkit_core::{
    wipe_vault, Accessibility, CredentialStore, ItemOptions, LockState, StoreConfig,
    ValueCodec, VaultBackend, VaultError, STATUS_INTERACTION_NOT_ALLOWED,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct OAuthToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: u64,
}

#[test]
fn test_credential_lifecycle() {
    let vault = common::vault();
    let store = common::store(&vault, "com.example.mail", None);
    let options = ItemOptions::new();

    assert!(!store.exists("imap", options));
    assert!(store.set_string("imap", "p4ssw0rd", options));
    assert!(store.exists("imap", options));
    assert_eq!(store.get_string("imap", options).as_deref(), Some("p4ssw0rd"));

    assert!(store.set_string("imap", "rotated", options));
    assert_eq!(store.get_string("imap", options).as_deref(), Some("rotated"));
    assert_eq!(store.all_keys(), HashSet::from(["imap".to_string()]));

    assert!(store.remove("imap", options));
    assert!(!store.exists("imap", options));
    assert!(!store.remove("imap", options));
    assert!(vault.is_empty());
}

#[test]
fn test_structured_value_round_trip_with_each_codec() {
    let vault = common::vault();
    let token = OAuthToken {
        access_token: "at".to_string(),
        refresh_token: Some("rt".to_string()),
        expires_at: 1_900_000_000,
    };

    for codec in [ValueCodec::Json, ValueCodec::Cbor] {
        let store = common::store(&vault, "com.example.oauth", None).with_codec(codec);
        assert!(store.set_object(&token, "token", ItemOptions::new()));
        assert_eq!(
            store.get_object::<OAuthToken>("token", ItemOptions::new()),
            Some(token.clone())
        );
    }

    // A payload written with one codec does not read back with the other.
    let json = common::store(&vault, "com.example.oauth", None);
    assert!(json.get_object::<OAuthToken>("token", ItemOptions::new()).is_none());
}

#[test]
fn test_key_scoping_by_service_and_group() {
    let vault = common::vault();
    let a = common::store(&vault, "svc.a", None);
    let b = common::store(&vault, "svc.b", None);
    let shared = common::store(&vault, "svc.a", Some("TEAMID.shared"));

    assert!(a.set_string("k1", "a1", ItemOptions::new()));
    assert!(a.set_string("k2", "a2", ItemOptions::new()));
    assert!(b.set_string("k3", "b3", ItemOptions::new()));
    assert!(shared.set_string("k1", "s1", ItemOptions::new()));

    assert_eq!(b.all_keys(), HashSet::from(["k3".to_string()]));
    assert_eq!(shared.get_string("k1", ItemOptions::new()).as_deref(), Some("s1"));
    assert!(b.get("k1", ItemOptions::new()).is_none());

    // A store without a group also matches items of any group.
    assert_eq!(
        a.all_keys(),
        HashSet::from(["k1".to_string(), "k2".to_string()])
    );
}

#[test]
fn test_remove_all_is_scoped() {
    let vault = common::vault();
    let a = common::store(&vault, "svc.a", None);
    let b = common::store(&vault, "svc.b", None);

    assert!(a.set("k1", b"1", ItemOptions::new()));
    assert!(a.set("k2", b"2", ItemOptions::new()));
    assert!(b.set("k3", b"3", ItemOptions::new()));

    assert!(a.remove_all());
    assert!(a.all_keys().is_empty());
    assert_eq!(b.all_keys(), HashSet::from(["k3".to_string()]));

    assert!(!a.remove_all());
    assert_eq!(a.try_remove_all(), Err(VaultError::NotFound));
}

#[test]
fn test_remove_all_keeps_other_access_group() {
    let vault = common::vault();
    let g1 = common::store(&vault, "svc", Some("TEAMID.g1"));
    let g2 = common::store(&vault, "svc", Some("TEAMID.g2"));
    let other = common::store(&vault, "svc.other", None);

    assert!(g1.set_string("a", "1", ItemOptions::new()));
    assert!(g2.set_string("b", "2", ItemOptions::new()));
    assert!(other.all_keys().is_empty());

    assert!(g1.remove_all());
    assert!(g1.all_keys().is_empty());
    assert_eq!(g2.all_keys(), HashSet::from(["b".to_string()]));
    assert_eq!(g2.get_string("b", ItemOptions::new()).as_deref(), Some("2"));
}

#[test]
fn test_groupless_update_reaches_grouped_entry() {
    let vault = common::vault();
    let plain = common::store(&vault, "svc", None);
    let grouped = common::store(&vault, "svc", Some("TEAMID.g"));

    assert!(plain.set_string("k", "plain", ItemOptions::new()));
    assert!(grouped.set_string("k", "grouped", ItemOptions::new()));
    assert_eq!(vault.len(), 2);
    assert_eq!(grouped.get_string("k", ItemOptions::new()).as_deref(), Some("grouped"));

    // No group filter on the update: both entries are rewritten.
    assert!(plain.set_string("k", "plain2", ItemOptions::new()));
    assert_eq!(vault.len(), 2);
    assert_eq!(grouped.get_string("k", ItemOptions::new()).as_deref(), Some("plain2"));

    // A grouped store's update stays inside its group.
    assert!(grouped.set_string("k", "grouped2", ItemOptions::new()));
    assert_eq!(grouped.get_string("k", ItemOptions::new()).as_deref(), Some("grouped2"));
    let other_group = common::store(&vault, "svc", Some("TEAMID.other"));
    assert!(other_group.get("k", ItemOptions::new()).is_none());
}

#[test]
fn test_wipe_vault_clears_foreign_items() {
    let vault = common::vault();
    let store = common::store(&vault, "svc", None);
    assert!(store.set("k", b"v", ItemOptions::new()));

    let certificate = Query::new(ItemClass::Certificate)
        .with(Attribute::ValueData, AttributeValue::Data(b"der".to_vec()));
    vault.add(&certificate).expect("add certificate");
    let internet = Query::new(ItemClass::InternetPassword)
        .with(Attribute::Account, AttributeValue::Data(b"alice".to_vec()))
        .with(Attribute::ValueData, AttributeValue::Data(b"pw".to_vec()));
    vault.add(&internet).expect("add internet password");
    assert_eq!(vault.len(), 3);

    wipe_vault(vault.as_ref());
    assert!(vault.is_empty());
    assert!(store.all_keys().is_empty());
}

#[test]
fn test_typed_mismatch_reads_as_absent() {
    let vault = common::vault();
    let store = common::store(&vault, "svc", None);

    assert!(store.set_object("x", "n", ItemOptions::new()));
    assert_eq!(store.get_int("n", ItemOptions::new()), None);
    assert!(store.exists("n", ItemOptions::new()));

    assert!(store.set_int("n", 7, ItemOptions::new()));
    assert_eq!(store.get_int("n", ItemOptions::new()), Some(7));
    assert_eq!(store.get_double("n", ItemOptions::new()), Some(7.0));
}

#[test]
fn test_accessibility_lifecycle() {
    let vault = common::vault();
    let store = common::store(&vault, "svc", None);

    assert_eq!(store.accessibility_of("k"), None);
    assert!(store.set("k", b"v", ItemOptions::new()));
    assert_eq!(store.accessibility_of("k"), Some(Accessibility::WhenUnlocked));

    assert!(store.set("k", b"v", Accessibility::AfterFirstUnlock.into()));
    assert_eq!(store.accessibility_of("k"), Some(Accessibility::AfterFirstUnlock));

    assert!(store.set("k", b"w", ItemOptions::new()));
    assert_eq!(store.accessibility_of("k"), Some(Accessibility::AfterFirstUnlock));

    // Reads filtered on another policy miss the entry.
    assert!(store.get("k", Accessibility::Always.into()).is_none());
    assert!(store.get("k", Accessibility::AfterFirstUnlock.into()).is_some());
}

#[test]
fn test_lock_state_enforces_accessibility() {
    let vault = common::vault();
    let store = common::store(&vault, "svc", None);

    assert!(store.set("background", b"b", Accessibility::AfterFirstUnlock.into()));
    assert!(store.set("foreground", b"f", ItemOptions::new()));
    assert!(store.set("anytime", b"a", Accessibility::Always.into()));

    vault.set_lock_state(LockState::LockedAfterFirstUnlock);
    assert!(store.get("background", ItemOptions::new()).is_some());
    assert!(store.get("foreground", ItemOptions::new()).is_none());
    assert_eq!(
        store.try_get("foreground", ItemOptions::new()),
        Err(VaultError::Denied {
            code: STATUS_INTERACTION_NOT_ALLOWED
        })
    );

    vault.set_lock_state(LockState::LockedBeforeFirstUnlock);
    assert!(store.get("background", ItemOptions::new()).is_none());
    assert!(store.get("anytime", ItemOptions::new()).is_some());

    vault.set_lock_state(LockState::Unlocked);
    assert!(store.get("foreground", ItemOptions::new()).is_some());
}

#[test]
fn test_vault_errors_collapse_on_plain_api() {
    let backend = Arc::new(common::FailingVault::new(VaultError::Unavailable {
        code: -25291,
    }));
    let store = CredentialStore::new(
        Arc::clone(&backend) as Arc<dyn VaultBackend>,
        "svc",
        None,
    );

    assert!(store.get("k", ItemOptions::new()).is_none());
    assert!(!store.exists("k", ItemOptions::new()));
    assert!(!store.set("k", b"v", ItemOptions::new()));
    assert!(!store.remove("k", ItemOptions::new()));
    assert!(!store.remove_all());
    assert!(store.all_keys().is_empty());
    assert!(store.accessibility_of("k").is_none());

    assert_eq!(
        store.try_get("k", ItemOptions::new()),
        Err(VaultError::Unavailable { code: -25291 })
    );
    assert!(store.try_all_keys().is_err());

    // Wiping keeps going after a failed class.
    let calls = backend.calls();
    wipe_vault(backend.as_ref());
    assert_eq!(backend.calls() - calls, 5);
}

#[test]
fn test_missing_key_is_not_an_error_on_try_api() {
    let vault = common::vault();
    let store = common::store(&vault, "svc", None);

    assert_eq!(store.try_get("missing", ItemOptions::new()), Ok(None));
    assert_eq!(store.try_all_keys(), Ok(HashSet::new()));
    assert_eq!(
        store.try_remove("missing", ItemOptions::new()),
        Err(VaultError::NotFound)
    );
}

#[test]
fn test_non_utf8_accounts_are_skipped() {
    let vault = common::vault();
    let store = common::store(&vault, "svc", None);
    assert!(store.set("ok", b"v", ItemOptions::new()));

    let foreign = Query::new(ItemClass::GenericPassword)
        .with(Attribute::Service, AttributeValue::String("svc".into()))
        .with(Attribute::Account, AttributeValue::Data(vec![0xff, 0x00, 0xfe]))
        .with(Attribute::ValueData, AttributeValue::Data(b"x".to_vec()));
    vault.add(&foreign).expect("add foreign item");

    assert_eq!(store.all_keys(), HashSet::from(["ok".to_string()]));
}

#[test]
fn test_store_from_config() {
    let vault = common::vault();
    let config = StoreConfig::new("com.example.config")
        .with_access_group("TEAMID.group")
        .with_codec(ValueCodec::Cbor);
    let store = CredentialStore::from_config(vault, &config);

    assert_eq!(store.service_name(), "com.example.config");
    assert_eq!(store.access_group(), Some("TEAMID.group"));
    assert_eq!(store.codec(), ValueCodec::Cbor);
    assert!(store.set_bool("flag", true, ItemOptions::new()));
    assert_eq!(store.get_bool("flag", ItemOptions::new()), Some(true));
}

#[test]
fn test_concurrent_writers_on_distinct_keys() {
    let vault = common::vault();
    let store = common::store(&vault, "svc", None);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            thread::spawn(move || {
                let key = format!("key-{i}");
                assert!(store.set_int(&key, i, ItemOptions::new()));
                assert_eq!(store.get_int(&key, ItemOptions::new()), Some(i));
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread");
    }

    assert_eq!(store.all_keys().len(), 8);
}

#[test]
fn test_standard_store_uses_default_config() {
    let vault = common::vault();
    let store = CredentialStore::standard(vault);
    let defaults = StoreConfig::default();

    assert_eq!(store.service_name(), defaults.service_name);
    assert_eq!(store.access_group(), None);
    assert!(store.set_double("ratio", 0.25, ItemOptions::new()));
    assert_eq!(store.get_double("ratio", ItemOptions::new()), Some(0.25));
}
