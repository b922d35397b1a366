//! Typed credential storage over the platform secret vault.
//!
//! A [`CredentialStore`] is bound to a service namespace and an optional
//! access group. It builds the attribute queries the vault expects, encodes
//! typed values into opaque payloads and maps vault status codes to
//! booleans, options or a [`VaultError`].
//!
//! The vault itself sits behind the [`VaultBackend`] trait:
//! `backend::AppleKeychain` (feature `platform-apple`) talks to Keychain
//! Services, [`MemoryVault`] keeps items in process with the same matching
//! rules.
//!
//! ```rust
//! use std::sync::Arc;
//! use keychainkit_core::{CredentialStore, ItemOptions, MemoryVault};
//!
//! let store = CredentialStore::new(Arc::new(MemoryVault::new()), "com.example.app", None);
//! assert!(store.set("api-token", b"abc123", ItemOptions::new()));
//! assert!(store.exists("api-token", ItemOptions::new()));
//! assert!(store.all_keys().contains("api-token"));
//! assert!(store.remove("api-token", ItemOptions::new()));
//! ```

mod accessibility;
pub use accessibility::*;

pub mod backend;
pub use backend::{platform_backend, ItemAttributes, ItemRecord, MemoryVault, VaultBackend};

mod codec;
pub use codec::*;

mod config;
pub use config::*;

mod error;
pub use error::*;

mod ffi;
pub use ffi::*;

pub mod logger;

pub mod query;

mod store;
pub use store::*;

uniffi::setup_scaffolding!("keychainkit_core");
