//! Distribution crate for `keychainkit-core`.
//!
//! Links the core library, including its UniFFI scaffolding, into the static
//! library / cdylib shipped in the Swift and Kotlin packages, and re-exports
//! its API for Rust callers.

pub use keychainkit_core::*;
