//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::codec::ValueCodec;
use crate::error::{VaultError, VaultResult};

/// Environment variable overriding [`StoreConfig::service_name`].
pub const ENV_SERVICE_NAME: &str = "KEYCHAINKIT_SERVICE_NAME";
/// Environment variable setting [`StoreConfig::access_group`].
pub const ENV_ACCESS_GROUP: &str = "KEYCHAINKIT_ACCESS_GROUP";
/// Environment variable selecting [`StoreConfig::codec`] (`json` or `cbor`).
pub const ENV_CODEC: &str = "KEYCHAINKIT_CODEC";

const FALLBACK_SERVICE_NAME: &str = "keychainkit";

/// Configuration of a [`CredentialStore`](crate::CredentialStore).
///
/// Deserializes from JSON; missing fields take their defaults.
///
/// ```rust
/// use keychainkit_core::{StoreConfig, ValueCodec};
///
/// let config: StoreConfig =
///     serde_json::from_str(r#"{"service_name": "com.example.app", "codec": "cbor"}"#).unwrap();
/// assert_eq!(config.service_name, "com.example.app");
/// assert_eq!(config.access_group, None);
/// assert_eq!(config.codec, ValueCodec::Cbor);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Service namespace of every entry.
    pub service_name: String,
    /// Optional sharing group.
    pub access_group: Option<String>,
    /// Codec for typed values.
    pub codec: ValueCodec,
}

impl Default for StoreConfig {
    /// Binds to the running executable's name.
    fn default() -> Self {
        Self {
            service_name: application_identifier(),
            access_group: None,
            codec: ValueCodec::default(),
        }
    }
}

impl StoreConfig {
    /// Creates a configuration for `service_name` with no access group.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            access_group: None,
            codec: ValueCodec::default(),
        }
    }

    /// Sets the access group.
    #[must_use]
    pub fn with_access_group(mut self, access_group: impl Into<String>) -> Self {
        self.access_group = Some(access_group.into());
        self
    }

    /// Sets the codec.
    #[must_use]
    pub const fn with_codec(mut self, codec: ValueCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Builds the default configuration, overridden by the `KEYCHAINKIT_*`
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Serialization`] if `KEYCHAINKIT_CODEC` names an
    /// unknown codec.
    pub fn from_env() -> VaultResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the default configuration, overridden by values returned from
    /// `lookup` for the `KEYCHAINKIT_*` names. Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Serialization`] if the codec value is unknown.
    pub fn from_lookup<F>(lookup: F) -> VaultResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let mut config = Self::default();

        if let Some(service_name) = lookup(ENV_SERVICE_NAME) {
            config.service_name = service_name;
        }
        if let Some(access_group) = lookup(ENV_ACCESS_GROUP) {
            config.access_group = Some(access_group);
        }
        if let Some(codec) = lookup(ENV_CODEC) {
            config.codec = codec.parse().map_err(|_| {
                VaultError::Serialization(format!("unknown codec '{codec}' in {ENV_CODEC}"))
            })?;
        }

        Ok(config)
    }
}

/// Returns the running executable's file stem, or `"keychainkit"`.
fn application_identifier() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_owned)
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_SERVICE_NAME.to_string())
}
