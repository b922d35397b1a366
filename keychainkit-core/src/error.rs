//! Error types for vault operations.

use thiserror::Error;

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// `errSecSuccess`.
pub const STATUS_SUCCESS: i32 = 0;
/// `errSecItemNotFound`.
pub const STATUS_ITEM_NOT_FOUND: i32 = -25300;
/// `errSecDuplicateItem`.
pub const STATUS_DUPLICATE_ITEM: i32 = -25299;
/// `errSecInteractionNotAllowed`, returned while the device is locked.
pub const STATUS_INTERACTION_NOT_ALLOWED: i32 = -25308;
/// `errSecAuthFailed`.
pub const STATUS_AUTH_FAILED: i32 = -25293;
/// `errSecUserCanceled`.
pub const STATUS_USER_CANCELED: i32 = -128;
/// `errSecMissingEntitlement`, usually a misconfigured access group.
pub const STATUS_MISSING_ENTITLEMENT: i32 = -34018;
/// `errSecNotAvailable`.
pub const STATUS_NOT_AVAILABLE: i32 = -25291;
/// `errSecNoSuchKeychain`.
pub const STATUS_NO_SUCH_KEYCHAIN: i32 = -25294;
/// `errSecDecode`.
pub const STATUS_DECODE: i32 = -26275;
/// `errSecParam`.
pub const STATUS_PARAM: i32 = -50;

/// Errors reported by a secret vault or raised while preparing a vault request.
#[derive(Debug, Clone, PartialEq, Eq, Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum VaultError {
    /// No item matched the query.
    #[error("item not found")]
    NotFound,

    /// An item with the same primary key already exists.
    #[error("duplicate item")]
    Duplicate,

    /// The vault refused access (device locked, authentication failed or
    /// missing entitlement).
    #[error("access denied (status {code})")]
    Denied {
        /// Vault status code.
        code: i32,
    },

    /// The vault service is not reachable.
    #[error("vault unavailable (status {code})")]
    Unavailable {
        /// Vault status code.
        code: i32,
    },

    /// The vault returned data it could not decode.
    #[error("corrupt vault data (status {code})")]
    Corrupt {
        /// Vault status code.
        code: i32,
    },

    /// Any other non-success status.
    #[error("vault rejected the request (status {code})")]
    Rejected {
        /// Vault status code.
        code: i32,
    },

    /// The key cannot be used as an item identifier.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A typed value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl VaultError {
    /// Classifies a non-success vault status code.
    #[must_use]
    pub const fn from_status(code: i32) -> Self {
        match code {
            STATUS_ITEM_NOT_FOUND => Self::NotFound,
            STATUS_DUPLICATE_ITEM => Self::Duplicate,
            STATUS_INTERACTION_NOT_ALLOWED
            | STATUS_AUTH_FAILED
            | STATUS_USER_CANCELED
            | STATUS_MISSING_ENTITLEMENT => Self::Denied { code },
            STATUS_NOT_AVAILABLE | STATUS_NO_SUCH_KEYCHAIN => Self::Unavailable { code },
            STATUS_DECODE => Self::Corrupt { code },
            _ => Self::Rejected { code },
        }
    }

    /// Converts a raw status into a result.
    ///
    /// # Errors
    ///
    /// Returns the classified error for any status other than success.
    pub const fn check(code: i32) -> VaultResult<()> {
        if code == STATUS_SUCCESS {
            Ok(())
        } else {
            Err(Self::from_status(code))
        }
    }

    /// Returns the vault status code this error corresponds to.
    ///
    /// Errors raised before reaching the vault report `errSecParam`.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::NotFound => STATUS_ITEM_NOT_FOUND,
            Self::Duplicate => STATUS_DUPLICATE_ITEM,
            Self::Denied { code }
            | Self::Unavailable { code }
            | Self::Corrupt { code }
            | Self::Rejected { code } => *code,
            Self::InvalidKey(_) => STATUS_PARAM,
            Self::Serialization(_) => STATUS_DECODE,
        }
    }

    /// Returns `true` for the "no such item" outcome.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
