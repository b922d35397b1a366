use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// When the vault allows an item's payload to be read.
///
/// The policy is stored per item at write time. Items written without an
/// explicit policy get [`Accessibility::WhenUnlocked`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
    uniffi::Enum,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    /// Readable regardless of whether the device is locked.
    Always,
    /// Readable once the device has been unlocked after a restart.
    AfterFirstUnlock,
    /// Readable only while the device is unlocked.
    #[default]
    WhenUnlocked,
}

impl Accessibility {
    /// Returns the vault constant stored in the `pdmn` attribute.
    #[must_use]
    pub const fn attribute_value(self) -> &'static str {
        match self {
            Self::Always => "dk",
            Self::AfterFirstUnlock => "ck",
            Self::WhenUnlocked => "ak",
        }
    }

    /// Maps a stored `pdmn` attribute back to a policy.
    ///
    /// Returns `None` for policies this crate does not model (e.g. the
    /// `ThisDeviceOnly` variants).
    #[must_use]
    pub fn from_attribute_value(value: &str) -> Option<Self> {
        match value {
            "dk" => Some(Self::Always),
            "ck" => Some(Self::AfterFirstUnlock),
            "ak" => Some(Self::WhenUnlocked),
            _ => None,
        }
    }

    /// Returns `true` if a payload under this policy is readable in `state`.
    #[must_use]
    pub const fn permits(self, state: LockState) -> bool {
        match self {
            Self::Always => true,
            Self::AfterFirstUnlock => !matches!(state, LockState::LockedBeforeFirstUnlock),
            Self::WhenUnlocked => matches!(state, LockState::Unlocked),
        }
    }
}

/// Device lock state, as seen by the vault when deciding accessibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LockState {
    /// The device is unlocked.
    #[default]
    Unlocked,
    /// Locked, but unlocked at least once since boot.
    LockedAfterFirstUnlock,
    /// Locked and never unlocked since boot.
    LockedBeforeFirstUnlock,
}
