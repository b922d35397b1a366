//! Structured encoding of typed values stored as item payloads.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{VaultError, VaultResult};

/// Serializer used for typed payloads.
///
/// The layout is private to the writer: a value must be read back with the
/// codec it was written with.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ValueCodec {
    /// UTF-8 JSON.
    #[default]
    Json,
    /// CBOR (RFC 8949).
    Cbor,
}

impl ValueCodec {
    /// Encodes `value` into a payload.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Serialization`] if the value cannot be encoded,
    /// including JSON values that contain a NaN or infinite float (which
    /// `serde_json` would otherwise write as `null`).
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> VaultResult<Vec<u8>> {
        match self {
            Self::Json => {
                let tree = ciborium::Value::serialized(value)
                    .map_err(|e| VaultError::Serialization(e.to_string()))?;
                if has_non_finite_float(&tree) {
                    return Err(VaultError::Serialization(
                        "JSON cannot represent NaN or infinite floats".to_string(),
                    ));
                }
                serde_json::to_vec(value).map_err(|e| VaultError::Serialization(e.to_string()))
            }
            Self::Cbor => {
                let mut buffer = Vec::new();
                ciborium::into_writer(value, &mut buffer)
                    .map_err(|e| VaultError::Serialization(e.to_string()))?;
                Ok(buffer)
            }
        }
    }

    /// Decodes a payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Serialization`] if the bytes are not a valid
    /// encoding of `T`.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> VaultResult<T> {
        match self {
            Self::Json => {
                serde_json::from_slice(bytes).map_err(|e| VaultError::Serialization(e.to_string()))
            }
            Self::Cbor => ciborium::from_reader(bytes)
                .map_err(|e| VaultError::Serialization(e.to_string())),
        }
    }
}

fn has_non_finite_float(value: &ciborium::Value) -> bool {
    match value {
        ciborium::Value::Float(float) => !float.is_finite(),
        ciborium::Value::Array(items) => items.iter().any(has_non_finite_float),
        ciborium::Value::Map(entries) => entries
            .iter()
            .any(|(key, value)| has_non_finite_float(key) || has_non_finite_float(value)),
        ciborium::Value::Tag(_, inner) => has_non_finite_float(inner),
        _ => false,
    }
}
