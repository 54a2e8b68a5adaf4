//! Value encodings for remote tiers

use crate::CacheError;
use serde::{Serialize, de::DeserializeOwned};

/// Turns values into bytes for a remote tier and back
///
/// Encoding failures map to [`CacheError::Serialization`], decoding
/// failures to [`CacheError::Deserialization`].
pub trait Serializer: Send + Sync + Clone + 'static {
    /// Short format name, used in logs
    fn format(&self) -> &'static str;

    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError>;

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError>;
}

macro_rules! serde_format {
    (
        $(#[$doc:meta])* $name:ident, $feature:literal, $format:literal,
        $encode:path, $decode:path
    ) => {
        $(#[$doc])*
        #[cfg(feature = $feature)]
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        #[cfg(feature = $feature)]
        impl Serializer for $name {
            fn format(&self) -> &'static str {
                $format
            }

            fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError> {
                $encode(value).map_err(|e| CacheError::Serialization(e.to_string()))
            }

            fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError> {
                $decode(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
            }
        }
    };
}

serde_format!(
    /// JSON, the default; remote entries stay readable with `redis-cli`
    JsonSerializer, "json", "json", serde_json::to_vec, serde_json::from_slice
);

serde_format!(
    /// MessagePack (`msgpack` feature)
    MsgPackSerializer, "msgpack", "msgpack", rmp_serde::to_vec, rmp_serde::from_slice
);

/// Bincode with the standard config (`bincode` feature)
///
/// Most compact, but only readable by Rust peers built with the same types.
#[cfg(feature = "bincode")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

#[cfg(feature = "bincode")]
impl Serializer for BincodeSerializer {
    fn format(&self) -> &'static str {
        "bincode"
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError> {
        bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError> {
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map(|(value, _read)| value)
            .map_err(|e| CacheError::Deserialization(e.to_string()))
    }
}
