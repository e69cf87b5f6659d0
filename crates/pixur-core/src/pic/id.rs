//! Strongly typed ids carried on the wire as varint strings.

use super::varint::{self, VarintError};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! varint_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u64);

        impl $name {
            /// The zero id. Never assigned by the server.
            pub const ZERO: Self = Self(0);

            pub fn new(value: u64) -> Self {
                Self(value)
            }

            pub fn value(self) -> u64 {
                self.0
            }

            pub fn is_zero(self) -> bool {
                self.0 == 0
            }

            /// Returns the varint wire form.
            pub fn encode(self) -> String {
                varint::encode(self.0)
            }

            /// Parses the varint wire form, rejecting trailing input.
            pub fn decode(raw: &str) -> Result<Self, VarintError> {
                varint::decode_all(raw).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.encode())
            }
        }

        impl FromStr for $name {
            type Err = VarintError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::decode(s)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.encode())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                // The server treats an empty id as zero.
                if raw.is_empty() {
                    return Ok(Self::ZERO);
                }
                Self::decode(&raw).map_err(de::Error::custom)
            }
        }
    };
}

varint_id!(
    /// Id of a picture. Assigned in increasing order, so it doubles as the
    /// pagination anchor.
    PicId
);

varint_id!(
    /// Id of a comment. Zero is the synthetic root every top-level comment
    /// hangs off.
    CommentId
);

varint_id!(
    /// Id of a tag.
    TagId
);
