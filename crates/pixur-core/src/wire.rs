//! Serde helpers for the API's JSON dialect.
//!
//! The server emits 64-bit integers as JSON strings but accepts plain
//! numbers, so both forms are read and strings are written.

pub(crate) mod int64 {
    use serde::{Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) if s.is_empty() => Ok(0),
            Raw::Text(s) => s.parse().map_err(de::Error::custom),
        }
    }
}
