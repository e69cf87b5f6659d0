//! Ordered text codec for 64-bit ids.
//!
//! Every id the API hands out (pics, comments, tags, users) travels as a
//! varint string. The first symbol either is the value itself (0..=15) or
//! announces how many 5-bit groups follow, so shorter strings always sort
//! before longer ones and equal-length strings sort numerically.
//!
//! ```text
//! 0      -> "0"
//! 16     -> "g0"
//! 72374  -> "k15m6"
//! u64::MAX -> "weyyyyyyyyyyyf"
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Symbol alphabet. `i`, `l`, `o` and `u` are left out to avoid look-alikes.
const SYMBOLS: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";

/// Values below this are encoded as a single symbol.
const SINGLE_SYMBOL_LIMIT: u64 = 0x10;

/// `w` announces 13 groups, which is enough for `u64::MAX`.
const MAX_GROUPS: usize = 13;

/// Errors produced while decoding a varint string.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarintError {
    #[error("varint: no input")]
    Empty,

    #[error("varint: invalid prefix '{0}'")]
    InvalidPrefix(char),

    #[error("varint: expected {expected} symbols but found {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("varint: invalid symbol '{0}'")]
    InvalidSymbol(char),

    #[error("varint: overflow")]
    Overflow,

    #[error("varint: excess input after {consumed} symbols")]
    ExcessInput { consumed: usize },
}

/// Encodes `value` into its varint text form.
pub fn encode(value: u64) -> String {
    if value < SINGLE_SYMBOL_LIMIT {
        return char::from(SYMBOLS[value as usize]).to_string();
    }

    let mut rest = value - SINGLE_SYMBOL_LIMIT;
    let mut groups = 1usize;
    let mut shift = 5;
    while shift < 64 {
        let group_max = 1u64 << shift;
        if rest < group_max {
            break;
        }
        rest -= group_max;
        groups += 1;
        shift += 5;
    }

    let mut out = String::with_capacity(groups + 1);
    out.push(char::from(SYMBOLS[groups + 0x0F]));
    for i in (0..groups).rev() {
        let group = (rest >> (5 * i)) & 0x1F;
        out.push(char::from(SYMBOLS[group as usize]));
    }
    out
}

/// Decodes a varint from the start of `raw`.
///
/// Returns the value and the number of bytes consumed. Trailing input is
/// left alone; use [`decode_all`] to reject it.
pub fn decode(raw: &str) -> Result<(u64, usize), VarintError> {
    let bytes = raw.as_bytes();
    let first = *bytes.first().ok_or(VarintError::Empty)?;
    let lead = symbol_value(first).ok_or(VarintError::InvalidPrefix(char::from(first)))?;

    if lead < SINGLE_SYMBOL_LIMIT {
        return Ok((lead, 1));
    }

    let groups = (lead - 0x0F) as usize;
    if groups > MAX_GROUPS {
        return Err(VarintError::Overflow);
    }

    let length = groups + 1;
    if bytes.len() < length {
        return Err(VarintError::Truncated {
            expected: length,
            actual: bytes.len(),
        });
    }

    let mut num: u64 = 0;
    for &b in &bytes[1..length] {
        let value = symbol_value(b).ok_or(VarintError::InvalidSymbol(char::from(b)))?;
        num = num
            .checked_mul(32)
            .and_then(|n| n.checked_add(value))
            .ok_or(VarintError::Overflow)?;
    }

    let value = num
        .checked_add(prefix_base(groups))
        .ok_or(VarintError::Overflow)?;
    Ok((value, length))
}

/// Decodes `raw`, requiring every byte to be consumed.
pub fn decode_all(raw: &str) -> Result<u64, VarintError> {
    let (value, consumed) = decode(raw)?;
    if consumed != raw.len() {
        return Err(VarintError::ExcessInput { consumed });
    }
    Ok(value)
}

/// Smallest value that needs `groups` symbols after the prefix.
fn prefix_base(groups: usize) -> u64 {
    (1..groups).fold(SINGLE_SYMBOL_LIMIT, |acc, k| acc + (1u64 << (5 * k)))
}

/// Case-insensitive symbol lookup.
fn symbol_value(b: u8) -> Option<u64> {
    let lower = b.to_ascii_lowercase();
    SYMBOLS
        .iter()
        .position(|&s| s == lower)
        .map(|p| p as u64)
}
