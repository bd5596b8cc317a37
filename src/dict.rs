//! Chunk dictionary codec
//!
//! Most .vox chunks carry a string dictionary: `u32 n` followed by `n`
//! pairs, each pair a length-prefixed key then a length-prefixed value.
//! Strings are not null-terminated on disk. The format caps a dictionary
//! at 4096 string bytes (terminators included) and 256 pairs.

use std::io::Cursor;

use crate::error::VoxError;
use crate::parser::helpers::{read_bytes, read_u32};
use crate::{MAX_DICT_BUFFER_SIZE, MAX_DICT_PAIRS};

/// Parsed chunk dictionary, preserving on-disk pair order for round-trip
///
/// Key lookup is case-insensitive. Unknown keys are retained verbatim so
/// the writer can emit them back unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoxDict {
    pairs: Vec<(String, String)>,
}

impl VoxDict {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a dictionary from the cursor, enforcing the format caps
    pub(crate) fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, VoxError> {
        let num_pairs = read_u32(cursor)?;
        if num_pairs > MAX_DICT_PAIRS {
            return Err(VoxError::DictOverflow);
        }

        let mut pairs = Vec::with_capacity(num_pairs as usize);
        let mut buffer_used = 0u32;
        for _ in 0..num_pairs {
            let key = Self::read_string(cursor, &mut buffer_used)?;
            let value = Self::read_string(cursor, &mut buffer_used)?;
            pairs.push((key, value));
        }
        Ok(Self { pairs })
    }

    fn read_string(cursor: &mut Cursor<&[u8]>, buffer_used: &mut u32) -> Result<String, VoxError> {
        let len = read_u32(cursor)?;
        if buffer_used.saturating_add(len) > MAX_DICT_BUFFER_SIZE {
            return Err(VoxError::DictOverflow);
        }
        *buffer_used += len + 1;
        let bytes = read_bytes(cursor, len as usize)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Look up a value by key, case-insensitively
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Look up a "0"/"1" value as a bool
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).map(|v| v.starts_with('1'))
    }

    /// Look up a decimal unsigned integer value
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Look up a decimal float value
    pub fn get_f32(&self, key: &str) -> Option<f32> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Append a pair, replacing any existing pair with the same key
    pub fn insert(&mut self, key: &str, value: &str) {
        match self
            .pairs
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            Some(index) => self.pairs[index].1 = value.to_string(),
            None => self.pairs.push((key.to_string(), value.to_string())),
        }
    }

    /// Iterate pairs in on-disk order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when the dictionary holds no pairs
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encoded byte size of this dictionary, counting the pair count field
    pub(crate) fn encoded_size(&self) -> u32 {
        let mut size = 4u32;
        for (k, v) in &self.pairs {
            size += 4 + k.len() as u32 + 4 + v.len() as u32;
        }
        size
    }

    /// Serialize in on-disk order
    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.pairs.len() as u32).to_le_bytes());
        for (k, v) in &self.pairs {
            out.extend_from_slice(&(k.len() as u32).to_le_bytes());
            out.extend_from_slice(k.as_bytes());
            out.extend_from_slice(&(v.len() as u32).to_le_bytes());
            out.extend_from_slice(v.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(pairs: &[(&str, &str)]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(pairs.len() as u32).to_le_bytes());
        for (k, v) in pairs {
            out.extend_from_slice(&(k.len() as u32).to_le_bytes());
            out.extend_from_slice(k.as_bytes());
            out.extend_from_slice(&(v.len() as u32).to_le_bytes());
            out.extend_from_slice(v.as_bytes());
        }
        out
    }

    #[test]
    fn test_read_pairs() {
        let bytes = encode(&[("_name", "wall"), ("_hidden", "1")]);
        let dict = VoxDict::read(&mut Cursor::new(bytes.as_slice())).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get("_name"), Some("wall"));
        assert_eq!(dict.get_bool("_hidden"), Some(true));
        assert_eq!(dict.get("_t"), None);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let bytes = encode(&[("_Name", "Floor")]);
        let dict = VoxDict::read(&mut Cursor::new(bytes.as_slice())).unwrap();
        assert_eq!(dict.get("_name"), Some("Floor"));
        assert_eq!(dict.get("_NAME"), Some("Floor"));
    }

    #[test]
    fn test_truncated_value_is_short_read() {
        let mut bytes = encode(&[("_name", "wall")]);
        bytes.truncate(bytes.len() - 2);
        let err = VoxDict::read(&mut Cursor::new(bytes.as_slice())).unwrap_err();
        assert!(matches!(err, VoxError::ShortRead(_)));
    }

    #[test]
    fn test_too_many_pairs_overflows() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1000u32.to_le_bytes());
        let err = VoxDict::read(&mut Cursor::new(bytes.as_slice())).unwrap_err();
        assert_eq!(err, VoxError::DictOverflow);
    }

    #[test]
    fn test_oversized_strings_overflow() {
        let big = "x".repeat(3000);
        let bytes = encode(&[("_a", &big), ("_b", &big)]);
        let err = VoxDict::read(&mut Cursor::new(bytes.as_slice())).unwrap_err();
        assert_eq!(err, VoxError::DictOverflow);
    }

    #[test]
    fn test_write_roundtrip_preserves_order() {
        let bytes = encode(&[("_zeta", "1"), ("_alpha", "2"), ("_custom", "x y z")]);
        let dict = VoxDict::read(&mut Cursor::new(bytes.as_slice())).unwrap();
        let mut out = Vec::new();
        dict.write_to(&mut out);
        assert_eq!(out, bytes);
        assert_eq!(dict.encoded_size() as usize, bytes.len());
    }
}
