//! Decoded field values.
//!
//! [`FieldValues`] is the bridge between a typed message and the byte
//! codec: `write_fields` fills it by name, the codec turns it into bytes, and
//! on the way back `read_fields` pulls typed values out of it.

use bytes::Bytes;

use crate::error::{ProtocolError, Result};

/// One field's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A single byte.
    Byte(u8),
    /// A byte array (fixed or trailing).
    Bytes(Bytes),
    /// A little-endian integer, widened.
    Int(u64),
    /// Masked bits, shifted down to bit 0.
    Bits(u8),
}

impl FieldValue {
    fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Byte(_) => "byte",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Int(_) => "integer",
            FieldValue::Bits(_) => "bits",
        }
    }
}

/// Named field values in layout order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    entries: Vec<(&'static str, FieldValue)>,
}

impl FieldValues {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set with room for `n` fields.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            entries: Vec::with_capacity(n),
        }
    }

    /// Set a value, replacing any earlier value of the same name.
    pub fn set(&mut self, name: &'static str, value: FieldValue) -> &mut Self {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    /// Set a byte field.
    pub fn set_byte(&mut self, name: &'static str, value: u8) -> &mut Self {
        self.set(name, FieldValue::Byte(value))
    }

    /// Set an integer field.
    pub fn set_int(&mut self, name: &'static str, value: u64) -> &mut Self {
        self.set(name, FieldValue::Int(value))
    }

    /// Set a bit field (value not yet shifted).
    pub fn set_bits(&mut self, name: &'static str, value: u8) -> &mut Self {
        self.set(name, FieldValue::Bits(value))
    }

    /// Set a flag stored as a single-bit field.
    pub fn set_flag(&mut self, name: &'static str, value: bool) -> &mut Self {
        self.set(name, FieldValue::Bits(value as u8))
    }

    /// Set a byte array field.
    pub fn set_bytes(&mut self, name: &'static str, value: impl Into<Bytes>) -> &mut Self {
        self.set(name, FieldValue::Bytes(value.into()))
    }

    /// Get a value by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    fn require(&self, name: &str) -> Result<&FieldValue> {
        self.get(name)
            .ok_or_else(|| ProtocolError::Codec(format!("Missing field '{}'", name)))
    }

    fn mismatch(name: &str, wanted: &str, found: &FieldValue) -> ProtocolError {
        ProtocolError::Codec(format!(
            "Field '{}' is {}, expected {}",
            name,
            found.kind_name(),
            wanted
        ))
    }

    /// Read a byte field.
    pub fn byte(&self, name: &str) -> Result<u8> {
        match self.require(name)? {
            FieldValue::Byte(b) => Ok(*b),
            other => Err(Self::mismatch(name, "byte", other)),
        }
    }

    /// Read an integer field.
    pub fn int(&self, name: &str) -> Result<u64> {
        match self.require(name)? {
            FieldValue::Int(n) => Ok(*n),
            other => Err(Self::mismatch(name, "integer", other)),
        }
    }

    /// Read a 16-bit integer field.
    pub fn u16(&self, name: &str) -> Result<u16> {
        let n = self.int(name)?;
        u16::try_from(n)
            .map_err(|_| ProtocolError::Codec(format!("Field '{}' value {} exceeds u16", name, n)))
    }

    /// Read a 32-bit integer field.
    pub fn u32(&self, name: &str) -> Result<u32> {
        let n = self.int(name)?;
        u32::try_from(n)
            .map_err(|_| ProtocolError::Codec(format!("Field '{}' value {} exceeds u32", name, n)))
    }

    /// Read a bit field.
    pub fn bits(&self, name: &str) -> Result<u8> {
        match self.require(name)? {
            FieldValue::Bits(b) => Ok(*b),
            other => Err(Self::mismatch(name, "bits", other)),
        }
    }

    /// Read a single-bit field as a flag.
    pub fn flag(&self, name: &str) -> Result<bool> {
        Ok(self.bits(name)? != 0)
    }

    /// Read a byte array field (cheap clone).
    pub fn bytes(&self, name: &str) -> Result<Bytes> {
        match self.require(name)? {
            FieldValue::Bytes(b) => Ok(b.clone()),
            other => Err(Self::mismatch(name, "bytes", other)),
        }
    }

    /// Read a fixed-size byte array field.
    pub fn array<const N: usize>(&self, name: &str) -> Result<[u8; N]> {
        let b = self.bytes(name)?;
        <[u8; N]>::try_from(&b[..]).map_err(|_| {
            ProtocolError::Codec(format!(
                "Field '{}' has {} bytes, expected {}",
                name,
                b.len(),
                N
            ))
        })
    }

    /// Number of values.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no values are set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.entries.iter().map(|(n, v)| (*n, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut values = FieldValues::new();
        values
            .set_byte("a", 7)
            .set_int("b", 0x1234)
            .set_bits("c", 3)
            .set_bytes("d", vec![1u8, 2, 3]);

        assert_eq!(values.len(), 4);
        assert_eq!(values.byte("a").unwrap(), 7);
        assert_eq!(values.u16("b").unwrap(), 0x1234);
        assert_eq!(values.bits("c").unwrap(), 3);
        assert_eq!(&values.bytes("d").unwrap()[..], &[1, 2, 3]);
    }

    #[test]
    fn test_set_replaces_existing() {
        let mut values = FieldValues::new();
        values.set_byte("a", 1).set_byte("a", 2);

        assert_eq!(values.len(), 1);
        assert_eq!(values.byte("a").unwrap(), 2);
    }

    #[test]
    fn test_missing_field() {
        let values = FieldValues::new();
        let err = values.byte("nope").unwrap_err();
        assert!(err.to_string().contains("Missing field 'nope'"));
    }

    #[test]
    fn test_kind_mismatch() {
        let mut values = FieldValues::new();
        values.set_int("n", 5);

        let err = values.byte("n").unwrap_err();
        assert!(err.to_string().contains("is integer, expected byte"));
    }

    #[test]
    fn test_narrowing_overflow() {
        let mut values = FieldValues::new();
        values.set_int("n", 0x1_0000);

        assert!(values.u16("n").is_err());
        assert_eq!(values.u32("n").unwrap(), 0x1_0000);
    }

    #[test]
    fn test_flag_and_array() {
        let mut values = FieldValues::new();
        values.set_flag("f", true).set_bytes("arr", vec![9u8, 8]);

        assert!(values.flag("f").unwrap());
        assert_eq!(values.array::<2>("arr").unwrap(), [9, 8]);
        assert!(values.array::<3>("arr").is_err());
    }
}
