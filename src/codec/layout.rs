//! Field layout metadata.
//!
//! Each message type declares its payload as a static, ordered table of
//! [`FieldDescriptor`]s. Offsets are relative to the start of the payload
//! (after the completion code for responses).
//!
//! Rules checked by [`FieldLayout::validate`]:
//! - offsets ascend in declaration order
//! - byte ranges never overlap, except [`FieldKind::Bits`] fields sharing a
//!   byte whose masks are disjoint
//! - at most one [`FieldLength::Rest`] field, only for [`FieldKind::Bytes`],
//!   and it is declared last
//! - [`FieldKind::LeInt`] is 1 to 8 bytes wide, [`FieldKind::Bits`] exactly 1
//!
//! # Example
//!
//! ```
//! use bmc_wire::codec::{FieldDescriptor, FieldLayout};
//!
//! const LAYOUT: &[FieldDescriptor] = &[
//!     FieldDescriptor::bits("channel", 0, 0x0F),
//!     FieldDescriptor::bits("tracking", 0, 0xC0),
//!     FieldDescriptor::le_int("manufacturer", 1, 3),
//!     FieldDescriptor::rest("data", 4),
//! ];
//!
//! let layout = FieldLayout::validate(LAYOUT).unwrap();
//! assert_eq!(layout.min_len(), 4);
//! assert!(layout.has_trailing());
//! ```

/// How a field's bytes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A single byte.
    Byte,
    /// A byte array copied verbatim.
    Bytes,
    /// Little-endian unsigned integer.
    LeInt,
    /// Sub-byte field selected by a mask; the value is stored shifted down.
    Bits {
        /// Bits of the byte that belong to this field.
        mask: u8,
    },
}

/// Width of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLength {
    /// Exactly this many bytes.
    Fixed(usize),
    /// Every byte after the fixed fields.
    Rest,
}

/// Offset, width and kind of one payload value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name used by `FieldValues` accessors.
    pub name: &'static str,
    /// Byte offset within the payload.
    pub offset: usize,
    /// Byte width.
    pub length: FieldLength,
    /// Value kind.
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// A single byte at `offset`.
    pub const fn byte(name: &'static str, offset: usize) -> Self {
        Self {
            name,
            offset,
            length: FieldLength::Fixed(1),
            kind: FieldKind::Byte,
        }
    }

    /// A fixed-length byte array.
    pub const fn bytes(name: &'static str, offset: usize, len: usize) -> Self {
        Self {
            name,
            offset,
            length: FieldLength::Fixed(len),
            kind: FieldKind::Bytes,
        }
    }

    /// A little-endian integer of `len` bytes.
    pub const fn le_int(name: &'static str, offset: usize, len: usize) -> Self {
        Self {
            name,
            offset,
            length: FieldLength::Fixed(len),
            kind: FieldKind::LeInt,
        }
    }

    /// Masked bits of the byte at `offset`.
    pub const fn bits(name: &'static str, offset: usize, mask: u8) -> Self {
        Self {
            name,
            offset,
            length: FieldLength::Fixed(1),
            kind: FieldKind::Bits { mask },
        }
    }

    /// Trailing byte array taking the remainder of the payload.
    pub const fn rest(name: &'static str, offset: usize) -> Self {
        Self {
            name,
            offset,
            length: FieldLength::Rest,
            kind: FieldKind::Bytes,
        }
    }

    /// End offset of a fixed field; `offset` for a trailing one.
    #[inline]
    pub const fn end(&self) -> usize {
        match self.length {
            FieldLength::Fixed(n) => self.offset + n,
            FieldLength::Rest => self.offset,
        }
    }

    /// True for the trailing variable-length field.
    #[inline]
    pub const fn is_trailing(&self) -> bool {
        matches!(self.length, FieldLength::Rest)
    }
}

/// A validated field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    fields: &'static [FieldDescriptor],
    min_len: usize,
    trailing: bool,
}

impl FieldLayout {
    /// Check a field table and compute its fixed extent.
    ///
    /// Returns a human-readable reason on violation; callers attach the
    /// command descriptor.
    pub fn validate(fields: &'static [FieldDescriptor]) -> std::result::Result<Self, String> {
        let mut min_len = 0usize;
        let mut trailing = false;
        let mut prev: Option<&FieldDescriptor> = None;
        // Mask bits already claimed in the byte of the most recent bit field.
        let mut shared_mask: u8 = 0;

        for field in fields {
            if trailing {
                return Err(format!(
                    "field '{}' follows the trailing field",
                    field.name
                ));
            }

            match (field.kind, field.length) {
                (FieldKind::Bytes, _) => {}
                (_, FieldLength::Rest) => {
                    return Err(format!(
                        "field '{}': only byte arrays may take the remaining bytes",
                        field.name
                    ));
                }
                (FieldKind::Byte, FieldLength::Fixed(n)) if n != 1 => {
                    return Err(format!("field '{}': byte field must be 1 byte", field.name));
                }
                (FieldKind::LeInt, FieldLength::Fixed(n)) if n == 0 || n > 8 => {
                    return Err(format!(
                        "field '{}': integer width {} outside 1..=8",
                        field.name, n
                    ));
                }
                (FieldKind::Bits { mask }, FieldLength::Fixed(n)) => {
                    if n != 1 {
                        return Err(format!("field '{}': bit field must be 1 byte", field.name));
                    }
                    if mask == 0 {
                        return Err(format!("field '{}': empty bit mask", field.name));
                    }
                }
                _ => {}
            }

            if let Some(p) = prev {
                if field.offset < p.offset {
                    return Err(format!(
                        "field '{}' at offset {} precedes '{}' at offset {}",
                        field.name, field.offset, p.name, p.offset
                    ));
                }

                let same_bit_byte = matches!(
                    (p.kind, field.kind),
                    (FieldKind::Bits { .. }, FieldKind::Bits { .. })
                ) && p.offset == field.offset;

                if same_bit_byte {
                    if let FieldKind::Bits { mask } = field.kind {
                        if shared_mask & mask != 0 {
                            return Err(format!(
                                "field '{}': mask {:#04x} overlaps an earlier bit field",
                                field.name, mask
                            ));
                        }
                        shared_mask |= mask;
                    }
                } else if field.offset < min_len {
                    return Err(format!(
                        "field '{}' at offset {} overlaps bytes ending at {}",
                        field.name, field.offset, min_len
                    ));
                } else if let FieldKind::Bits { mask } = field.kind {
                    shared_mask = mask;
                }
            } else if let FieldKind::Bits { mask } = field.kind {
                shared_mask = mask;
            }

            if field.is_trailing() {
                trailing = true;
                min_len = min_len.max(field.offset);
            } else {
                min_len = min_len.max(field.end());
            }
            prev = Some(field);
        }

        Ok(Self {
            fields,
            min_len,
            trailing,
        })
    }

    /// Layout with no fields (empty payload).
    pub const fn empty() -> Self {
        Self {
            fields: &[],
            min_len: 0,
            trailing: false,
        }
    }

    /// Field table in declaration order.
    #[inline]
    pub fn fields(&self) -> &'static [FieldDescriptor] {
        self.fields
    }

    /// Minimum payload length: end of the last fixed field.
    #[inline]
    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// True if the last field takes the remaining bytes.
    #[inline]
    pub fn has_trailing(&self) -> bool {
        self.trailing
    }

    /// Find a field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_simple_layout() {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::byte("a", 0),
            FieldDescriptor::le_int("b", 1, 2),
            FieldDescriptor::bytes("c", 3, 4),
        ];

        let layout = FieldLayout::validate(FIELDS).unwrap();
        assert_eq!(layout.min_len(), 7);
        assert!(!layout.has_trailing());
        assert_eq!(layout.fields().len(), 3);
        assert_eq!(layout.field("b").unwrap().offset, 1);
        assert!(layout.field("missing").is_none());
    }

    #[test]
    fn test_bits_may_share_byte() {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::bits("low", 0, 0x0F),
            FieldDescriptor::bits("high", 0, 0xF0),
            FieldDescriptor::byte("next", 1),
        ];

        let layout = FieldLayout::validate(FIELDS).unwrap();
        assert_eq!(layout.min_len(), 2);
    }

    #[test]
    fn test_overlapping_masks_rejected() {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::bits("low", 0, 0x0F),
            FieldDescriptor::bits("mid", 0, 0x18),
        ];

        let err = FieldLayout::validate(FIELDS).unwrap_err();
        assert!(err.contains("overlaps an earlier bit field"));
    }

    #[test]
    fn test_overlapping_ranges_rejected() {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::le_int("a", 0, 2),
            FieldDescriptor::byte("b", 1),
        ];

        let err = FieldLayout::validate(FIELDS).unwrap_err();
        assert!(err.contains("overlaps"));
    }

    #[test]
    fn test_byte_cannot_share_with_bits() {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::bits("flags", 0, 0x01),
            FieldDescriptor::byte("whole", 0),
        ];

        assert!(FieldLayout::validate(FIELDS).is_err());
    }

    #[test]
    fn test_unsorted_offsets_rejected() {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::byte("b", 1),
            FieldDescriptor::byte("a", 0),
        ];

        let err = FieldLayout::validate(FIELDS).unwrap_err();
        assert!(err.contains("precedes"));
    }

    #[test]
    fn test_trailing_must_be_last() {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::rest("data", 0),
            FieldDescriptor::byte("after", 0),
        ];

        let err = FieldLayout::validate(FIELDS).unwrap_err();
        assert!(err.contains("follows the trailing field"));
    }

    #[test]
    fn test_trailing_only_for_byte_arrays() {
        const FIELDS: &[FieldDescriptor] = &[FieldDescriptor {
            name: "n",
            offset: 0,
            length: FieldLength::Rest,
            kind: FieldKind::LeInt,
        }];

        assert!(FieldLayout::validate(FIELDS).is_err());
    }

    #[test]
    fn test_integer_width_bounds() {
        const TOO_WIDE: &[FieldDescriptor] = &[FieldDescriptor::le_int("n", 0, 9)];
        const ZERO: &[FieldDescriptor] = &[FieldDescriptor::le_int("n", 0, 0)];
        const MAX: &[FieldDescriptor] = &[FieldDescriptor::le_int("n", 0, 8)];

        assert!(FieldLayout::validate(TOO_WIDE).is_err());
        assert!(FieldLayout::validate(ZERO).is_err());
        assert_eq!(FieldLayout::validate(MAX).unwrap().min_len(), 8);
    }

    #[test]
    fn test_trailing_layout_min_len() {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::byte("a", 0),
            FieldDescriptor::rest("data", 1),
        ];

        let layout = FieldLayout::validate(FIELDS).unwrap();
        assert_eq!(layout.min_len(), 1);
        assert!(layout.has_trailing());
    }

    #[test]
    fn test_empty_layout() {
        let layout = FieldLayout::validate(&[]).unwrap();
        assert_eq!(layout, FieldLayout::empty());
        assert_eq!(layout.min_len(), 0);
    }
}
