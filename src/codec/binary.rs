//! Offset-driven binary codec.
//!
//! Turns [`FieldValues`] into payload bytes and back using a validated
//! [`FieldLayout`]. Multi-byte integers are little-endian, byte arrays are
//! copied verbatim and bit fields are OR'd into their shared byte.
//!
//! Decoding only checks lengths; value ranges are the caller's business.
//!
//! # Example
//!
//! ```
//! use bmc_wire::codec::{FieldCodec, FieldDescriptor, FieldLayout, FieldValues};
//! use bmc_wire::protocol::{CommandDescriptor, NetFn};
//! use bytes::Bytes;
//!
//! const FIELDS: &[FieldDescriptor] = &[
//!     FieldDescriptor::byte("field0", 0),
//!     FieldDescriptor::byte("field1", 1),
//! ];
//! let layout = FieldLayout::validate(FIELDS).unwrap();
//! let cmd = CommandDescriptor::response_of(NetFn::STORAGE, 0x42);
//!
//! let values = FieldCodec::decode(cmd, &layout, &Bytes::from_static(&[0x11, 0x22])).unwrap();
//! assert_eq!(values.byte("field0").unwrap(), 0x11);
//! assert_eq!(values.byte("field1").unwrap(), 0x22);
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::fields::{FieldValue, FieldValues};
use super::layout::{FieldDescriptor, FieldKind, FieldLayout, FieldLength};
use crate::error::{ProtocolError, Result};
use crate::protocol::CommandDescriptor;

/// Layout-driven codec.
///
/// A marker struct with static methods. All state lives in the layout and
/// the values.
pub struct FieldCodec;

impl FieldCodec {
    /// Encode values into a payload.
    ///
    /// Fields are written in declaration order into a zero-filled buffer
    /// sized to the fixed extent plus the trailing field, if any. Undeclared
    /// bits and gap bytes stay zero.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Codec`] if a value is missing, has the wrong
    /// kind, or does not fit its declared width or mask.
    pub fn encode(layout: &FieldLayout, values: &FieldValues) -> Result<Bytes> {
        let fields = layout.fields();
        let mut total = layout.min_len();

        if let Some(last) = fields.last().filter(|f| f.is_trailing()) {
            match values.get(last.name) {
                Some(FieldValue::Bytes(b)) => total = total.max(last.offset + b.len()),
                Some(other) => return Err(Self::kind_error(last, other)),
                None => return Err(Self::missing(last)),
            }
        }

        let mut buf = BytesMut::zeroed(total);

        for field in fields {
            let value = values.get(field.name).ok_or_else(|| Self::missing(field))?;
            let off = field.offset;

            match (field.kind, value) {
                (FieldKind::Byte, FieldValue::Byte(b)) => buf[off] = *b,

                (FieldKind::Bytes, FieldValue::Bytes(b)) => {
                    if let FieldLength::Fixed(n) = field.length {
                        if b.len() != n {
                            return Err(ProtocolError::Codec(format!(
                                "Field '{}' needs {} bytes, got {}",
                                field.name,
                                n,
                                b.len()
                            )));
                        }
                    }
                    buf[off..off + b.len()].copy_from_slice(b);
                }

                (FieldKind::LeInt, FieldValue::Int(n)) => {
                    let width = Self::fixed_width(field);
                    if width < 8 && (*n >> (8 * width)) != 0 {
                        return Err(ProtocolError::Codec(format!(
                            "Field '{}' value {:#x} does not fit {} bytes",
                            field.name, n, width
                        )));
                    }
                    let mut slot = &mut buf[off..off + width];
                    slot.put_uint_le(*n, width);
                }

                (FieldKind::Bits { mask }, FieldValue::Bits(v)) => {
                    let shifted = u16::from(*v) << mask.trailing_zeros();
                    if shifted & !u16::from(mask) != 0 {
                        return Err(ProtocolError::Codec(format!(
                            "Field '{}' value {:#x} does not fit mask {:#04x}",
                            field.name, v, mask
                        )));
                    }
                    buf[off] |= shifted as u8;
                }

                (_, other) => return Err(Self::kind_error(field, other)),
            }
        }

        Ok(buf.freeze())
    }

    /// Decode a payload into values.
    ///
    /// The length check happens before any field is read, so a short
    /// payload never yields a partially populated result.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedMessage`] if `raw` is shorter than
    /// the end of the last fixed field.
    pub fn decode(
        command: CommandDescriptor,
        layout: &FieldLayout,
        raw: &Bytes,
    ) -> Result<FieldValues> {
        if raw.len() < layout.min_len() {
            return Err(ProtocolError::MalformedMessage {
                command,
                expected: layout.min_len(),
                actual: raw.len(),
            });
        }

        let mut values = FieldValues::with_capacity(layout.fields().len());

        for field in layout.fields() {
            let off = field.offset;
            let value = match (field.kind, field.length) {
                (FieldKind::Byte, _) => FieldValue::Byte(raw[off]),
                (FieldKind::Bytes, FieldLength::Fixed(n)) => {
                    FieldValue::Bytes(raw.slice(off..off + n))
                }
                (FieldKind::Bytes, FieldLength::Rest) => FieldValue::Bytes(raw.slice(off..)),
                (FieldKind::LeInt, FieldLength::Fixed(n)) => {
                    let mut slot = &raw[off..off + n];
                    FieldValue::Int(slot.get_uint_le(n))
                }
                (FieldKind::Bits { mask }, _) => {
                    FieldValue::Bits((raw[off] & mask) >> mask.trailing_zeros())
                }
                (FieldKind::LeInt, FieldLength::Rest) => {
                    return Err(ProtocolError::Codec(format!(
                        "Field '{}' cannot take the remaining bytes",
                        field.name
                    )));
                }
            };
            values.set(field.name, value);
        }

        Ok(values)
    }

    fn fixed_width(field: &FieldDescriptor) -> usize {
        match field.length {
            FieldLength::Fixed(n) => n,
            FieldLength::Rest => 0,
        }
    }

    fn missing(field: &FieldDescriptor) -> ProtocolError {
        ProtocolError::Codec(format!("Missing field '{}'", field.name))
    }

    fn kind_error(field: &FieldDescriptor, value: &FieldValue) -> ProtocolError {
        ProtocolError::Codec(format!(
            "Field '{}' declared as {:?} cannot hold {:?}",
            field.name, field.kind, value
        ))
    }
}
