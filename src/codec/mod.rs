//! Codec module - layout-driven payload encoding/decoding.
//!
//! This module turns typed messages into payload bytes and back:
//!
//! - [`FieldDescriptor`] / [`FieldLayout`] - static offset/width/kind tables
//! - [`FieldValues`] - named values exchanged between a message and the codec
//! - [`FieldCodec`] - the byte-level encoder/decoder
//! - [`Message`] / [`Request`] / [`DynMessage`] - typed and object-safe views
//!
//! # Design
//!
//! Layouts are `const` tables declared by each command type, so there is no
//! runtime introspection. The codec is a marker struct with static methods.
//!
//! # Example
//!
//! ```
//! use bmc_wire::codec::{FieldCodec, FieldDescriptor, FieldLayout, FieldValues};
//!
//! const FIELDS: &[FieldDescriptor] = &[
//!     FieldDescriptor::byte("id", 0),
//!     FieldDescriptor::le_int("count", 1, 2),
//! ];
//! let layout = FieldLayout::validate(FIELDS).unwrap();
//!
//! let mut values = FieldValues::new();
//! values.set_byte("id", 1).set_int("count", 0x0102);
//!
//! let bytes = FieldCodec::encode(&layout, &values).unwrap();
//! assert_eq!(&bytes[..], &[0x01, 0x02, 0x01]);
//! ```

mod binary;
mod fields;
mod layout;
mod message;

pub use binary::FieldCodec;
pub use fields::{FieldValue, FieldValues};
pub use layout::{FieldDescriptor, FieldKind, FieldLayout, FieldLength};
pub use message::{DynMessage, Message, Request};
