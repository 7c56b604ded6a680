//! Typed message traits.
//!
//! A command type declares its identity and payload layout statically and
//! binds its struct fields by name:
//!
//! ```
//! use bmc_wire::codec::{FieldDescriptor, FieldValues, Message};
//! use bmc_wire::protocol::{CommandDescriptor, NetFn};
//! use bmc_wire::Result;
//!
//! #[derive(Debug, PartialEq)]
//! struct ReadThing {
//!     index: u8,
//! }
//!
//! impl Message for ReadThing {
//!     const NAME: &'static str = "read_thing";
//!     const DESCRIPTOR: CommandDescriptor = CommandDescriptor::request(NetFn::STORAGE, 0x42);
//!     const LAYOUT: &'static [FieldDescriptor] = &[FieldDescriptor::byte("index", 0)];
//!
//!     fn write_fields(&self, values: &mut FieldValues) {
//!         values.set_byte("index", self.index);
//!     }
//!
//!     fn read_fields(values: &FieldValues) -> Result<Self> {
//!         Ok(Self { index: values.byte("index")? })
//!     }
//! }
//!
//! let bytes = ReadThing { index: 7 }.encode().unwrap();
//! assert_eq!(&bytes[..], &[0x07]);
//! assert_eq!(ReadThing::decode(&bytes).unwrap(), ReadThing { index: 7 });
//! ```

use std::any::Any;
use std::fmt;

use bytes::Bytes;

use super::binary::FieldCodec;
use super::fields::FieldValues;
use super::layout::{FieldDescriptor, FieldLayout};
use crate::error::{ProtocolError, Result};
use crate::protocol::CommandDescriptor;

/// A message type with a static layout.
pub trait Message: fmt::Debug + Send + Sync + Sized + 'static {
    /// Human-readable command name, used in logs.
    const NAME: &'static str;
    /// Identity of this message type.
    const DESCRIPTOR: CommandDescriptor;
    /// Payload layout, ordered by offset.
    const LAYOUT: &'static [FieldDescriptor];

    /// Store this message's values by field name.
    fn write_fields(&self, values: &mut FieldValues);

    /// Build a message from decoded values.
    fn read_fields(values: &FieldValues) -> Result<Self>;

    /// Validate and return this type's layout.
    fn layout() -> Result<FieldLayout> {
        FieldLayout::validate(Self::LAYOUT).map_err(|reason| ProtocolError::InvalidLayout {
            command: Self::DESCRIPTOR,
            reason,
        })
    }

    /// Encode with an already validated layout.
    fn encode_with(&self, layout: &FieldLayout) -> Result<Bytes> {
        let mut values = FieldValues::with_capacity(Self::LAYOUT.len());
        self.write_fields(&mut values);
        FieldCodec::encode(layout, &values)
    }

    /// Decode with an already validated layout.
    fn decode_with(layout: &FieldLayout, raw: &Bytes) -> Result<Self> {
        let values = FieldCodec::decode(Self::DESCRIPTOR, layout, raw)?;
        Self::read_fields(&values)
    }

    /// Encode this message's payload.
    fn encode(&self) -> Result<Bytes> {
        self.encode_with(&Self::layout()?)
    }

    /// Decode a payload into this message type.
    fn decode(raw: &Bytes) -> Result<Self> {
        Self::decode_with(&Self::layout()?, raw)
    }
}

/// A request and the response type it expects.
pub trait Request: Message {
    /// Response paired with this request.
    type Response: Message;
}

/// Object-safe view of any message, used for registry dispatch.
pub trait DynMessage: fmt::Debug + Send + Sync {
    /// Identity of the concrete message type.
    fn descriptor(&self) -> CommandDescriptor;

    /// Command name.
    fn message_name(&self) -> &'static str;

    /// Encode the payload.
    fn encode_payload(&self) -> Result<Bytes>;

    /// Borrow as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Convert into `Any` for owned downcasting.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<M: Message> DynMessage for M {
    fn descriptor(&self) -> CommandDescriptor {
        M::DESCRIPTOR
    }

    fn message_name(&self) -> &'static str {
        M::NAME
    }

    fn encode_payload(&self) -> Result<Bytes> {
        Message::encode(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl dyn DynMessage {
    /// Downcast to a concrete message type.
    pub fn downcast_ref<M: Message>(&self) -> Option<&M> {
        self.as_any().downcast_ref::<M>()
    }

    /// Downcast a boxed message to a concrete type.
    pub fn downcast<M: Message>(self: Box<Self>) -> Option<M> {
        self.into_any().downcast::<M>().ok().map(|b| *b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::NetFn;

    #[derive(Debug, PartialEq)]
    struct Pair {
        a: u8,
        b: u16,
    }

    impl Message for Pair {
        const NAME: &'static str = "pair";
        const DESCRIPTOR: CommandDescriptor = CommandDescriptor::request(NetFn::OEM_GROUP, 0x01);
        const LAYOUT: &'static [FieldDescriptor] = &[
            FieldDescriptor::byte("a", 0),
            FieldDescriptor::le_int("b", 1, 2),
        ];

        fn write_fields(&self, values: &mut FieldValues) {
            values.set_byte("a", self.a).set_int("b", self.b.into());
        }

        fn read_fields(values: &FieldValues) -> Result<Self> {
            Ok(Self {
                a: values.byte("a")?,
                b: values.u16("b")?,
            })
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl Message for Broken {
        const NAME: &'static str = "broken";
        const DESCRIPTOR: CommandDescriptor = CommandDescriptor::request(NetFn::OEM_GROUP, 0x02);
        const LAYOUT: &'static [FieldDescriptor] = &[
            FieldDescriptor::byte("a", 1),
            FieldDescriptor::byte("b", 0),
        ];

        fn write_fields(&self, _values: &mut FieldValues) {}

        fn read_fields(_values: &FieldValues) -> Result<Self> {
            Ok(Broken)
        }
    }

    #[test]
    fn test_encode_decode() {
        let pair = Pair { a: 1, b: 0x0203 };
        let bytes = Message::encode(&pair).unwrap();
        assert_eq!(&bytes[..], &[0x01, 0x03, 0x02]);
        assert_eq!(Pair::decode(&bytes).unwrap(), pair);
    }

    #[test]
    fn test_invalid_layout_reported_with_command() {
        match Message::encode(&Broken) {
            Err(ProtocolError::InvalidLayout { command, .. }) => {
                assert_eq!(command, Broken::DESCRIPTOR);
            }
            other => panic!("expected InvalidLayout, got {:?}", other),
        }
    }

    #[test]
    fn test_dyn_message_downcast() {
        let boxed: Box<dyn DynMessage> = Box::new(Pair { a: 9, b: 1 });

        assert_eq!(boxed.descriptor(), Pair::DESCRIPTOR);
        assert_eq!(boxed.message_name(), "pair");
        assert_eq!(&boxed.encode_payload().unwrap()[..], &[9, 1, 0]);
        assert!(boxed.downcast_ref::<Pair>().is_some());
        assert!(boxed.downcast_ref::<Broken>().is_none());

        let pair = boxed.downcast::<Pair>().unwrap();
        assert_eq!(pair, Pair { a: 9, b: 1 });
    }
}
