//! Command registry for decode dispatch by descriptor.
//!
//! The registry maps a [`CommandDescriptor`] to the validated layout and
//! factory of its message type. Registration happens once at startup through
//! [`RegistryBuilder`]; [`RegistryBuilder::build`] freezes the table into a
//! [`CommandRegistry`] that is only ever read afterwards and can be shared
//! across threads behind an `Arc`.
//!
//! A duplicate descriptor is a configuration error and is rejected, never
//! overwritten. A miss on lookup is [`ProtocolError::UnknownCommand`].

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;

use crate::codec::{DynMessage, FieldLayout, Message, Request};
use crate::error::{ProtocolError, Result};
use crate::protocol::{CommandDescriptor, NetFn};

/// Factory that decodes a payload into a boxed message.
pub type DecodeFn = fn(&FieldLayout, &Bytes) -> Result<Box<dyn DynMessage>>;

fn decode_boxed<M: Message>(layout: &FieldLayout, raw: &Bytes) -> Result<Box<dyn DynMessage>> {
    let message: Box<dyn DynMessage> = Box::new(M::decode_with(layout, raw)?);
    Ok(message)
}

/// Entry for a registered message type.
#[derive(Clone, Copy)]
pub struct CommandEntry {
    /// Command name.
    pub name: &'static str,
    /// Rust type registered under the descriptor.
    pub type_id: TypeId,
    /// Identity of the message type.
    pub descriptor: CommandDescriptor,
    /// Validated payload layout.
    pub layout: FieldLayout,
    /// Decoder for this type.
    pub factory: DecodeFn,
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl CommandEntry {
    /// Decode a payload through this entry's factory.
    pub fn decode(&self, raw: &Bytes) -> Result<Box<dyn DynMessage>> {
        (self.factory)(&self.layout, raw)
    }
}

/// Collects registrations before the registry is frozen.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: HashMap<CommandDescriptor, CommandEntry>,
}

impl RegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a message type.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidLayout`] if `M::LAYOUT` breaks the layout rules
    ///   or the network function does not fit 6 bits
    /// - [`ProtocolError::DuplicateCommand`] if the descriptor is taken
    pub fn register<M: Message>(&mut self) -> Result<&mut Self> {
        let function = M::DESCRIPTOR.function;
        if function.0 > NetFn::MAX {
            return Err(ProtocolError::InvalidLayout {
                command: M::DESCRIPTOR,
                reason: format!("network function {:#04x} exceeds 6 bits", function.0),
            });
        }
        let layout = M::layout()?;

        if self.entries.contains_key(&M::DESCRIPTOR) {
            return Err(ProtocolError::DuplicateCommand(M::DESCRIPTOR));
        }

        tracing::trace!("Registered {} as {}", M::NAME, M::DESCRIPTOR);
        self.entries.insert(
            M::DESCRIPTOR,
            CommandEntry {
                name: M::NAME,
                type_id: TypeId::of::<M>(),
                descriptor: M::DESCRIPTOR,
                layout,
                factory: decode_boxed::<M>,
            },
        );
        Ok(self)
    }

    /// Register a request together with its response type.
    pub fn register_request<R: Request>(&mut self) -> Result<&mut Self> {
        self.register::<R>()?;
        self.register::<R::Response>()
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freeze the registrations.
    pub fn build(self) -> CommandRegistry {
        CommandRegistry {
            entries: self.entries,
        }
    }
}

/// Immutable descriptor-to-type table.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    entries: HashMap<CommandDescriptor, CommandEntry>,
}

impl CommandRegistry {
    /// Start a new registration.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry holding the carrier and built-in example commands.
    pub fn with_defaults() -> Result<Self> {
        let mut builder = RegistryBuilder::new();
        crate::commands::register_defaults(&mut builder)?;
        Ok(builder.build())
    }

    /// Look up the entry for a descriptor.
    pub fn lookup(&self, descriptor: CommandDescriptor) -> Result<&CommandEntry> {
        self.entries
            .get(&descriptor)
            .ok_or(ProtocolError::UnknownCommand(descriptor))
    }

    /// Check whether a descriptor is registered.
    pub fn contains(&self, descriptor: CommandDescriptor) -> bool {
        self.entries.contains_key(&descriptor)
    }

    /// Validated layout of a typed message.
    ///
    /// The descriptor must be registered to `M` itself; an entry holding a
    /// different type is [`ProtocolError::UnknownCommand`].
    pub fn layout_of<M: Message>(&self) -> Result<FieldLayout> {
        let entry = self.lookup(M::DESCRIPTOR)?;
        if entry.type_id != TypeId::of::<M>() {
            tracing::debug!(
                "{} is registered as {}, not {}",
                M::DESCRIPTOR,
                entry.name,
                M::NAME
            );
            return Err(ProtocolError::UnknownCommand(M::DESCRIPTOR));
        }
        Ok(entry.layout)
    }

    /// Decode a payload for any registered descriptor.
    ///
    /// Use [`DynMessage::as_any`] or `downcast` to reach the concrete type.
    pub fn decode(&self, descriptor: CommandDescriptor, raw: &Bytes) -> Result<Box<dyn DynMessage>> {
        self.lookup(descriptor)?.decode(raw)
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries (unordered).
    pub fn entries(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{FieldDescriptor, FieldValues};
    use crate::commands::app::{DeviceId, GetDeviceId};

    #[derive(Debug, PartialEq)]
    struct Sample {
        field0: u8,
        field1: u8,
    }

    impl Message for Sample {
        const NAME: &'static str = "sample";
        const DESCRIPTOR: CommandDescriptor = CommandDescriptor::response_of(NetFn::STORAGE, 0x42);
        const LAYOUT: &'static [FieldDescriptor] = &[
            FieldDescriptor::byte("field0", 0),
            FieldDescriptor::byte("field1", 1),
        ];

        fn write_fields(&self, values: &mut FieldValues) {
            values
                .set_byte("field0", self.field0)
                .set_byte("field1", self.field1);
        }

        fn read_fields(values: &FieldValues) -> Result<Self> {
            Ok(Self {
                field0: values.byte("field0")?,
                field1: values.byte("field1")?,
            })
        }
    }

    #[derive(Debug)]
    struct Clash;

    impl Message for Clash {
        const NAME: &'static str = "clash";
        const DESCRIPTOR: CommandDescriptor = Sample::DESCRIPTOR;
        const LAYOUT: &'static [FieldDescriptor] = &[];

        fn write_fields(&self, _values: &mut FieldValues) {}

        fn read_fields(_values: &FieldValues) -> Result<Self> {
            Ok(Clash)
        }
    }

    #[derive(Debug)]
    struct WideFunction;

    impl Message for WideFunction {
        const NAME: &'static str = "wide_function";
        const DESCRIPTOR: CommandDescriptor = CommandDescriptor::request(NetFn(0x40), 0x01);
        const LAYOUT: &'static [FieldDescriptor] = &[];

        fn write_fields(&self, _values: &mut FieldValues) {}

        fn read_fields(_values: &FieldValues) -> Result<Self> {
            Ok(WideFunction)
        }
    }

    #[derive(Debug)]
    struct BadLayout;

    impl Message for BadLayout {
        const NAME: &'static str = "bad_layout";
        const DESCRIPTOR: CommandDescriptor = CommandDescriptor::request(NetFn::OEM_GROUP, 0x7F);
        const LAYOUT: &'static [FieldDescriptor] = &[
            FieldDescriptor::le_int("a", 0, 2),
            FieldDescriptor::byte("b", 1),
        ];

        fn write_fields(&self, _values: &mut FieldValues) {}

        fn read_fields(_values: &FieldValues) -> Result<Self> {
            Ok(BadLayout)
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut builder = RegistryBuilder::new();
        builder.register::<Sample>().unwrap();
        let registry = builder.build();

        let entry = registry.lookup(Sample::DESCRIPTOR).unwrap();
        assert_eq!(entry.name, "sample");
        assert_eq!(entry.layout.min_len(), 2);
        assert!(registry.contains(Sample::DESCRIPTOR));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut builder = RegistryBuilder::new();
        builder.register::<Sample>().unwrap();

        match builder.register::<Clash>() {
            Err(ProtocolError::DuplicateCommand(d)) => assert_eq!(d, Sample::DESCRIPTOR),
            other => panic!("expected DuplicateCommand, got {:?}", other),
        }

        // First registration stays in place
        let registry = builder.build();
        assert_eq!(registry.lookup(Sample::DESCRIPTOR).unwrap().name, "sample");
    }

    #[test]
    fn test_layout_of_requires_registered_type() {
        let mut builder = RegistryBuilder::new();
        builder.register::<Clash>().unwrap();
        let registry = builder.build();

        // Same descriptor, different type.
        match registry.layout_of::<Sample>() {
            Err(ProtocolError::UnknownCommand(d)) => assert_eq!(d, Sample::DESCRIPTOR),
            other => panic!("expected UnknownCommand, got {:?}", other),
        }
        assert!(registry.layout_of::<Clash>().is_ok());
    }

    #[test]
    fn test_network_function_wider_than_six_bits_rejected() {
        let mut builder = RegistryBuilder::new();
        assert!(matches!(
            builder.register::<WideFunction>(),
            Err(ProtocolError::InvalidLayout { .. })
        ));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let mut builder = RegistryBuilder::new();
        assert!(matches!(
            builder.register::<BadLayout>(),
            Err(ProtocolError::InvalidLayout { .. })
        ));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_unknown_command() {
        let registry = CommandRegistry::builder().build();
        let d = CommandDescriptor::request(NetFn::STORAGE, 0x99);

        match registry.lookup(d) {
            Err(ProtocolError::UnknownCommand(missing)) => assert_eq!(missing, d),
            other => panic!("expected UnknownCommand, got {:?}", other),
        }
        assert!(registry.decode(d, &Bytes::new()).is_err());
    }

    #[test]
    fn test_decode_dispatch() {
        let mut builder = RegistryBuilder::new();
        builder.register::<Sample>().unwrap();
        let registry = builder.build();

        let msg = registry
            .decode(Sample::DESCRIPTOR, &Bytes::from_static(&[0x11, 0x22]))
            .unwrap();
        assert_eq!(
            msg.downcast_ref::<Sample>(),
            Some(&Sample {
                field0: 0x11,
                field1: 0x22
            })
        );
    }

    #[test]
    fn test_request_and_response_registered_together() {
        let mut builder = RegistryBuilder::new();
        builder.register_request::<GetDeviceId>().unwrap();
        let registry = builder.build();

        assert!(registry.contains(GetDeviceId::DESCRIPTOR));
        assert!(registry.contains(DeviceId::DESCRIPTOR));
        assert!(registry.layout_of::<DeviceId>().is_ok());
    }

    #[test]
    fn test_defaults_register_cleanly() {
        let registry = CommandRegistry::with_defaults().unwrap();
        assert_eq!(registry.len(), 12);
        for entry in registry.entries() {
            assert!(registry.contains(entry.descriptor.request_side()));
            assert!(registry.contains(entry.descriptor.response()));
        }
    }
}
