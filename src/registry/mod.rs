//! Registry module - descriptor to message type mapping.
//!
//! Provides:
//! - [`RegistryBuilder`] - collects registrations at startup
//! - [`CommandRegistry`] - immutable lookup and decode dispatch
//! - [`CommandEntry`] - validated layout and factory for one descriptor
//!
//! # Example
//!
//! ```
//! use bmc_wire::commands::app::GetDeviceId;
//! use bmc_wire::codec::Message;
//! use bmc_wire::registry::CommandRegistry;
//!
//! let mut builder = CommandRegistry::builder();
//! builder.register_request::<GetDeviceId>().unwrap();
//! let registry = builder.build();
//!
//! assert!(registry.lookup(GetDeviceId::DESCRIPTOR).is_ok());
//! ```

mod command_registry;

pub use command_registry::{CommandEntry, CommandRegistry, DecodeFn, RegistryBuilder};
