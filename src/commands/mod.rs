//! Built-in command definitions.
//!
//! A small set of concrete commands that exercise every field kind:
//! - [`app`] - device identity and self test, sent directly
//! - [`firmware`] - firmware management, usually sent bridged
//!
//! The bridge carrier commands live in [`crate::bridge`] and are registered
//! here as well.

pub mod app;
pub mod firmware;

use crate::bridge::{GetMessage, SendMessage};
use crate::error::Result;
use crate::registry::RegistryBuilder;

/// Register the carrier and built-in commands.
pub fn register_defaults(builder: &mut RegistryBuilder) -> Result<()> {
    builder
        .register_request::<SendMessage>()?
        .register_request::<GetMessage>()?
        .register_request::<app::GetDeviceId>()?
        .register_request::<app::GetSelfTestResults>()?
        .register_request::<firmware::GetFirmwareVersion>()?
        .register_request::<firmware::GetUpdateStatus>()?;
    Ok(())
}
