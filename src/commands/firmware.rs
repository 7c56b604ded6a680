//! Firmware management commands.
//!
//! These are served by a satellite management controller that is not
//! directly addressable on the system interface, so they normally travel
//! through [`crate::bridge`] rather than being sent directly.

use bytes::Bytes;

use crate::codec::{FieldDescriptor, FieldValues, Message, Request};
use crate::error::Result;
use crate::protocol::{CommandDescriptor, NetFn};

/// Get Firmware Version command code.
pub const CMD_GET_FIRMWARE_VERSION: u8 = 0x01;
/// Get Update Status command code.
pub const CMD_GET_UPDATE_STATUS: u8 = 0x02;

/// Ask for the version of one firmware component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetFirmwareVersion {
    /// Component index (0 = operational image).
    pub component: u8,
}

impl Message for GetFirmwareVersion {
    const NAME: &'static str = "get_firmware_version";
    const DESCRIPTOR: CommandDescriptor =
        CommandDescriptor::request(NetFn::FIRMWARE, CMD_GET_FIRMWARE_VERSION);
    const LAYOUT: &'static [FieldDescriptor] = &[FieldDescriptor::byte("component", 0)];

    fn write_fields(&self, values: &mut FieldValues) {
        values.set_byte("component", self.component);
    }

    fn read_fields(values: &FieldValues) -> Result<Self> {
        Ok(Self {
            component: values.byte("component")?,
        })
    }
}

impl Request for GetFirmwareVersion {
    type Response = FirmwareVersion;
}

/// Version of a firmware component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub component: u8,
    pub major: u8,
    pub minor: u8,
    pub build: u32,
    /// Free-form version label, usually ASCII.
    pub label: Bytes,
}

impl FirmwareVersion {
    /// Label as text, replacing invalid UTF-8.
    pub fn label_lossy(&self) -> String {
        String::from_utf8_lossy(&self.label).into_owned()
    }
}

impl Message for FirmwareVersion {
    const NAME: &'static str = "get_firmware_version_response";
    const DESCRIPTOR: CommandDescriptor =
        CommandDescriptor::response_of(NetFn::FIRMWARE, CMD_GET_FIRMWARE_VERSION);
    const LAYOUT: &'static [FieldDescriptor] = &[
        FieldDescriptor::byte("component", 0),
        FieldDescriptor::byte("major", 1),
        FieldDescriptor::byte("minor", 2),
        FieldDescriptor::le_int("build", 3, 4),
        FieldDescriptor::rest("label", 7),
    ];

    fn write_fields(&self, values: &mut FieldValues) {
        values
            .set_byte("component", self.component)
            .set_byte("major", self.major)
            .set_byte("minor", self.minor)
            .set_int("build", self.build.into())
            .set_bytes("label", self.label.clone());
    }

    fn read_fields(values: &FieldValues) -> Result<Self> {
        Ok(Self {
            component: values.byte("component")?,
            major: values.byte("major")?,
            minor: values.byte("minor")?,
            build: values.u32("build")?,
            label: values.bytes("label")?,
        })
    }
}

/// Ask for the state of the firmware update engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetUpdateStatus;

impl Message for GetUpdateStatus {
    const NAME: &'static str = "get_update_status";
    const DESCRIPTOR: CommandDescriptor =
        CommandDescriptor::request(NetFn::FIRMWARE, CMD_GET_UPDATE_STATUS);
    const LAYOUT: &'static [FieldDescriptor] = &[];

    fn write_fields(&self, _values: &mut FieldValues) {}

    fn read_fields(_values: &FieldValues) -> Result<Self> {
        Ok(GetUpdateStatus)
    }
}

impl Request for GetUpdateStatus {
    type Response = UpdateStatus;
}

/// Update engine state reported in the low nibble of byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Receiving,
    Verifying,
    Writing,
    Complete,
    Failed,
    Other(u8),
}

impl UpdateState {
    fn from_bits(b: u8) -> Self {
        match b {
            0 => UpdateState::Idle,
            1 => UpdateState::Receiving,
            2 => UpdateState::Verifying,
            3 => UpdateState::Writing,
            4 => UpdateState::Complete,
            5 => UpdateState::Failed,
            other => UpdateState::Other(other),
        }
    }

    fn to_bits(self) -> u8 {
        match self {
            UpdateState::Idle => 0,
            UpdateState::Receiving => 1,
            UpdateState::Verifying => 2,
            UpdateState::Writing => 3,
            UpdateState::Complete => 4,
            UpdateState::Failed => 5,
            UpdateState::Other(b) => b,
        }
    }
}

/// Update engine status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateStatus {
    pub state: UpdateState,
    pub rollback_available: bool,
    pub progress_percent: u8,
    pub last_error: u16,
}

impl Message for UpdateStatus {
    const NAME: &'static str = "get_update_status_response";
    const DESCRIPTOR: CommandDescriptor =
        CommandDescriptor::response_of(NetFn::FIRMWARE, CMD_GET_UPDATE_STATUS);
    const LAYOUT: &'static [FieldDescriptor] = &[
        FieldDescriptor::bits("state", 0, 0x0F),
        FieldDescriptor::bits("rollback_available", 0, 0x80),
        FieldDescriptor::byte("progress_percent", 1),
        FieldDescriptor::le_int("last_error", 2, 2),
    ];

    fn write_fields(&self, values: &mut FieldValues) {
        values
            .set_bits("state", self.state.to_bits())
            .set_flag("rollback_available", self.rollback_available)
            .set_byte("progress_percent", self.progress_percent)
            .set_int("last_error", self.last_error.into());
    }

    fn read_fields(values: &FieldValues) -> Result<Self> {
        Ok(Self {
            state: UpdateState::from_bits(values.bits("state")?),
            rollback_available: values.flag("rollback_available")?,
            progress_percent: values.byte("progress_percent")?,
            last_error: values.u16("last_error")?,
        })
    }
}
