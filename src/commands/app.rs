//! Application network function commands.

use bytes::Bytes;

use crate::codec::{FieldDescriptor, FieldValues, Message, Request};
use crate::error::Result;
use crate::protocol::{CommandDescriptor, NetFn};

/// Get Device ID command code.
pub const CMD_GET_DEVICE_ID: u8 = 0x01;
/// Get Self Test Results command code.
pub const CMD_GET_SELF_TEST_RESULTS: u8 = 0x04;

/// Request the controller's identity and firmware revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetDeviceId;

impl Message for GetDeviceId {
    const NAME: &'static str = "get_device_id";
    const DESCRIPTOR: CommandDescriptor = CommandDescriptor::request(NetFn::APP, CMD_GET_DEVICE_ID);
    const LAYOUT: &'static [FieldDescriptor] = &[];

    fn write_fields(&self, _values: &mut FieldValues) {}

    fn read_fields(_values: &FieldValues) -> Result<Self> {
        Ok(GetDeviceId)
    }
}

impl Request for GetDeviceId {
    type Response = DeviceId;
}

/// Controller identity.
///
/// ```text
/// 0      device id
/// 1      [7] provides SDRs  [3:0] device revision
/// 2      [7] update in progress  [6:0] firmware major
/// 3      firmware minor (BCD)
/// 4      protocol version (BCD, minor in high nibble)
/// 5      additional device support flags
/// 6..9   manufacturer id (20 bits, LE)
/// 9..11  product id (LE)
/// 11..   auxiliary firmware revision (optional)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId {
    pub device_id: u8,
    pub provides_sdrs: bool,
    pub device_revision: u8,
    pub update_in_progress: bool,
    pub firmware_major: u8,
    pub firmware_minor: u8,
    pub protocol_version: u8,
    pub additional_support: u8,
    pub manufacturer_id: u32,
    pub product_id: u16,
    pub aux_firmware: Bytes,
}

impl DeviceId {
    /// Firmware revision as `major.minor`, decoding the BCD minor byte.
    pub fn firmware_version(&self) -> String {
        let minor = (self.firmware_minor >> 4) * 10 + (self.firmware_minor & 0x0F);
        format!("{}.{:02}", self.firmware_major, minor)
    }
}

impl Message for DeviceId {
    const NAME: &'static str = "get_device_id_response";
    const DESCRIPTOR: CommandDescriptor =
        CommandDescriptor::response_of(NetFn::APP, CMD_GET_DEVICE_ID);
    const LAYOUT: &'static [FieldDescriptor] = &[
        FieldDescriptor::byte("device_id", 0),
        FieldDescriptor::bits("device_revision", 1, 0x0F),
        FieldDescriptor::bits("provides_sdrs", 1, 0x80),
        FieldDescriptor::bits("firmware_major", 2, 0x7F),
        FieldDescriptor::bits("update_in_progress", 2, 0x80),
        FieldDescriptor::byte("firmware_minor", 3),
        FieldDescriptor::byte("protocol_version", 4),
        FieldDescriptor::byte("additional_support", 5),
        FieldDescriptor::le_int("manufacturer_id", 6, 3),
        FieldDescriptor::le_int("product_id", 9, 2),
        FieldDescriptor::rest("aux_firmware", 11),
    ];

    fn write_fields(&self, values: &mut FieldValues) {
        values
            .set_byte("device_id", self.device_id)
            .set_bits("device_revision", self.device_revision)
            .set_flag("provides_sdrs", self.provides_sdrs)
            .set_bits("firmware_major", self.firmware_major)
            .set_flag("update_in_progress", self.update_in_progress)
            .set_byte("firmware_minor", self.firmware_minor)
            .set_byte("protocol_version", self.protocol_version)
            .set_byte("additional_support", self.additional_support)
            .set_int("manufacturer_id", self.manufacturer_id.into())
            .set_int("product_id", self.product_id.into())
            .set_bytes("aux_firmware", self.aux_firmware.clone());
    }

    fn read_fields(values: &FieldValues) -> Result<Self> {
        Ok(Self {
            device_id: values.byte("device_id")?,
            provides_sdrs: values.flag("provides_sdrs")?,
            device_revision: values.bits("device_revision")?,
            update_in_progress: values.flag("update_in_progress")?,
            firmware_major: values.bits("firmware_major")?,
            firmware_minor: values.byte("firmware_minor")?,
            protocol_version: values.byte("protocol_version")?,
            additional_support: values.byte("additional_support")?,
            manufacturer_id: values.u32("manufacturer_id")?,
            product_id: values.u16("product_id")?,
            aux_firmware: values.bytes("aux_firmware")?,
        })
    }
}

/// Ask the controller for its power-on self test outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetSelfTestResults;

impl Message for GetSelfTestResults {
    const NAME: &'static str = "get_self_test_results";
    const DESCRIPTOR: CommandDescriptor =
        CommandDescriptor::request(NetFn::APP, CMD_GET_SELF_TEST_RESULTS);
    const LAYOUT: &'static [FieldDescriptor] = &[];

    fn write_fields(&self, _values: &mut FieldValues) {}

    fn read_fields(_values: &FieldValues) -> Result<Self> {
        Ok(GetSelfTestResults)
    }
}

impl Request for GetSelfTestResults {
    type Response = SelfTestResults;
}

/// Self test outcome. `0x55` means no error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfTestResults {
    pub result: u8,
    pub detail: u8,
}

impl SelfTestResults {
    /// Result byte reported when every test passed.
    pub const PASSED: u8 = 0x55;

    /// True if no error was found.
    pub fn passed(&self) -> bool {
        self.result == Self::PASSED
    }
}

impl Message for SelfTestResults {
    const NAME: &'static str = "get_self_test_results_response";
    const DESCRIPTOR: CommandDescriptor =
        CommandDescriptor::response_of(NetFn::APP, CMD_GET_SELF_TEST_RESULTS);
    const LAYOUT: &'static [FieldDescriptor] = &[
        FieldDescriptor::byte("result", 0),
        FieldDescriptor::byte("detail", 1),
    ];

    fn write_fields(&self, values: &mut FieldValues) {
        values
            .set_byte("result", self.result)
            .set_byte("detail", self.detail);
    }

    fn read_fields(values: &FieldValues) -> Result<Self> {
        Ok(Self {
            result: values.byte("result")?,
            detail: values.byte("detail")?,
        })
    }
}
