//! Outer carrier commands used to tunnel a request to a bridged device.
//!
//! ```text
//! SendMessage request          GetMessage response
//! 0     [7:6] tracking         0     [7:4] privilege
//!       [3:0] channel                [3:0] channel
//! 1     device id              1     device id
//! 2     sequence               2     sequence
//! 3..   inner request          3..   inner response
//! ```
//!
//! The inner request is `[function, command, data...]` and the inner
//! response is `[function, command, completion, data...]`.

use bytes::{BufMut, Bytes, BytesMut};

use super::sequence::BridgeTarget;
use crate::codec::{FieldDescriptor, FieldValues, Message, Request};
use crate::error::Result;
use crate::protocol::{CommandDescriptor, NetFn};

/// Send Message command code.
pub const CMD_SEND_MESSAGE: u8 = 0x34;
/// Get Message command code.
pub const CMD_GET_MESSAGE: u8 = 0x33;

/// Offset of the inner completion code in a tunneled response.
pub const INNER_COMPLETION_OFFSET: usize = 2;

/// Shortest well-formed tunneled response: function, command, completion.
pub const INNER_RESPONSE_MIN_LEN: usize = INNER_COMPLETION_OFFSET + 1;

/// Tracking mode asking the carrier to match the response to its request.
pub const TRACK_REQUEST: u8 = 0x01;

/// Deliver an inner request to a device behind a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessage {
    /// Channel the target sits on (4 bits).
    pub channel: u8,
    /// Tracking mode (2 bits), normally [`TRACK_REQUEST`].
    pub tracking: u8,
    /// Address of the target on that channel.
    pub device_id: u8,
    /// Sequence number the inner response must carry.
    pub sequence: u8,
    /// Inner request, `[function, command, data...]`.
    pub message: Bytes,
}

impl SendMessage {
    /// Wrap an inner request for `target`.
    pub fn new(target: BridgeTarget, sequence: u8, message: Bytes) -> Self {
        Self {
            channel: target.channel,
            tracking: TRACK_REQUEST,
            device_id: target.device_id,
            sequence,
            message,
        }
    }
}

impl Message for SendMessage {
    const NAME: &'static str = "send_message";
    const DESCRIPTOR: CommandDescriptor = CommandDescriptor::request(NetFn::APP, CMD_SEND_MESSAGE);
    const LAYOUT: &'static [FieldDescriptor] = &[
        FieldDescriptor::bits("channel", 0, 0x0F),
        FieldDescriptor::bits("tracking", 0, 0xC0),
        FieldDescriptor::byte("device_id", 1),
        FieldDescriptor::byte("sequence", 2),
        FieldDescriptor::rest("message", 3),
    ];

    fn write_fields(&self, values: &mut FieldValues) {
        values
            .set_bits("channel", self.channel)
            .set_bits("tracking", self.tracking)
            .set_byte("device_id", self.device_id)
            .set_byte("sequence", self.sequence)
            .set_bytes("message", self.message.clone());
    }

    fn read_fields(values: &FieldValues) -> Result<Self> {
        Ok(Self {
            channel: values.bits("channel")?,
            tracking: values.bits("tracking")?,
            device_id: values.byte("device_id")?,
            sequence: values.byte("sequence")?,
            message: values.bytes("message")?,
        })
    }
}

impl Request for SendMessage {
    type Response = SendMessageResponse;
}

/// Carrier acknowledgement. Some controllers echo data here; it is kept
/// but not interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SendMessageResponse {
    /// Whatever followed the completion code.
    pub data: Bytes,
}

impl Message for SendMessageResponse {
    const NAME: &'static str = "send_message_response";
    const DESCRIPTOR: CommandDescriptor =
        CommandDescriptor::response_of(NetFn::APP, CMD_SEND_MESSAGE);
    const LAYOUT: &'static [FieldDescriptor] = &[FieldDescriptor::rest("data", 0)];

    fn write_fields(&self, values: &mut FieldValues) {
        values.set_bytes("data", self.data.clone());
    }

    fn read_fields(values: &FieldValues) -> Result<Self> {
        Ok(Self {
            data: values.bytes("data")?,
        })
    }
}

/// Retrieve the next queued message from the receive queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetMessage;

impl Message for GetMessage {
    const NAME: &'static str = "get_message";
    const DESCRIPTOR: CommandDescriptor = CommandDescriptor::request(NetFn::APP, CMD_GET_MESSAGE);
    const LAYOUT: &'static [FieldDescriptor] = &[];

    fn write_fields(&self, _values: &mut FieldValues) {}

    fn read_fields(_values: &FieldValues) -> Result<Self> {
        Ok(GetMessage)
    }
}

impl Request for GetMessage {
    type Response = GetMessageResponse;
}

/// A queued message and the address it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetMessageResponse {
    /// Channel the message arrived on (4 bits).
    pub channel: u8,
    /// Privilege level of the message (4 bits).
    pub privilege: u8,
    /// Address of the sender.
    pub device_id: u8,
    /// Sequence number echoed from the request.
    pub sequence: u8,
    /// Inner response, `[function, command, completion, data...]`.
    pub message: Bytes,
}

impl GetMessageResponse {
    /// Device the message came from.
    pub fn target(&self) -> BridgeTarget {
        BridgeTarget::new(self.channel, self.device_id)
    }
}

impl Message for GetMessageResponse {
    const NAME: &'static str = "get_message_response";
    const DESCRIPTOR: CommandDescriptor =
        CommandDescriptor::response_of(NetFn::APP, CMD_GET_MESSAGE);
    const LAYOUT: &'static [FieldDescriptor] = &[
        FieldDescriptor::bits("channel", 0, 0x0F),
        FieldDescriptor::bits("privilege", 0, 0xF0),
        FieldDescriptor::byte("device_id", 1),
        FieldDescriptor::byte("sequence", 2),
        FieldDescriptor::rest("message", 3),
    ];

    fn write_fields(&self, values: &mut FieldValues) {
        values
            .set_bits("channel", self.channel)
            .set_bits("privilege", self.privilege)
            .set_byte("device_id", self.device_id)
            .set_byte("sequence", self.sequence)
            .set_bytes("message", self.message.clone());
    }

    fn read_fields(values: &FieldValues) -> Result<Self> {
        Ok(Self {
            channel: values.bits("channel")?,
            privilege: values.bits("privilege")?,
            device_id: values.byte("device_id")?,
            sequence: values.byte("sequence")?,
            message: values.bytes("message")?,
        })
    }
}

/// Build a tunneled request: `[function, command, data...]`.
pub fn wrap_inner(descriptor: CommandDescriptor, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(2 + payload.len());
    buf.put_u8(descriptor.wire_function());
    buf.put_u8(descriptor.command);
    buf.put_slice(payload);
    buf.freeze()
}
