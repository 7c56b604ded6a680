//! Command identity: network function, command code and direction.
//!
//! A [`CommandDescriptor`] names one message type. A request and its
//! response share the network function and command code and differ only in
//! [`Direction`]. On the wire a response carries the odd network function
//! (`request | 1`); the descriptor always stores the even request code.
//!
//! # Example
//!
//! ```
//! use bmc_wire::protocol::{CommandDescriptor, NetFn};
//!
//! let req = CommandDescriptor::request(NetFn::APP, 0x01);
//! let rsp = req.response();
//!
//! assert_eq!(req.wire_function(), 0x06);
//! assert_eq!(rsp.wire_function(), 0x07);
//! assert_eq!(rsp.request_side(), req);
//! ```

use std::fmt;

/// Network function code (6 bits on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetFn(pub u8);

impl NetFn {
    /// Chassis device commands.
    pub const CHASSIS: NetFn = NetFn(0x00);
    /// Bridge commands.
    pub const BRIDGE: NetFn = NetFn(0x02);
    /// Sensor and event commands.
    pub const SENSOR_EVENT: NetFn = NetFn(0x04);
    /// Application commands (device id, messaging).
    pub const APP: NetFn = NetFn(0x06);
    /// Firmware management commands.
    pub const FIRMWARE: NetFn = NetFn(0x08);
    /// Non-volatile storage commands (FRU, SDR, SEL).
    pub const STORAGE: NetFn = NetFn(0x0A);
    /// Transport configuration commands.
    pub const TRANSPORT: NetFn = NetFn(0x0C);
    /// Group extension commands.
    pub const GROUP_EXTENSION: NetFn = NetFn(0x2C);
    /// OEM/group commands.
    pub const OEM_GROUP: NetFn = NetFn(0x2E);

    /// Highest encodable network function.
    pub const MAX: u8 = 0x3F;

    /// Request form of this code (low bit cleared).
    #[inline]
    pub const fn request(self) -> NetFn {
        NetFn(self.0 & !1)
    }

    /// True if the low bit marks a response.
    #[inline]
    pub const fn is_response(self) -> bool {
        self.0 & 1 == 1
    }
}

impl fmt::Display for NetFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// Which way a message travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Requester to responder.
    Request,
    /// Responder to requester.
    Response,
}

/// Immutable identity of one message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandDescriptor {
    /// Network function (request form).
    pub function: NetFn,
    /// Command code within the network function.
    pub command: u8,
    /// Request or response.
    pub direction: Direction,
}

impl CommandDescriptor {
    /// Create a descriptor.
    pub const fn new(function: NetFn, command: u8, direction: Direction) -> Self {
        Self {
            function: function.request(),
            command,
            direction,
        }
    }

    /// Descriptor of a request.
    pub const fn request(function: NetFn, command: u8) -> Self {
        Self::new(function, command, Direction::Request)
    }

    /// Descriptor of a response.
    pub const fn response_of(function: NetFn, command: u8) -> Self {
        Self::new(function, command, Direction::Response)
    }

    /// The response paired with this command.
    pub const fn response(self) -> Self {
        Self::new(self.function, self.command, Direction::Response)
    }

    /// The request paired with this command.
    pub const fn request_side(self) -> Self {
        Self::new(self.function, self.command, Direction::Request)
    }

    /// Network function as it appears on the wire for this direction.
    #[inline]
    pub const fn wire_function(&self) -> u8 {
        match self.direction {
            Direction::Request => self.function.0,
            Direction::Response => self.function.0 | 1,
        }
    }

    /// Check if this describes a response.
    #[inline]
    pub fn is_response(&self) -> bool {
        self.direction == Direction::Response
    }

    /// Build a descriptor from an on-wire network function and command.
    pub const fn from_wire(function: u8, command: u8) -> Self {
        let direction = if function & 1 == 1 {
            Direction::Response
        } else {
            Direction::Request
        };
        Self::new(NetFn(function), command, direction)
    }
}

impl fmt::Display for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            Direction::Request => "request",
            Direction::Response => "response",
        };
        write!(
            f,
            "netfn {} cmd {:#04x} ({})",
            self.function, self.command, dir
        )
    }
}
