//! Wire format encoding and decoding.
//!
//! Implements the 2-byte message header that precedes every payload:
//! ```text
//! ┌───────────────────┬──────────┐
//! │ NetFn │ LUN       │ Command  │
//! │ 6 bits│ 2 bits    │ 1 byte   │
//! └───────────────────┴──────────┘
//! ```
//!
//! Payload integers are little-endian; see [`crate::codec`].

use crate::error::{ProtocolError, Result};

use super::descriptor::{CommandDescriptor, NetFn};

/// Header size in bytes (fixed, exactly 2).
pub const HEADER_SIZE: usize = 2;

/// Largest payload a single frame may carry.
pub const MAX_PAYLOAD_SIZE: usize = 255;

/// Default logical unit number.
pub const DEFAULT_LUN: u8 = 0;

/// Highest logical unit number (2 bits).
pub const MAX_LUN: u8 = 0b11;

/// Decoded message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Network function as sent on the wire (odd for responses).
    pub function: u8,
    /// Logical unit number.
    pub lun: u8,
    /// Command code.
    pub command: u8,
}

impl Header {
    /// Create a new header.
    pub fn new(function: u8, lun: u8, command: u8) -> Self {
        Self {
            function,
            lun,
            command,
        }
    }

    /// Header for a descriptor on the default LUN.
    pub fn for_command(descriptor: CommandDescriptor) -> Self {
        Self::new(descriptor.wire_function(), DEFAULT_LUN, descriptor.command)
    }

    /// Encode header to bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use bmc_wire::protocol::Header;
    ///
    /// let header = Header::new(0x06, 0, 0x01);
    /// assert_eq!(header.encode(), [0x18, 0x01]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// Fields are not range checked here; see [`Header::validate`].
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (2 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0] = (self.function << 2) | (self.lun & MAX_LUN);
        buf[1] = self.command;
    }

    /// Decode header from bytes.
    ///
    /// Returns `None` if buffer is too short.
    ///
    /// # Example
    ///
    /// ```
    /// use bmc_wire::protocol::Header;
    ///
    /// let header = Header::decode(&[0x1C, 0x01]).unwrap();
    /// assert_eq!(header.function, 0x07);
    /// assert_eq!(header.command, 0x01);
    /// ```
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            function: buf[0] >> 2,
            lun: buf[0] & MAX_LUN,
            command: buf[1],
        })
    }

    /// Validate the header fields fit their bit widths.
    pub fn validate(&self) -> Result<()> {
        if self.function > NetFn::MAX {
            return Err(ProtocolError::Codec(format!(
                "Network function {:#04x} exceeds 6 bits",
                self.function
            )));
        }

        if self.lun > MAX_LUN {
            return Err(ProtocolError::Codec(format!(
                "LUN {} exceeds 2 bits",
                self.lun
            )));
        }

        Ok(())
    }

    /// Descriptor named by this header.
    #[inline]
    pub fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::from_wire(self.function, self.command)
    }

    /// Check if this is a response.
    #[inline]
    pub fn is_response(&self) -> bool {
        self.function & 1 == 1
    }
}
