//! Completion codes.
//!
//! Every response starts with a one-byte completion code. `0x00` is success;
//! the generic failure codes live in `0xC0..=0xFF`, `0x01..=0x7E` are
//! device-specific (OEM) and `0x80..=0xBE` are command-specific.

use std::fmt;

/// Single-byte response status.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompletionCode(pub u8);

impl CompletionCode {
    /// Command completed normally.
    pub const SUCCESS: CompletionCode = CompletionCode(0x00);
    /// Command-specific: no message queued (used by "get message").
    pub const NO_MESSAGE: CompletionCode = CompletionCode(0x80);
    /// Node busy.
    pub const NODE_BUSY: CompletionCode = CompletionCode(0xC0);
    /// Invalid or unsupported command.
    pub const INVALID_COMMAND: CompletionCode = CompletionCode(0xC1);
    /// Command invalid for the given LUN.
    pub const INVALID_FOR_LUN: CompletionCode = CompletionCode(0xC2);
    /// Timeout while processing the command.
    pub const TIMEOUT: CompletionCode = CompletionCode(0xC3);
    /// Out of space.
    pub const OUT_OF_SPACE: CompletionCode = CompletionCode(0xC4);
    /// Request data truncated.
    pub const REQUEST_TRUNCATED: CompletionCode = CompletionCode(0xC6);
    /// Request data length invalid.
    pub const INVALID_LENGTH: CompletionCode = CompletionCode(0xC7);
    /// Request data field length limit exceeded.
    pub const LENGTH_EXCEEDED: CompletionCode = CompletionCode(0xC8);
    /// Parameter out of range.
    pub const PARAMETER_OUT_OF_RANGE: CompletionCode = CompletionCode(0xC9);
    /// Cannot return the requested number of bytes.
    pub const CANNOT_RETURN_BYTES: CompletionCode = CompletionCode(0xCA);
    /// Requested sensor, data or record not present.
    pub const NOT_PRESENT: CompletionCode = CompletionCode(0xCB);
    /// Invalid data field in request.
    pub const ILLEGAL_PARAMETER: CompletionCode = CompletionCode(0xCC);
    /// Command illegal for the specified sensor or record type.
    pub const ILLEGAL_FOR_TYPE: CompletionCode = CompletionCode(0xCD);
    /// Command response could not be provided.
    pub const RESPONSE_UNAVAILABLE: CompletionCode = CompletionCode(0xCE);
    /// Cannot execute duplicated request.
    pub const DUPLICATED_REQUEST: CompletionCode = CompletionCode(0xCF);
    /// Destination unavailable.
    pub const DESTINATION_UNAVAILABLE: CompletionCode = CompletionCode(0xD3);
    /// Insufficient privilege level.
    pub const INSUFFICIENT_PRIVILEGE: CompletionCode = CompletionCode(0xD4);
    /// Command not supported in present state.
    pub const NOT_SUPPORTED_IN_STATE: CompletionCode = CompletionCode(0xD5);
    /// Unspecified error.
    pub const UNSPECIFIED: CompletionCode = CompletionCode(0xFF);

    /// Check for success.
    #[inline]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Raw byte value.
    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Short description for the generic codes.
    pub fn description(self) -> &'static str {
        match self.0 {
            0x00 => "success",
            0x80 => "no message available",
            0xC0 => "node busy",
            0xC1 => "invalid command",
            0xC2 => "invalid for LUN",
            0xC3 => "timeout",
            0xC4 => "out of space",
            0xC5 => "reservation cancelled",
            0xC6 => "request data truncated",
            0xC7 => "request data length invalid",
            0xC8 => "request data length exceeded",
            0xC9 => "parameter out of range",
            0xCA => "cannot return requested bytes",
            0xCB => "not present",
            0xCC => "illegal parameter",
            0xCD => "illegal for type",
            0xCE => "response unavailable",
            0xCF => "duplicated request",
            0xD0 => "SDR repository in update mode",
            0xD1 => "firmware in update mode",
            0xD2 => "initialization in progress",
            0xD3 => "destination unavailable",
            0xD4 => "insufficient privilege",
            0xD5 => "not supported in present state",
            0xD6 => "sub-function disabled",
            0xFF => "unspecified error",
            0x01..=0x7E => "device-specific",
            0x81..=0xBE => "command-specific",
            _ => "reserved",
        }
    }
}

impl From<u8> for CompletionCode {
    fn from(b: u8) -> Self {
        CompletionCode(b)
    }
}

impl fmt::Debug for CompletionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompletionCode({:#04x})", self.0)
    }
}

impl fmt::Display for CompletionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x} ({})", self.0, self.description())
    }
}
