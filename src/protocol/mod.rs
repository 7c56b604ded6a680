//! Protocol module - command identity, completion codes and framing.
//!
//! This module implements the pieces shared by every message:
//! - Command descriptors (network function, command, direction)
//! - Completion codes
//! - 2-byte header encoding/decoding
//! - Request/response frames handed to and from the transport

mod completion;
mod descriptor;
mod frame;
mod wire_format;

pub use completion::CompletionCode;
pub use descriptor::{CommandDescriptor, Direction, NetFn};
pub use frame::{RequestFrame, ResponseFrame};
pub use wire_format::{Header, DEFAULT_LUN, HEADER_SIZE, MAX_LUN, MAX_PAYLOAD_SIZE};
