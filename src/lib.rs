//! # bmc-wire
//!
//! Typed request/response marshaling for a baseboard management protocol.
//!
//! Commands are identified by a network function and command code. Each
//! command type declares its payload as a static table of fields, and the
//! crate turns those tables into bytes and back, runs transactions with
//! retry over a pluggable transport, and tunnels requests to devices
//! behind a channel (bridged messaging).
//!
//! ## Layers
//!
//! - **Codec**: field layouts (byte, fixed bytes, little-endian int, bit
//!   field, trailing bytes) and the [`codec::Message`] trait
//! - **Registry**: descriptor to type mapping, built once and then immutable
//! - **Transaction**: encode, send, retry on transport failure, classify
//! - **Bridge**: outer send/get message carriers around an inner request
//! - **Transport**: the `send_receive` contract plus in-memory doubles
//!
//! ## Example
//!
//! ```
//! use bmc_wire::commands::app::GetDeviceId;
//! use bmc_wire::transport::ScriptedTransport;
//! use bmc_wire::Client;
//!
//! let transport = ScriptedTransport::new();
//! transport.push_reply(&[
//!     0x00, // completion
//!     0x20, 0x81, 0x02, 0x47, 0x02, 0xBF, 0x57, 0x01, 0x00, 0x3E, 0x0B,
//! ]);
//!
//! let client = Client::builder().build(transport).unwrap();
//! let id = client.send(&GetDeviceId).unwrap();
//!
//! assert_eq!(id.firmware_version(), "2.47");
//! assert_eq!(id.manufacturer_id, 0x157);
//! ```

pub mod bridge;
pub mod codec;
pub mod commands;
pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod transaction;
pub mod transport;

mod client;

pub use client::{Client, ClientBuilder};
pub use error::{ProtocolError, Result};
pub use transaction::{CallOptions, Response};
