//! Request and response frames.
//!
//! A [`RequestFrame`] is what the transaction engine hands to the transport:
//! a header plus the encoded request payload. The transport answers with raw
//! bytes that start with the completion code; [`ResponseFrame`] splits them.
//! Payloads use `bytes::Bytes` so slicing never copies.
//!
//! # Example
//!
//! ```
//! use bmc_wire::protocol::{CommandDescriptor, NetFn, RequestFrame, ResponseFrame};
//! use bytes::Bytes;
//!
//! let frame = RequestFrame::new(
//!     CommandDescriptor::request(NetFn::STORAGE, 0x42),
//!     Bytes::from_static(&[0x07]),
//! );
//! assert_eq!(frame.to_wire(), vec![0x28, 0x42, 0x07]);
//!
//! let rsp = ResponseFrame::parse(Bytes::from_static(&[0x00, 0x11, 0x22])).unwrap();
//! assert!(rsp.completion().is_success());
//! assert_eq!(rsp.payload(), &[0x11, 0x22]);
//! ```

use bytes::Bytes;

use super::completion::CompletionCode;
use super::descriptor::CommandDescriptor;
use super::wire_format::{Header, HEADER_SIZE};

/// An outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    /// Descriptor of the request.
    pub descriptor: CommandDescriptor,
    /// Logical unit number.
    pub lun: u8,
    /// Encoded request payload.
    pub payload: Bytes,
}

impl RequestFrame {
    /// Create a frame on the default LUN.
    pub fn new(descriptor: CommandDescriptor, payload: Bytes) -> Self {
        Self {
            descriptor,
            lun: 0,
            payload,
        }
    }

    /// Set the logical unit number.
    pub fn with_lun(mut self, lun: u8) -> Self {
        self.lun = lun;
        self
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Wire header for this frame.
    pub fn header(&self) -> Header {
        Header::new(self.descriptor.wire_function(), self.lun, self.descriptor.command)
    }

    /// Flatten to `[netfn/lun, command, payload...]`.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        buf.extend_from_slice(&self.header().encode());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Parse a flattened frame.
    ///
    /// Returns `None` if the buffer cannot hold a header.
    pub fn from_wire(buf: &Bytes) -> Option<Self> {
        let header = Header::decode(buf)?;
        Some(Self {
            descriptor: header.descriptor(),
            lun: header.lun,
            payload: buf.slice(HEADER_SIZE..),
        })
    }
}

/// An inbound response: completion code plus the data after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    completion: CompletionCode,
    payload: Bytes,
}

impl ResponseFrame {
    /// Create a response frame.
    pub fn new(completion: CompletionCode, payload: Bytes) -> Self {
        Self {
            completion,
            payload,
        }
    }

    /// Split raw response bytes.
    ///
    /// Returns `None` for an empty buffer (no completion code).
    pub fn parse(raw: Bytes) -> Option<Self> {
        let &first = raw.first()?;
        Some(Self {
            completion: CompletionCode(first),
            payload: raw.slice(1..),
        })
    }

    /// The completion code.
    #[inline]
    pub fn completion(&self) -> CompletionCode {
        self.completion
    }

    /// Data after the completion code.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Data after the completion code (cheap clone).
    #[inline]
    pub fn payload_bytes(&self) -> Bytes {
        self.payload.clone()
    }

    /// Re-assemble `[completion, payload...]`.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + self.payload.len());
        buf.push(self.completion.0);
        buf.extend_from_slice(&self.payload);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::NetFn;

    #[test]
    fn test_request_frame_creation() {
        let d = CommandDescriptor::request(NetFn::APP, 0x01);
        let frame = RequestFrame::new(d, Bytes::from_static(b"\x01\x02"));

        assert_eq!(frame.descriptor, d);
        assert_eq!(frame.lun, 0);
        assert_eq!(frame.payload(), b"\x01\x02");
        assert_eq!(frame.payload_len(), 2);
    }

    #[test]
    fn test_request_frame_wire_roundtrip() {
        let d = CommandDescriptor::request(NetFn::OEM_GROUP, 0x10);
        let frame = RequestFrame::new(d, Bytes::from_static(&[0xAA, 0xBB])).with_lun(1);

        let wire = Bytes::from(frame.to_wire());
        let parsed = RequestFrame::from_wire(&wire).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_request_frame_empty_payload() {
        let d = CommandDescriptor::request(NetFn::APP, 0x33);
        let frame = RequestFrame::new(d, Bytes::new());
        assert_eq!(frame.to_wire().len(), HEADER_SIZE);
    }

    #[test]
    fn test_from_wire_too_short() {
        assert!(RequestFrame::from_wire(&Bytes::from_static(&[0x18])).is_none());
    }

    #[test]
    fn test_response_frame_parse() {
        let rsp = ResponseFrame::parse(Bytes::from_static(&[0xC1])).unwrap();
        assert_eq!(rsp.completion(), CompletionCode::INVALID_COMMAND);
        assert!(rsp.payload().is_empty());
    }

    #[test]
    fn test_response_frame_parse_empty() {
        assert!(ResponseFrame::parse(Bytes::new()).is_none());
    }

    #[test]
    fn test_response_payload_zero_copy() {
        let raw = Bytes::from_static(&[0x00, 1, 2, 3]);
        let rsp = ResponseFrame::parse(raw.clone()).unwrap();

        assert_eq!(rsp.payload_bytes().as_ptr(), raw[1..].as_ptr());
        assert_eq!(rsp.to_wire(), raw.to_vec());
    }
}
