//! Transport module - the channel the transaction engine talks through.
//!
//! The physical binding (KCS, serial, LAN session) lives outside this crate.
//! Anything that can exchange one request frame for one raw response within
//! a timeout implements [`Transport`].
//!
//! Also provides test doubles:
//! - [`ScriptedTransport`] - replays a fixed sequence of outcomes
//! - [`FnTransport`] - answers each frame with a closure

mod scripted;

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use crate::protocol::RequestFrame;

pub use scripted::{FnTransport, ScriptedTransport, TransportCall};

/// Channel-level failure reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No response arrived within the timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The channel failed (I/O error, link down, session lost).
    #[error("{0}")]
    Failure(String),
}

/// Exchanges one request frame for one raw response.
///
/// Implementations must keep at most one frame in flight per device and
/// must return within `timeout`. The returned bytes start with the
/// completion code.
pub trait Transport: Send + Sync {
    /// Send a request and wait for its response.
    fn send_receive(&self, frame: &RequestFrame, timeout: Duration)
        -> Result<Bytes, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send_receive(
        &self,
        frame: &RequestFrame,
        timeout: Duration,
    ) -> Result<Bytes, TransportError> {
        (**self).send_receive(frame, timeout)
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send_receive(
        &self,
        frame: &RequestFrame,
        timeout: Duration,
    ) -> Result<Bytes, TransportError> {
        (**self).send_receive(frame, timeout)
    }
}
