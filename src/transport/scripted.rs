//! In-memory transports for tests and simulations.
//!
//! # Example
//!
//! ```
//! use bmc_wire::transport::{ScriptedTransport, Transport, TransportError};
//! use bmc_wire::protocol::{CommandDescriptor, NetFn, RequestFrame};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let transport = ScriptedTransport::new();
//! transport.push_timeout();
//! transport.push_reply(&[0x00, 0x11]);
//!
//! let frame = RequestFrame::new(CommandDescriptor::request(NetFn::APP, 0x01), Bytes::new());
//! let timeout = Duration::from_millis(10);
//!
//! assert!(matches!(
//!     transport.send_receive(&frame, timeout),
//!     Err(TransportError::Timeout(_))
//! ));
//! assert_eq!(&transport.send_receive(&frame, timeout).unwrap()[..], &[0x00, 0x11]);
//! assert_eq!(transport.call_count(), 2);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;

use super::{Transport, TransportError};
use crate::protocol::RequestFrame;

/// One recorded exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportCall {
    /// Frame the engine sent.
    pub frame: RequestFrame,
    /// Timeout it was sent with.
    pub timeout: Duration,
}

#[derive(Debug)]
struct Script {
    outcomes: VecDeque<Result<Bytes, TransportError>>,
    calls: Vec<TransportCall>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Replays queued outcomes in order and records every frame sent.
///
/// Once the queue is empty every call fails with a transport failure.
#[derive(Debug)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    /// Create a transport with an empty script.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                outcomes: VecDeque::new(),
                calls: Vec::new(),
            }),
        }
    }

    /// Queue a raw response (completion code first).
    pub fn push_reply(&self, raw: &[u8]) -> &Self {
        lock(&self.script)
            .outcomes
            .push_back(Ok(Bytes::copy_from_slice(raw)));
        self
    }

    /// Queue a timeout.
    pub fn push_timeout(&self) -> &Self {
        lock(&self.script)
            .outcomes
            .push_back(Err(TransportError::Timeout(Duration::ZERO)));
        self
    }

    /// Queue `n` timeouts.
    pub fn push_timeouts(&self, n: usize) -> &Self {
        for _ in 0..n {
            self.push_timeout();
        }
        self
    }

    /// Queue a channel failure.
    pub fn push_failure(&self, reason: &str) -> &Self {
        lock(&self.script)
            .outcomes
            .push_back(Err(TransportError::Failure(reason.to_string())));
        self
    }

    /// Number of exchanges attempted so far.
    pub fn call_count(&self) -> usize {
        lock(&self.script).calls.len()
    }

    /// Copy of every recorded exchange.
    pub fn calls(&self) -> Vec<TransportCall> {
        lock(&self.script).calls.clone()
    }

    /// Number of outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.script).outcomes.len()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ScriptedTransport {
    fn send_receive(
        &self,
        frame: &RequestFrame,
        timeout: Duration,
    ) -> Result<Bytes, TransportError> {
        let mut script = lock(&self.script);
        script.calls.push(TransportCall {
            frame: frame.clone(),
            timeout,
        });
        script
            .outcomes
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Failure("script exhausted".to_string())))
    }
}

/// Transport that answers each frame with a closure.
///
/// Handy for simulating a device whose replies depend on the request, such
/// as echoing a bridge sequence number.
pub struct FnTransport<F> {
    handler: F,
}

impl<F> FnTransport<F>
where
    F: Fn(&RequestFrame) -> Result<Bytes, TransportError> + Send + Sync,
{
    /// Wrap a handler.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> fmt::Debug for FnTransport<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransport").finish_non_exhaustive()
    }
}

impl<F> Transport for FnTransport<F>
where
    F: Fn(&RequestFrame) -> Result<Bytes, TransportError> + Send + Sync,
{
    fn send_receive(
        &self,
        frame: &RequestFrame,
        _timeout: Duration,
    ) -> Result<Bytes, TransportError> {
        (self.handler)(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CommandDescriptor, NetFn};

    fn frame() -> RequestFrame {
        RequestFrame::new(CommandDescriptor::request(NetFn::APP, 0x01), Bytes::new())
    }

    #[test]
    fn test_replays_in_order() {
        let t = ScriptedTransport::new();
        t.push_reply(&[0x00]).push_failure("link down").push_timeout();

        let timeout = Duration::from_millis(5);
        assert!(t.send_receive(&frame(), timeout).is_ok());
        assert_eq!(
            t.send_receive(&frame(), timeout),
            Err(TransportError::Failure("link down".to_string()))
        );
        assert!(matches!(
            t.send_receive(&frame(), timeout),
            Err(TransportError::Timeout(_))
        ));
        assert_eq!(t.remaining(), 0);
    }

    #[test]
    fn test_exhausted_script_fails() {
        let t = ScriptedTransport::new();
        assert!(matches!(
            t.send_receive(&frame(), Duration::ZERO),
            Err(TransportError::Failure(_))
        ));
    }

    #[test]
    fn test_records_calls() {
        let t = ScriptedTransport::new();
        t.push_reply(&[0x00]);
        t.send_receive(&frame(), Duration::from_millis(7)).unwrap();

        let calls = t.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].frame, frame());
        assert_eq!(calls[0].timeout, Duration::from_millis(7));
    }

    #[test]
    fn test_fn_transport() {
        let t = FnTransport::new(|f: &RequestFrame| {
            Ok(Bytes::from(vec![0x00, f.descriptor.command]))
        });
        let raw = t.send_receive(&frame(), Duration::ZERO).unwrap();
        assert_eq!(&raw[..], &[0x00, 0x01]);
    }
}
