//! Bridged messaging.
//!
//! A bridged call tunnels an inner request to a device that sits behind one
//! of the controller's channels. The inner request rides in the payload of
//! an outer [`SendMessage`]; the inner response is collected by polling with
//! outer [`GetMessage`] until a message with the call's address and
//! sequence number shows up.
//!
//! Failures are split in two:
//! - The outer carrier failed: [`ProtocolError::BridgeCarrierFailure`]
//! - The carrier worked but the device did not answer in time:
//!   [`ProtocolError::BridgeInnerFailure`]
//!
//! An inner response that arrives but cannot be decoded is not an error.
//! It becomes a [`Response`] with a locally synthesized completion code,
//! `0xC9` when it is too short to carry one and `0xCC` for any other fault.
//!
//! # Example
//!
//! ```
//! use bmc_wire::bridge::{Bridge, BridgeTarget};
//! use bmc_wire::commands::firmware::GetUpdateStatus;
//! use bmc_wire::config::BridgeConfig;
//! use bmc_wire::registry::CommandRegistry;
//! use bmc_wire::transaction::CallOptions;
//! use bmc_wire::transport::ScriptedTransport;
//!
//! let registry = CommandRegistry::with_defaults().unwrap();
//! let transport = ScriptedTransport::new();
//! transport
//!     .push_reply(&[0x00]) // send message accepted
//!     .push_reply(&[0x80]) // nothing queued yet
//!     .push_reply(&[0x00, 0x02, 0x72, 0x00, 0x09, 0x02, 0x00, 0x04, 100, 0x00, 0x00]);
//!
//! let bridge = Bridge::new();
//! let rsp = bridge
//!     .send_bridged(
//!         &registry,
//!         &transport,
//!         BridgeTarget::new(2, 0x72),
//!         &GetUpdateStatus,
//!         &CallOptions::default(),
//!         &BridgeConfig::default(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(rsp.into_bridged_result().unwrap().progress_percent, 100);
//! assert_eq!(transport.call_count(), 3);
//! ```

mod carrier;
mod sequence;

pub use carrier::{
    wrap_inner, GetMessage, GetMessageResponse, SendMessage, SendMessageResponse,
    CMD_GET_MESSAGE, CMD_SEND_MESSAGE, INNER_COMPLETION_OFFSET, INNER_RESPONSE_MIN_LEN,
    TRACK_REQUEST,
};
pub use sequence::{BridgeTarget, SequenceAllocator};

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

use crate::codec::{FieldLayout, Message, Request};
use crate::config::BridgeConfig;
use crate::error::{CarrierFault, CarrierStage, InnerFailure, ProtocolError, Result};
use crate::protocol::{CommandDescriptor, CompletionCode};
use crate::registry::CommandRegistry;
use crate::transaction::{execute, CallOptions, Response};
use crate::transport::Transport;

/// Progress of one bridged call, traced at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Sequence number leased, nothing sent yet.
    Idle,
    /// The carrier accepted the inner request.
    Sent,
    /// Polling the receive queue.
    AwaitingInner,
    /// A decodable inner response arrived.
    InnerReceived,
    /// The poll budget ran out.
    InnerTimedOut,
    /// An inner response arrived but could not be decoded.
    InnerMalformed,
    /// The call finished, successfully or not.
    Done,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BridgeState::Idle => "idle",
            BridgeState::Sent => "sent",
            BridgeState::AwaitingInner => "awaiting-inner",
            BridgeState::InnerReceived => "inner-received",
            BridgeState::InnerTimedOut => "inner-timed-out",
            BridgeState::InnerMalformed => "inner-malformed",
            BridgeState::Done => "done",
        };
        f.write_str(s)
    }
}

struct StateTrace {
    target: BridgeTarget,
    sequence: u8,
    state: BridgeState,
}

impl StateTrace {
    fn new(target: BridgeTarget, sequence: u8) -> Self {
        Self {
            target,
            sequence,
            state: BridgeState::Idle,
        }
    }

    fn enter(&mut self, next: BridgeState) {
        tracing::debug!(
            "Bridge {} seq {}: {} -> {}",
            self.target,
            self.sequence,
            self.state,
            next
        );
        self.state = next;
    }

    fn fail(&mut self, error: ProtocolError) -> ProtocolError {
        self.enter(BridgeState::Done);
        error
    }
}

type MailKey = (BridgeTarget, u8);

#[derive(Debug, Default)]
struct Shared {
    sequences: HashMap<BridgeTarget, SequenceAllocator>,
    mailbox: HashMap<MailKey, Bytes>,
}

/// Sequence numbers and parked responses shared by all bridged calls of a
/// client.
#[derive(Debug, Default)]
pub struct Bridge {
    shared: Mutex<Shared>,
}

/// A sequence number held for one bridged call.
///
/// Dropping the lease frees the number and discards any response parked
/// for it.
#[derive(Debug)]
pub struct SequenceLease<'a> {
    bridge: &'a Bridge,
    target: BridgeTarget,
    sequence: u8,
}

impl SequenceLease<'_> {
    /// The leased sequence number.
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Target the number is leased for.
    pub fn target(&self) -> BridgeTarget {
        self.target
    }
}

impl Drop for SequenceLease<'_> {
    fn drop(&mut self) {
        self.bridge.release(self.target, self.sequence);
    }
}

impl Bridge {
    /// Create an empty bridge.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve the next free sequence number for `target`.
    pub fn lease(&self, target: BridgeTarget) -> Result<SequenceLease<'_>> {
        let sequence = self
            .lock()
            .sequences
            .entry(target)
            .or_default()
            .allocate()
            .ok_or(ProtocolError::SequenceExhausted {
                channel: target.channel,
                device_id: target.device_id,
            })?;

        Ok(SequenceLease {
            bridge: self,
            target,
            sequence,
        })
    }

    /// Sequence numbers currently in flight for `target`.
    pub fn in_flight(&self, target: BridgeTarget) -> usize {
        self.lock()
            .sequences
            .get(&target)
            .map_or(0, SequenceAllocator::in_flight)
    }

    /// Responses parked for calls that have not collected them yet.
    pub fn parked(&self) -> usize {
        self.lock().mailbox.len()
    }

    fn release(&self, target: BridgeTarget, sequence: u8) {
        let mut shared = self.lock();
        if let Some(alloc) = shared.sequences.get_mut(&target) {
            alloc.release(sequence);
            alloc.compact();
        }
        shared.mailbox.remove(&(target, sequence));
    }

    fn take_parked(&self, target: BridgeTarget, sequence: u8) -> Option<Bytes> {
        self.lock().mailbox.remove(&(target, sequence))
    }

    /// Hand a message to the call that owns its sequence number, if any.
    fn park(&self, msg: GetMessageResponse) {
        let target = msg.target();
        let mut shared = self.lock();
        let owned = shared
            .sequences
            .get(&target)
            .map_or(false, |alloc| alloc.is_in_flight(msg.sequence));

        if owned {
            tracing::debug!("Parking response for {} seq {}", target, msg.sequence);
            shared.mailbox.insert((target, msg.sequence), msg.message);
        } else {
            tracing::warn!(
                "Discarding unsolicited message from {} seq {}",
                target,
                msg.sequence
            );
        }
    }

    /// Run one bridged transaction.
    ///
    /// `options` applies to the outer send; each poll uses
    /// `config.poll_timeout()` with the same retry policy.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::BridgeCarrierFailure`] if an outer command fails
    /// - [`ProtocolError::BridgeInnerFailure`] if the poll budget runs out
    /// - [`ProtocolError::SequenceExhausted`] if no sequence number is free
    /// - [`ProtocolError::UnknownCommand`] if a carrier or inner type is not registered
    pub fn send_bridged<R, T>(
        &self,
        registry: &CommandRegistry,
        transport: &T,
        target: BridgeTarget,
        inner: &R,
        options: &CallOptions,
        config: &BridgeConfig,
    ) -> Result<Response<R::Response>>
    where
        R: Request,
        T: Transport + ?Sized,
    {
        let request_layout = registry.layout_of::<R>()?;
        let response_layout = registry.layout_of::<R::Response>()?;
        let payload = inner.encode_with(&request_layout)?;

        let lease = self.lease(target)?;
        let sequence = lease.sequence();
        let mut trace = StateTrace::new(target, sequence);

        let send = SendMessage::new(target, sequence, wrap_inner(R::DESCRIPTOR, &payload));
        let ack = execute(registry, transport, &send, options)
            .map_err(|err| trace.fail(carrier_error(CarrierStage::Send, err)))?;
        if !ack.completion().is_success() {
            return Err(trace.fail(carrier_completion(CarrierStage::Send, ack.completion())));
        }
        trace.enter(BridgeState::Sent);

        let poll_options = options.with_timeout(config.poll_timeout());
        trace.enter(BridgeState::AwaitingInner);

        let mut polls = 0;
        let message = loop {
            if let Some(message) = self.take_parked(target, sequence) {
                break Some(message);
            }
            if polls >= config.max_polls {
                break None;
            }
            polls += 1;

            let rsp = execute(registry, transport, &GetMessage, &poll_options)
                .map_err(|err| trace.fail(carrier_error(CarrierStage::Receive, err)))?;
            let code = rsp.completion();
            if code == CompletionCode::NO_MESSAGE {
                continue;
            }
            if !code.is_success() {
                return Err(trace.fail(carrier_completion(CarrierStage::Receive, code)));
            }

            let msg = rsp
                .into_result()
                .map_err(|err| trace.fail(carrier_error(CarrierStage::Receive, err)))?;
            if msg.target() == target && msg.sequence == sequence {
                break Some(msg.message);
            }
            self.park(msg);
        };

        let message = match message {
            Some(message) => message,
            None => {
                trace.enter(BridgeState::InnerTimedOut);
                return Err(trace.fail(ProtocolError::BridgeInnerFailure(InnerFailure::TimedOut {
                    polls,
                })));
            }
        };

        let response = decode_inner::<R::Response>(&response_layout, message);
        trace.enter(if response.is_synthesized() {
            BridgeState::InnerMalformed
        } else {
            BridgeState::InnerReceived
        });
        trace.enter(BridgeState::Done);
        Ok(response)
    }
}

fn carrier_completion(stage: CarrierStage, code: CompletionCode) -> ProtocolError {
    ProtocolError::BridgeCarrierFailure {
        stage,
        fault: CarrierFault::Completion(code),
    }
}

/// Reclassify an outer transaction error as a carrier failure.
fn carrier_error(stage: CarrierStage, err: ProtocolError) -> ProtocolError {
    let fault = match &err {
        ProtocolError::TransportTimeout { .. } => Some(CarrierFault::Timeout),
        ProtocolError::TransportFailure { reason, .. } => {
            Some(CarrierFault::Transport(reason.clone()))
        }
        ProtocolError::MalformedMessage { .. } => Some(CarrierFault::Malformed(err.to_string())),
        _ => None,
    };
    match fault {
        Some(fault) => ProtocolError::BridgeCarrierFailure { stage, fault },
        None => err,
    }
}

/// Classify a tunneled `[function, command, completion, data...]` response.
fn decode_inner<M: Message>(layout: &FieldLayout, message: Bytes) -> Response<M> {
    if message.len() < INNER_RESPONSE_MIN_LEN {
        tracing::warn!(
            "Bridged {} response too short ({} bytes)",
            M::DESCRIPTOR,
            message.len()
        );
        return Response::synthesized(M::DESCRIPTOR, CompletionCode::PARAMETER_OUT_OF_RANGE);
    }

    let echoed = CommandDescriptor::from_wire(message[0], message[1]);
    if echoed != M::DESCRIPTOR {
        tracing::warn!("Bridged {} answered as {}", M::DESCRIPTOR, echoed);
        return Response::synthesized(M::DESCRIPTOR, CompletionCode::ILLEGAL_PARAMETER);
    }

    let completion = CompletionCode(message[INNER_COMPLETION_OFFSET]);
    let payload = message.slice(INNER_RESPONSE_MIN_LEN..);
    if !completion.is_success() {
        return Response::failure(M::DESCRIPTOR, completion, payload);
    }

    match M::decode_with(layout, &payload) {
        Ok(body) => Response::success(M::DESCRIPTOR, body, payload),
        Err(err) => {
            tracing::warn!("Bridged {} undecodable: {}", M::DESCRIPTOR, err);
            Response::synthesized(M::DESCRIPTOR, CompletionCode::ILLEGAL_PARAMETER)
        }
    }
}
