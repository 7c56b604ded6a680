//! Transaction engine: one request, one classified response.
//!
//! [`execute`] drives a single exchange:
//! 1. Encode the request with its registered layout
//! 2. Send through the transport, retrying transport failures per policy
//! 3. Split the completion code off the raw response
//! 4. Non-zero completion: return it without decoding (never retried)
//! 5. Zero completion: decode the body; a short body is `MalformedMessage`
//!
//! The frame is built once and sent unchanged on every attempt. All state
//! for a transaction lives on the stack of the call.
//!
//! # Example
//!
//! ```
//! use bmc_wire::commands::app::GetSelfTestResults;
//! use bmc_wire::registry::CommandRegistry;
//! use bmc_wire::transaction::{execute, CallOptions};
//! use bmc_wire::transport::ScriptedTransport;
//!
//! let registry = CommandRegistry::with_defaults().unwrap();
//! let transport = ScriptedTransport::new();
//! transport.push_timeout().push_reply(&[0x00, 0x55, 0x00]);
//!
//! let rsp = execute(&registry, &transport, &GetSelfTestResults, &CallOptions::default()).unwrap();
//! assert_eq!(rsp.into_result().unwrap().result, 0x55);
//! assert_eq!(transport.call_count(), 2);
//! ```

use std::time::Duration;

use bytes::Bytes;

use crate::codec::{DynMessage, FieldLayout, Message, Request};
use crate::config::{ClientConfig, RetryPolicy};
use crate::error::{InnerFailure, ProtocolError, Result};
use crate::protocol::{
    CommandDescriptor, CompletionCode, RequestFrame, ResponseFrame, MAX_PAYLOAD_SIZE,
};
use crate::registry::CommandRegistry;
use crate::transport::{Transport, TransportError};

/// Per-call settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOptions {
    /// Timeout handed to the transport for each attempt.
    pub timeout: Duration,
    /// Which transport failures to retry.
    pub retry: RetryPolicy,
}

impl CallOptions {
    /// Create options.
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Self {
        Self { timeout, retry }
    }

    /// Same options with a different timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Same options with a different retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for CallOptions {
    fn from(config: &ClientConfig) -> Self {
        Self::new(config.timeout(), config.retry)
    }
}

/// A classified response.
///
/// The body is present only when the completion code is success. A
/// response can also be synthesized locally by the bridge when a bridged
/// device sends content that cannot be decoded; see
/// [`Response::is_synthesized`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<T> {
    descriptor: CommandDescriptor,
    completion: CompletionCode,
    body: Option<T>,
    payload: Bytes,
    synthesized: bool,
}

impl<T> Response<T> {
    /// Successful response with a decoded body.
    pub fn success(descriptor: CommandDescriptor, body: T, payload: Bytes) -> Self {
        Self {
            descriptor,
            completion: CompletionCode::SUCCESS,
            body: Some(body),
            payload,
            synthesized: false,
        }
    }

    /// Non-success response carrying only its completion code.
    pub fn failure(descriptor: CommandDescriptor, completion: CompletionCode, payload: Bytes) -> Self {
        Self {
            descriptor,
            completion,
            body: None,
            payload,
            synthesized: false,
        }
    }

    /// Non-success response produced locally rather than by the device.
    pub fn synthesized(descriptor: CommandDescriptor, completion: CompletionCode) -> Self {
        Self {
            descriptor,
            completion,
            body: None,
            payload: Bytes::new(),
            synthesized: true,
        }
    }

    /// Descriptor of the response type.
    #[inline]
    pub fn descriptor(&self) -> CommandDescriptor {
        self.descriptor
    }

    /// The completion code.
    #[inline]
    pub fn completion(&self) -> CompletionCode {
        self.completion
    }

    /// Check for success.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.body.is_some()
    }

    /// True if the completion code was produced locally.
    #[inline]
    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }

    /// Decoded body, present only on success.
    #[inline]
    pub fn body(&self) -> Option<&T> {
        self.body.as_ref()
    }

    /// Raw bytes after the completion code.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take the body, or fail with [`ProtocolError::NonSuccessCompletion`].
    pub fn into_result(self) -> Result<T> {
        match self.body {
            Some(body) => Ok(body),
            None => Err(ProtocolError::NonSuccessCompletion {
                command: self.descriptor,
                code: self.completion,
            }),
        }
    }

    /// Take the body of a bridged response, or fail with
    /// [`ProtocolError::BridgeInnerFailure`].
    pub fn into_bridged_result(self) -> Result<T> {
        match self.body {
            Some(body) => Ok(body),
            None => Err(ProtocolError::BridgeInnerFailure(InnerFailure::Completion(
                self.completion,
            ))),
        }
    }

    /// Transform the body.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        Response {
            descriptor: self.descriptor,
            completion: self.completion,
            body: self.body.map(f),
            payload: self.payload,
            synthesized: self.synthesized,
        }
    }
}

/// Run one typed transaction.
///
/// # Errors
///
/// - [`ProtocolError::UnknownCommand`] if the request or response type is not registered
/// - [`ProtocolError::TransportTimeout`] / [`ProtocolError::TransportFailure`] once retries run out
/// - [`ProtocolError::MalformedMessage`] if a success response is too short
///
/// A non-zero completion code is not an error here; see [`Response::into_result`].
pub fn execute<R, T>(
    registry: &CommandRegistry,
    transport: &T,
    request: &R,
    options: &CallOptions,
) -> Result<Response<R::Response>>
where
    R: Request,
    T: Transport + ?Sized,
{
    let request_layout = registry.layout_of::<R>()?;
    let response_layout = registry.layout_of::<R::Response>()?;

    let payload = request.encode_with(&request_layout)?;
    let frame = build_frame(R::DESCRIPTOR, payload)?;

    let raw = exchange(transport, &frame, options)?;
    classify::<R::Response>(&response_layout, raw)
}

/// Run one transaction for a message known only through the registry.
///
/// The response is decoded through the registry entry of the request's
/// paired response descriptor.
pub fn execute_dyn<T>(
    registry: &CommandRegistry,
    transport: &T,
    request: &dyn DynMessage,
    options: &CallOptions,
) -> Result<Response<Box<dyn DynMessage>>>
where
    T: Transport + ?Sized,
{
    let descriptor = request.descriptor();
    registry.lookup(descriptor)?;
    let response_entry = registry.lookup(descriptor.response())?;

    let frame = build_frame(descriptor, request.encode_payload()?)?;
    let raw = exchange(transport, &frame, options)?;

    let rsp = split_completion(response_entry.descriptor, raw)?;
    if !rsp.completion().is_success() {
        return Ok(Response::failure(
            response_entry.descriptor,
            rsp.completion(),
            rsp.payload_bytes(),
        ));
    }

    let payload = rsp.payload_bytes();
    let body = response_entry.decode(&payload)?;
    Ok(Response::success(response_entry.descriptor, body, payload))
}

pub(crate) fn build_frame(descriptor: CommandDescriptor, payload: Bytes) -> Result<RequestFrame> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::Codec(format!(
            "{} payload of {} bytes exceeds {}",
            descriptor,
            payload.len(),
            MAX_PAYLOAD_SIZE
        )));
    }
    let frame = RequestFrame::new(descriptor, payload);
    frame.header().validate()?;
    Ok(frame)
}

/// Send a frame, retrying transport failures while the policy allows.
pub(crate) fn exchange<T>(transport: &T, frame: &RequestFrame, options: &CallOptions) -> Result<Bytes>
where
    T: Transport + ?Sized,
{
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        tracing::debug!(
            "Sending {} ({} bytes), attempt {}",
            frame.descriptor,
            frame.payload_len(),
            attempt
        );

        match transport.send_receive(frame, options.timeout) {
            Ok(raw) => return Ok(raw),
            Err(err) if options.retry.permits(attempt - 1, &err) => {
                tracing::warn!(
                    "Transport error for {} on attempt {}, retrying: {}",
                    frame.descriptor,
                    attempt,
                    err
                );
            }
            Err(TransportError::Timeout(_)) => {
                return Err(ProtocolError::TransportTimeout { attempts: attempt });
            }
            Err(TransportError::Failure(reason)) => {
                return Err(ProtocolError::TransportFailure {
                    attempts: attempt,
                    reason,
                });
            }
        }
    }
}

fn split_completion(descriptor: CommandDescriptor, raw: Bytes) -> Result<ResponseFrame> {
    ResponseFrame::parse(raw).ok_or(ProtocolError::MalformedMessage {
        command: descriptor,
        expected: 1,
        actual: 0,
    })
}

/// Classify raw response bytes for a typed response.
pub(crate) fn classify<M: Message>(layout: &FieldLayout, raw: Bytes) -> Result<Response<M>> {
    let rsp = split_completion(M::DESCRIPTOR, raw)?;
    let payload = rsp.payload_bytes();

    if !rsp.completion().is_success() {
        tracing::debug!("{} completed with {}", M::DESCRIPTOR, rsp.completion());
        return Ok(Response::failure(M::DESCRIPTOR, rsp.completion(), payload));
    }

    let body = M::decode_with(layout, &payload)?;
    Ok(Response::success(M::DESCRIPTOR, body, payload))
}
