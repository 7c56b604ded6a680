//! Client builder and call surface.
//!
//! The [`ClientBuilder`] provides a fluent API for registering commands and
//! tuning timeouts, retries and bridge polling. The [`Client`] it builds
//! owns:
//! 1. An immutable command registry, shared by every clone
//! 2. The transport, which serializes access to the physical channel
//! 3. The bridge state (sequence numbers and parked responses)
//!
//! Calls block the calling thread for one or more round trips. A client is
//! cheap to clone and can be used from many threads at once.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use bmc_wire::commands::app::GetSelfTestResults;
//! use bmc_wire::transport::ScriptedTransport;
//! use bmc_wire::Client;
//!
//! let transport = ScriptedTransport::new();
//! transport.push_reply(&[0x00, 0x55, 0x00]);
//!
//! let client = Client::builder()
//!     .timeout(Duration::from_millis(500))
//!     .max_retries(1)
//!     .build(transport)
//!     .unwrap();
//!
//! assert!(client.send(&GetSelfTestResults).unwrap().passed());
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::bridge::{Bridge, BridgeTarget};
use crate::codec::{DynMessage, Request};
use crate::commands::register_defaults;
use crate::config::{ClientConfig, RetryPolicy};
use crate::error::Result;
use crate::registry::{CommandRegistry, RegistryBuilder};
use crate::transaction::{self, CallOptions, Response};
use crate::transport::Transport;

type Registration = fn(&mut RegistryBuilder) -> Result<&mut RegistryBuilder>;

/// Builder for configuring and creating a client.
pub struct ClientBuilder {
    config: ClientConfig,
    defaults: bool,
    registrations: Vec<Registration>,
}

impl ClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            defaults: true,
            registrations: Vec::new(),
        }
    }

    /// Register a request type and its response.
    ///
    /// Registration errors surface from [`ClientBuilder::build`].
    pub fn register_request<R: Request>(mut self) -> Self {
        self.registrations
            .push(RegistryBuilder::register_request::<R>);
        self
    }

    /// Skip the built-in commands. Bridged calls then need the carrier
    /// commands registered explicitly.
    pub fn without_defaults(mut self) -> Self {
        self.defaults = false;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the per-exchange timeout.
    ///
    /// Default: 5 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = millis(timeout);
        self
    }

    /// Set how many times a failed exchange is repeated.
    ///
    /// Default: 2
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.retry.max_retries = retries;
        self
    }

    /// Replace the retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    /// Set the number of receive polls per bridged call.
    ///
    /// Default: 10
    pub fn max_polls(mut self, polls: u32) -> Self {
        self.config.bridge.max_polls = polls;
        self
    }

    /// Set the timeout of each receive poll.
    ///
    /// Default: 1 second
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.config.bridge.poll_timeout_ms = millis(timeout);
        self
    }

    /// Build the registry and the client.
    pub fn build<T>(self, transport: T) -> Result<Client>
    where
        T: Transport + 'static,
    {
        self.build_shared(Arc::new(transport))
    }

    /// Build a client over a transport that is already shared.
    pub fn build_shared(self, transport: Arc<dyn Transport>) -> Result<Client> {
        let mut builder = CommandRegistry::builder();
        if self.defaults {
            register_defaults(&mut builder)?;
        }
        for register in &self.registrations {
            register(&mut builder)?;
        }
        let registry = builder.build();

        tracing::debug!(
            "Client ready: {} commands, timeout {} ms, {} retries",
            registry.len(),
            self.config.timeout_ms,
            self.config.retry.max_retries
        );

        Ok(Client {
            registry: Arc::new(registry),
            transport,
            config: self.config,
            bridge: Arc::new(Bridge::new()),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// A configured management client.
///
/// Clones share the registry, transport and bridge state.
#[derive(Clone)]
pub struct Client {
    registry: Arc<CommandRegistry>,
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    bridge: Arc<Bridge>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("commands", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The command registry.
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// The active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Bridge state shared by this client's clones.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Call options derived from the configuration.
    pub fn call_options(&self) -> CallOptions {
        CallOptions::from(&self.config)
    }

    /// Send a request and return its body, failing on a non-zero
    /// completion code.
    pub fn send<R: Request>(&self, request: &R) -> Result<R::Response> {
        self.execute(request)?.into_result()
    }

    /// Send a request and return the classified response.
    pub fn execute<R: Request>(&self, request: &R) -> Result<Response<R::Response>> {
        self.execute_with(request, &self.call_options())
    }

    /// Like [`Client::execute`] with explicit per-call options.
    pub fn execute_with<R: Request>(
        &self,
        request: &R,
        options: &CallOptions,
    ) -> Result<Response<R::Response>> {
        transaction::execute(&self.registry, self.transport.as_ref(), request, options)
    }

    /// Send a message known only through the registry.
    pub fn execute_dyn(&self, request: &dyn DynMessage) -> Result<Response<Box<dyn DynMessage>>> {
        transaction::execute_dyn(
            &self.registry,
            self.transport.as_ref(),
            request,
            &self.call_options(),
        )
    }

    /// Send a request to a bridged device and return its body.
    ///
    /// A non-zero inner completion code becomes
    /// [`crate::ProtocolError::BridgeInnerFailure`].
    pub fn send_bridged<R: Request>(
        &self,
        channel: u8,
        device_id: u8,
        inner: &R,
    ) -> Result<R::Response> {
        self.execute_bridged(BridgeTarget::new(channel, device_id), inner)?
            .into_bridged_result()
    }

    /// Send a request to a bridged device and return the classified inner
    /// response.
    pub fn execute_bridged<R: Request>(
        &self,
        target: BridgeTarget,
        inner: &R,
    ) -> Result<Response<R::Response>> {
        self.bridge.send_bridged(
            &self.registry,
            self.transport.as_ref(),
            target,
            inner,
            &self.call_options(),
            &self.config.bridge,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{FieldDescriptor, FieldValues, Message};
    use crate::commands::app::{DeviceId, GetDeviceId, GetSelfTestResults, SelfTestResults};
    use crate::commands::firmware::GetFirmwareVersion;
    use crate::error::{InnerFailure, ProtocolError};
    use crate::protocol::{CommandDescriptor, CompletionCode, NetFn};
    use crate::transport::ScriptedTransport;

    #[derive(Debug, PartialEq)]
    struct Ping;

    #[derive(Debug, PartialEq)]
    struct Pong {
        token: u16,
    }

    impl Message for Ping {
        const NAME: &'static str = "ping";
        const DESCRIPTOR: CommandDescriptor = CommandDescriptor::request(NetFn::OEM_GROUP, 0x10);
        const LAYOUT: &'static [FieldDescriptor] = &[];

        fn write_fields(&self, _values: &mut FieldValues) {}

        fn read_fields(_values: &FieldValues) -> Result<Self> {
            Ok(Ping)
        }
    }

    impl Request for Ping {
        type Response = Pong;
    }

    impl Message for Pong {
        const NAME: &'static str = "pong";
        const DESCRIPTOR: CommandDescriptor = CommandDescriptor::response_of(NetFn::OEM_GROUP, 0x10);
        const LAYOUT: &'static [FieldDescriptor] = &[FieldDescriptor::le_int("token", 0, 2)];

        fn write_fields(&self, values: &mut FieldValues) {
            values.set_int("token", self.token.into());
        }

        fn read_fields(values: &FieldValues) -> Result<Self> {
            Ok(Self {
                token: values.u16("token")?,
            })
        }
    }

    fn test_client(transport: Arc<ScriptedTransport>) -> Client {
        Client::builder()
            .timeout(Duration::from_millis(20))
            .max_retries(1)
            .max_polls(2)
            .poll_timeout(Duration::from_millis(5))
            .build_shared(transport)
            .unwrap()
    }

    #[test]
    fn test_builder_settings() {
        let client = test_client(Arc::new(ScriptedTransport::new()));
        let config = client.config();
        assert_eq!(config.timeout_ms, 20);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.bridge.max_polls, 2);
        assert_eq!(config.bridge.poll_timeout_ms, 5);
        assert!(client.registry().contains(GetDeviceId::DESCRIPTOR));
    }

    #[test]
    fn test_send_returns_body() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_reply(&[0x00, 0x55, 0x00]);

        let client = test_client(transport.clone());
        let results: SelfTestResults = client.send(&GetSelfTestResults).unwrap();
        assert!(results.passed());
        assert_eq!(transport.calls()[0].timeout, Duration::from_millis(20));
    }

    #[test]
    fn test_send_non_success_is_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_reply(&[0xC1]);

        let err = test_client(transport).send(&GetDeviceId).unwrap_err();
        match err {
            ProtocolError::NonSuccessCompletion { command, code } => {
                assert_eq!(command, DeviceId::DESCRIPTOR);
                assert_eq!(code, CompletionCode::INVALID_COMMAND);
            }
            other => panic!("expected NonSuccessCompletion, got {:?}", other),
        }
    }

    #[test]
    fn test_register_custom_request() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_reply(&[0x00, 0x34, 0x12]);

        let client = Client::builder()
            .register_request::<Ping>()
            .build_shared(transport)
            .unwrap();
        assert_eq!(client.send(&Ping).unwrap(), Pong { token: 0x1234 });
    }

    #[test]
    fn test_duplicate_registration_fails_build() {
        let err = Client::builder()
            .register_request::<GetDeviceId>()
            .build(ScriptedTransport::new())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::DuplicateCommand(_)));
    }

    #[test]
    fn test_without_defaults() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = Client::builder()
            .without_defaults()
            .register_request::<Ping>()
            .build_shared(transport.clone())
            .unwrap();

        assert_eq!(client.registry().len(), 2);
        let err = client.send(&GetDeviceId).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownCommand(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_send_bridged() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_reply(&[0x00]).push_reply(&[
            0x00, 0x06, 0x20, 0x00, // outer: channel 6, device 0x20, seq 0
            0x09, 0x01, 0x00, // inner header
            0x00, 0x01, 0x02, 0x03, 0x00, 0x00, 0x00, b'x',
        ]);

        let client = test_client(transport);
        let version = client
            .send_bridged(6, 0x20, &GetFirmwareVersion { component: 0 })
            .unwrap();
        assert_eq!((version.major, version.minor, version.build), (1, 2, 3));
        assert_eq!(version.label_lossy(), "x");
    }

    #[test]
    fn test_send_bridged_times_out() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_reply(&[0x00]).push_reply(&[0x80]).push_reply(&[0x80]);

        let err = test_client(transport)
            .send_bridged(6, 0x20, &GetFirmwareVersion { component: 0 })
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::BridgeInnerFailure(InnerFailure::TimedOut { polls: 2 })
        ));
    }

    #[test]
    fn test_clones_share_bridge() {
        let client = test_client(Arc::new(ScriptedTransport::new()));
        let other = client.clone();

        let lease = client.bridge().lease(BridgeTarget::new(1, 0x10)).unwrap();
        assert_eq!(other.bridge().in_flight(BridgeTarget::new(1, 0x10)), 1);
        drop(lease);
    }

    #[test]
    fn test_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Client>();
    }
}
