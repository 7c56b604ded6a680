//! Error types for bmc-wire.

use std::fmt;

use thiserror::Error;

use crate::protocol::{CommandDescriptor, CompletionCode};

/// Which outer carrier command failed during a bridged call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierStage {
    /// The outer "send message" that delivers the inner request.
    Send,
    /// The outer "get message" that retrieves the inner response.
    Receive,
}

impl fmt::Display for CarrierStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CarrierStage::Send => f.write_str("send"),
            CarrierStage::Receive => f.write_str("receive"),
        }
    }
}

/// Why a carrier frame failed before the inner command could complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarrierFault {
    /// The carrier command came back with a non-success completion code.
    Completion(CompletionCode),
    /// The carrier timed out on the transport (after retries).
    Timeout,
    /// The transport reported a channel failure (after retries).
    Transport(String),
    /// The carrier response itself did not fit its layout.
    Malformed(String),
}

impl fmt::Display for CarrierFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CarrierFault::Completion(code) => write!(f, "completion code {}", code),
            CarrierFault::Timeout => f.write_str("transport timeout"),
            CarrierFault::Transport(reason) => write!(f, "transport failure: {}", reason),
            CarrierFault::Malformed(reason) => write!(f, "malformed carrier response: {}", reason),
        }
    }
}

/// Failure of the tunneled command once the carrier itself succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InnerFailure {
    /// The bridged device answered with a non-success completion code.
    Completion(CompletionCode),
    /// No matching inner response arrived within the poll budget.
    TimedOut {
        /// Number of receive polls issued.
        polls: u32,
    },
}

impl fmt::Display for InnerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InnerFailure::Completion(code) => write!(f, "inner completion code {}", code),
            InnerFailure::TimedOut { polls } => {
                write!(f, "no inner response after {} polls", polls)
            }
        }
    }
}

/// Main error type for all bmc-wire operations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The transport timed out on every permitted attempt.
    #[error("Transport timeout after {attempts} attempt(s)")]
    TransportTimeout { attempts: u32 },

    /// The transport failed on every permitted attempt.
    #[error("Transport failure after {attempts} attempt(s): {reason}")]
    TransportFailure { attempts: u32, reason: String },

    /// No type is registered for the descriptor.
    #[error("Unknown command: {0}")]
    UnknownCommand(CommandDescriptor),

    /// A descriptor was registered twice.
    #[error("Command registered twice: {0}")]
    DuplicateCommand(CommandDescriptor),

    /// A field layout violates the layout rules.
    #[error("Invalid layout for {command}: {reason}")]
    InvalidLayout {
        command: CommandDescriptor,
        reason: String,
    },

    /// Payload is shorter than the fixed fields require.
    #[error("Malformed message for {command}: need {expected} bytes, got {actual}")]
    MalformedMessage {
        command: CommandDescriptor,
        expected: usize,
        actual: usize,
    },

    /// A value does not fit the field it is written to.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Well-formed response carrying a non-success completion code.
    #[error("{command} completed with {code}")]
    NonSuccessCompletion {
        command: CommandDescriptor,
        code: CompletionCode,
    },

    /// The outer carrier failed; the inner command was not completed.
    #[error("Bridge carrier {stage} failed: {fault}")]
    BridgeCarrierFailure {
        stage: CarrierStage,
        fault: CarrierFault,
    },

    /// The carrier succeeded but the bridged device did not.
    #[error("Bridged command failed: {0}")]
    BridgeInnerFailure(InnerFailure),

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// Every sequence number for a bridge target is in flight.
    #[error("No free bridge sequence number for channel {channel} device {device_id:#04x}")]
    SequenceExhausted { channel: u8, device_id: u8 },
}

impl ProtocolError {
    /// True for channel-level failures the retry policy may repeat.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProtocolError::TransportTimeout { .. } | ProtocolError::TransportFailure { .. }
        )
    }
}

/// Result type alias using ProtocolError.
pub type Result<T> = std::result::Result<T, ProtocolError>;
