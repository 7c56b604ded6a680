//! Shared helpers for bmc-wire integration tests.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, Once};
use std::time::Duration;

use bmc_wire::bridge::{GetMessage, SendMessage};
use bmc_wire::codec::Message;
use bmc_wire::commands::app::{GetDeviceId, GetSelfTestResults};
use bmc_wire::commands::firmware::{GetFirmwareVersion, GetUpdateStatus};
use bmc_wire::protocol::{CommandDescriptor, RequestFrame};
use bmc_wire::transport::{Transport, TransportError};
use bytes::Bytes;
use tracing::Level;

/// Global one-time tracing initialization guard.
static INIT_TRACING: Once = Once::new();

/// Install a compact `DEBUG` subscriber once per test binary.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_target(false)
            .without_time()
            .with_test_writer()
            .try_init();
    });
}

/// Identity bytes returned for Get Device ID (after the completion code).
pub const DEVICE_ID: &[u8] = &[
    0x20, 0x81, 0x02, 0x47, 0x02, 0xBF, 0x57, 0x01, 0x00, 0x3E, 0x0B,
];

#[derive(Default)]
struct DeviceState {
    /// Tunneled responses waiting for a get-message poll.
    queue: VecDeque<Vec<u8>>,
    /// (channel, device, sequence) sent but not yet collected.
    outstanding: HashSet<(u8, u8, u8)>,
    /// Sequence numbers reused while still outstanding.
    reused: Vec<u8>,
    sends: usize,
}

/// A controller with one satellite device on every channel.
///
/// Direct commands are answered from fixed data. Bridged firmware commands
/// are answered by the satellite: the version echoes the requested
/// component in `minor` and the sequence number in `build`.
#[derive(Default)]
pub struct SimulatedController {
    state: Mutex<DeviceState>,
}

impl SimulatedController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence numbers that were handed out twice while live.
    pub fn reused_sequences(&self) -> Vec<u8> {
        self.state.lock().unwrap().reused.clone()
    }

    /// Number of send-message carriers received.
    pub fn sends(&self) -> usize {
        self.state.lock().unwrap().sends
    }

    fn satellite(inner: &[u8], sequence: u8) -> Vec<u8> {
        let descriptor = CommandDescriptor::from_wire(inner[0], inner[1]);
        let mut rsp = vec![inner[0] | 1, inner[1]];

        if descriptor == GetFirmwareVersion::DESCRIPTOR {
            let component = inner.get(2).copied().unwrap_or(0);
            rsp.extend_from_slice(&[0x00, component, 1, component, sequence, 0, 0, 0]);
            rsp.extend_from_slice(b"sat");
        } else if descriptor == GetUpdateStatus::DESCRIPTOR {
            rsp.extend_from_slice(&[0x00, 0x00, 0, 0, 0]);
        } else {
            rsp.push(0xC1);
        }
        rsp
    }
}

impl Transport for SimulatedController {
    fn send_receive(&self, frame: &RequestFrame, _timeout: Duration) -> Result<Bytes, TransportError> {
        let mut state = self.state.lock().unwrap();
        let payload = frame.payload();

        let mut reply = vec![0x00];
        if frame.descriptor == GetDeviceId::DESCRIPTOR {
            reply.extend_from_slice(DEVICE_ID);
        } else if frame.descriptor == GetSelfTestResults::DESCRIPTOR {
            reply.extend_from_slice(&[0x55, 0x00]);
        } else if frame.descriptor == SendMessage::DESCRIPTOR {
            let (channel, device, sequence) = (payload[0] & 0x0F, payload[1], payload[2]);
            if !state.outstanding.insert((channel, device, sequence)) {
                state.reused.push(sequence);
            }
            state.sends += 1;

            let mut queued = vec![channel, device, sequence];
            queued.extend(Self::satellite(&payload[3..], sequence));
            state.queue.push_back(queued);
        } else if frame.descriptor == GetMessage::DESCRIPTOR {
            match state.queue.pop_front() {
                Some(msg) => {
                    state.outstanding.remove(&(msg[0], msg[1], msg[2]));
                    reply.extend(msg);
                }
                None => reply[0] = 0x80,
            }
        } else {
            reply[0] = 0xC1;
        }

        Ok(Bytes::from(reply))
    }
}
