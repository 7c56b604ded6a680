//! Bridge addressing and sequence numbers.

use std::collections::HashSet;
use std::fmt;

/// A device reached through a channel of the local controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BridgeTarget {
    /// Channel number (4 bits).
    pub channel: u8,
    /// Address of the device on that channel.
    pub device_id: u8,
}

impl BridgeTarget {
    /// Create a target.
    pub const fn new(channel: u8, device_id: u8) -> Self {
        Self { channel, device_id }
    }
}

impl fmt::Display for BridgeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {} device {:#04x}", self.channel, self.device_id)
    }
}

/// Hands out 8-bit sequence numbers for one target.
///
/// Numbers advance with wrap-around and skip any number still in flight,
/// so two live calls to the same target never share one.
#[derive(Debug, Default)]
pub struct SequenceAllocator {
    next: u8,
    in_flight: HashSet<u8>,
}

impl SequenceAllocator {
    /// Create an allocator starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator whose first candidate is `start`.
    pub fn starting_at(start: u8) -> Self {
        Self {
            next: start,
            in_flight: HashSet::new(),
        }
    }

    /// Take the next free number, or `None` if all 256 are in flight.
    pub fn allocate(&mut self) -> Option<u8> {
        if self.in_flight.len() > usize::from(u8::MAX) {
            return None;
        }
        loop {
            let seq = self.next;
            self.next = self.next.wrapping_add(1);
            if self.in_flight.insert(seq) {
                return Some(seq);
            }
        }
    }

    /// Return a number to the pool.
    pub fn release(&mut self, seq: u8) {
        self.in_flight.remove(&seq);
    }

    /// Check whether `seq` is currently handed out.
    pub fn is_in_flight(&self, seq: u8) -> bool {
        self.in_flight.contains(&seq)
    }

    /// Free the bookkeeping of an idle allocator, keeping only its
    /// position in the sequence.
    pub fn compact(&mut self) {
        if self.in_flight.is_empty() {
            self.in_flight = HashSet::new();
        }
    }

    /// Number of sequence numbers in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
