//! Bounded single-producer/single-consumer packet ring.
//!
//! The transport ingress enqueues whole frames; the supervisor drains them
//! one cycle at a time. The ring is the only back-pressure surface toward
//! the peer: a full ring drops the frame, the drop is counted upstream, and
//! the peer retransmits at the protocol level.
//!
//! Publication order contract (for ports where the producer runs in an
//! interrupt or callback context): the producer must store the slot contents
//! and its valid flag before advancing `head`; the consumer must read the
//! valid flag before the contents and clear it before advancing `tail`.
//! Through `&mut self` both sides are exclusive here; a lock-free port adds
//! the matching acquire/release ordering on the indices.

use emberboot_wire::Packet;

/// Number of frames the ring can hold.
pub const QUEUE_CAPACITY: usize = 16;

/// Fixed-capacity FIFO of received frames.
#[derive(Debug)]
pub struct PacketQueue {
    slots: [Packet; QUEUE_CAPACITY],
    valid: [bool; QUEUE_CAPACITY],
    head: usize,
    tail: usize,
    count: usize,
}

impl PacketQueue {
    pub fn new() -> Self {
        Self {
            slots: [Packet::EMPTY; QUEUE_CAPACITY],
            valid: [false; QUEUE_CAPACITY],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Buffer a frame at `head`. Returns `false` (frame dropped) when full.
    pub fn enqueue(&mut self, packet: Packet) -> bool {
        if self.count >= QUEUE_CAPACITY {
            return false;
        }

        self.slots[self.head] = packet;
        self.valid[self.head] = true;
        self.head = (self.head + 1) % QUEUE_CAPACITY;
        self.count += 1;
        true
    }

    /// Take the oldest buffered frame, if any.
    pub fn dequeue(&mut self) -> Option<Packet> {
        if self.count == 0 || !self.valid[self.tail] {
            return None;
        }

        let packet = self.slots[self.tail];
        self.valid[self.tail] = false;
        self.tail = (self.tail + 1) % QUEUE_CAPACITY;
        self.count -= 1;
        Some(packet)
    }

    /// Frames currently buffered.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= QUEUE_CAPACITY
    }
}

impl Default for PacketQueue {
    fn default() -> Self {
        Self::new()
    }
}
