//! Inbound run state for stop-and-wait transfer.
//!
//! [`RunReceiver`] accumulates the receive side of one run: how many
//! segments and payload bytes have arrived, and whether the LAST_SEGMENT
//! packet has been seen.  It does **not** send ACKs or touch the sink;
//! [`crate::connection::Connection::receive_run`] owns the receive loop and
//! calls [`RunReceiver::on_segment`] for each accepted data packet.
//!
//! There is no resequencing buffer: the sender keeps exactly one segment in
//! flight, so segments can only arrive in order.  The only anomaly is a
//! duplicate — the sender retransmitting a segment whose ACK was lost —
//! which [`RunReceiver::accepts`] rejects by segment number so the payload
//! is not written twice (the connection layer still re-ACKs it).

/// Receive-side state for one run.
#[derive(Debug)]
pub struct RunReceiver {
    /// Segment number the run expects next (numbering starts at 1).
    expected_segment: u32,
    /// Payload bytes accepted so far.
    bytes_received: u64,
    /// DATA/LAST_SEGMENT packets accepted so far.
    segments_received: u32,
    /// Set when the LAST_SEGMENT packet arrives.
    complete: bool,
}

impl Default for RunReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReceiver {
    /// Create state for a fresh run.
    pub fn new() -> Self {
        Self {
            expected_segment: 1,
            bytes_received: 0,
            segments_received: 0,
            complete: false,
        }
    }

    /// `true` when `segment_number` is the segment this run expects next.
    ///
    /// Anything else is a retransmitted duplicate: the caller should re-ACK
    /// it without writing the payload.
    pub fn accepts(&self, segment_number: u32) -> bool {
        segment_number == self.expected_segment
    }

    /// Record one accepted data segment.
    ///
    /// `last` marks the LAST_SEGMENT packet, which completes the run.
    pub fn on_segment(&mut self, payload_len: usize, last: bool) {
        self.bytes_received += payload_len as u64;
        self.segments_received += 1;
        self.expected_segment += 1;
        if last {
            self.complete = true;
        }
    }

    /// `true` once the LAST_SEGMENT packet has been received.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Payload bytes accepted so far in this run.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Data segments accepted so far in this run.
    pub fn segments_received(&self) -> u32 {
        self.segments_received
    }
}
