//! Outbound run state for stop-and-wait transfer.
//!
//! [`RunSender`] slices one logical byte stream into segments and tracks the
//! cursor, the segment numbering, and the run counters.  It does **not**
//! touch the socket; [`crate::connection::Connection::send_run`] calls these
//! methods and owns the actual send/retransmit loop.
//!
//! # Stop-and-wait contract
//! - [`next_packet`] is a pure peek: it builds the segment at the current
//!   cursor without advancing anything, so the connection layer can
//!   retransmit the identical packet as many times as the retry policy
//!   allows.
//! - [`on_ack`] advances the cursor and counters exactly once per
//!   acknowledged segment.
//! - Segment numbers start at 1 and increase by 1 per segment.
//! - The segment that consumes the final source byte carries LAST_SEGMENT
//!   instead of DATA; an empty source still yields one empty LAST_SEGMENT
//!   so the receiver observes run completion.
//!
//! [`next_packet`]: RunSender::next_packet
//! [`on_ack`]: RunSender::on_ack

use crate::packet::{flags, Header, Packet, MAX_SEGMENT_PAYLOAD};

/// Send-side state for one run over an established connection.
#[derive(Debug)]
pub struct RunSender {
    /// Byte offset into the source of the next unacknowledged segment.
    cursor: usize,
    /// Segment number to stamp on the next segment (starts at 1).
    next_segment: u32,
    /// Upper bound on payload bytes per segment.
    max_payload: usize,
    /// Advertised total run size, saturated into the 16-bit wire field.
    total_size: u16,
    /// Payload bytes acknowledged so far.
    bytes_acked: u64,
    /// Segments acknowledged so far.
    segments_acked: u32,
    /// Set once the LAST_SEGMENT packet has been acknowledged.
    finished: bool,
}

impl RunSender {
    /// Create send state for a run of `source_len` bytes with the default
    /// segment payload bound.
    pub fn new(source_len: usize) -> Self {
        Self::with_max_payload(source_len, MAX_SEGMENT_PAYLOAD)
    }

    /// Create send state with an explicit payload bound (tests use small
    /// bounds to exercise segmentation cheaply).
    pub fn with_max_payload(source_len: usize, max_payload: usize) -> Self {
        assert!(max_payload >= 1, "max_payload must be at least 1");
        Self {
            cursor: 0,
            next_segment: 1,
            max_payload,
            total_size: source_len.min(u16::MAX as usize) as u16,
            bytes_acked: 0,
            segments_acked: 0,
            finished: false,
        }
    }

    /// Build the segment at the current cursor, or `None` when the run is
    /// complete.
    ///
    /// Does not advance state: calling this twice without an intervening
    /// [`RunSender::on_ack`] returns the identical packet.
    pub fn next_packet(&self, source: &[u8]) -> Option<Packet> {
        if self.finished {
            return None;
        }

        let end = (self.cursor + self.max_payload).min(source.len());
        let chunk = &source[self.cursor..end];
        let is_last = end == source.len();

        Some(Packet {
            header: Header {
                segment_size: chunk.len() as u32,
                segment_number: self.next_segment,
                total_size: self.total_size,
                checksum: 0, // filled in by Packet::encode
                flags: if is_last { flags::LAST_SEGMENT } else { flags::DATA },
            },
            payload: chunk.to_vec(),
        })
    }

    /// Record the acknowledgment of the segment last returned by
    /// [`RunSender::next_packet`]: advance the cursor and counters, and mark
    /// the run finished when that segment was the last one.
    pub fn on_ack(&mut self, acked: &Packet) {
        debug_assert_eq!(
            acked.header.segment_number, self.next_segment,
            "on_ack for a segment that is not in flight"
        );
        self.cursor += acked.payload.len();
        self.bytes_acked += acked.payload.len() as u64;
        self.segments_acked += 1;
        self.next_segment += 1;
        if acked.header.flags == flags::LAST_SEGMENT {
            self.finished = true;
        }
    }

    /// `true` once the LAST_SEGMENT packet has been acknowledged.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Payload bytes acknowledged so far in this run.
    pub fn bytes_acked(&self) -> u64 {
        self.bytes_acked
    }

    /// Segments acknowledged so far in this run.
    pub fn segments_acked(&self) -> u32 {
        self.segments_acked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive a complete run, collecting every packet "sent".
    fn collect_run(source: &[u8], max_payload: usize) -> Vec<Packet> {
        let mut s = RunSender::with_max_payload(source.len(), max_payload);
        let mut packets = Vec::new();
        while let Some(pkt) = s.next_packet(source) {
            s.on_ack(&pkt);
            packets.push(pkt);
        }
        packets
    }

    #[test]
    fn five_thousand_bytes_make_four_segments() {
        let source = vec![0xa5u8; 5000];
        let packets = collect_run(&source, 1460);

        assert_eq!(packets.len(), 4);
        assert_eq!(packets[0].payload.len(), 1460);
        assert_eq!(packets[1].payload.len(), 1460);
        assert_eq!(packets[2].payload.len(), 1460);
        assert_eq!(packets[3].payload.len(), 620);
    }

    #[test]
    fn segment_numbers_increase_by_one_from_one() {
        let source = vec![0u8; 50];
        let packets = collect_run(&source, 10);
        for (i, pkt) in packets.iter().enumerate() {
            assert_eq!(pkt.header.segment_number, i as u32 + 1);
        }
    }

    #[test]
    fn only_final_segment_carries_last_flag() {
        let source = vec![0u8; 45];
        let packets = collect_run(&source, 10);
        assert_eq!(packets.len(), 5);
        for pkt in &packets[..4] {
            assert_eq!(pkt.header.flags, flags::DATA);
        }
        assert_eq!(packets[4].header.flags, flags::LAST_SEGMENT);
    }

    #[test]
    fn exact_multiple_tags_last_chunk() {
        // 30 bytes at 10 per segment: the third full chunk is the last one.
        let source = vec![0u8; 30];
        let packets = collect_run(&source, 10);
        assert_eq!(packets.len(), 3);
        assert_eq!(packets[2].payload.len(), 10);
        assert_eq!(packets[2].header.flags, flags::LAST_SEGMENT);
    }

    #[test]
    fn empty_source_emits_one_empty_last_segment() {
        let packets = collect_run(&[], 1460);
        assert_eq!(packets.len(), 1);
        assert!(packets[0].payload.is_empty());
        assert_eq!(packets[0].header.flags, flags::LAST_SEGMENT);
        assert_eq!(packets[0].header.segment_number, 1);
    }

    #[test]
    fn next_packet_is_idempotent_until_acked() {
        let source = vec![1u8; 100];
        let s = RunSender::with_max_payload(source.len(), 10);
        let a = s.next_packet(&source).unwrap();
        let b = s.next_packet(&source).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn counters_track_acked_progress() {
        let source = vec![2u8; 25];
        let mut s = RunSender::with_max_payload(source.len(), 10);

        let p1 = s.next_packet(&source).unwrap();
        s.on_ack(&p1);
        assert_eq!(s.bytes_acked(), 10);
        assert_eq!(s.segments_acked(), 1);
        assert!(!s.is_finished());

        let p2 = s.next_packet(&source).unwrap();
        s.on_ack(&p2);
        let p3 = s.next_packet(&source).unwrap();
        s.on_ack(&p3);
        assert_eq!(s.bytes_acked(), 25);
        assert_eq!(s.segments_acked(), 3);
        assert!(s.is_finished());
        assert!(s.next_packet(&source).is_none());
    }

    #[test]
    fn total_size_saturates_into_wire_field() {
        let s = RunSender::new(2 * 1024 * 1024);
        let pkt = s.next_packet(&vec![0u8; 2 * 1024 * 1024]).unwrap();
        assert_eq!(pkt.header.total_size, u16::MAX);
    }

    #[test]
    fn payloads_reassemble_to_source() {
        let source: Vec<u8> = (0..=255u8).cycle().take(3333).collect();
        let packets = collect_run(&source, 100);
        let rebuilt: Vec<u8> = packets.iter().flat_map(|p| p.payload.clone()).collect();
        assert_eq!(rebuilt, source);
    }
}
