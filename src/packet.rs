//! Wire-format definitions for RUDP packets.
//!
//! Every datagram exchanged between peers is a [`Packet`].  This module is
//! responsible for:
//! - Defining the on-wire binary layout (header fields, flags, payload).
//! - Serialising a [`Packet`] into a byte buffer ready for transmission,
//!   stamping the checksum in the process.
//! - Deserialising a raw byte slice back into a [`Packet`], returning errors
//!   for truncated, inconsistent, or corrupted input.
//! - Classifying the flag byte into a [`PacketKind`] exactly once at the
//!   boundary, so no bit-test logic leaks into the protocol layers.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         Segment Size                          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Segment Number                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |           Total Size          |            Checksum           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Flags     |                 Payload ...                   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Total header size: [`HEADER_LEN`] = 13 bytes.
//! segment_size(4) + segment_number(4) + total_size(2) + checksum(2) + flags(1)

use crate::checksum::internet_checksum;

/// Bit-flag constants for the `flags` header field.
pub mod flags {
    /// Synchronise — handshake initiation.
    pub const SYN: u8 = 0x01;
    /// Acknowledgement of a received packet.
    pub const ACK: u8 = 0x02;
    /// Finish — initiator is closing the connection.
    pub const FIN: u8 = 0x04;
    /// Data-bearing segment within a run.
    pub const DATA: u8 = 0x08;
    /// Final data segment of a run.
    pub const LAST_SEGMENT: u8 = 0x10;
}

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 13;

/// Largest payload attached to a single packet, chosen so header + payload
/// stays comfortably inside one UDP datagram.
pub const MAX_SEGMENT_PAYLOAD: usize = 1460;

// Byte offsets of each field within the serialised header.
const OFF_SEGMENT_SIZE: usize = 0;
const OFF_SEGMENT_NUMBER: usize = 4;
const OFF_TOTAL_SIZE: usize = 8;
const OFF_CHECKSUM: usize = 10;
const OFF_FLAGS: usize = 12;

/// The kind of packet, decoded once from the raw flag byte.
///
/// The protocol sets exactly one "kind" per packet; the only combination is
/// SYN+ACK during the handshake.  Any other flag combination is malformed
/// and yields `None` from [`Header::kind`] — receive loops ignore such
/// packets without ACKing, relying on the peer's retransmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Syn,
    SynAck,
    Ack,
    Fin,
    Data,
    LastSegment,
}

/// Fixed-size protocol header.
///
/// Fields are in host byte order; [`Packet::encode`] converts to big-endian
/// on the wire and [`Packet::decode`] converts back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Byte length of the payload attached to this packet (0 for control
    /// packets).  On encode this is computed from the actual payload length;
    /// on decode it is validated against the remaining buffer bytes.
    pub segment_size: u32,
    /// Sequence id of this segment within the run; numbering starts at 1.
    pub segment_number: u32,
    /// Advertised size of the full logical transfer.  Informational only —
    /// payload framing never depends on it.
    pub total_size: u16,
    /// Internet checksum (RFC 1071) over the entire serialised packet.
    ///
    /// On encode this is computed and written last.
    /// On decode this is verified before the packet is returned.
    pub checksum: u16,
    /// Bitmask of [`flags`] constants.
    pub flags: u8,
}

impl Header {
    /// Classify the flag byte.
    ///
    /// Matches the exact flag values the protocol emits; anything else is a
    /// malformed packet and returns `None`.
    pub fn kind(&self) -> Option<PacketKind> {
        match self.flags {
            f if f == flags::SYN => Some(PacketKind::Syn),
            f if f == flags::SYN | flags::ACK => Some(PacketKind::SynAck),
            f if f == flags::ACK => Some(PacketKind::Ack),
            f if f == flags::FIN => Some(PacketKind::Fin),
            f if f == flags::DATA => Some(PacketKind::Data),
            f if f == flags::LAST_SEGMENT => Some(PacketKind::LastSegment),
            _ => None,
        }
    }
}

/// A complete protocol datagram: header + payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Build a payload-less control packet with the given flag byte.
    ///
    /// Used for SYN, SYN+ACK, ACK, and FIN exchanges, which carry no data
    /// and leave the segment fields at zero.
    pub fn control(flags: u8) -> Self {
        Self {
            header: Header {
                segment_size: 0,
                segment_number: 0,
                total_size: 0,
                checksum: 0, // filled in by encode
                flags,
            },
            payload: Vec::new(),
        }
    }

    /// Shorthand for [`Header::kind`].
    pub fn kind(&self) -> Option<PacketKind> {
        self.header.kind()
    }

    /// Serialise this packet into a newly allocated byte vector.
    ///
    /// `header.segment_size` and `header.checksum` are computed from the
    /// actual payload; any values already stored in those fields are ignored.
    /// The checksum field is held at zero while the checksum is computed,
    /// then filled in — the receiver zeroes it again before verifying.
    pub fn encode(&self) -> Vec<u8> {
        let payload_len = self.payload.len();
        let mut buf = vec![0u8; HEADER_LEN + payload_len];

        buf[OFF_SEGMENT_SIZE..OFF_SEGMENT_SIZE + 4]
            .copy_from_slice(&(payload_len as u32).to_be_bytes());
        buf[OFF_SEGMENT_NUMBER..OFF_SEGMENT_NUMBER + 4]
            .copy_from_slice(&self.header.segment_number.to_be_bytes());
        buf[OFF_TOTAL_SIZE..OFF_TOTAL_SIZE + 2]
            .copy_from_slice(&self.header.total_size.to_be_bytes());
        // Checksum field is zero while computing the checksum.
        buf[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&0u16.to_be_bytes());
        buf[OFF_FLAGS] = self.header.flags;

        buf[HEADER_LEN..].copy_from_slice(&self.payload);

        let csum = internet_checksum(&buf);
        buf[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&csum.to_be_bytes());

        buf
    }

    /// Parse a [`Packet`] from a raw byte slice.
    ///
    /// Returns [`Err`] if:
    /// - `buf` is shorter than [`HEADER_LEN`],
    /// - the `segment_size` field disagrees with `buf.len()`, or
    /// - the checksum does not verify.
    ///
    /// A checksum failure is never retried here; callers treat it as "drop
    /// this datagram, as if never received".
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < HEADER_LEN {
            return Err(PacketError::TooShort);
        }

        let segment_size = u32::from_be_bytes(
            buf[OFF_SEGMENT_SIZE..OFF_SEGMENT_SIZE + 4].try_into().unwrap(),
        );
        let segment_number = u32::from_be_bytes(
            buf[OFF_SEGMENT_NUMBER..OFF_SEGMENT_NUMBER + 4].try_into().unwrap(),
        );
        let total_size =
            u16::from_be_bytes(buf[OFF_TOTAL_SIZE..OFF_TOTAL_SIZE + 2].try_into().unwrap());
        let checksum =
            u16::from_be_bytes(buf[OFF_CHECKSUM..OFF_CHECKSUM + 2].try_into().unwrap());
        let flags = buf[OFF_FLAGS];

        if buf.len() != HEADER_LEN + segment_size as usize {
            return Err(PacketError::LengthMismatch);
        }

        // Verify checksum: zero the stored field, recompute, compare.
        let mut scratch = buf.to_vec();
        scratch[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&0u16.to_be_bytes());
        if internet_checksum(&scratch) != checksum {
            return Err(PacketError::ChecksumMismatch);
        }

        Ok(Packet {
            header: Header {
                segment_size,
                segment_number,
                total_size,
                checksum,
                flags,
            },
            payload: buf[HEADER_LEN..].to_vec(),
        })
    }
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, PartialEq, Eq)]
pub enum PacketError {
    /// Buffer shorter than the fixed header size.
    TooShort,
    /// `segment_size` field does not match the actual remaining bytes.
    LengthMismatch,
    /// Checksum did not match the recomputed value.
    ChecksumMismatch,
}

impl std::fmt::Display for PacketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketError::TooShort => write!(f, "buffer too short to contain a header"),
            PacketError::LengthMismatch => {
                write!(f, "segment_size field does not match remaining bytes")
            }
            PacketError::ChecksumMismatch => write!(f, "checksum verification failed"),
        }
    }
}

impl std::error::Error for PacketError {}
