//! `rudp` — a reliable-delivery transport (stop-and-wait ARQ) over UDP.
//!
//! Built for experimentation and benchmarking against standard TCP streams:
//! one connection at a time, one unacknowledged segment in flight, positive
//! acknowledgment with bounded retransmission, and an RFC 1071 checksum
//! guarding every exchange.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐  DATA/LAST_SEGMENT  ┌──────────┐
//!  │Initiator │────────────────────▶│Responder │
//!  └────┬─────┘                     └─────┬────┘
//!       │            ACKs                 │
//!       │◀────────────────────────────────┘
//!       │
//!  ┌────▼──────────────────────────────┐
//!  │           Connection              │
//!  │ (handshake/teardown FSM, ARQ loop │
//!  │  + owns socket, peer, run count)  │
//!  └────┬──────────────────────────────┘
//!       │ raw UDP datagrams
//!  ┌────▼──────┐
//!  │  Socket   │  (thin async wrapper around tokio UdpSocket)
//!  └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`checksum`]   — RFC 1071 one's-complement checksum
//! - [`packet`]     — wire format (serialise / deserialise, `PacketKind`)
//! - [`socket`]     — async UDP socket abstraction
//! - [`state`]      — connection finite-state-machine type
//! - [`retry`]      — retransmission policy (attempt bound, fixed timeout)
//! - [`sender`]     — run send-side state (cursor, numbering, LAST tagging)
//! - [`receiver`]   — run receive-side state (counters, completion)
//! - [`connection`] — handshake/teardown + reliable send + run transfer
//! - [`stats`]      — per-run statistics and session summary
//! - [`simulator`]  — lossy/corrupting socket wrapper for tests

pub mod checksum;
pub mod connection;
pub mod packet;
pub mod receiver;
pub mod retry;
pub mod sender;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod stats;
