//! Per-connection lifecycle manager: the RUDP protocol engine.
//!
//! A [`Connection`] owns the complete state for one logical peer-to-peer
//! session.  Its responsibilities are:
//! - Driving the handshake (SYN → SYN+ACK → ACK) and teardown (FIN → ACK)
//!   state machine (see [`crate::state`]).
//! - The stop-and-wait retransmission primitive ([`Connection::reliable_send`]):
//!   one packet in flight, fixed per-attempt timeout, bounded attempts.
//! - Driving whole runs through [`crate::sender::RunSender`] and
//!   [`crate::receiver::RunReceiver`], speaking [`crate::packet::Packet`]s
//!   over the owned [`crate::socket::Socket`].
//!
//! Connection objects are created either by an active open
//! ([`Connection::connect`], the initiator) or by accepting a peer's SYN
//! ([`Connection::accept`], the responder).  Exactly one connection is
//! active per socket; there is no multiplexing.
//!
//! Every wait inside the retransmission primitive, the handshake, and the
//! teardown is bounded by [`crate::retry::RetryPolicy::ack_timeout`] — no
//! unbounded receive exists on those paths.  Only the responder's wait for
//! the *next* inbound segment (its listening posture) blocks without a
//! deadline.

use std::io::Write;
use std::net::SocketAddr;
use std::time::Instant;

use tokio::time::timeout;

use crate::packet::{flags, Packet, PacketKind};
use crate::receiver::RunReceiver;
use crate::retry::RetryPolicy;
use crate::sender::RunSender;
use crate::socket::{Socket, SocketError};
use crate::state::ConnectionState;
use crate::stats::RunStats;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors surfaced by connection operations.
///
/// Checksum failures and unrecognised flag combinations never appear here:
/// they are absorbed inside the receive loops (the datagram is dropped as if
/// never received) and recovered by the peer's retransmission.
#[derive(Debug)]
pub enum ConnError {
    /// No checksum-valid handshake reply arrived within the timeout window.
    HandshakeTimeout,
    /// The handshake reply was valid but did not carry the ACK flag.
    HandshakeRejected,
    /// The attempt bound was exhausted without receiving an ACK.
    ///
    /// Fatal to the current run; the connection may still be torn down
    /// cleanly afterwards.
    RetransmissionExhausted {
        /// Number of transmissions performed (equals the configured bound).
        attempts: u32,
    },
    /// The peer sent FIN; the connection is closed.
    PeerClosed,
    /// The operation is not legal in the connection's current state.
    BadState,
    /// Fatal failure of the transport underneath; aborts any in-progress run.
    Socket(SocketError),
}

impl std::fmt::Display for ConnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HandshakeTimeout => write!(f, "timed out waiting for handshake reply"),
            Self::HandshakeRejected => write!(f, "handshake reply did not acknowledge"),
            Self::RetransmissionExhausted { attempts } => {
                write!(f, "no ACK after {attempts} transmission attempts")
            }
            Self::PeerClosed => write!(f, "peer closed the connection"),
            Self::BadState => write!(f, "operation not valid in current connection state"),
            Self::Socket(e) => write!(f, "transport failure: {e}"),
        }
    }
}

impl std::error::Error for ConnError {}

impl From<SocketError> for ConnError {
    fn from(e: SocketError) -> Self {
        Self::Socket(e)
    }
}

impl From<std::io::Error> for ConnError {
    fn from(e: std::io::Error) -> Self {
        Self::Socket(SocketError::Io(e))
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Which side of the handshake this endpoint played.
///
/// Only the initiator is protocol-obligated to emit FIN on close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Initiator,
    Responder,
}

/// A handle to a single reliable connection over UDP.
#[derive(Debug)]
pub struct Connection {
    /// Current FSM state.
    pub state: ConnectionState,
    /// Underlying datagram socket, owned exclusively by this connection.
    socket: Socket,
    /// Remote peer, bound during the handshake; the only address whose
    /// datagrams are accepted.
    peer: SocketAddr,
    /// Retransmission parameters for every bounded wait on this connection.
    policy: RetryPolicy,
    role: Role,
    /// Responder only: whether the initiator's handshake-completion ACK has
    /// been consumed.  That ACK carries the same bare ACK flag as a segment
    /// acknowledgment and is distinguished purely by position in the
    /// protocol sequence.
    handshake_acked: bool,
    /// Completed segment-transfer runs on this connection.
    run_count: u32,
}

impl Connection {
    // -----------------------------------------------------------------------
    // Handshake
    // -----------------------------------------------------------------------

    /// Perform an active open (initiator) with the default [`RetryPolicy`].
    pub async fn connect(socket: Socket, peer: SocketAddr) -> Result<Self, ConnError> {
        Self::connect_with(socket, peer, RetryPolicy::default()).await
    }

    /// Perform an active open with an explicit retransmission policy.
    ///
    /// Sends a single SYN (no SYN retry) and waits up to
    /// `policy.ack_timeout` for a checksum-valid, ACK-bearing reply.
    /// Corrupted datagrams are skipped within the window; the deadline then
    /// yields [`ConnError::HandshakeTimeout`].  A valid reply without the
    /// ACK flag is a hard [`ConnError::HandshakeRejected`].
    pub async fn connect_with(
        socket: Socket,
        peer: SocketAddr,
        policy: RetryPolicy,
    ) -> Result<Self, ConnError> {
        let mut conn = Self {
            state: ConnectionState::Closed,
            socket,
            peer,
            policy,
            role: Role::Initiator,
            handshake_acked: false,
            run_count: 0,
        };

        conn.socket.send_to(&Packet::control(flags::SYN), peer).await?;
        conn.state = ConnectionState::SynSent;
        log::debug!("→ SYN to {peer}; waiting for SYN+ACK");

        let deadline = Instant::now() + conn.policy.ack_timeout;
        let reply = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                log::warn!("handshake timeout waiting for SYN+ACK from {peer}");
                return Err(ConnError::HandshakeTimeout);
            }
            match timeout(remaining, conn.socket.recv_from()).await {
                Err(_elapsed) => {
                    log::warn!("handshake timeout waiting for SYN+ACK from {peer}");
                    return Err(ConnError::HandshakeTimeout);
                }
                // Corrupted datagram: drop it as if never received.
                Ok(Err(e)) if e.is_recoverable() => continue,
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok((pkt, from))) => {
                    if from != peer {
                        continue;
                    }
                    break pkt;
                }
            }
        };

        if reply.header.flags & flags::ACK == 0 {
            log::warn!("handshake reply from {peer} lacks ACK (flags {:#04x})", reply.header.flags);
            return Err(ConnError::HandshakeRejected);
        }
        log::debug!("← SYN+ACK from {peer}");

        // Final ACK completes the 3-way handshake.
        conn.socket.send_to(&Packet::control(flags::ACK), peer).await?;
        conn.state = ConnectionState::Established;
        conn.handshake_acked = true;
        log::info!("handshake complete with {peer}; connection established");

        Ok(conn)
    }

    /// Perform a passive open (responder) with the default [`RetryPolicy`].
    pub async fn accept(socket: Socket) -> Result<Self, ConnError> {
        Self::accept_with(socket, RetryPolicy::default()).await
    }

    /// Wait for a checksum-valid SYN, reply SYN+ACK, and return an
    /// established connection bound to the initiator's address.
    ///
    /// The responder transitions to `Established` here without waiting for
    /// the initiator's final ACK — that ACK is consumed positionally inside
    /// [`Connection::receive_run`], and data is accepted without it.
    pub async fn accept_with(socket: Socket, policy: RetryPolicy) -> Result<Self, ConnError> {
        loop {
            let (pkt, from) = match socket.recv_from().await {
                // Corrupted datagram while listening: keep waiting.
                Err(e) if e.is_recoverable() => continue,
                Err(e) => return Err(e.into()),
                Ok(v) => v,
            };

            match pkt.kind() {
                Some(PacketKind::Syn) => {
                    log::debug!("← SYN from {from}; → SYN+ACK");
                    socket
                        .send_to(&Packet::control(flags::SYN | flags::ACK), from)
                        .await?;
                    log::info!("connection established with {from}");
                    return Ok(Self {
                        state: ConnectionState::Established,
                        socket,
                        peer: from,
                        policy,
                        role: Role::Responder,
                        handshake_acked: false,
                        run_count: 0,
                    });
                }
                // Anything that is not a SYN is noise while listening.
                _ => continue,
            }
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Address of the connected peer.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Local address of the owned socket.
    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    /// Number of completed segment-transfer runs on this connection.
    pub fn run_count(&self) -> u32 {
        self.run_count
    }

    // -----------------------------------------------------------------------
    // Retransmission primitive
    // -----------------------------------------------------------------------

    /// Send `packet` and wait for an acknowledgment, retransmitting up to
    /// the policy's attempt bound (stop-and-wait ARQ).
    ///
    /// Each attempt transmits the packet unchanged and waits the fixed
    /// `ack_timeout` for any inbound datagram.  A checksum-valid, ACK-bearing
    /// reply from the peer succeeds immediately.  A timeout, a corrupted
    /// datagram, or a valid non-ACK packet all consume the attempt and
    /// trigger retransmission — there is no backoff.
    ///
    /// Returns [`ConnError::RetransmissionExhausted`] once the bound is
    /// reached (non-fatal to the connection) or [`ConnError::Socket`] when
    /// the transport itself fails (fatal).
    pub async fn reliable_send(&self, packet: &Packet) -> Result<(), ConnError> {
        let mut attempts = 0u32;

        while attempts < self.policy.max_attempts {
            self.socket.send_to(packet, self.peer).await?;
            attempts += 1;

            match timeout(self.policy.ack_timeout, self.socket.recv_from()).await {
                Err(_elapsed) => {
                    log::debug!(
                        "timeout waiting for ACK of segment #{}, attempt {}/{}",
                        packet.header.segment_number,
                        attempts,
                        self.policy.max_attempts
                    );
                }
                // Corrupted reply: not the ack we wanted; retransmit.
                Ok(Err(e)) if e.is_recoverable() => {}
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok((reply, from))) => {
                    if from == self.peer && reply.header.flags & flags::ACK != 0 {
                        return Ok(());
                    }
                    // Valid-checksum packet without ACK, or a stranger's
                    // datagram: counted toward the same attempt bound.
                }
            }
        }

        log::warn!(
            "segment #{} unacknowledged after {} attempts",
            packet.header.segment_number,
            attempts
        );
        Err(ConnError::RetransmissionExhausted { attempts })
    }

    // -----------------------------------------------------------------------
    // Run transfer
    // -----------------------------------------------------------------------

    /// Transmit `source` as one run: slice it into segments, drive each
    /// through [`Connection::reliable_send`], and advance only on ACK.
    ///
    /// The run ends exactly when the LAST_SEGMENT packet is acknowledged.
    /// On exhaustion or transport failure the run is aborted and the error
    /// propagated; there is no partial-run resume.
    pub async fn send_run(&mut self, source: &[u8]) -> Result<RunStats, ConnError> {
        if self.state != ConnectionState::Established {
            return Err(ConnError::BadState);
        }

        let started = Instant::now();
        let mut run = RunSender::new(source.len());

        while let Some(pkt) = run.next_packet(source) {
            self.reliable_send(&pkt).await?;
            run.on_ack(&pkt);
        }

        self.run_count += 1;
        let stats = RunStats {
            bytes: run.bytes_acked(),
            segments: run.segments_acked(),
            elapsed: started.elapsed(),
        };
        log::info!(
            "run #{} sent: {} bytes in {} segments ({:.3} Mbps)",
            self.run_count,
            stats.bytes,
            stats.segments,
            stats.megabits_per_second()
        );
        Ok(stats)
    }

    /// Receive one run, appending payload bytes to `sink` in order.
    ///
    /// For every checksum-valid packet from the peer:
    /// - DATA / LAST_SEGMENT: the expected segment is written to the sink
    ///   and ACKed; a duplicate (retransmission of an already-accepted
    ///   segment after a lost ACK) is re-ACKed without being written.
    ///   LAST_SEGMENT completes the run.
    /// - FIN: ACKed; the sink is flushed and [`ConnError::PeerClosed`] is
    ///   returned — connection closure takes priority over further runs.
    /// - A bare ACK is consumed once as the handshake-completion
    ///   acknowledgment; later bare ACKs are stale and ignored.
    /// - A retransmitted SYN is answered with a fresh SYN+ACK.
    /// - Corrupted or malformed packets are dropped without an ACK; the
    ///   sender's retransmission recovers.
    pub async fn receive_run<W: Write>(&mut self, sink: &mut W) -> Result<RunStats, ConnError> {
        if self.state != ConnectionState::Established {
            return Err(ConnError::BadState);
        }

        let mut run = RunReceiver::new();
        let mut started: Option<Instant> = None;

        loop {
            let (pkt, from) = match self.socket.recv_from().await {
                // Checksum mismatch or malformed frame: drop silently.
                Err(e) if e.is_recoverable() => continue,
                Err(e) => return Err(e.into()),
                Ok(v) => v,
            };
            if from != self.peer {
                continue;
            }

            match pkt.kind() {
                Some(kind @ (PacketKind::Data | PacketKind::LastSegment)) => {
                    started.get_or_insert_with(Instant::now);

                    if run.accepts(pkt.header.segment_number) {
                        sink.write_all(&pkt.payload)?;
                        run.on_segment(pkt.payload.len(), kind == PacketKind::LastSegment);
                    } else {
                        // Our ACK was lost; re-ACK the duplicate.
                        log::debug!(
                            "duplicate segment #{} re-acknowledged",
                            pkt.header.segment_number
                        );
                    }
                    self.socket
                        .send_to(&Packet::control(flags::ACK), self.peer)
                        .await?;

                    if run.is_complete() {
                        sink.flush()?;
                        self.run_count += 1;
                        let stats = RunStats {
                            bytes: run.bytes_received(),
                            segments: run.segments_received(),
                            elapsed: started.map(|s| s.elapsed()).unwrap_or_default(),
                        };
                        log::info!(
                            "run #{} received: {} bytes in {} segments",
                            self.run_count,
                            stats.bytes,
                            stats.segments
                        );
                        return Ok(stats);
                    }
                }
                Some(PacketKind::Fin) => {
                    log::info!("← FIN from {}; closing", self.peer);
                    let _ = self
                        .socket
                        .send_to(&Packet::control(flags::ACK), self.peer)
                        .await;
                    sink.flush()?;
                    self.state = ConnectionState::Closed;
                    return Err(ConnError::PeerClosed);
                }
                Some(PacketKind::Ack) => {
                    if !self.handshake_acked {
                        // First bare ACK after SYN+ACK is the handshake
                        // completion, not a segment acknowledgment.
                        self.handshake_acked = true;
                        log::debug!("handshake-completion ACK consumed");
                    }
                }
                Some(PacketKind::Syn) => {
                    // Our SYN+ACK was lost; answer the retransmitted SYN.
                    let _ = self
                        .socket
                        .send_to(&Packet::control(flags::SYN | flags::ACK), self.peer)
                        .await;
                }
                // Unexpected SYN+ACK or unrecognised flag combination:
                // malformed, no ACK.
                Some(PacketKind::SynAck) | None => {}
            }
        }
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Close the connection.  Never fails observably and is idempotent.
    ///
    /// The initiator sends one FIN and waits a single bounded timeout for
    /// its ACK; with or without the ACK the connection transitions to
    /// `Closed` — teardown always completes locally.  The responder closes
    /// without emitting FIN.
    pub async fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }

        if self.role == Role::Initiator {
            self.state = ConnectionState::Closing;
            log::debug!("→ FIN to {}", self.peer);

            match self.socket.send_to(&Packet::control(flags::FIN), self.peer).await {
                Err(e) => log::warn!("failed to send FIN: {e}; closing anyway"),
                Ok(()) => match timeout(self.policy.ack_timeout, self.socket.recv_from()).await {
                    Ok(Ok((pkt, from)))
                        if from == self.peer && pkt.header.flags & flags::ACK != 0 =>
                    {
                        log::debug!("← ACK for FIN");
                    }
                    Ok(_) => log::warn!("no valid ACK for FIN; closing anyway"),
                    Err(_elapsed) => log::warn!("timeout waiting for FIN ACK; closing anyway"),
                },
            }
        }

        self.state = ConnectionState::Closed;
        log::info!("connection with {} closed", self.peer);
    }
}
