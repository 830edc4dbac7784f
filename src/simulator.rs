//! Fault-injecting socket wrapper for deterministic testing.
//!
//! Real networks drop and corrupt packets.  To exercise the reliability
//! mechanisms without depending on actual network conditions, this module
//! provides a [`Simulator`] that wraps a [`crate::socket::Socket`] and
//! applies a configurable fault model on the send path:
//!
//! | Fault        | Description                                          |
//! |--------------|------------------------------------------------------|
//! | Packet loss  | Drop an outbound packet with probability `loss_rate`.|
//! | Corruption   | Flip one bit of the encoded bytes with probability   |
//! |              | `corrupt_rate` (the receiver's checksum rejects it). |
//!
//! The RNG is seeded so failing tests are reproducible.  With the default
//! (fault-free) configuration the simulator is a transparent pass-through.
//!
//! The protocol never pipelines, so reordering and duplication faults have
//! nothing to act on here; loss and corruption are the two conditions the
//! retransmission primitive must absorb.

use std::net::SocketAddr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::packet::Packet;
use crate::socket::{Socket, SocketError};

/// Configuration for the fault-injection model.
///
/// All probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Probability that any given outbound packet is silently dropped.
    pub loss_rate: f64,
    /// Probability that an outbound packet has one bit flipped.
    pub corrupt_rate: f64,
    /// Seed for the fault RNG, so runs are reproducible.
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults by default: the simulator is a transparent pass-through.
        Self {
            loss_rate: 0.0,
            corrupt_rate: 0.0,
            seed: 0,
        }
    }
}

/// A fault-injecting wrapper around the socket layer.
///
/// Receives are passed through untouched; faults apply to sends only, which
/// is sufficient to starve either direction of a test topology (the peer's
/// ACKs go through a simulator of their own).
#[derive(Debug)]
pub struct Simulator {
    config: SimulatorConfig,
    socket: Socket,
    rng: StdRng,
}

impl Simulator {
    /// Wrap `socket` with the given fault model.
    pub fn new(socket: Socket, config: SimulatorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, socket, rng }
    }

    /// Local address of the wrapped socket.
    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    /// Replace the fault rates without reseeding the RNG.
    ///
    /// Tests use this to run a clean handshake first and only then make the
    /// channel hostile.
    pub fn set_fault_rates(&mut self, loss_rate: f64, corrupt_rate: f64) {
        self.config.loss_rate = loss_rate;
        self.config.corrupt_rate = corrupt_rate;
    }

    /// Send `packet` through the simulated network.
    ///
    /// Applies loss and corruption according to the configuration before
    /// handing the bytes to the real socket.  A dropped packet still
    /// returns `Ok(())` — from the sender's point of view the datagram left;
    /// the network ate it.
    pub async fn send_to(&mut self, packet: &Packet, dest: SocketAddr) -> Result<(), SocketError> {
        if self.rng.gen_bool(self.config.loss_rate) {
            log::debug!("simulator: dropping packet to {dest}");
            return Ok(());
        }

        let mut bytes = packet.encode();
        if self.rng.gen_bool(self.config.corrupt_rate) {
            let bit = self.rng.gen_range(0..bytes.len() * 8);
            bytes[bit / 8] ^= 1 << (bit % 8);
            log::debug!("simulator: corrupting bit {bit} of packet to {dest}");
        }

        self.socket.send_raw(&bytes, dest).await
    }

    /// Receive the next packet from the wrapped socket, unmodified.
    pub async fn recv_from(&self) -> Result<(Packet, SocketAddr), SocketError> {
        self.socket.recv_from().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_fault_free() {
        let cfg = SimulatorConfig::default();
        assert_eq!(cfg.loss_rate, 0.0);
        assert_eq!(cfg.corrupt_rate, 0.0);
    }

    #[test]
    fn seeded_rng_is_deterministic() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..32 {
            assert_eq!(a.gen_bool(0.5), b.gen_bool(0.5));
        }
    }
}
