//! Retransmission policy.
//!
//! The reliable-send primitive is stop-and-wait ARQ: transmit, wait a fixed
//! time for an ACK, retransmit on anything else.  [`RetryPolicy`] holds the
//! two knobs of that loop — the per-attempt timeout and the attempt bound.
//!
//! There is no RTT estimation and no exponential back-off: every attempt
//! waits the same fixed timeout, and the loop stops only on a valid ACK,
//! attempt exhaustion, or a fatal socket error.

use std::time::Duration;

/// Default ceiling on transmissions of a single packet.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// Default wait for an ACK after each transmission.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Adjustable retransmission parameters for one connection.
///
/// The same timeout bounds the handshake's wait for SYN+ACK and the
/// teardown's wait for the FIN ACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum transmissions of one packet before giving up.
    pub max_attempts: u32,
    /// Fixed wait for an ACK after each transmission.
    pub ack_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 1000);
        assert_eq!(p.ack_timeout, Duration::from_secs(10));
    }
}
