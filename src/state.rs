//! Connection finite-state machine (FSM) types.
//!
//! This module defines every state a [`crate::connection::Connection`] can
//! occupy.  State transitions are *not* implemented here — they live in
//! [`crate::connection`].
//!
//! The diagram is deliberately small: the protocol allows a single peer,
//! a single connection per endpoint, and only the initiator sends FIN, so
//! none of the symmetric-close states of full TCP exist here.

/// All possible states of the connection FSM.
///
/// ```text
///                 SYN sent            SYN+ACK rcvd, ACK sent
///   CLOSED ────────────────▶ SYN_SENT ────────────────▶ ESTABLISHED
///      ▲                                                     │
///      │              FIN ACKed or timeout                   │ FIN sent
///      └──────────────────────────────── CLOSING ◀───────────┘
/// ```
///
/// The responder skips `SYN_SENT`: it moves straight from `Closed` to
/// `Established` after replying SYN+ACK, and from `Established` to `Closed`
/// on local close (no FIN of its own).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection exists; initial and final state.
    #[default]
    Closed,
    /// SYN has been sent; waiting for SYN+ACK.
    SynSent,
    /// Handshake complete; runs may be transferred.
    Established,
    /// FIN sent; waiting (bounded) for its ACK.
    Closing,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
