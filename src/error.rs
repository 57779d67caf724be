//! Error taxonomy for the RRC core.
//!
//! Errors are grouped by how they propagate (see the design notes): admission
//! errors are always surfaced to the L7 originator, integrity and transport
//! errors are recovered locally (dropped, counted, logged), and protocol
//! errors drive an FSM back to a safe state.

use core::fmt;

/// Errors returned synchronously from the admission path to L7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AdmissionError {
    /// Payload exceeds the configured MTU.
    PayloadTooLarge,
    /// The target queue was full and the new frame was not of higher
    /// priority than anything already queued.
    BufferFull,
    /// L3 reported no route to the destination.
    NoRouteAvailable,
    /// L2 reported that the next hop has no usable slot right now.
    TdmaSlotUnavailable,
    /// The next hop's link quality fails the usability predicate.
    PhyLinkPoor,
    /// A request to a collaborator subsystem did not complete before its
    /// deadline.
    Timeout,
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AdmissionError::PayloadTooLarge => "payload exceeds configured MTU",
            AdmissionError::BufferFull => "target queue is full",
            AdmissionError::NoRouteAvailable => "no route to destination",
            AdmissionError::TdmaSlotUnavailable => "next hop has no usable TDMA slot",
            AdmissionError::PhyLinkPoor => "next hop link quality is not usable",
            AdmissionError::Timeout => "collaborator request timed out",
        })
    }
}

impl std::error::Error for AdmissionError {}

/// Errors detected while parsing or relaying frames. Never surfaced to L7;
/// counted and logged instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum IntegrityError {
    /// The frame's checksum did not match its payload.
    ChecksumMismatch,
    /// TTL reached zero before the frame could be relayed further.
    TtlExpired,
    /// The frame failed a structural invariant (bad length, bad priority/datatype pairing, ...).
    InvalidFrame,
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IntegrityError::ChecksumMismatch => "checksum mismatch",
            IntegrityError::TtlExpired => "TTL expired",
            IntegrityError::InvalidFrame => "invalid frame",
        })
    }
}

impl std::error::Error for IntegrityError {}

/// Errors in the voice reservation / NC slot protocols. Drive an FSM
/// transition back to a safe state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProtocolError {
    /// No CC was received within `NC_SLOT_TIMEOUT_MS` of sending a CR.
    ReservationTimeout,
    /// Two neighbors claim the same NC slot index.
    NcSlotConflict,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProtocolError::ReservationTimeout => "voice reservation timed out",
            ProtocolError::NcSlotConflict => "NC slot conflict",
        })
    }
}

impl std::error::Error for ProtocolError {}

/// Errors from the IPC fabric connecting RRC to L7/L3/L2/PHY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// The peer subsystem's channel is gone (hung up / process exited).
    PeerUnavailable,
    /// An outbound channel stayed full for longer than the bounded wait.
    ChannelFull,
    /// A received message did not parse into its expected shape.
    MessageMalformed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportError::PeerUnavailable => "peer subsystem unavailable",
            TransportError::ChannelFull => "outbound channel full",
            TransportError::MessageMalformed => "malformed message",
        })
    }
}

impl std::error::Error for TransportError {}

/// Counters for errors that are recovered locally rather than surfaced.
///
/// Read by the `dump-state` CLI subcommand and by tests asserting on
/// boundary behavior (e.g. S5's `slot_unavailable` counter).
#[derive(Debug, Default, Clone, Copy, serde::Serialize)]
pub struct Counters {
    pub checksum_mismatch: u64,
    pub ttl_expired: u64,
    pub invalid_frame: u64,
    pub reservation_timeout: u64,
    pub nc_slot_conflict: u64,
    pub peer_unavailable: u64,
    pub channel_full: u64,
    pub message_malformed: u64,
    pub slot_unavailable: u64,
    pub no_route_for_relay: u64,
}

impl Counters {
    pub fn record_integrity(&mut self, err: IntegrityError) {
        match err {
            IntegrityError::ChecksumMismatch => self.checksum_mismatch += 1,
            IntegrityError::TtlExpired => self.ttl_expired += 1,
            IntegrityError::InvalidFrame => self.invalid_frame += 1,
        }
    }

    pub fn record_protocol(&mut self, err: ProtocolError) {
        match err {
            ProtocolError::ReservationTimeout => self.reservation_timeout += 1,
            ProtocolError::NcSlotConflict => self.nc_slot_conflict += 1,
        }
    }

    pub fn record_transport(&mut self, err: TransportError) {
        match err {
            TransportError::PeerUnavailable => self.peer_unavailable += 1,
            TransportError::ChannelFull => self.channel_full += 1,
            TransportError::MessageMalformed => self.message_malformed += 1,
        }
    }
}
