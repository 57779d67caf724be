//! Messages exchanged with the L2 (TDMA/radio link) layer (§4.5, §4.6, §6).

use super::RequestId;
use crate::frame::Frame;
use crate::message::PriorityClass;

/// Messages RRC sends down to L2.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Confirm `next_hop` has a usable, allocated slot of the right class
    /// before committing to transmit (§4.5's slot-check round trip).
    SlotCheckRequest {
        request_id: RequestId,
        next_hop: u8,
        priority: PriorityClass,
    },
    /// Hand a frame to L2 for transmission in the current slot.
    Transmit(Frame),
    /// Announce this node's NC slot claim (§4.7).
    NcSlotClaim { slot: u32 },
}

/// Messages L2 sends up to RRC.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// Response to a previous `SlotCheckRequest`.
    SlotCheckResponse {
        request_id: RequestId,
        available: bool,
    },
    /// A frame was received over the air, for relay/delivery handling
    /// (§4.6).
    FrameReceived(Frame),
    /// The current TDMA slot index advanced; drives the tick loop's
    /// per-slot scheduling decision.
    SlotTick { slot_index: u8 },
    /// A neighbor announced its own NC slot claim, heard over the air
    /// (§4.7's collision-avoidance bitmap is only useful once real neighbor
    /// claims are recorded into it).
    NcSlotClaim { node_id: u8, slot: u32 },
}
