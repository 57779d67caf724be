//! Messages exchanged with the L3 (OLSR-style routing) layer (§4.1, §4.3, §6).

use super::RequestId;
use crate::topology::TopologyUpdate;

/// Messages RRC sends down to L3.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Resolve a next hop for `dest_id` (§4.1 step 3).
    RouteRequest { request_id: RequestId, dest_id: u8 },
    /// Notify L3 of a link-quality change so it can re-run its routing
    /// computation (§4.3 step 2).
    TopologyChanged(TopologyUpdate),
}

/// Messages L3 sends up to RRC.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// Response to a previous `RouteRequest`; `None` means no route exists.
    RouteResponse {
        request_id: RequestId,
        next_hop: Option<u8>,
    },
    /// L3 rejects the currently active route for a destination under
    /// reconfiguration (§4.6, `ConnectionContext::Reconfig`).
    RouteAccepted { destination: u8 },
}
