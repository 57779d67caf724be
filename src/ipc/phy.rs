//! Messages exchanged with the PHY layer (§4.3, §4.4, §6). PHY never
//! receives requests from RRC in this design — it is a pure sample/beacon
//! source — so there is no `Outbound` variant here.

use crate::time::Beacon;
use crate::topology::PhySample;

/// Messages PHY sends up to RRC.
#[derive(Debug, Clone, Copy)]
pub enum Inbound {
    /// A fresh RSSI/SNR/PER sample for one neighbor (§4.3).
    Sample(PhySample),
    /// A beacon heard during an NC slot, for time-sync averaging (§4.4).
    BeaconHeard(Beacon),
}
