//! Messages exchanged with the L7 application layer (§6).

use super::RequestId;
use crate::error::AdmissionError;
use crate::message::ApplicationMessage;
use crate::voice::VoiceEvent;

/// Messages L7 sends down to RRC.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// A new message to classify and admit (§4.1).
    Admit(ApplicationMessage),
    /// A PTT/CR/CC voice-control event from the handset (§4.5).
    VoiceEvent(VoiceEvent),
}

/// Messages RRC sends up to L7.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// The outcome of a previously submitted `Admit` request.
    AdmissionResult {
        request_id: RequestId,
        accepted: bool,
        error: Option<AdmissionError>,
    },
    /// A frame addressed to this node was fully delivered (§4.6).
    Delivered {
        source_id: u8,
        payload: Vec<u8>,
    },
}
