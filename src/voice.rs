//! The PTT/CR/CC voice-reservation state machine granting exclusive access
//! to the MV slot (§4.5).

use crate::error::ProtocolError;
use crate::time::{Duration, Instant};

/// Voice FSM states. Only `ActiveTx` grants exclusive MV-slot access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum VoiceFsmState {
    Inactive,
    CrSent,
    ActiveTx,
}

/// Events the voice FSM reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEvent {
    PttPress,
    PttRelease,
    ContentionSucceeded,
    ContentionFailed,
    CcReceived,
    EndCall,
}

/// Action the caller must take in response to a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceAction {
    /// No side effect beyond the state change.
    None,
    /// Enqueue a CR frame at P0 and attempt contention in the next DU/GU slot.
    EnqueueCr,
    /// Drain the analog-voice queue (call ended).
    DrainAnalogVoice,
}

/// The voice-reservation FSM.
pub struct VoiceFsm {
    state: VoiceFsmState,
    cr_sent_at: Option<Instant>,
}

impl Default for VoiceFsm {
    fn default() -> Self {
        Self {
            state: VoiceFsmState::Inactive,
            cr_sent_at: None,
        }
    }
}

impl VoiceFsm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> VoiceFsmState {
        self.state
    }

    pub fn is_active_tx(&self) -> bool {
        self.state == VoiceFsmState::ActiveTx
    }

    /// Applies `event`, returning the action the caller must perform.
    ///
    /// Invalid event/state combinations are no-ops (e.g. a PTT press while
    /// already `CrSent`): the FSM only transitions on the combinations
    /// spec.md §4.5 names.
    pub fn handle(&mut self, event: VoiceEvent, now: Instant) -> VoiceAction {
        use VoiceEvent::*;
        use VoiceFsmState::*;

        match (self.state, event) {
            (Inactive, PttPress) => {
                // Stay Inactive until contention actually succeeds; the
                // caller enqueues the CR frame and attempts contention.
                VoiceAction::EnqueueCr
            }
            (Inactive, ContentionSucceeded) => {
                self.state = CrSent;
                self.cr_sent_at = Some(now);
                log::debug!("voice FSM: Inactive -> CrSent");
                VoiceAction::None
            }
            (Inactive, ContentionFailed) => {
                // Remain Inactive.
                VoiceAction::None
            }
            (CrSent, CcReceived) => {
                self.state = ActiveTx;
                self.cr_sent_at = None;
                log::info!("voice FSM: CrSent -> ActiveTx");
                VoiceAction::None
            }
            (ActiveTx, EndCall) | (ActiveTx, PttRelease) => {
                self.state = Inactive;
                self.cr_sent_at = None;
                log::debug!("voice FSM: ActiveTx -> Inactive");
                VoiceAction::DrainAnalogVoice
            }
            _ => VoiceAction::None,
        }
    }

    /// Checks the CR->CC timeout. If `CrSent` for longer than `cc_deadline`,
    /// reverts to `Inactive` and returns the protocol error to surface
    /// (§4.5, "Timeouts").
    pub fn check_timeout(&mut self, now: Instant, cc_deadline: Duration) -> Option<ProtocolError> {
        if self.state != VoiceFsmState::CrSent {
            return None;
        }
        let sent_at = self.cr_sent_at?;
        if now.duration_since(sent_at) >= cc_deadline {
            self.state = VoiceFsmState::Inactive;
            self.cr_sent_at = None;
            log::warn!("voice reservation timed out, reverting to Inactive");
            Some(ProtocolError::ReservationTimeout)
        } else {
            None
        }
    }
}
