//! Per-slot decision logic and the fixed TDMA slot schedule (§4.5).

use crate::frame::Frame;
use crate::message::PriorityClass;
use crate::queue::QueueSet;
use crate::time::Instant;
use crate::topology::LinkQualityTracker;
use crate::voice::VoiceFsm;

/// The four TDMA slot classes (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotClass {
    /// Slot 0 (described as slot 1): Managed Voice, reservation-only.
    Mv,
    /// Slots 1-3 (described as 2-4): Dynamic Use.
    Du,
    /// Slots 4-7 (described as 5-8): General Use.
    Gu,
    /// Slots 8-9 (described as 9-10): Network Control.
    Nc,
}

/// Maps a 0-indexed slot within the superframe to its class, per spec.md's
/// fixed schedule table.
pub fn slot_class(slot_index: u8) -> SlotClass {
    match slot_index {
        0 => SlotClass::Mv,
        1..=3 => SlotClass::Du,
        4..=7 => SlotClass::Gu,
        8 | 9 => SlotClass::Nc,
        _ => unreachable!("slot_index out of range 0..10: {slot_index}"),
    }
}

/// Pluggable admission function for the GU slot's CSMA-style contention
/// (§4.8 / §9 open question: the source's `rand() % 100 < 50` is treated as
/// a pluggable default, not a fixed algorithm).
pub trait ContentionPolicy {
    fn admit(&mut self) -> bool;
}

/// Default contention policy: 50% admit probability, matching the source's
/// legacy simulation.
pub struct RandomContention {
    rng: rand::rngs::SmallRng,
}

impl RandomContention {
    pub fn new() -> Self {
        use rand::SeedableRng;
        Self {
            rng: rand::rngs::SmallRng::from_entropy(),
        }
    }
}

impl Default for RandomContention {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentionPolicy for RandomContention {
    fn admit(&mut self) -> bool {
        use rand::Rng;
        self.rng.gen_range(0..100) < 50
    }
}

/// Result of one per-slot scheduling decision.
#[derive(Debug)]
pub enum SlotDecision {
    /// A frame was dequeued and can transmit immediately (no L2 round trip
    /// is needed — either it's an NC transmission in a slot we own, or the
    /// class's rules don't require a slot check).
    Transmit(Frame),
    /// A frame was dequeued and passed its local link-usability check, but
    /// still needs an L2 slot-check round trip before it can transmit. The
    /// caller is responsible for issuing that request asynchronously and
    /// holding the frame until the response arrives on a later tick (§5).
    NeedsSlotCheck(Frame),
    /// Nothing transmitted this slot.
    Idle(IdleReason),
    /// Not yet synchronized: listen only.
    Listen,
    /// An NC slot this node doesn't own: listen for beacons.
    ListenForBeacons,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    QueueEmpty,
    ContentionLost,
    SlotUnavailable,
    LinkNotUsable,
    Unsynchronized,
}

/// Makes the per-slot decision described in §4.5.
///
/// `now` is used for the link-quality usability check; `owns_nc_slot` is
/// this node's own (locally known, no round trip needed) NC slot
/// ownership; `contention` is consulted only in GU slots. Slot checks
/// against L2 are *not* performed here — see `SlotDecision::NeedsSlotCheck`.
#[allow(clippy::too_many_arguments)]
pub fn decide_slot(
    slot_index: u8,
    synchronized: bool,
    queues: &mut QueueSet,
    voice: &VoiceFsm,
    tracker: &LinkQualityTracker,
    owns_nc_slot: bool,
    contention: &mut impl ContentionPolicy,
    now: Instant,
) -> SlotDecision {
    if !synchronized {
        return SlotDecision::Listen;
    }

    match slot_class(slot_index) {
        SlotClass::Nc => {
            if owns_nc_slot {
                if queues.nc.is_empty() {
                    SlotDecision::Idle(IdleReason::QueueEmpty)
                } else {
                    take_and_verify(queues.nc.dequeue().unwrap(), queues, tracker, now, true)
                }
            } else {
                SlotDecision::ListenForBeacons
            }
        }
        SlotClass::Mv => {
            if voice.is_active_tx() && !queues.analog_voice.is_empty() {
                let frame = queues.analog_voice.dequeue().unwrap();
                take_and_verify(frame, queues, tracker, now, false)
            } else if !queues.data[0].is_empty() {
                let frame = queues.data[0].dequeue().unwrap();
                take_and_verify(frame, queues, tracker, now, false)
            } else {
                SlotDecision::Idle(IdleReason::QueueEmpty)
            }
        }
        SlotClass::Du => {
            if !queues.data[0].is_empty() {
                let frame = queues.data[0].dequeue().unwrap();
                take_and_verify(frame, queues, tracker, now, false)
            } else if !queues.data[1].is_empty() {
                let frame = queues.data[1].dequeue().unwrap();
                take_and_verify(frame, queues, tracker, now, false)
            } else {
                SlotDecision::Idle(IdleReason::QueueEmpty)
            }
        }
        SlotClass::Gu => {
            if !contention.admit() {
                return SlotDecision::Idle(IdleReason::ContentionLost);
            }
            let frame = queues
                .data[2]
                .dequeue()
                .or_else(|| queues.data[3].dequeue())
                .or_else(|| queues.rx_relay.dequeue());
            match frame {
                Some(frame) => take_and_verify(frame, queues, tracker, now, false),
                None => SlotDecision::Idle(IdleReason::QueueEmpty),
            }
        }
    }
}

/// Shared tail of the non-idle branches: checks link usability (a purely
/// local, synchronous check) before deciding whether the frame can
/// transmit immediately or still needs an L2 slot-check round trip. On
/// failure, returns the frame to the head of its queue (S5) and goes idle.
fn take_and_verify(
    frame: Frame,
    queues: &mut QueueSet,
    tracker: &LinkQualityTracker,
    now: Instant,
    is_nc: bool,
) -> SlotDecision {
    if !tracker.usable(frame.next_hop_id, now) {
        let priority = frame.priority;
        requeue_front(queues, priority, frame);
        return SlotDecision::Idle(IdleReason::LinkNotUsable);
    }

    if is_nc {
        SlotDecision::Transmit(frame)
    } else {
        SlotDecision::NeedsSlotCheck(frame)
    }
}

fn requeue_front(queues: &mut QueueSet, priority: PriorityClass, frame: Frame) {
    queues.queue_for_mut(priority).push_front(frame);
}
