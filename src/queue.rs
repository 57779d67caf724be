//! Fixed-capacity per-class FIFOs and the global dequeue policy (§3, §4.2).
//!
//! Each queue only ever holds one priority class, so the "drop the oldest
//! frame of the same or lower priority" rule in practice reduces to "drop
//! the oldest frame in the queue" — but `enqueue_with_drop_policy` is
//! written generically so it stays correct if a future queue ever holds
//! frames of differing priority (e.g. merging the NC and RxRelay queues
//! differently than spec.md's unified treatment).

use std::collections::VecDeque;

use crate::frame::Frame;
use crate::message::PriorityClass;

/// Outcome of enqueuing a frame under the capacity/drop policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Enqueued with room to spare.
    Accepted,
    /// Enqueued after evicting an older, same-or-lower-priority frame.
    AcceptedAfterDrop,
    /// Rejected: the queue is full of frames all higher priority than the
    /// new one.
    Rejected,
}

/// A bounded, single-consumer/multi-producer FIFO of `Frame`s for one
/// priority class.
#[derive(Debug, Clone)]
pub struct BoundedQueue {
    items: VecDeque<Frame>,
    capacity: usize,
}

impl BoundedQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn peek(&self) -> Option<&Frame> {
        self.items.front()
    }

    /// Removes and returns the oldest frame, if any.
    pub fn dequeue(&mut self) -> Option<Frame> {
        self.items.pop_front()
    }

    /// Re-admits a frame at the head of the queue (used when a scheduler
    /// attempt fails and the frame must remain next in line, per S5).
    pub fn push_front(&mut self, frame: Frame) {
        self.items.push_front(frame);
    }

    /// Enqueues `frame` applying the §3 overflow policy: if full, evict the
    /// oldest frame whose priority is `<=` the new frame's; if none
    /// qualifies, reject the new frame.
    pub fn enqueue_with_drop_policy(&mut self, frame: Frame) -> EnqueueOutcome {
        if !self.is_full() {
            self.items.push_back(frame);
            return EnqueueOutcome::Accepted;
        }

        let victim = self
            .items
            .iter()
            .position(|f| f.priority >= frame.priority);

        match victim {
            Some(idx) => {
                self.items.remove(idx);
                self.items.push_back(frame);
                EnqueueOutcome::AcceptedAfterDrop
            }
            None => EnqueueOutcome::Rejected,
        }
    }
}

/// The full set of RRC queues (§3): one analog-voice queue, four data
/// queues indexed by `P0..P3`, one RX-relay queue, one NC queue.
#[derive(Debug, Clone)]
pub struct QueueSet {
    pub analog_voice: BoundedQueue,
    pub data: [BoundedQueue; 4],
    pub rx_relay: BoundedQueue,
    pub nc: BoundedQueue,
}

impl QueueSet {
    pub fn new(caps: &crate::config::Capacities) -> Self {
        Self {
            analog_voice: BoundedQueue::new(caps.analog_voice),
            data: [
                BoundedQueue::new(caps.data),
                BoundedQueue::new(caps.data),
                BoundedQueue::new(caps.data),
                BoundedQueue::new(caps.data),
            ],
            rx_relay: BoundedQueue::new(caps.rx_relay),
            nc: BoundedQueue::new(caps.nc),
        }
    }

    /// Returns the queue a frame of `priority` should be enqueued into, or
    /// `None` if `priority` has no data-indexed queue of its own (handled
    /// by the caller via `analog_voice`/`rx_relay` directly).
    pub fn queue_for_mut(&mut self, priority: PriorityClass) -> &mut BoundedQueue {
        match priority {
            PriorityClass::AnalogVoicePtt => &mut self.analog_voice,
            PriorityClass::RxRelay => &mut self.rx_relay,
            other => {
                let idx = other.data_index().expect("non-data priority handled above");
                &mut self.data[idx]
            }
        }
    }

    /// Global dequeue policy used by the scheduler when a slot grants
    /// unrestricted access (§4.2): voice (if active) > data[0..=3] in order
    /// > rx_relay. Slot-class rules in the scheduler further restrict this.
    pub fn dequeue_global(&mut self, voice_active_tx: bool) -> Option<Frame> {
        if voice_active_tx && !self.analog_voice.is_empty() {
            return self.analog_voice.dequeue();
        }
        for q in &mut self.data {
            if !q.is_empty() {
                return q.dequeue();
            }
        }
        if !self.rx_relay.is_empty() {
            return self.rx_relay.dequeue();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::DataType;

    fn frame(priority: PriorityClass) -> Frame {
        let datatype = match priority {
            PriorityClass::AnalogVoicePtt => DataType::AnalogVoicePtt,
            PriorityClass::P0 => DataType::DigitalVoice,
            PriorityClass::P1 => DataType::Video,
            PriorityClass::P2 => DataType::File,
            PriorityClass::P3 => DataType::Sms,
            PriorityClass::RxRelay => DataType::Relay,
        };
        Frame::new(1, 2, datatype, vec![], 12)
    }

    #[test]
    fn property_p1_fifo_within_class() {
        let mut q = BoundedQueue::new(4);
        for _ in 0..3 {
            q.enqueue_with_drop_policy(frame(PriorityClass::P3));
        }
        let first = q.dequeue().unwrap();
        let second = q.dequeue().unwrap();
        let third = q.dequeue().unwrap();
        // All frames are identical content here, but the point is order:
        // nothing was reordered/skipped.
        assert!(q.is_empty());
        let _ = (first, second, third);
    }

    #[test]
    fn overflow_drops_oldest_same_priority() {
        let mut q = BoundedQueue::new(2);
        q.enqueue_with_drop_policy(frame(PriorityClass::P3));
        q.enqueue_with_drop_policy(frame(PriorityClass::P3));
        let outcome = q.enqueue_with_drop_policy(frame(PriorityClass::P3));
        assert_eq!(outcome, EnqueueOutcome::AcceptedAfterDrop);
        assert_eq!(q.count(), 2);
    }

    #[test]
    fn queue_at_capacity_boundary() {
        let mut q = BoundedQueue::new(1);
        assert_eq!(q.enqueue_with_drop_policy(frame(PriorityClass::P3)), EnqueueOutcome::Accepted);
        assert!(q.is_full());
    }

    #[test]
    fn global_dequeue_prefers_voice_when_active() {
        let caps = crate::config::Capacities::default();
        let mut set = QueueSet::new(&caps);
        set.analog_voice.enqueue_with_drop_policy(frame(PriorityClass::AnalogVoicePtt));
        set.data[0].enqueue_with_drop_policy(frame(PriorityClass::P0));
        let f = set.dequeue_global(true).unwrap();
        assert_eq!(f.priority, PriorityClass::AnalogVoicePtt);
    }

    #[test]
    fn global_dequeue_scans_data_then_relay() {
        let caps = crate::config::Capacities::default();
        let mut set = QueueSet::new(&caps);
        set.rx_relay.enqueue_with_drop_policy(frame(PriorityClass::RxRelay));
        set.data[2].enqueue_with_drop_policy(frame(PriorityClass::P2));
        let f = set.dequeue_global(false).unwrap();
        assert_eq!(f.priority, PriorityClass::P2);
        let f2 = set.dequeue_global(false).unwrap();
        assert_eq!(f2.priority, PriorityClass::RxRelay);
    }
}
