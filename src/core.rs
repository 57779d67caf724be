//! `RrcCore`: owns all RRC state and drives the tick loop (§4.6, §5).

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Receiver;

use crate::classifier::{self, AdmissionOutcome};
use crate::config::Config;
use crate::connection::ConnectionTable;
use crate::error::{Counters, IntegrityError};
use crate::frame::Frame;
use crate::ipc::{l2, l3, l7, phy, Coupling, RequestId};
use crate::message::ApplicationMessage;
use crate::ncslot::{self, NcStatusBitmap};
use crate::queue::QueueSet;
use crate::scheduler::{self, RandomContention, SlotDecision};
use crate::time::{Beacon, Duration, Instant, TdmaSyncState, Timer};
use crate::topology::LinkQualityTracker;
use crate::voice::{VoiceEvent, VoiceFsm};

/// An L7 admission or an over-the-air relay frame that is waiting on an L3
/// route lookup to come back before it can be queued (§5: the lookup must
/// never block the tick loop, so the frame/message waits here instead).
enum PendingRoute {
    Admission(ApplicationMessage),
    Relay(Frame),
}

/// A frame that has passed its local checks and is waiting on an L2
/// slot-check response before it can transmit (§4.5, §5).
struct PendingSlotCheck {
    request_id: RequestId,
    frame: Frame,
}

/// Per-queue frame counts, for `StateSnapshot`.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct QueueDepths {
    pub analog_voice: usize,
    pub data: [usize; 4],
    pub rx_relay: usize,
    pub nc: usize,
}

/// A point-in-time dump of all `RrcCore` state, printed as JSON by the
/// `dump-state` CLI subcommand (§6.1).
#[derive(Debug, Clone, serde::Serialize)]
pub struct StateSnapshot {
    pub node_id: u8,
    pub sync: TdmaSyncState,
    pub voice_state: crate::voice::VoiceFsmState,
    pub my_nc_slot: Option<u32>,
    pub counters: Counters,
    pub queue_depths: QueueDepths,
    pub neighbors: Vec<crate::topology::NeighborLinkState>,
}

/// Owns every piece of mutable RRC state for one node and drives the tick
/// loop described in §5: drain inbound channels non-blockingly, advance the
/// TDMA clock, make the per-slot decision, sweep timeouts. No method on
/// this type ever blocks waiting on a collaborator response — a lookup
/// that can't be answered immediately is parked in `pending_routes` or
/// `pending_slot_check` and resolved on a later tick.
pub struct RrcCore<T: Timer> {
    config: Config,
    timer: T,
    queues: QueueSet,
    tracker: LinkQualityTracker,
    voice: VoiceFsm,
    sync: TdmaSyncState,
    connections: ConnectionTable,
    nc_bitmap: NcStatusBitmap,
    my_nc_slot: Option<u32>,
    active_node_count: u32,
    epoch: u32,
    counters: Counters,
    contention: RandomContention,
    direct_neighbors: HashSet<u8>,
    pending_routes: HashMap<RequestId, PendingRoute>,
    pending_slot_check: Option<PendingSlotCheck>,
    l7: Coupling<l7::Outbound, l7::Inbound>,
    l3: Coupling<l3::Outbound, l3::Inbound>,
    l2: Coupling<l2::Outbound, l2::Inbound>,
    phy_rx: Receiver<phy::Inbound>,
    last_tick: Option<Instant>,
}

impl<T: Timer> RrcCore<T> {
    pub fn new(
        config: Config,
        timer: T,
        l7: Coupling<l7::Outbound, l7::Inbound>,
        l3: Coupling<l3::Outbound, l3::Inbound>,
        l2: Coupling<l2::Outbound, l2::Inbound>,
        phy_rx: Receiver<phy::Inbound>,
    ) -> Self {
        let tracker = LinkQualityTracker::new(config.thresholds);
        let queues = QueueSet::new(&config.capacities);
        Self {
            config,
            timer,
            queues,
            tracker,
            voice: VoiceFsm::new(),
            sync: TdmaSyncState::new(),
            connections: ConnectionTable::new(),
            nc_bitmap: NcStatusBitmap::default(),
            my_nc_slot: None,
            active_node_count: 1,
            epoch: 0,
            counters: Counters::default(),
            contention: RandomContention::new(),
            direct_neighbors: HashSet::new(),
            pending_routes: HashMap::new(),
            pending_slot_check: None,
            l7,
            l3,
            l2,
            phy_rx,
            last_tick: None,
        }
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn queues(&self) -> &QueueSet {
        &self.queues
    }

    pub fn tracker(&self) -> &LinkQualityTracker {
        &self.tracker
    }

    pub fn sync(&self) -> &TdmaSyncState {
        &self.sync
    }

    pub fn voice(&self) -> &VoiceFsm {
        &self.voice
    }

    pub fn my_nc_slot(&self) -> Option<u32> {
        self.my_nc_slot
    }

    /// Builds a point-in-time JSON-serializable snapshot of all core state,
    /// for the `dump-state` CLI subcommand (§6.1).
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            node_id: self.config.node_id,
            sync: self.sync.clone(),
            voice_state: self.voice.state(),
            my_nc_slot: self.my_nc_slot,
            counters: self.counters,
            queue_depths: QueueDepths {
                analog_voice: self.queues.analog_voice.count(),
                data: [
                    self.queues.data[0].count(),
                    self.queues.data[1].count(),
                    self.queues.data[2].count(),
                    self.queues.data[3].count(),
                ],
                rx_relay: self.queues.rx_relay.count(),
                nc: self.queues.nc.count(),
            },
            neighbors: self.tracker.iter().copied().collect(),
        }
    }

    /// Classifies and admits one L7 message. A direct neighbor is admitted
    /// immediately; anything else needs an L3 route lookup, which is issued
    /// here and resolved asynchronously in `drain_l3_events` once the
    /// response (or a timeout) arrives — this call never blocks (§4.1, §5).
    pub fn admit(&mut self, msg: ApplicationMessage) -> AdmissionOutcome {
        let now = self.timer.now();
        if self.direct_neighbors.contains(&msg.dest_id) {
            return self.finish_admission(msg, msg.dest_id, now);
        }

        let timeout = Duration::from_millis(self.config.timeouts.request_deadline_ms);
        let request_id = self.l3.begin_request(now, timeout);
        match self.l3.send(l3::Outbound::RouteRequest { request_id, dest_id: msg.dest_id }) {
            Ok(()) => {
                self.pending_routes.insert(request_id, PendingRoute::Admission(msg));
                AdmissionOutcome::Pending
            }
            Err(err) => {
                self.counters.record_transport(err);
                AdmissionOutcome::Dropped(crate::error::AdmissionError::NoRouteAvailable)
            }
        }
    }

    /// Finishes admitting `msg` once its next hop is known, updating the
    /// per-destination connection context on success.
    fn finish_admission(&mut self, msg: ApplicationMessage, next_hop: u8, now: Instant) -> AdmissionOutcome {
        let dest_id = msg.dest_id;
        let priority = msg.priority_class();
        let outcome = classifier::admit_with_route(msg, next_hop, &mut self.queues, &self.config);
        if outcome == AdmissionOutcome::Accepted {
            self.connections.on_admission(dest_id, priority, now);
        }
        outcome
    }

    /// Handles one frame received over the air (§4.6): checksum/TTL
    /// integrity checks, local delivery, or relay. A relay whose
    /// destination isn't a direct neighbor needs an L3 route lookup, issued
    /// here and resolved asynchronously — this call never blocks (§5).
    pub fn handle_rx_frame(&mut self, mut frame: Frame) {
        if !frame.checksum_ok() {
            self.counters.record_integrity(IntegrityError::ChecksumMismatch);
            log::warn!("dropping frame from {}: checksum mismatch", frame.source_id);
            return;
        }

        if frame.is_local || frame.destination_id == self.config.node_id {
            let _ = self.l7.send(l7::Outbound::Delivered {
                source_id: frame.source_id,
                payload: frame.payload,
            });
            return;
        }

        if !frame.decrement_ttl() {
            self.counters.record_integrity(IntegrityError::TtlExpired);
            log::warn!("dropping frame from {} to {}: TTL expired", frame.source_id, frame.destination_id);
            return;
        }

        let now = self.timer.now();
        if self.direct_neighbors.contains(&frame.destination_id) {
            frame.next_hop_id = frame.destination_id;
            self.queues.rx_relay.enqueue_with_drop_policy(frame);
            return;
        }

        let timeout = Duration::from_millis(self.config.timeouts.request_deadline_ms);
        let request_id = self.l3.begin_request(now, timeout);
        match self.l3.send(l3::Outbound::RouteRequest { request_id, dest_id: frame.destination_id }) {
            Ok(()) => {
                self.pending_routes.insert(request_id, PendingRoute::Relay(frame));
            }
            Err(err) => {
                self.counters.record_transport(err);
                self.counters.no_route_for_relay += 1;
            }
        }
    }

    /// Runs the per-slot decision for `slot_index` (§4.5). If a slot check
    /// is already in flight from a previous slot, this first polls for its
    /// resolution (non-blocking); otherwise it makes a fresh decision and,
    /// if that decision needs an L2 slot check, issues it without waiting
    /// for the answer (§5).
    pub fn run_slot(&mut self, slot_index: u8) {
        let now = self.timer.now();

        if let Some(pending) = self.pending_slot_check.take() {
            match self.poll_slot_check(pending, now) {
                SlotCheckPoll::Available(frame) => self.transmit(frame, now),
                SlotCheckPoll::Unavailable(frame) => {
                    self.counters.slot_unavailable += 1;
                    let priority = frame.priority;
                    self.queues.queue_for_mut(priority).push_front(frame);
                }
                SlotCheckPoll::Pending(pending) => {
                    self.pending_slot_check = Some(pending);
                }
            }
            return;
        }

        let decision = scheduler::decide_slot(
            slot_index,
            self.sync.synchronized(),
            &mut self.queues,
            &self.voice,
            &self.tracker,
            self.my_nc_slot.is_some(),
            &mut self.contention,
            now,
        );

        match decision {
            SlotDecision::Transmit(frame) => self.transmit(frame, now),
            SlotDecision::NeedsSlotCheck(frame) => self.begin_slot_check(frame, now),
            SlotDecision::Idle(_) | SlotDecision::Listen | SlotDecision::ListenForBeacons => {}
        }
    }

    /// Issues a non-blocking `SlotCheckRequest` for `frame` and parks it in
    /// `pending_slot_check` until the response (or a timeout) arrives.
    fn begin_slot_check(&mut self, frame: Frame, now: Instant) {
        let timeout = Duration::from_millis(self.config.timeouts.slot_check_deadline_ms);
        let request_id = self.l2.begin_request(now, timeout);
        let priority = frame.priority;
        let next_hop = frame.next_hop_id;
        match self.l2.send(l2::Outbound::SlotCheckRequest { request_id, next_hop, priority }) {
            Ok(()) => {
                self.pending_slot_check = Some(PendingSlotCheck { request_id, frame });
            }
            Err(err) => {
                self.counters.record_transport(err);
                self.queues.queue_for_mut(priority).push_front(frame);
            }
        }
    }

    /// Polls for `pending`'s response without blocking: drains whatever L2
    /// has queued (dispatching anything that isn't the matching response
    /// through the normal handler so it isn't lost), then checks whether
    /// the request has expired.
    fn poll_slot_check(&mut self, pending: PendingSlotCheck, now: Instant) -> SlotCheckPoll {
        let PendingSlotCheck { request_id, frame } = pending;
        for msg in self.l2.drain() {
            if let l2::Inbound::SlotCheckResponse { request_id: id, available } = msg {
                if id == request_id {
                    self.l2.complete_request(id);
                    return if available {
                        SlotCheckPoll::Available(frame)
                    } else {
                        SlotCheckPoll::Unavailable(frame)
                    };
                }
                // Stale/duplicate response for a request we already
                // resolved; nothing to do with it.
                continue;
            }
            self.handle_l2_message(msg, now);
        }

        if self.l2.sweep_expired(now).iter().any(|id| *id == request_id) {
            log::warn!("L2 slot-check request {request_id:?} timed out");
            return SlotCheckPoll::Unavailable(frame);
        }

        SlotCheckPoll::Pending(PendingSlotCheck { request_id, frame })
    }

    fn transmit(&mut self, frame: Frame, now: Instant) {
        let destination = frame.destination_id;
        if let Err(err) = self.l2.send(l2::Outbound::Transmit(frame)) {
            self.counters.record_transport(err);
        } else {
            self.connections.on_transmit_success(destination, now);
        }
    }

    /// Advances the TDMA clock and drains every inbound channel
    /// non-blockingly; call once per 10 ms tick (§5).
    pub fn tick(&mut self) {
        let now = self.timer.now();
        let elapsed = match self.last_tick {
            Some(last) => now.duration_since(last).as_millis() as u32,
            None => crate::time::SLOT_DURATION_MS,
        };
        self.last_tick = Some(now);
        self.sync.advance(elapsed);

        if !self.sync.synchronized()
            && self
                .sync
                .scan_timed_out(now, Duration::from_millis(self.config.timeouts.max_scan_time_ms))
        {
            self.sync.declare_master(self.config.node_id, now);
        }

        self.drain_phy(now);
        self.drain_l7();
        self.drain_l3_events(now);
        self.drain_l2_events(now);
        self.sweep_timeouts(now);
    }

    fn drain_phy(&mut self, now: Instant) {
        loop {
            match self.phy_rx.try_recv() {
                Ok(phy::Inbound::Sample(sample)) => {
                    self.direct_neighbors.insert(sample.node_id);
                    if let Some(update) = self.tracker.apply_sample(sample) {
                        if let Err(err) = self.l3.send(l3::Outbound::TopologyChanged(update)) {
                            self.counters.record_transport(err);
                        }
                    }
                }
                Ok(phy::Inbound::BeaconHeard(beacon)) => {
                    self.apply_beacon(beacon, now);
                }
                Err(_) => break,
            }
        }
    }

    fn apply_beacon(&mut self, beacon: Beacon, now: Instant) {
        self.sync.sync_to_beacons(std::slice::from_ref(&beacon), now);
        self.direct_neighbors.insert(beacon.source);
    }

    fn drain_l7(&mut self) {
        for msg in self.l7.drain() {
            match msg {
                l7::Inbound::Admit(app_msg) => {
                    self.admit(app_msg);
                }
                l7::Inbound::VoiceEvent(event) => self.handle_voice_event(event),
            }
        }
    }

    /// Resolves any L3 route lookups that have answered since the last
    /// tick, completing the admission or relay that was waiting on them.
    fn drain_l3_events(&mut self, now: Instant) {
        for msg in self.l3.drain() {
            match msg {
                l3::Inbound::RouteResponse { request_id, next_hop } => {
                    self.l3.complete_request(request_id);
                    let Some(pending) = self.pending_routes.remove(&request_id) else {
                        continue;
                    };
                    match (pending, next_hop) {
                        (PendingRoute::Admission(msg), Some(hop)) => {
                            self.finish_admission(msg, hop, now);
                        }
                        (PendingRoute::Admission(msg), None) => {
                            log::info!("no route to {}: admission dropped", msg.dest_id);
                        }
                        (PendingRoute::Relay(mut frame), Some(hop)) => {
                            frame.next_hop_id = hop;
                            self.queues.rx_relay.enqueue_with_drop_policy(frame);
                        }
                        (PendingRoute::Relay(frame), None) => {
                            self.counters.no_route_for_relay += 1;
                            log::info!("no route to {}: relay frame dropped", frame.destination_id);
                        }
                    }
                }
                l3::Inbound::RouteAccepted { destination } => {
                    self.connections.on_route_accepted(destination);
                }
            }
        }
    }

    fn drain_l2_events(&mut self, now: Instant) {
        for msg in self.l2.drain() {
            self.handle_l2_message(msg, now);
        }
    }

    /// Dispatches one L2 inbound message. Shared between `drain_l2_events`
    /// and `poll_slot_check`, which also has to process whatever else L2
    /// sent while a slot-check response was in flight.
    fn handle_l2_message(&mut self, msg: l2::Inbound, now: Instant) {
        match msg {
            l2::Inbound::FrameReceived(frame) => self.handle_rx_frame(frame),
            l2::Inbound::SlotTick { slot_index } => self.run_slot(slot_index),
            l2::Inbound::NcSlotClaim { node_id, slot } => {
                self.nc_bitmap.set(slot);
                self.tracker.set_nc_slot(node_id, Some(slot as u8));
                self.tracker.note_heard(node_id, now);
                log::debug!("recorded NC slot claim: node {node_id} slot {slot}");
            }
            // A response to a request this node already gave up on (it
            // expired, or a duplicate arrived); nothing to do with it.
            l2::Inbound::SlotCheckResponse { .. } => {}
        }
    }

    fn sweep_timeouts(&mut self, now: Instant) {
        let inactivity = Duration::from_secs(self.config.timeouts.inactivity_timeout_s);
        let setup = Duration::from_secs(self.config.timeouts.setup_timeout_s);
        self.connections.sweep_timeouts(now, inactivity, setup);

        if let Some(err) = self
            .voice
            .check_timeout(now, Duration::from_millis(self.config.timeouts.voice_cc_deadline_ms))
        {
            self.counters.record_protocol(err);
        }

        for id in self.l3.sweep_expired(now) {
            if let Some(pending) = self.pending_routes.remove(&id) {
                match pending {
                    PendingRoute::Admission(msg) => {
                        log::warn!("L3 route request for admission to {} timed out", msg.dest_id);
                    }
                    PendingRoute::Relay(frame) => {
                        self.counters.no_route_for_relay += 1;
                        log::warn!("L3 route request for relay to {} timed out", frame.destination_id);
                    }
                }
            }
        }
        for id in self.l2.sweep_expired(now) {
            log::warn!("L2 request {id:?} timed out");
        }

        let evicted = self
            .tracker
            .evict_stale_nc(now, Duration::from_millis(self.config.timeouts.nc_slot_timeout_ms));
        for (node, slot) in evicted {
            self.nc_bitmap.clear(u32::from(slot));
            log::info!("evicted stale NC slot claim from node {node} (slot {slot})");
        }
    }

    /// Handles a PTT/CC event from the voice path, enqueuing a CR frame when
    /// asked (§4.5).
    pub fn handle_voice_event(&mut self, event: VoiceEvent) {
        let now = self.timer.now();
        let action = self.voice.handle(event, now);
        match action {
            crate::voice::VoiceAction::EnqueueCr => {
                let mut frame = Frame::new(
                    self.config.node_id,
                    0xFF,
                    crate::message::DataType::DigitalVoice,
                    Vec::new(),
                    self.config.initial_ttl,
                );
                frame.next_hop_id = 0xFF;
                self.queues.data[0].enqueue_with_drop_policy(frame);
            }
            crate::voice::VoiceAction::DrainAnalogVoice => {
                while self.queues.analog_voice.dequeue().is_some() {}
            }
            crate::voice::VoiceAction::None => {}
        }
    }

    /// Assigns this node's NC slot if it doesn't have one yet (§4.7).
    pub fn ensure_nc_slot(&mut self) {
        if self.my_nc_slot.is_some() {
            return;
        }
        if let Some(slot) = ncslot::pick_nc_slot(
            self.config.node_id,
            self.active_node_count,
            self.epoch,
            &self.nc_bitmap,
        ) {
            self.nc_bitmap.set(slot);
            self.my_nc_slot = Some(slot);
            if let Err(err) = self.l2.send(l2::Outbound::NcSlotClaim { slot }) {
                self.counters.record_transport(err);
            }
            log::info!("claimed NC slot {slot}");
        }
    }
}

/// Outcome of polling an in-flight `PendingSlotCheck`.
enum SlotCheckPoll {
    Available(Frame),
    Unavailable(Frame),
    Pending(PendingSlotCheck),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Instant as RrcInstant;
    use std::cell::Cell;

    struct FakeTimer(Cell<u64>);
    impl Timer for FakeTimer {
        fn now(&self) -> RrcInstant {
            RrcInstant::from_millis(self.0.get())
        }
    }

    fn couplings() -> (
        Coupling<l7::Outbound, l7::Inbound>,
        Coupling<l3::Outbound, l3::Inbound>,
        Coupling<l2::Outbound, l2::Inbound>,
        Receiver<phy::Inbound>,
    ) {
        use std::sync::mpsc::channel;
        let (l7_out_tx, _l7_out_rx) = channel();
        let (_l7_in_tx, l7_in_rx) = channel();
        let (l3_out_tx, _l3_out_rx) = channel();
        let (_l3_in_tx, l3_in_rx) = channel();
        let (l2_out_tx, _l2_out_rx) = channel();
        let (_l2_in_tx, l2_in_rx) = channel();
        let (_phy_tx, phy_rx) = channel();
        (
            Coupling::new(l7_out_tx, l7_in_rx),
            Coupling::new(l3_out_tx, l3_in_rx),
            Coupling::new(l2_out_tx, l2_in_rx),
            phy_rx,
        )
    }

    #[test]
    fn admission_of_direct_neighbor_enqueues_without_l3_round_trip() {
        let (l7, l3, l2, phy_rx) = couplings();
        let mut config = Config::default();
        config.node_id = 1;
        let mut core = RrcCore::new(config, FakeTimer(Cell::new(0)), l7, l3, l2, phy_rx);
        core.direct_neighbors.insert(2);

        let msg = ApplicationMessage {
            src_id: 1,
            dest_id: 2,
            datatype: crate::message::DataType::Sms,
            transmission_type: crate::message::TransmissionType::Unicast,
            payload: b"hi".to_vec(),
            sequence_number: 0,
            timestamp_ms: 0,
            preemption_allowed: false,
        };
        let outcome = core.admit(msg);
        assert_eq!(outcome, AdmissionOutcome::Accepted);
        assert_eq!(core.queues().data[3].count(), 1);
    }

    #[test]
    fn admission_of_non_neighbor_is_pending_until_l3_answers() {
        let (l7, l3, l2, phy_rx) = couplings();
        let mut config = Config::default();
        config.node_id = 1;
        let mut core = RrcCore::new(config, FakeTimer(Cell::new(0)), l7, l3, l2, phy_rx);

        let msg = ApplicationMessage {
            src_id: 1,
            dest_id: 9,
            datatype: crate::message::DataType::Sms,
            transmission_type: crate::message::TransmissionType::Unicast,
            payload: b"hi".to_vec(),
            sequence_number: 0,
            timestamp_ms: 0,
            preemption_allowed: false,
        };
        let outcome = core.admit(msg);
        assert_eq!(outcome, AdmissionOutcome::Pending);
        assert_eq!(core.queues().data[3].count(), 0, "must not enqueue before the route resolves");
        assert!(!core.pending_routes.is_empty());
    }

    #[test]
    fn handle_rx_frame_delivers_local_traffic() {
        let (l7, l3, l2, phy_rx) = couplings();
        let mut config = Config::default();
        config.node_id = 5;
        let mut core = RrcCore::new(config, FakeTimer(Cell::new(0)), l7, l3, l2, phy_rx);

        let mut frame = Frame::new(9, 5, crate::message::DataType::Sms, b"payload".to_vec(), 12);
        frame.next_hop_id = 5;
        core.handle_rx_frame(frame);
        // No direct observable without a receiver on the l7 outbound
        // channel in this fixture; the call completing without panicking
        // (and not landing in rx_relay) is the behavior under test.
        assert!(core.queues().rx_relay.is_empty());
    }

    #[test]
    fn checksum_mismatch_is_counted_and_dropped() {
        let (l7, l3, l2, phy_rx) = couplings();
        let core_config = Config::default();
        let mut core = RrcCore::new(core_config, FakeTimer(Cell::new(0)), l7, l3, l2, phy_rx);

        let mut frame = Frame::new(9, 5, crate::message::DataType::Sms, b"payload".to_vec(), 12);
        frame.checksum ^= 0xFFFF;
        core.handle_rx_frame(frame);
        assert_eq!(core.counters().checksum_mismatch, 1);
    }

    #[test]
    fn ttl_expired_relay_frame_is_counted_and_dropped() {
        let (l7, l3, l2, phy_rx) = couplings();
        let mut config = Config::default();
        config.node_id = 5;
        let mut core = RrcCore::new(config, FakeTimer(Cell::new(0)), l7, l3, l2, phy_rx);

        let mut frame = Frame::new(9, 7, crate::message::DataType::Relay, b"payload".to_vec(), 1);
        frame.next_hop_id = 6;
        frame.ttl = 1;
        frame.decrement_ttl();
        core.handle_rx_frame(frame);
        assert_eq!(core.counters().ttl_expired, 1);
    }

    #[test]
    fn ensure_nc_slot_claims_once() {
        let (l7, l3, l2, phy_rx) = couplings();
        let mut config = Config::default();
        config.node_id = 3;
        let mut core = RrcCore::new(config, FakeTimer(Cell::new(0)), l7, l3, l2, phy_rx);
        core.ensure_nc_slot();
        let first = core.my_nc_slot();
        assert!(first.is_some());
        core.ensure_nc_slot();
        assert_eq!(core.my_nc_slot(), first);
    }

    #[test]
    fn neighbor_nc_slot_claim_is_recorded_in_bitmap() {
        let (l7, l3, l2, phy_rx) = couplings();
        let config = Config::default();
        let mut core = RrcCore::new(config, FakeTimer(Cell::new(0)), l7, l3, l2, phy_rx);
        core.handle_l2_message(l2::Inbound::NcSlotClaim { node_id: 2, slot: 7 }, Instant::from_millis(0));
        assert!(core.nc_bitmap.is_set(7));
    }

    #[test]
    fn voice_event_drives_fsm() {
        let (l7, l3, l2, phy_rx) = couplings();
        let config = Config::default();
        let mut core = RrcCore::new(config, FakeTimer(Cell::new(0)), l7, l3, l2, phy_rx);
        core.handle_voice_event(VoiceEvent::PttPress);
        core.handle_voice_event(VoiceEvent::ContentionSucceeded);
        core.handle_voice_event(VoiceEvent::CcReceived);
        assert!(core.voice().is_active_tx());
    }
}
