//! End-to-end scenario tests driving `RrcCore` through its public API,
//! including the IPC round trips to a fake L2 collaborator running on a
//! background thread.

use std::sync::mpsc;
use std::thread;

use rrc_core::config::Config;
use rrc_core::core::RrcCore;
use rrc_core::ipc::{l2, phy, Coupling};
use rrc_core::time::{Instant, SystemTimer};
use rrc_core::topology::PhySample;

/// Builds an `RrcCore` wired to real mpsc channels, plus the sender/receiver
/// halves the test drives directly: a background thread always answers
/// `SlotCheckRequest`s with `slot_available` (echoing the request id it was
/// sent, never constructing one of its own), and a `phy_tx` the test uses
/// to seed neighbor samples.
fn core_with_l2_responder(
    node_id: u8,
    slot_available: bool,
) -> (RrcCore<SystemTimer>, mpsc::Receiver<l2::Outbound>, mpsc::Sender<phy::Inbound>) {
    let mut config = Config::default();
    config.node_id = node_id;
    // Generous deadline: the responder thread is local and near-instant,
    // but real wall-clock timing shouldn't make this test flaky.
    config.timeouts.slot_check_deadline_ms = 200;
    config.timeouts.max_scan_time_ms = 0;

    let (l7_out_tx, _l7_out_rx) = mpsc::channel();
    let (_l7_in_tx, l7_in_rx) = mpsc::channel();
    let (l3_out_tx, _l3_out_rx) = mpsc::channel();
    let (_l3_in_tx, l3_in_rx) = mpsc::channel();
    let (l2_out_tx, l2_out_rx) = mpsc::channel::<l2::Outbound>();
    let (l2_in_tx, l2_in_rx) = mpsc::channel::<l2::Inbound>();
    let (phy_tx, phy_rx) = mpsc::channel::<phy::Inbound>();

    let (observed_tx, observed_rx) = mpsc::channel::<l2::Outbound>();
    thread::spawn(move || {
        for msg in l2_out_rx.iter() {
            if let l2::Outbound::SlotCheckRequest { request_id, .. } = &msg {
                let _ = l2_in_tx.send(l2::Inbound::SlotCheckResponse {
                    request_id: *request_id,
                    available: slot_available,
                });
            }
            if observed_tx.send(msg).is_err() {
                break;
            }
        }
    });

    let l7 = Coupling::new(l7_out_tx, l7_in_rx);
    let l3 = Coupling::new(l3_out_tx, l3_in_rx);
    let l2 = Coupling::new(l2_out_tx, l2_in_rx);

    let core = RrcCore::new(config, SystemTimer::new(), l7, l3, l2, phy_rx);
    (core, observed_rx, phy_tx)
}

fn seed_neighbor(phy_tx: &mpsc::Sender<phy::Inbound>, neighbor: u8) {
    phy_tx
        .send(phy::Inbound::Sample(PhySample {
            node_id: neighbor,
            rssi_dbm: -60.0,
            snr_db: 20.0,
            per_pct: 1.0,
            timestamp: Instant::from_millis(0),
        }))
        .unwrap();
}

#[test]
fn s1_relay_frame_is_eventually_transmitted_to_l2() {
    let (mut core, observed, phy_tx) = core_with_l2_responder(1, true);
    seed_neighbor(&phy_tx, 2);
    core.tick(); // establishes sync and applies the seeded neighbor sample

    let mut frame = rrc_core::frame::Frame::new(9, 2, rrc_core::message::DataType::File, b"relay payload".to_vec(), 12);
    frame.destination_id = 2;
    frame.next_hop_id = 2;
    core.handle_rx_frame(frame);
    assert_eq!(core.queues().rx_relay.count(), 1);

    // GU-slot contention is probabilistic and the slot check resolves
    // asynchronously, so retry until a Transmit is actually observed.
    let mut transmitted = false;
    for _ in 0..50 {
        core.run_slot(4);
        if observed.try_iter().any(|msg| matches!(msg, l2::Outbound::Transmit(_))) {
            transmitted = true;
            break;
        }
    }
    assert!(transmitted, "expected a Transmit message to reach L2");
    assert!(core.queues().rx_relay.is_empty(), "relay frame should eventually transmit");
}

#[test]
fn s5_slot_unavailable_bounces_frame_back_to_queue() {
    let (mut core, _observed, phy_tx) = core_with_l2_responder(1, false);
    seed_neighbor(&phy_tx, 2);
    core.tick();

    let mut frame = rrc_core::frame::Frame::new(9, 2, rrc_core::message::DataType::File, b"relay payload".to_vec(), 12);
    frame.destination_id = 2;
    frame.next_hop_id = 2;
    core.handle_rx_frame(frame);
    assert_eq!(core.queues().rx_relay.count(), 1);

    // The first call only issues the async slot-check request; it resolves
    // on a later call once the responder thread's reply has arrived.
    for _ in 0..50 {
        core.run_slot(4);
        if core.counters().slot_unavailable > 0 {
            break;
        }
    }

    assert_eq!(core.queues().rx_relay.count(), 1, "frame must remain queued when L2 reports no slot");
    assert_eq!(core.counters().slot_unavailable, 1);
}

#[test]
fn s2_three_analog_voice_frames_drain_across_three_mv_slots() {
    let (mut core, observed, phy_tx) = core_with_l2_responder(1, true);
    seed_neighbor(&phy_tx, 2);
    core.tick();

    for _ in 0..3 {
        let outcome = core.admit(rrc_core::message::ApplicationMessage {
            src_id: 1,
            dest_id: 2,
            datatype: rrc_core::message::DataType::AnalogVoicePtt,
            transmission_type: rrc_core::message::TransmissionType::Unicast,
            payload: b"v".to_vec(),
            sequence_number: 1,
            timestamp_ms: 0,
            preemption_allowed: false,
        });
        // The destination is a direct neighbor (seeded above), so admission
        // never needs an L3 round trip and should always succeed.
        assert_eq!(outcome, rrc_core::classifier::AdmissionOutcome::Accepted);
    }

    core.handle_voice_event(rrc_core::voice::VoiceEvent::PttPress);
    core.handle_voice_event(rrc_core::voice::VoiceEvent::ContentionSucceeded);
    core.handle_voice_event(rrc_core::voice::VoiceEvent::CcReceived);
    assert!(core.voice().is_active_tx());

    // Each MV slot may only issue the async slot-check request; a later
    // slot call polls it and transmits once the responder thread answers.
    let mut transmitted = 0;
    for _ in 0..50 {
        core.run_slot(0); // MV slot: voice has exclusive access while ActiveTx.
        transmitted += observed
            .try_iter()
            .filter(|msg| matches!(msg, l2::Outbound::Transmit(_)))
            .count();
        if transmitted >= 3 {
            break;
        }
    }
    assert_eq!(transmitted, 3, "all three analog-voice frames should transmit in MV slots");
}

#[test]
fn ensure_nc_slot_is_idempotent_across_calls() {
    let (mut core, _observed, _phy_tx) = core_with_l2_responder(7, true);
    core.ensure_nc_slot();
    let slot = core.my_nc_slot();
    assert!(slot.is_some());
    core.ensure_nc_slot();
    assert_eq!(core.my_nc_slot(), slot);
}
