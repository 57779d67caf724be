//! Classification and admission of L7 traffic into the queue set (§4.1).

use crate::config::Config;
use crate::error::AdmissionError;
use crate::frame::Frame;
use crate::message::{ApplicationMessage, DataType};
use crate::queue::{EnqueueOutcome, QueueSet};

/// Outcome of an admission attempt, returned to L7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Accepted,
    /// The destination isn't a direct neighbor; an L3 route lookup was
    /// issued and admission will complete asynchronously once it answers
    /// (§5 — never block the tick loop on this).
    Pending,
    Dropped(AdmissionError),
}

/// Classifies and admits a single `ApplicationMessage` once its next hop is
/// already known — either because the destination is a direct neighbor, or
/// because an L3 route lookup has already resolved (§4.1).
///
/// On `Accepted`, the frame has already been pushed into the appropriate
/// queue in `queues`; on `Dropped`, nothing was enqueued.
pub fn admit_with_route(
    msg: ApplicationMessage,
    next_hop: u8,
    queues: &mut QueueSet,
    config: &Config,
) -> AdmissionOutcome {
    if msg.payload.len() > config.mtu {
        return AdmissionOutcome::Dropped(AdmissionError::PayloadTooLarge);
    }

    if matches!(msg.datatype, DataType::Unknown) {
        log::warn!(
            "admitting message with Unknown datatype from {} to {}",
            msg.src_id,
            msg.dest_id
        );
    }

    let mut frame = Frame::new(
        msg.src_id,
        msg.dest_id,
        msg.datatype,
        msg.payload,
        config.initial_ttl,
    );
    frame.next_hop_id = next_hop;

    let queue = queues.queue_for_mut(frame.priority);
    match queue.enqueue_with_drop_policy(frame) {
        EnqueueOutcome::Accepted | EnqueueOutcome::AcceptedAfterDrop => AdmissionOutcome::Accepted,
        EnqueueOutcome::Rejected => AdmissionOutcome::Dropped(AdmissionError::BufferFull),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::TransmissionType;

    fn message(dest: u8, datatype: DataType, payload: &[u8]) -> ApplicationMessage {
        ApplicationMessage {
            src_id: 254,
            dest_id: dest,
            datatype,
            transmission_type: TransmissionType::Unicast,
            payload: payload.to_vec(),
            sequence_number: 1,
            timestamp_ms: 0,
            preemption_allowed: false,
        }
    }

    #[test]
    fn s1_admission_happy_path() {
        let config = Config::default();
        let mut queues = QueueSet::new(&config.capacities);

        let outcome = admit_with_route(message(1, DataType::Sms, b"Hello"), 1, &mut queues, &config);

        assert_eq!(outcome, AdmissionOutcome::Accepted);
        assert_eq!(queues.data[3].count(), 1);
        let frame = queues.data[3].peek().unwrap();
        assert_eq!(frame.next_hop_id, 1);
        assert!(frame.checksum_ok());
    }

    #[test]
    fn payload_over_mtu_rejected() {
        let mut config = Config::default();
        config.mtu = 4;
        let mut queues = QueueSet::new(&config.capacities);

        let outcome = admit_with_route(message(1, DataType::Sms, b"Hello"), 1, &mut queues, &config);
        assert_eq!(outcome, AdmissionOutcome::Dropped(AdmissionError::PayloadTooLarge));
    }

    #[test]
    fn payload_equal_to_mtu_accepted() {
        let mut config = Config::default();
        config.mtu = 5;
        let mut queues = QueueSet::new(&config.capacities);

        let outcome = admit_with_route(message(1, DataType::Sms, b"Hello"), 1, &mut queues, &config);
        assert_eq!(outcome, AdmissionOutcome::Accepted);
    }

    #[test]
    fn datatype_table_routes_to_correct_queue() {
        let config = Config::default();
        let mut queues = QueueSet::new(&config.capacities);

        admit_with_route(message(1, DataType::DigitalVoice, b"v"), 1, &mut queues, &config);
        assert_eq!(queues.data[0].count(), 1);

        admit_with_route(message(1, DataType::Video, b"v"), 1, &mut queues, &config);
        assert_eq!(queues.data[1].count(), 1);

        admit_with_route(message(1, DataType::File, b"v"), 1, &mut queues, &config);
        assert_eq!(queues.data[2].count(), 1);

        admit_with_route(message(1, DataType::ToL3, b"v"), 1, &mut queues, &config);
        assert_eq!(queues.data[3].count(), 1);

        admit_with_route(message(1, DataType::AnalogVoicePtt, b"v"), 1, &mut queues, &config);
        assert_eq!(queues.analog_voice.count(), 1);
    }
}
