//! L7 traffic types: data types, the total priority order, and the
//! `ApplicationMessage` that L7 hands down to RRC (§3, §4.1).

use serde::Serialize;

/// Application traffic type, tagging every message RRC admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    Sms,
    DigitalVoice,
    Video,
    File,
    AnalogVoicePtt,
    /// A frame received from L2 and awaiting forwarding; never originates
    /// from L7 directly.
    Relay,
    ToL3,
    Unknown,
}

impl DataType {
    /// The datatype -> priority-class mapping is a fixed total function
    /// (§4.1's table), never a match with a silent default fallthrough.
    pub const fn priority_class(self) -> PriorityClass {
        match self {
            DataType::AnalogVoicePtt => PriorityClass::AnalogVoicePtt,
            DataType::DigitalVoice => PriorityClass::P0,
            DataType::Video => PriorityClass::P1,
            DataType::File => PriorityClass::P2,
            DataType::Sms => PriorityClass::P3,
            DataType::Relay => PriorityClass::RxRelay,
            DataType::ToL3 => PriorityClass::P3,
            DataType::Unknown => PriorityClass::P3,
        }
    }
}

/// Priority class total order: `AnalogVoicePtt > P0 > P1 > P2 > P3 > RxRelay`.
///
/// Declaration order backs the derived `Ord`; no variant carries a signed
/// integer or sentinel value (see SPEC_FULL.md §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PriorityClass {
    AnalogVoicePtt,
    P0,
    P1,
    P2,
    P3,
    RxRelay,
}

impl PriorityClass {
    /// Index into the `data[0..=3]` queue array, if this class has one.
    pub const fn data_index(self) -> Option<usize> {
        match self {
            PriorityClass::P0 => Some(0),
            PriorityClass::P1 => Some(1),
            PriorityClass::P2 => Some(2),
            PriorityClass::P3 => Some(3),
            _ => None,
        }
    }
}

/// How a message should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransmissionType {
    Unicast,
    Multicast,
    Broadcast,
}

/// A unit of traffic handed down from L7 to RRC.
///
/// Created by L7, consumed by the classifier, turned into at most one
/// `Frame`, then released.
#[derive(Debug, Clone)]
pub struct ApplicationMessage {
    pub src_id: u8,
    pub dest_id: u8,
    pub datatype: DataType,
    pub transmission_type: TransmissionType,
    pub payload: Vec<u8>,
    pub sequence_number: u32,
    pub timestamp_ms: u64,
    pub preemption_allowed: bool,
}

impl ApplicationMessage {
    pub fn priority_class(&self) -> PriorityClass {
        self.datatype.priority_class()
    }
}
