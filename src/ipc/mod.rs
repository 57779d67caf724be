//! The IPC fabric connecting RRC to its four collaborators — L7, L3, L2,
//! PHY — and the request/response correlation used to track a request
//! issued to one of them against its eventual, asynchronously arriving
//! response (§5, §6).
//!
//! Each collaborator gets one inbound `Receiver` (messages arriving at RRC)
//! and one outbound `Sender` (messages RRC emits); `core::RrcCore` drains
//! the inbound side non-blockingly between ticks and uses `PendingTable` to
//! match a collaborator's response back to the request that triggered it,
//! or to notice it never answered before its deadline. Nothing in this
//! module ever blocks the calling thread — a request that needs an answer
//! before the tick loop can make progress (an L3 route, an L2 slot check)
//! is issued on one tick and resolved on a later one.

pub mod l2;
pub mod l3;
pub mod l7;
pub mod phy;

use std::sync::mpsc::{Receiver, Sender, TryRecvError};

use crate::error::TransportError;
use crate::time::{Duration, Instant};

/// Monotonically increasing identifier correlating a request to its
/// eventual response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

/// Hands out unique, increasing `RequestId`s for one `RrcCore` instance.
#[derive(Debug, Default)]
pub struct RequestIdGen(u64);

impl RequestIdGen {
    pub fn next(&mut self) -> RequestId {
        self.0 += 1;
        RequestId(self.0)
    }
}

/// Maximum number of requests any one collaborator may have outstanding at
/// once; bounds the pending table to a fixed-size buffer rather than an
/// unbounded map, matching the fixed-capacity style the rest of the core
/// uses for anything driven by untrusted/adversarial timing.
pub const MAX_PENDING_PER_COLLABORATOR: usize = 32;

/// An outstanding request awaiting a response, tracked for deadline
/// enforcement (§5: "a per-request deadline/timeout").
#[derive(Debug, Clone, Copy)]
struct PendingEntry {
    id: RequestId,
    deadline: Instant,
}

/// Fixed-capacity table of outstanding requests for one collaborator.
///
/// Built on `heapless::Vec` since the table is naturally bounded
/// (`MAX_PENDING_PER_COLLABORATOR`) and lives on `RrcCore` for the whole
/// process lifetime.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: heapless::Vec<PendingEntry, MAX_PENDING_PER_COLLABORATOR>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly sent request with its deadline. Silently drops the
    /// oldest entry if the table is at capacity — a collaborator that is
    /// this far behind is already being treated as unavailable by the
    /// deadline sweep.
    pub fn insert(&mut self, id: RequestId, deadline: Instant) {
        if self.entries.is_full() {
            self.entries.remove(0);
        }
        let _ = self.entries.push(PendingEntry { id, deadline });
    }

    /// Removes and confirms `id` was actually outstanding.
    pub fn complete(&mut self, id: RequestId) -> bool {
        if let Some(pos) = self.entries.iter().position(|e| e.id == id) {
            self.entries.remove(pos);
            true
        } else {
            false
        }
    }

    /// Removes and returns every entry whose deadline has passed.
    pub fn sweep_expired(&mut self, now: Instant) -> Vec<RequestId> {
        let mut expired = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            if self.entries[i].deadline <= now {
                expired.push(self.entries.remove(i).id);
            } else {
                i += 1;
            }
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One half of a collaborator coupling: outbound sender plus inbound
/// receiver, with the pending-request table for that collaborator.
pub struct Coupling<Out, In> {
    outbound: Sender<Out>,
    inbound: Receiver<In>,
    pending: PendingTable,
    id_gen: RequestIdGen,
}

impl<Out, In> Coupling<Out, In> {
    pub fn new(outbound: Sender<Out>, inbound: Receiver<In>) -> Self {
        Self {
            outbound,
            inbound,
            pending: PendingTable::new(),
            id_gen: RequestIdGen::default(),
        }
    }

    /// Allocates a fresh request id and registers its deadline.
    pub fn begin_request(&mut self, now: Instant, timeout: Duration) -> RequestId {
        let id = self.id_gen.next();
        self.pending.insert(id, now + timeout);
        id
    }

    /// Marks `id` as answered. Returns `false` if it had already expired (or
    /// never existed) and the response should be ignored as stale.
    pub fn complete_request(&mut self, id: RequestId) -> bool {
        self.pending.complete(id)
    }

    /// Sweeps timed-out requests, returning their ids for the caller to
    /// treat as `AdmissionError::Timeout`/`TransportError::PeerUnavailable`.
    pub fn sweep_expired(&mut self, now: Instant) -> Vec<RequestId> {
        self.pending.sweep_expired(now)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Sends `msg`, mapping a hung-up peer to `TransportError::PeerUnavailable`.
    pub fn send(&self, msg: Out) -> Result<(), TransportError> {
        self.outbound.send(msg).map_err(|_| TransportError::PeerUnavailable)
    }

    /// Drains every inbound message currently queued without blocking.
    pub fn drain(&self) -> Vec<In> {
        let mut out = Vec::new();
        loop {
            match self.inbound.try_recv() {
                Ok(msg) => out.push(msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }
}
