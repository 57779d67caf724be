//! Time APIs: a microsecond-ish `Duration`/`Instant` pair plus the TDMA
//! frame clock, slot index, and multi-beacon synchronization state.
//!
//! The `Duration`/`Instant`/`Timer` trio is deliberately small and
//! special-purpose rather than reaching for `std::time` everywhere: the
//! scheduler only ever needs millisecond arithmetic within a 100 ms
//! superframe, and a pluggable `Timer` lets tests drive the clock by hand.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Length of one TDMA superframe.
pub const FRAME_DURATION_MS: u32 = 100;
/// Length of a single TDMA slot.
pub const SLOT_DURATION_MS: u32 = 10;
/// Number of slots per superframe.
pub const SLOTS_PER_FRAME: u32 = FRAME_DURATION_MS / SLOT_DURATION_MS;

/// A duration with millisecond resolution, used throughout the TDMA layer.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Duration(u64);

impl Duration {
    pub const ZERO: Self = Duration(0);

    pub fn from_millis(ms: u64) -> Self {
        Duration(ms)
    }

    pub fn from_secs(s: u64) -> Self {
        Duration(s * 1000)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl Add for Duration {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Duration(self.0 + rhs.0)
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Duration {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Duration {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A point in time relative to an unspecified epoch, with millisecond
/// resolution. Obtained from a [`Timer`] implementation.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant(u64);

impl Instant {
    pub fn from_millis(ms: u64) -> Self {
        Instant(ms)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn duration_since(&self, earlier: Instant) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }
}

impl Sub for Instant {
    type Output = Duration;
    fn sub(self, rhs: Self) -> Duration {
        self.duration_since(rhs)
    }
}

impl Add<Duration> for Instant {
    type Output = Self;
    fn add(self, d: Duration) -> Self {
        Instant(self.0 + d.0)
    }
}

impl Sub<Duration> for Instant {
    type Output = Self;
    fn sub(self, d: Duration) -> Self {
        Instant(self.0.saturating_sub(d.0))
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl fmt::Debug for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Trait for time sources.
///
/// The host application supplies an implementation (wall clock, simulated
/// clock in tests); the core never reads the system clock directly.
pub trait Timer {
    /// Returns the current time as an `Instant`.
    fn now(&self) -> Instant;
}

/// A `Timer` backed by `std::time::Instant`, for the `rrc` binary.
pub struct SystemTimer {
    start: std::time::Instant,
}

impl SystemTimer {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl Default for SystemTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for SystemTimer {
    fn now(&self) -> Instant {
        Instant::from_millis(self.start.elapsed().as_millis() as u64)
    }
}

/// Operational status of the TDMA time-sync state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SyncStatus {
    /// No beacons heard yet and no self-declared master role.
    Unsynchronized,
    /// No master heard; this node has declared itself master after
    /// `MAX_SCAN_TIME_MS` of silence.
    Master,
    /// Synchronized to a heard master's beacons.
    MasterHeard,
}

/// A received beacon: source node id and its network timestamp within the
/// current superframe (milliseconds, `0..FRAME_DURATION_MS`).
#[derive(Debug, Clone, Copy)]
pub struct Beacon {
    pub source: u8,
    pub network_ts_ms: u32,
}

/// TDMA frame clock and synchronization state (§4.4 of the specification).
#[derive(Debug, Clone, serde::Serialize)]
pub struct TdmaSyncState {
    synchronized: bool,
    status: SyncStatus,
    /// Local time within the current 100 ms superframe, `0..FRAME_DURATION_MS`.
    local_time_ms: u32,
    slot_index: u8,
    master_id: Option<u8>,
    frame_counter: u64,
    #[serde(skip)]
    last_activity: Option<Instant>,
}

impl Default for TdmaSyncState {
    fn default() -> Self {
        Self {
            synchronized: false,
            status: SyncStatus::Unsynchronized,
            local_time_ms: 0,
            slot_index: 0,
            master_id: None,
            frame_counter: 0,
            last_activity: None,
        }
    }
}

impl TdmaSyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn synchronized(&self) -> bool {
        self.synchronized
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn local_time_ms(&self) -> u32 {
        self.local_time_ms
    }

    pub fn slot_index(&self) -> u8 {
        self.slot_index
    }

    pub fn master_id(&self) -> Option<u8> {
        self.master_id
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Advances the local clock by `elapsed_ms`, wrapping the superframe and
    /// recomputing the slot index. Called once per tick.
    pub fn advance(&mut self, elapsed_ms: u32) {
        let total = self.local_time_ms + elapsed_ms;
        self.frame_counter += u64::from(total / FRAME_DURATION_MS);
        self.local_time_ms = total % FRAME_DURATION_MS;
        self.slot_index = (self.local_time_ms / SLOT_DURATION_MS) as u8;
        debug_assert!(self.local_time_ms < FRAME_DURATION_MS);
    }

    /// Declares self as master after silence, per cold-start acquisition.
    pub fn declare_master(&mut self, self_id: u8, now: Instant) {
        self.synchronized = true;
        self.status = SyncStatus::Master;
        self.master_id = Some(self_id);
        self.last_activity = Some(now);
        log::info!("no master heard; declaring self (node {self_id}) master");
    }

    /// Whether enough silence has elapsed to permit declaring self master.
    pub fn scan_timed_out(&self, now: Instant, max_scan: Duration) -> bool {
        match self.last_activity {
            None => true,
            Some(last) => now.duration_since(last) >= max_scan,
        }
    }

    pub fn note_activity(&mut self, now: Instant) {
        self.last_activity = Some(now);
    }

    /// Processes a batch of beacons received in an NC slot: computes each
    /// beacon's offset against the current local time, averages them with
    /// an integer mean, and adjusts the local clock (§4.4).
    ///
    /// `beacons` must be non-empty.
    pub fn sync_to_beacons(&mut self, beacons: &[Beacon], now: Instant) {
        assert!(!beacons.is_empty(), "sync_to_beacons requires beacons");

        let local_mod = self.local_time_ms as i64;
        let sum: i64 = beacons
            .iter()
            .map(|b| {
                let net_mod = i64::from(b.network_ts_ms) % i64::from(FRAME_DURATION_MS);
                net_mod - local_mod
            })
            .sum();
        let offset = sum / beacons.len() as i64;

        let mut new_time = local_mod + offset;
        new_time %= i64::from(FRAME_DURATION_MS);
        if new_time < 0 {
            new_time += i64::from(FRAME_DURATION_MS);
        }
        self.local_time_ms = new_time as u32;
        self.slot_index = (self.local_time_ms / SLOT_DURATION_MS) as u8;

        self.synchronized = true;
        self.status = SyncStatus::MasterHeard;
        self.master_id = Some(beacons[0].source);
        self.last_activity = Some(now);

        log::debug!(
            "synced to {} beacons (offset {offset}ms): local_time_ms={}, master={:?}",
            beacons.len(),
            self.local_time_ms,
            self.master_id
        );
    }
}
