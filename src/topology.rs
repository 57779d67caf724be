//! Per-neighbor link-quality tracking, change detection, and the link-cost
//! function consumed by routing (§4.3).

use serde::Serialize;

use crate::config::Thresholds;
use crate::time::Instant;

/// A raw PHY metrics sample for one neighbor.
#[derive(Debug, Clone, Copy)]
pub struct PhySample {
    pub node_id: u8,
    pub rssi_dbm: f32,
    pub snr_db: f32,
    pub per_pct: f32,
    pub timestamp: Instant,
}

/// Tracked per-neighbor state (§3).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NeighborLinkState {
    pub node_id: u8,
    pub rssi_dbm: f32,
    pub snr_db: f32,
    pub per_pct: f32,
    #[serde(skip)]
    pub last_update: Instant,
    pub link_active: bool,
    pub score: f32,
    pub nc_slot: Option<u8>,
    #[serde(skip)]
    pub last_heard: Instant,
}

/// A topology change to report to L3 (§4.3 step 2, §6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopologyUpdate {
    pub node_id: u8,
    pub rssi_dbm: f32,
    pub snr_db: f32,
    pub per_pct: f32,
    pub link_active: bool,
    pub timestamp: Instant,
}

impl PartialEq for NeighborLinkState {
    fn eq(&self, other: &Self) -> bool {
        self.node_id == other.node_id
            && self.rssi_dbm == other.rssi_dbm
            && self.snr_db == other.snr_db
            && self.per_pct == other.per_pct
            && self.link_active == other.link_active
    }
}

impl NeighborLinkState {
    fn link_active(rssi: f32, snr: f32, per: f32, t: &Thresholds) -> bool {
        rssi > t.rssi_active_dbm && snr > t.snr_active_db && per < t.per_active_pct
    }

    fn compute_score(rssi: f32, snr: f32, per: f32) -> f32 {
        let rssi_n = ((rssi + 120.0) / 90.0).clamp(0.0, 1.0);
        let snr_n = (snr / 30.0).clamp(0.0, 1.0);
        let per_n = ((100.0 - per) / 100.0).clamp(0.0, 1.0);
        (0.4 * rssi_n + 0.3 * snr_n + 0.3 * per_n).clamp(0.0, 1.0)
    }

    /// ETX-flavored link cost for routing (§4.3 step 4).
    pub fn link_cost(&self) -> f32 {
        const EPS: f32 = 1e-6;
        const CAP: f32 = 100.0;
        let etx = if self.per_pct < 100.0 {
            1.0 / (1.0 - self.per_pct / 100.0)
        } else {
            CAP
        };
        (etx / self.score.max(EPS)).min(CAP)
    }

    /// Stricter usability predicate consumed by the scheduler (§4.3).
    pub fn usable(&self, t: &Thresholds, now: Instant) -> bool {
        if now.duration_since(self.last_update).as_millis() > t.staleness_ms {
            return false;
        }
        self.link_active
            && self.rssi_dbm >= t.rssi_usable_dbm
            && self.snr_db >= t.snr_usable_db
            && self.per_pct < t.per_usable_pct
    }
}

/// Tracks link state for up to 256 neighbors (node ids are one byte) and
/// emits `TopologyUpdate`s on significant change.
#[derive(Debug, Clone)]
pub struct LinkQualityTracker {
    neighbors: Box<[Option<NeighborLinkState>; 256]>,
    thresholds: Thresholds,
}

impl LinkQualityTracker {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            neighbors: Box::new([None; 256]),
            thresholds,
        }
    }

    pub fn get(&self, node_id: u8) -> Option<&NeighborLinkState> {
        self.neighbors[node_id as usize].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NeighborLinkState> {
        self.neighbors.iter().filter_map(|n| n.as_ref())
    }

    /// Whether `node_id` is currently usable for transmission, per §4.3,
    /// including the staleness rule (an unknown/stale neighbor is never
    /// usable).
    pub fn usable(&self, node_id: u8, now: Instant) -> bool {
        match self.get(node_id) {
            Some(n) => n.usable(&self.thresholds, now),
            None => false,
        }
    }

    /// Applies a PHY sample, updating tracked state and returning a
    /// `TopologyUpdate` if any change threshold was crossed or `link_active`
    /// flipped (§4.3 steps 1-3). Idempotent under duplicate samples (law
    /// L3): applying the same sample twice produces the same state and no
    /// second trigger on the second application.
    pub fn apply_sample(&mut self, sample: PhySample) -> Option<TopologyUpdate> {
        let t = &self.thresholds;
        let active = NeighborLinkState::link_active(sample.rssi_dbm, sample.snr_db, sample.per_pct, t);
        let score = NeighborLinkState::compute_score(sample.rssi_dbm, sample.snr_db, sample.per_pct);

        let slot = sample.timestamp;
        let prior = self.neighbors[sample.node_id as usize];

        let trigger = match prior {
            None => true,
            Some(prev) => {
                let d_rssi = (sample.rssi_dbm - prev.rssi_dbm).abs();
                let d_snr = (sample.snr_db - prev.snr_db).abs();
                let d_per = (sample.per_pct - prev.per_pct).abs();
                active != prev.link_active
                    || d_rssi > t.rssi_change_db
                    || d_snr > t.snr_change_db
                    || d_per > t.per_change_pct
            }
        };

        let nc_slot = prior.and_then(|p| p.nc_slot);

        self.neighbors[sample.node_id as usize] = Some(NeighborLinkState {
            node_id: sample.node_id,
            rssi_dbm: sample.rssi_dbm,
            snr_db: sample.snr_db,
            per_pct: sample.per_pct,
            last_update: slot,
            link_active: active,
            score,
            nc_slot,
            last_heard: slot,
        });

        if trigger {
            log::debug!(
                "topology change for node {}: active={}, rssi={:.1}, snr={:.1}, per={:.1}",
                sample.node_id,
                active,
                sample.rssi_dbm,
                sample.snr_db,
                sample.per_pct
            );
            Some(TopologyUpdate {
                node_id: sample.node_id,
                rssi_dbm: sample.rssi_dbm,
                snr_db: sample.snr_db,
                per_pct: sample.per_pct,
                link_active: active,
                timestamp: slot,
            })
        } else {
            None
        }
    }

    pub fn set_nc_slot(&mut self, node_id: u8, slot: Option<u8>) {
        if let Some(n) = self.neighbors[node_id as usize].as_mut() {
            n.nc_slot = slot;
        }
    }

    pub fn note_heard(&mut self, node_id: u8, now: Instant) {
        if let Some(n) = self.neighbors[node_id as usize].as_mut() {
            n.last_heard = now;
        }
    }

    /// Evicts neighbors whose NC slot bit is stale (two super-cycles of
    /// silence), freeing their slot (§4.7). Returns `(node_id, slot)` pairs
    /// so the caller can also clear the corresponding bit in its own
    /// collision-avoidance bitmap.
    pub fn evict_stale_nc(&mut self, now: Instant, max_age: crate::time::Duration) -> Vec<(u8, u8)> {
        let mut evicted = Vec::new();
        for slot in self.neighbors.iter_mut() {
            if let Some(n) = slot {
                if let Some(nc_slot) = n.nc_slot {
                    if now.duration_since(n.last_heard) > max_age {
                        evicted.push((n.node_id, nc_slot));
                        n.nc_slot = None;
                    }
                }
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(node_id: u8, rssi: f32, snr: f32, per: f32, ts_ms: u64) -> PhySample {
        PhySample {
            node_id,
            rssi_dbm: rssi,
            snr_db: snr,
            per_pct: per,
            timestamp: Instant::from_millis(ts_ms),
        }
    }

    #[test]
    fn s1_admission_neighbor_active() {
        let mut tracker = LinkQualityTracker::new(Thresholds::default());
        let update = tracker.apply_sample(sample(1, -70.0, 18.0, 1.0, 0));
        assert!(update.is_some());
        assert!(tracker.get(1).unwrap().link_active);
        assert!(tracker.usable(1, Instant::from_millis(0)));
    }

    #[test]
    fn s3_link_degradation_triggers_olsr() {
        let mut tracker = LinkQualityTracker::new(Thresholds::default());
        tracker.apply_sample(sample(2, -70.0, 18.0, 1.0, 0));
        assert!(tracker.get(2).unwrap().link_active);

        let update = tracker
            .apply_sample(sample(2, -92.0, 8.0, 15.0, 1))
            .expect("must trigger exactly one update");
        assert!(!update.link_active);
        assert_eq!(update.node_id, 2);
        assert_eq!(update.rssi_dbm, -92.0);
    }

    #[test]
    fn law_l3_idempotent_under_duplicate_sample() {
        let mut tracker = LinkQualityTracker::new(Thresholds::default());
        let s = sample(5, -70.0, 18.0, 1.0, 0);
        tracker.apply_sample(s);
        let state_after_first = *tracker.get(5).unwrap();
        let second = tracker.apply_sample(s);
        assert!(second.is_none(), "duplicate sample must not re-trigger");
        assert_eq!(state_after_first, *tracker.get(5).unwrap());
    }

    #[test]
    fn per_100_boundary_caps_link_cost() {
        let mut tracker = LinkQualityTracker::new(Thresholds::default());
        tracker.apply_sample(sample(9, -70.0, 18.0, 100.0, 0));
        let cost = tracker.get(9).unwrap().link_cost();
        assert!(cost <= 100.0);
    }

    #[test]
    fn staleness_makes_neighbor_unusable() {
        let mut tracker = LinkQualityTracker::new(Thresholds::default());
        tracker.apply_sample(sample(3, -60.0, 20.0, 0.0, 0));
        assert!(tracker.usable(3, Instant::from_millis(0)));
        assert!(!tracker.usable(3, Instant::from_millis(600)));
    }

    #[test]
    fn unknown_neighbor_not_usable() {
        let tracker = LinkQualityTracker::new(Thresholds::default());
        assert!(!tracker.usable(200, Instant::from_millis(0)));
    }
}
