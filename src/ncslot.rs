//! NC slot assignment: compact round-robin, seedex fallback, linear probe,
//! and conflict detection over a 40-slot super-cycle (§4.7).

/// Number of NC slots in a super-cycle (two 10-frame cycles × 2 NC slots).
pub const NC_SLOT_COUNT: u32 = 40;
/// Maximum seedex probe attempts before falling back to linear probing.
const SEEDEX_MAX_TRIES: u32 = 16;

/// 40-bit bitmap of claimed NC slots, stored as a `[u8; 5]` to mirror the
/// wire-compact representation used in piggyback TLVs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct NcStatusBitmap {
    raw: [u8; 5],
}

impl NcStatusBitmap {
    pub fn is_set(&self, slot: u32) -> bool {
        debug_assert!(slot < NC_SLOT_COUNT);
        let byte = self.raw[(slot / 8) as usize];
        byte & (1 << (slot % 8)) != 0
    }

    pub fn set(&mut self, slot: u32) {
        debug_assert!(slot < NC_SLOT_COUNT);
        self.raw[(slot / 8) as usize] |= 1 << (slot % 8);
    }

    pub fn clear(&mut self, slot: u32) {
        debug_assert!(slot < NC_SLOT_COUNT);
        self.raw[(slot / 8) as usize] &= !(1 << (slot % 8));
    }
}

/// Two-round 32-bit integer hash used to mix the seedex probe key.
fn seedex_hash(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x45d9f3b);
    x ^= x >> 16;
    x = x.wrapping_mul(0x45d9f3b);
    x ^= x >> 16;
    x
}

/// Picks an NC slot for `node_id`, given the slots already claimed by
/// neighbors in `bitmap` (with self's own prior bit, if any, already
/// cleared by the caller) and the current `active_node_count` and `epoch`.
///
/// Implements the three-stage algorithm: compact round-robin, seedex
/// fallback (up to 16 tries), then linear probe from a node-derived start.
/// Returns `None` only if all 40 slots are taken (never expected in
/// practice since `active_node_count` is bounded by `NC_SLOT_COUNT`).
pub fn pick_nc_slot(node_id: u8, active_node_count: u32, epoch: u32, bitmap: &NcStatusBitmap) -> Option<u32> {
    if active_node_count > 0 && active_node_count <= NC_SLOT_COUNT {
        let candidate = (u32::from(node_id) % active_node_count) + 1;
        let candidate = candidate % NC_SLOT_COUNT;
        if !bitmap.is_set(candidate) {
            return Some(candidate);
        }
    }

    for try_idx in 0..SEEDEX_MAX_TRIES {
        let key = (u32::from(node_id) << 16) ^ epoch ^ try_idx.wrapping_mul(0x9e37_79b1);
        let candidate = seedex_hash(key) % NC_SLOT_COUNT;
        if !bitmap.is_set(candidate) {
            return Some(candidate);
        }
    }

    let start = u32::from(node_id) % NC_SLOT_COUNT;
    for offset in 0..NC_SLOT_COUNT {
        let candidate = (start + offset) % NC_SLOT_COUNT;
        if !bitmap.is_set(candidate) {
            return Some(candidate);
        }
    }

    None
}
