//! Persisted node state: per-category unlock timestamps, failure-lock
//! stamps, and the per-player remote lock log.
//!
//! The store is injected into every operation rather than held as ambient
//! global state, so tests run against a plain in-memory instance.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use bevy_math::Vec3;
use tracing::warn;

use crate::world::{NodeCategory, NodeId, PlayerId};

/// Simulation timestamp in seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct SimTime(pub f64);

impl SimTime {
    #[inline]
    pub fn seconds(self) -> f64 {
        self.0
    }

    /// Seconds elapsed since `earlier`.
    #[inline]
    pub fn elapsed_since(self, earlier: SimTime) -> f64 {
        self.0 - earlier.0
    }
}

/// A lock written at `stamped_at` is live while `now - stamped_at` has not
/// exceeded the configured duration. Exactly at the duration it is still
/// live; strictly beyond it, expired.
#[inline]
pub fn lock_is_live(stamped_at: SimTime, now: SimTime, duration_secs: f32) -> bool {
    now.elapsed_since(stamped_at) <= f64::from(duration_secs)
}

/// Per-node unlock timestamps, one slot per category. `None` is locked.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryUnlocks {
    stamps: [Option<SimTime>; 4],
}

impl CategoryUnlocks {
    #[inline]
    pub fn get(&self, category: NodeCategory) -> Option<SimTime> {
        self.stamps[category.index()]
    }

    fn set(&mut self, category: NodeCategory, stamp: Option<SimTime>) {
        self.stamps[category.index()] = stamp;
    }
}

/// One remote-context failure record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockEntry {
    pub position: Vec3,
    pub stamped_at: SimTime,
}

/// Append-only list of remote failure records for one player. Appends are
/// O(1); expired entries are dropped lazily by [`RemoteLockLog::prune`] at
/// the start of each query.
#[derive(Debug, Clone, Default)]
pub struct RemoteLockLog {
    entries: Vec<LockEntry>,
}

impl RemoteLockLog {
    pub fn append(&mut self, position: Vec3, now: SimTime) {
        self.entries.push(LockEntry {
            position,
            stamped_at: now,
        });
    }

    /// Drop every entry whose lock window has elapsed.
    pub fn prune(&mut self, now: SimTime, duration_secs: f32) {
        self.entries
            .retain(|entry| lock_is_live(entry.stamped_at, now, duration_secs));
    }

    /// Whether any live entry covers `position` within `radius` (inclusive).
    pub fn covers(&self, position: Vec3, radius: f32, now: SimTime, duration_secs: f32) -> bool {
        let limit = radius * radius;
        self.entries.iter().any(|entry| {
            lock_is_live(entry.stamped_at, now, duration_secs)
                && entry.position.distance_squared(position) <= limit
        })
    }

    /// Rebuild a log from the parallel-array layout older hosts persist.
    /// A length mismatch means the arrays can no longer be trusted; the
    /// whole log is discarded and the player reads as not locked.
    pub fn from_parallel(positions: Vec<Vec3>, timestamps: Vec<SimTime>) -> Self {
        if positions.len() != timestamps.len() {
            warn!(
                positions = positions.len(),
                timestamps = timestamps.len(),
                "remote lock log arrays are inconsistent; clearing the log"
            );
            return Self::default();
        }
        let entries = positions
            .into_iter()
            .zip(timestamps)
            .map(|(position, stamped_at)| LockEntry {
                position,
                stamped_at,
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[LockEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All breach-core persisted state, keyed by node and player ids.
#[derive(Resource, Debug, Default, Clone)]
pub struct NodeStateStore {
    unlocks: HashMap<NodeId, CategoryUnlocks>,
    locks: HashMap<NodeId, SimTime>,
    remote_logs: HashMap<PlayerId, RemoteLockLog>,
}

impl NodeStateStore {
    /// Stamp a category unlocked. Idempotent: an already-unlocked category
    /// keeps its original (earliest) stamp, so unlocks from earlier sessions
    /// stay distinguishable from this-session ones.
    pub fn unlock(&mut self, node: NodeId, category: NodeCategory, now: SimTime) {
        let slots = self.unlocks.entry(node).or_default();
        if slots.get(category).is_none() {
            slots.set(category, Some(now));
        }
    }

    pub fn unlocked_since(&self, node: NodeId, category: NodeCategory) -> Option<SimTime> {
        self.unlocks.get(&node).and_then(|slots| slots.get(category))
    }

    pub fn is_unlocked(&self, node: NodeId, category: NodeCategory) -> bool {
        self.unlocked_since(node, category).is_some()
    }

    /// Clear one category back to locked. Only the same-session rollback in
    /// the propagator may call this; the session-start guard lives there.
    pub fn rollback(&mut self, node: NodeId, category: NodeCategory) {
        if let Some(slots) = self.unlocks.get_mut(&node) {
            slots.set(category, None);
        }
    }

    pub fn stamp_lock(&mut self, node: NodeId, now: SimTime) {
        self.locks.insert(node, now);
    }

    pub fn lock_stamp(&self, node: NodeId) -> Option<SimTime> {
        self.locks.get(&node).copied()
    }

    /// Lazy expiry on read: returns whether the node is still directly
    /// locked, dropping the stamp if its window has elapsed.
    pub fn clear_expired_lock(&mut self, node: NodeId, now: SimTime, duration_secs: f32) -> bool {
        match self.locks.get(&node) {
            Some(&stamped_at) if lock_is_live(stamped_at, now, duration_secs) => true,
            Some(_) => {
                self.locks.remove(&node);
                false
            }
            None => false,
        }
    }

    pub fn remote_log(&self, player: PlayerId) -> Option<&RemoteLockLog> {
        self.remote_logs.get(&player)
    }

    pub fn remote_log_mut(&mut self, player: PlayerId) -> &mut RemoteLockLog {
        self.remote_logs.entry(player).or_default()
    }

    pub fn import_remote_log(&mut self, player: PlayerId, log: RemoteLockLog) {
        self.remote_logs.insert(player, log);
    }
}
