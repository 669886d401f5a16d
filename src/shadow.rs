//! Shadow-node side table (§4.4): per-node metadata kept off the node itself
//! so the node's own memory layout stays exactly "catalog shape, nothing
//! else" and can be reclaimed by a plain `Box::from_raw` once unlinked.
//!
//! No lock-free concurrent map exists anywhere in the crates this crate
//! otherwise draws on, so the table is a small hand-built shard set: an
//! `RwLock<HashMap<..>>` per shard, sharded by the node's own address so
//! unrelated nodes rarely contend on the same shard's lock. Mutation of the
//! map itself (insert on publish, remove on unlink) is comparatively rare
//! next to the per-node `RawMutex` traffic the table's entries see, so a
//! coarse per-shard `RwLock` is adequate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::{lock_api::RawMutex as _, RawMutex, RwLock};

const SHARDS: usize = 16;

/// Off-node metadata for one internal node.
pub(crate) struct ShadowNode {
    lock: RawMutex,
    child_count: AtomicU32,
    /// Times a pool sub-pool on this node overflowed and forced a direct
    /// jump to pigeon rather than a catalog-order grow. Surfaced by
    /// [`crate::ops::destroy`] as a diagnostic.
    nr_fallback: AtomicU8,
}

impl ShadowNode {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            lock: RawMutex::INIT,
            child_count: AtomicU32::new(0),
            nr_fallback: AtomicU8::new(0),
        })
    }

    pub(crate) fn lock(&self) {
        self.lock.lock();
    }

    pub(crate) fn unlock(&self) {
        unsafe { self.lock.unlock() };
    }

    pub(crate) fn child_count(&self) -> u32 {
        self.child_count.load(Ordering::Acquire)
    }

    pub(crate) fn set_child_count(&self, n: u32) {
        self.child_count.store(n, Ordering::Release);
    }

    pub(crate) fn incr_child_count(&self) {
        self.child_count.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_fallback(&self) {
        self.nr_fallback.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn fallback_count(&self) -> u8 {
        self.nr_fallback.load(Ordering::Relaxed)
    }
}

pub(crate) struct ShadowTable {
    shards: Vec<RwLock<HashMap<usize, Arc<ShadowNode>>>>,
}

impl ShadowTable {
    pub(crate) fn new() -> Self {
        Self {
            shards: (0..SHARDS).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    fn shard_for(&self, addr: usize) -> &RwLock<HashMap<usize, Arc<ShadowNode>>> {
        &self.shards[(addr >> 3) % SHARDS]
    }

    /// Creates and registers a shadow entry for a freshly allocated node.
    /// Called exactly once per node, before the node's `ChildRef` is
    /// published into its parent.
    pub(crate) fn publish(&self, addr: usize) -> Arc<ShadowNode> {
        let entry = ShadowNode::new();
        let mut shard = self.shard_for(addr).write();
        shard.insert(addr, entry.clone());
        entry
    }

    pub(crate) fn get(&self, addr: usize) -> Option<Arc<ShadowNode>> {
        self.shard_for(addr).read().get(&addr).cloned()
    }

    /// Removes the entry for a node being unlinked. The `Arc` may still be
    /// held by threads that looked it up just before the unlink; they finish
    /// using it harmlessly since the node's memory itself is only freed after
    /// the RCU grace period.
    pub(crate) fn remove(&self, addr: usize) {
        self.shard_for(addr).write().remove(&addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_then_get_round_trips() {
        let table = ShadowTable::new();
        let entry = table.publish(0x1000);
        entry.set_child_count(3);
        let fetched = table.get(0x1000).unwrap();
        assert_eq!(fetched.child_count(), 3);
    }

    #[test]
    fn remove_clears_entry() {
        let table = ShadowTable::new();
        table.publish(0x2000);
        table.remove(0x2000);
        assert!(table.get(0x2000).is_none());
    }

    #[test]
    fn lock_unlock_round_trip() {
        let table = ShadowTable::new();
        let entry = table.publish(0x3000);
        entry.lock();
        entry.unlock();
    }

    #[test]
    fn fallback_counter_accumulates() {
        let table = ShadowTable::new();
        let entry = table.publish(0x4000);
        entry.record_fallback();
        entry.record_fallback();
        assert_eq!(entry.fallback_count(), 2);
    }
}
