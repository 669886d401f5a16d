//! A concurrent, RCU-protected adaptive radix tree (Judy array) keyed by a
//! fixed-width unsigned integer.
//!
//! The public surface is deliberately small: [`JudyArray::new`],
//! [`JudyArray::add`], [`JudyArray::lookup`], and `Drop`. Everything else —
//! the node-shape catalog, the tagged child pointer, the shadow-node side
//! table, the recompaction engine, the attach/branch builder — is an
//! internal component assembled by these four operations; see `DESIGN.md`
//! for how each one maps onto the component design.

mod attach;
mod childref;
mod error;
mod node;
mod ops;
mod rcu;
mod recompact;
mod shadow;
mod shape;

use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};

pub use error::JaError;
pub use ops::{LeafHandle, LeafIter};

use childref::{AtomicChildRef, ChildRef};
use shadow::ShadowTable;

/// A node a caller inserts into the array. The array never inspects or
/// interprets the node's contents, only its intrusive `next` link, which
/// chains multiple nodes sharing the same key into one leaf list.
///
/// `next` must be null before the first call to [`JudyArray::add`] with this
/// node; the array takes ownership of it from that call onward.
pub trait LeafNode {
    fn next(&self) -> &AtomicPtr<Self>
    where
        Self: Sized;
}

/// A concurrent, RCU-protected Judy array mapping a `key_bits`-wide unsigned
/// integer to a list of user-owned leaf nodes.
pub struct JudyArray<T: LeafNode> {
    root: AtomicChildRef,
    shadow: ShadowTable,
    key_bytes: usize,
    key_max: u64,
    fallback_count: AtomicU64,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: LeafNode> JudyArray<T> {
    /// Creates an empty array over `key_bits`-wide keys.
    ///
    /// # Errors
    /// Returns [`JaError::InvalidKey`] unless `key_bits` is one of `8`, `16`,
    /// `32`, or `64`.
    pub fn new(key_bits: u32) -> Result<Self, JaError> {
        if !matches!(key_bits, 8 | 16 | 32 | 64) {
            return Err(JaError::InvalidKey);
        }
        let key_max = if key_bits == 64 { u64::MAX } else { (1u64 << key_bits) - 1 };
        Ok(Self {
            root: AtomicChildRef::new(ChildRef::NULL),
            shadow: ShadowTable::new(),
            key_bytes: (key_bits / 8) as usize,
            key_max,
            fallback_count: AtomicU64::new(0),
            _marker: std::marker::PhantomData,
        })
    }

    /// Inserts `node` under `key`. If `key` is already present, `node` is
    /// chained onto the existing leaf list rather than replacing it — the
    /// array is a multimap.
    ///
    /// # Errors
    /// Returns [`JaError::InvalidKey`] if `key` exceeds this array's maximum.
    pub fn add(&self, key: u64, node: Box<T>) -> Result<(), JaError> {
        let raw = Box::into_raw(node);
        ops::add(&self.root, &self.shadow, &self.fallback_count, self.key_bytes, self.key_max, key, raw)
    }

    /// Looks up `key`, returning the head of its leaf list (if any) bound to
    /// the lifetime of `guard`. Pin `guard` for as long as any node yielded
    /// by [`LeafHandle::iter`] is in use.
    pub fn lookup<'g>(&self, guard: &'g crossbeam_epoch::Guard, key: u64) -> Option<LeafHandle<'g, T>> {
        if key > self.key_max {
            return None;
        }
        ops::lookup(&self.root, self.key_bytes, key, guard)
    }

    /// Pins the current thread's epoch for a read-side critical section
    /// bracketing one or more [`JudyArray::lookup`] calls.
    pub fn pin(&self) -> crossbeam_epoch::Guard {
        rcu::pin()
    }
}

impl<T: LeafNode> Drop for JudyArray<T> {
    fn drop(&mut self) {
        let fallbacks = self.fallback_count.load(Ordering::Relaxed);
        ops::destroy(&self.root, self.key_bytes, &self.shadow, fallbacks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicPtr;

    struct Entry {
        next: AtomicPtr<Entry>,
        value: u32,
    }

    impl Entry {
        fn new(value: u32) -> Box<Self> {
            Box::new(Self { next: AtomicPtr::new(std::ptr::null_mut()), value })
        }
    }

    impl LeafNode for Entry {
        fn next(&self) -> &AtomicPtr<Self> {
            &self.next
        }
    }

    #[test]
    fn rejects_unsupported_key_width() {
        assert_eq!(JudyArray::<Entry>::new(24).unwrap_err(), JaError::InvalidKey);
    }

    #[test]
    fn add_then_lookup_round_trips() {
        let ja = JudyArray::<Entry>::new(16).unwrap();
        ja.add(42, Entry::new(42)).unwrap();
        let guard = ja.pin();
        let found = ja.lookup(&guard, 42).unwrap();
        let values: Vec<u32> = found.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![42]);
    }

    #[test]
    fn missing_key_returns_none() {
        let ja = JudyArray::<Entry>::new(16).unwrap();
        ja.add(1, Entry::new(1)).unwrap();
        let guard = ja.pin();
        assert!(ja.lookup(&guard, 2).is_none());
    }

    #[test]
    fn key_above_max_is_rejected() {
        let ja = JudyArray::<Entry>::new(8).unwrap();
        assert_eq!(ja.add(256, Entry::new(0)).unwrap_err(), JaError::InvalidKey);
        let guard = ja.pin();
        assert!(ja.lookup(&guard, 256).is_none());
    }

    #[test]
    fn duplicate_key_chains_at_the_leaf() {
        let ja = JudyArray::<Entry>::new(8).unwrap();
        ja.add(7, Entry::new(1)).unwrap();
        ja.add(7, Entry::new(2)).unwrap();
        ja.add(7, Entry::new(3)).unwrap();
        let guard = ja.pin();
        let mut values: Vec<u32> = ja.lookup(&guard, 7).unwrap().iter().map(|e| e.value).collect();
        values.sort_unstable();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn sparse_keys_across_8_bit_width() {
        let ja = JudyArray::<Entry>::new(8).unwrap();
        for k in 0u64..200 {
            ja.add(k, Entry::new(k as u32)).unwrap();
        }
        let guard = ja.pin();
        for k in 0u64..200 {
            assert!(ja.lookup(&guard, k).is_some(), "missing key {k}");
        }
        for k in 200u64..240 {
            assert!(ja.lookup(&guard, k).is_none(), "unexpected key {k}");
        }
    }

    #[test]
    fn forces_recompaction_past_linear_capacity() {
        let ja = JudyArray::<Entry>::new(32).unwrap();
        // All these keys share the same top 3 bytes, so every add after the
        // first few lands in the same last-level node and forces it through
        // every catalog shape up to pigeon.
        for k in 0u64..260 {
            ja.add(k, Entry::new(k as u32)).unwrap();
        }
        let guard = ja.pin();
        for k in 0u64..260 {
            assert!(ja.lookup(&guard, k).is_some(), "missing key {k}");
        }
    }
}
