//! Top-level operations (§5): `lookup`, `add`, `destroy`.
//!
//! `lookup` never locks or allocates; it is a pure acquire-load walk bounded
//! by the caller's pinned epoch guard. `add` retries a lock-free walk until
//! it finds either an existing leaf to chain onto or a vacancy to fill,
//! taking a lock only on the one node it is about to mutate (or, when that
//! node is full, the grow it replaces it with). Duplicate keys chain at the
//! leaf rather than overwrite, matching the container's multimap semantics.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use arrayvec::ArrayVec;
use crossbeam_epoch::Guard;

use crate::attach;
use crate::childref::{AtomicChildRef, ChildRef};
use crate::error::{JaError, JaResult};
use crate::node;
use crate::rcu;
use crate::recompact;
use crate::shadow::ShadowTable;
use crate::LeafNode;

pub(crate) fn decompose(key: u64, key_bytes: usize) -> ArrayVec<u8, 8> {
    let mut out = ArrayVec::new();
    for i in 0..key_bytes {
        let shift = 8 * (key_bytes - 1 - i);
        out.push(((key >> shift) & 0xFF) as u8);
    }
    out
}

/// A leaf list head observed under a pinned epoch guard. Borrowing `'g` ties
/// every node it yields to the guard that kept them alive.
pub struct LeafHandle<'g, T> {
    head: *mut T,
    _guard: PhantomData<&'g Guard>,
}

impl<'g, T: LeafNode> LeafHandle<'g, T> {
    pub fn iter(&self) -> LeafIter<'g, T> {
        LeafIter { cur: self.head, _m: PhantomData }
    }
}

pub struct LeafIter<'g, T> {
    cur: *mut T,
    _m: PhantomData<&'g ()>,
}

impl<'g, T: LeafNode> Iterator for LeafIter<'g, T> {
    type Item = &'g T;

    fn next(&mut self) -> Option<&'g T> {
        if self.cur.is_null() {
            return None;
        }
        let node = unsafe { &*self.cur };
        self.cur = node.next().load(Ordering::Acquire);
        Some(node)
    }
}

pub(crate) fn lookup<'g, T: LeafNode>(
    root: &AtomicChildRef,
    key_bytes: usize,
    key: u64,
    _guard: &'g Guard,
) -> Option<LeafHandle<'g, T>> {
    let bytes = decompose(key, key_bytes);
    let mut cur = root.load(Ordering::Acquire);
    for &b in &bytes {
        if cur.is_null() {
            return None;
        }
        cur = node::get_nth(cur.shape_of(), cur.ptr_of(), b);
    }
    if cur.is_null() {
        None
    } else {
        Some(LeafHandle { head: cur.ptr_of() as *mut T, _guard: PhantomData })
    }
}

/// Frees every wrapping internal node `build_chain` allocated for this
/// attempt, but never the leaf itself — ownership of the user node the
/// caller passed in stays with the caller until a publish actually succeeds.
fn unwind_chain(bytes: &[u8], chain_ref: ChildRef, shadow: &ShadowTable) {
    if bytes.is_empty() {
        return;
    }
    let mut cur = chain_ref;
    for &b in bytes {
        let next = node::get_nth(cur.shape_of(), cur.ptr_of(), b);
        shadow.remove(cur.ptr_of() as usize);
        unsafe { node::dealloc(cur.shape_of(), cur.ptr_of()) };
        cur = next;
    }
}

pub(crate) fn add<T: LeafNode>(
    root: &AtomicChildRef,
    shadow: &ShadowTable,
    fallback_count: &AtomicU64,
    key_bytes: usize,
    key_max: u64,
    key: u64,
    user_node: *mut T,
) -> JaResult<()> {
    if key > key_max {
        return Err(JaError::InvalidKey);
    }
    let bytes = decompose(key, key_bytes);

    loop {
        let guard = rcu::pin();
        let root_ref = root.load(Ordering::Acquire);

        if root_ref.is_null() {
            let leaf_ref = ChildRef::make(user_node as *mut (), 0);
            let chain = attach::build_chain(&bytes, leaf_ref, shadow);
            match root.compare_exchange(ChildRef::NULL, chain, Ordering::Release, Ordering::Relaxed) {
                Ok(_) => {
                    shadow.publish(user_node as usize);
                    return Ok(());
                }
                Err(_) => {
                    unwind_chain(&bytes, chain, shadow);
                    continue;
                }
            }
        }

        let mut prev: Option<(ChildRef, u8)> = None;
        let mut cur = root_ref;
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            let next = node::get_nth(cur.shape_of(), cur.ptr_of(), b);
            if next.is_null() {
                break;
            }
            prev = Some((cur, b));
            cur = next;
            i += 1;
        }

        if i == bytes.len() {
            // `cur` is an existing leaf head; chain the new node onto it.
            let Some(head_shadow) = shadow.get(cur.ptr_of() as usize) else {
                continue; // raced with a concurrent first-insert of this exact key
            };
            head_shadow.lock();
            let (parent, parent_byte) = prev.expect("key_bytes >= 1, loop ran at least once");
            let leaf_slot = node::slot_for(parent.shape_of(), parent.ptr_of(), parent_byte)
                .expect("slot observed non-null moments ago");
            let old_head = leaf_slot.load(Ordering::Acquire);
            unsafe {
                (*user_node).next().store(old_head.ptr_of() as *mut T, Ordering::Relaxed);
            }
            let new_head = ChildRef::make(user_node as *mut (), 0);
            leaf_slot.store(new_head, Ordering::Release);
            head_shadow.unlock();
            shadow.remove(old_head.ptr_of() as usize);
            shadow.publish(user_node as usize);
            return Ok(());
        }

        // Vacancy is `cur`'s child at bytes[i]; build the rest of the chain
        // and attach it with a single slot write.
        let leaf_ref = ChildRef::make(user_node as *mut (), 0);
        let chain_ref = attach::build_chain(&bytes[i + 1..], leaf_ref, shadow);

        match node::set_nth(cur.shape_of(), cur.ptr_of(), bytes[i], chain_ref) {
            node::SetResult::Inserted => {
                shadow.publish(user_node as usize);
                return Ok(());
            }
            node::SetResult::AlreadyPresent => {
                unwind_chain(&bytes[i + 1..], chain_ref, shadow);
                continue;
            }
            node::SetResult::Full => {
                let Some(cur_shadow) = shadow.get(cur.ptr_of() as usize) else {
                    unwind_chain(&bytes[i + 1..], chain_ref, shadow);
                    continue;
                };
                cur_shadow.lock();
                let parent_slot = match prev {
                    Some((gp, gp_byte)) => node::slot_for(gp.shape_of(), gp.ptr_of(), gp_byte)
                        .expect("slot observed non-null moments ago"),
                    None => root,
                };
                let result = recompact::recompact_add(
                    parent_slot,
                    cur.shape_of(),
                    cur.ptr_of(),
                    bytes[i],
                    chain_ref,
                    shadow,
                    &guard,
                );
                cur_shadow.unlock();
                if result.fallback {
                    fallback_count.fetch_add(1, Ordering::Relaxed);
                }
                shadow.publish(user_node as usize);
                return Ok(());
            }
        }
    }
}

/// Tears the tree down depth-first, freeing every internal node directly
/// (no running readers remain once the container itself is being dropped, so
/// there is no grace period to wait out) and reporting whether any pool node
/// ever overflowed into a pigeon fallback.
pub(crate) fn destroy(root: &AtomicChildRef, key_bytes: usize, shadow: &ShadowTable, fallback_count: u64) {
    fn walk(depth_remaining: usize, r: ChildRef, shadow: &ShadowTable) {
        if r.is_null() || depth_remaining == 0 {
            return;
        }
        let shape = r.shape_of();
        let ptr = r.ptr_of();
        node::iterate(shape, ptr, |_, child| walk(depth_remaining - 1, child, shadow));
        shadow.remove(ptr as usize);
        unsafe { node::dealloc(shape, ptr) };
    }

    let r = root.load(Ordering::Acquire);
    walk(key_bytes, r, shadow);
    root.store(ChildRef::NULL, Ordering::Relaxed);

    if fallback_count > 0 {
        eprintln!("rcuja: destroyed array with {fallback_count} pool-to-pigeon fallback recompaction(s)");
    }
}
