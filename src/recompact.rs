//! Recompaction engine (§4.5): grows a full node to the next catalog shape,
//! or jumps straight to pigeon when a pool node's sub-pool overflows even
//! though the node as a whole has room left.
//!
//! Grounded on the original's `ja_node_recompact_add`: allocate the bigger
//! replacement, copy every existing child across, insert the one that didn't
//! fit, publish the replacement into the parent slot, then defer-free the
//! old node. The caller holds the parent slot's shadow lock for the whole
//! operation, so the copy-then-publish sequence is never observed half-done
//! by another writer; concurrent readers either see the old node (and miss
//! the in-flight insert, same as if they'd arrived a moment earlier) or the
//! fully-populated new one.

use crossbeam_epoch::Guard;

use crate::childref::{AtomicChildRef, ChildRef};
use crate::node;
use crate::shadow::ShadowTable;
use crate::shape::{self, PIGEON_SHAPE};

pub(crate) struct Recompacted {
    pub(crate) new_ref: ChildRef,
    pub(crate) fallback: bool,
}

/// Caller holds the lock on the shadow node for `old_ptr` and on the parent
/// slot, and has already confirmed `new_byte` is absent from the old node.
pub(crate) fn recompact_add(
    parent_slot: &AtomicChildRef,
    old_shape: u8,
    old_ptr: *mut (),
    new_byte: u8,
    new_child: ChildRef,
    shadow: &ShadowTable,
    guard: &Guard,
) -> Recompacted {
    let old_info = shape::shape(old_shape);
    let old_len = node::len(old_shape, old_ptr);
    let fallback = old_info.class == crate::shape::ShapeClass::Pool && old_len < old_info.max_child as usize;
    let new_shape = if fallback { PIGEON_SHAPE } else { shape::next_shape(old_shape) };

    let new_ptr = node::alloc_new(new_shape);
    node::iterate(old_shape, old_ptr, |byte, child| {
        debug_assert!(matches!(node::set_nth(new_shape, new_ptr, byte, child), node::SetResult::Inserted));
    });
    debug_assert!(matches!(node::set_nth(new_shape, new_ptr, new_byte, new_child), node::SetResult::Inserted));

    let new_shadow = shadow.publish(new_ptr as usize);
    new_shadow.set_child_count(old_len as u32 + 1);

    let new_ref = ChildRef::make(new_ptr, new_shape);
    parent_slot.store(new_ref, std::sync::atomic::Ordering::Release);

    shadow.remove(old_ptr as usize);
    unsafe { crate::rcu::defer_reclaim_node(guard, old_shape, old_ptr) };

    Recompacted { new_ref, fallback }
}
