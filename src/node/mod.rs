//! Shape-dispatch layer: routes a `(shape, *mut ())` pair from a
//! [`crate::childref::ChildRef`] to the concrete node type the shape index
//! names, without the caller ever seeing the concrete type.
//!
//! Every function here takes `&self`-style shared access only: nodes are
//! mutated through interior atomics under the owning shadow node's lock, and
//! read concurrently without any lock at all, so there is never a `&mut`
//! reference to a live node.

pub(crate) mod linear;
pub(crate) mod pigeon;
pub(crate) mod pool;

use crate::childref::ChildRef;
use crate::shape::PIGEON_SHAPE;
use linear::LinearNode;
pub(crate) use linear::SetResult;
use pigeon::PigeonNode;
use pool::PoolNode;

type Pool2 = PoolNode<2, 27>;
type Pool4 = PoolNode<4, 26>;

/// Allocates an empty node of the given shape and returns its untagged,
/// aligned address. Pair with [`dealloc`] (after an RCU grace period) to free
/// it.
pub(crate) fn alloc_new(shape: u8) -> *mut () {
    match shape {
        0 => Box::into_raw(LinearNode::<1>::empty()) as *mut (),
        1 => Box::into_raw(LinearNode::<3>::empty()) as *mut (),
        2 => Box::into_raw(LinearNode::<7>::empty()) as *mut (),
        3 => Box::into_raw(LinearNode::<14>::empty()) as *mut (),
        4 => Box::into_raw(LinearNode::<28>::empty()) as *mut (),
        5 => Box::into_raw(Pool2::empty()) as *mut (),
        6 => Box::into_raw(Pool4::empty()) as *mut (),
        PIGEON_SHAPE => Box::into_raw(PigeonNode::empty()) as *mut (),
        _ => unreachable!("shape {shape} has no node representation"),
    }
}

pub(crate) fn get_nth(shape: u8, ptr: *mut (), byte: u8) -> ChildRef {
    macro_rules! via {
        ($ty:ty) => {{
            let node = unsafe { &*(ptr as *const $ty) };
            node.get_nth(byte)
        }};
    }
    match shape {
        0 => via!(LinearNode<1>),
        1 => via!(LinearNode<3>),
        2 => via!(LinearNode<7>),
        3 => via!(LinearNode<14>),
        4 => via!(LinearNode<28>),
        5 => via!(Pool2),
        6 => via!(Pool4),
        PIGEON_SHAPE => via!(PigeonNode),
        _ => unreachable!("shape {shape} has no node representation"),
    }
}

/// Caller holds the owning shadow node's lock.
pub(crate) fn set_nth(shape: u8, ptr: *mut (), byte: u8, child: ChildRef) -> SetResult {
    macro_rules! via {
        ($ty:ty) => {{
            let node = unsafe { &*(ptr as *const $ty) };
            node.set_nth(byte, child)
        }};
    }
    match shape {
        0 => via!(LinearNode<1>),
        1 => via!(LinearNode<3>),
        2 => via!(LinearNode<7>),
        3 => via!(LinearNode<14>),
        4 => via!(LinearNode<28>),
        5 => via!(Pool2),
        6 => via!(Pool4),
        PIGEON_SHAPE => via!(PigeonNode),
        _ => unreachable!("shape {shape} has no node representation"),
    }
}

pub(crate) fn iterate(shape: u8, ptr: *mut (), mut f: impl FnMut(u8, ChildRef)) {
    macro_rules! via {
        ($ty:ty) => {{
            let node = unsafe { &*(ptr as *const $ty) };
            node.iterate(&mut f)
        }};
    }
    match shape {
        0 => via!(LinearNode<1>),
        1 => via!(LinearNode<3>),
        2 => via!(LinearNode<7>),
        3 => via!(LinearNode<14>),
        4 => via!(LinearNode<28>),
        5 => via!(Pool2),
        6 => via!(Pool4),
        PIGEON_SHAPE => via!(PigeonNode),
        _ => unreachable!("shape {shape} has no node representation"),
    }
}

/// Address of the atomic cell holding an already-present child, for callers
/// that need to replace a node's entry with a grown sibling in place (see
/// [`crate::recompact::recompact_add`]'s `parent_slot` argument). Returns
/// `None` only if `byte` was never inserted, which callers never hit in
/// practice since they only ask for bytes they just observed present.
pub(crate) fn slot_for<'a>(shape: u8, ptr: *mut (), byte: u8) -> Option<&'a crate::childref::AtomicChildRef> {
    macro_rules! via {
        ($ty:ty) => {{
            let node = unsafe { &*(ptr as *const $ty) };
            node.slot(byte)
        }};
    }
    match shape {
        0 => via!(LinearNode<1>),
        1 => via!(LinearNode<3>),
        2 => via!(LinearNode<7>),
        3 => via!(LinearNode<14>),
        4 => via!(LinearNode<28>),
        5 => via!(Pool2),
        6 => via!(Pool4),
        PIGEON_SHAPE => via!(PigeonNode),
        _ => unreachable!("shape {shape} has no node representation"),
    }
}

pub(crate) fn len(shape: u8, ptr: *mut ()) -> usize {
    macro_rules! via {
        ($ty:ty) => {{
            let node = unsafe { &*(ptr as *const $ty) };
            node.len()
        }};
    }
    match shape {
        0 => via!(LinearNode<1>),
        1 => via!(LinearNode<3>),
        2 => via!(LinearNode<7>),
        3 => via!(LinearNode<14>),
        4 => via!(LinearNode<28>),
        5 => via!(Pool2),
        6 => via!(Pool4),
        PIGEON_SHAPE => via!(PigeonNode),
        _ => unreachable!("shape {shape} has no node representation"),
    }
}

/// Reconstructs the boxed node and drops it. Safety: caller must guarantee no
/// reader holds a reference into this node, i.e. this only runs after an RCU
/// grace period has elapsed since the node was unlinked (see
/// [`crate::rcu::defer_reclaim_node`]).
pub(crate) unsafe fn dealloc(shape: u8, ptr: *mut ()) {
    macro_rules! via {
        ($ty:ty) => {
            drop(Box::from_raw(ptr as *mut $ty))
        };
    }
    match shape {
        0 => via!(LinearNode<1>),
        1 => via!(LinearNode<3>),
        2 => via!(LinearNode<7>),
        3 => via!(LinearNode<14>),
        4 => via!(LinearNode<28>),
        5 => via!(Pool2),
        6 => via!(Pool4),
        PIGEON_SHAPE => via!(PigeonNode),
        _ => unreachable!("shape {shape} has no node representation"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_get_set_dealloc_round_trip_each_shape() {
        for shape in [0u8, 1, 2, 3, 4, 5, 6, PIGEON_SHAPE] {
            let ptr = alloc_new(shape);
            assert!(get_nth(shape, ptr, 3).is_null());
            let child = ChildRef::make((&0u64 as *const u64 as usize & !0b111) as *mut (), 0);
            assert!(matches!(set_nth(shape, ptr, 3, child), SetResult::Inserted));
            assert_eq!(get_nth(shape, ptr, 3), child);
            let mut seen = Vec::new();
            iterate(shape, ptr, |b, c| seen.push((b, c)));
            assert_eq!(seen, vec![(3, child)]);
            unsafe { dealloc(shape, ptr) };
        }
    }
}
