//! RCU collaborator (§6.1): a thin facade over `crossbeam_epoch`.
//!
//! Reads pin the epoch for the duration of a lookup so no node they touch can
//! be freed out from under them; writers unlink a node by swapping its parent
//! slot and then defer the actual free until every reader that might still
//! hold a reference has dropped its guard. `crossbeam_epoch` already
//! implements exactly this pairing, so there is no abstraction here beyond
//! naming the two operations this crate needs and routing node frees through
//! the shape-dispatch [`crate::node::dealloc`].

use crossbeam_epoch::{self as epoch, Guard};

use crate::node;

/// Pins the current thread's epoch for a read-side critical section.
pub(crate) fn pin() -> Guard {
    epoch::pin()
}

/// Defers freeing the node at `ptr` (of the given shape) until no guard
/// pinned at or before this call can still be outstanding.
///
/// Safety: `ptr` must have already been unlinked from every slot a new reader
/// could observe it through, and must not be deferred more than once.
pub(crate) unsafe fn defer_reclaim_node(guard: &Guard, shape: u8, ptr: *mut ()) {
    let addr = ptr as usize;
    guard.defer_unchecked(move || {
        node::dealloc(shape, addr as *mut ());
    });
}
