//! Attach/branch builder (§4.6): builds a chain of fresh, unreachable
//! internal nodes bottom-up from a new leaf head, so the only thing that
//! ever becomes visible to another thread is the single publish of the
//! outermost node into the existing parent's slot.
//!
//! Every node built here starts with exactly one child, catalog shape 0
//! (`max_child == 1`), since nothing else can reach it until that one
//! publish happens — there's nothing to size up for.

use crate::childref::ChildRef;
use crate::node;
use crate::shadow::ShadowTable;

/// Builds the chain for `bytes` (the key bytes from the vacancy's *next*
/// level down to the leaf), wrapping `leaf_ref` at the bottom. Returns the
/// `ChildRef` for the node that should be published at the vacancy.
///
/// `bytes` empty means the vacancy was the leaf slot itself; `leaf_ref` is
/// returned unchanged; the caller publishes it directly with no new node.
pub(crate) fn build_chain(bytes: &[u8], leaf_ref: ChildRef, shadow: &ShadowTable) -> ChildRef {
    let mut acc = leaf_ref;
    for &byte in bytes.iter().rev() {
        let ptr = node::alloc_new(0);
        let inserted = node::set_nth(0, ptr, byte, acc);
        debug_assert!(matches!(inserted, node::SetResult::Inserted));
        shadow.publish(ptr as usize).set_child_count(1);
        acc = ChildRef::make(ptr, 0);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bytes_returns_leaf_unchanged() {
        let shadow = ShadowTable::new();
        let leaf = ChildRef::make((&1u64 as *const u64 as usize & !0b111) as *mut (), 0);
        assert_eq!(build_chain(&[], leaf, &shadow), leaf);
    }

    #[test]
    fn builds_one_node_per_byte() {
        let shadow = ShadowTable::new();
        let leaf = ChildRef::make((&1u64 as *const u64 as usize & !0b111) as *mut (), 0);
        let top = build_chain(&[0x11, 0x22, 0x33], leaf, &shadow);
        assert_eq!(top.shape_of(), 0);

        let mid = node::get_nth(0, top.ptr_of(), 0x11);
        assert_eq!(mid.shape_of(), 0);
        let bottom = node::get_nth(0, mid.ptr_of(), 0x22);
        assert_eq!(bottom.shape_of(), 0);
        let got_leaf = node::get_nth(0, bottom.ptr_of(), 0x33);
        assert_eq!(got_leaf, leaf);

        unsafe {
            node::dealloc(0, bottom.ptr_of());
            node::dealloc(0, mid.ptr_of());
            node::dealloc(0, top.ptr_of());
        }
    }
}
