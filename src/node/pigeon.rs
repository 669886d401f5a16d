//! Pigeon node (catalog index 7): a direct-indexed array of 256 child slots,
//! one per possible key byte. The universal recompaction fallback: a pool
//! sub-pool overflow jumps straight here instead of trying shape 6's sibling
//! pool width, since there is nowhere wider to grow.

use crate::childref::{AtomicChildRef, ChildRef};
use crate::node::linear::SetResult;

pub(crate) struct PigeonNode {
    children: [AtomicChildRef; 256],
}

impl PigeonNode {
    pub(crate) fn empty() -> Box<Self> {
        Box::new(Self {
            children: std::array::from_fn(|_| AtomicChildRef::default()),
        })
    }

    pub(crate) fn get_nth(&self, byte: u8) -> ChildRef {
        self.children[byte as usize].load(std::sync::atomic::Ordering::Acquire)
    }

    /// Caller holds the owning shadow node's lock.
    pub(crate) fn set_nth(&self, byte: u8, child: ChildRef) -> SetResult {
        if !self.children[byte as usize].load(std::sync::atomic::Ordering::Relaxed).is_null() {
            return SetResult::AlreadyPresent;
        }
        self.children[byte as usize].store(child, std::sync::atomic::Ordering::Release);
        SetResult::Inserted
    }

    pub(crate) fn slot(&self, byte: u8) -> Option<&AtomicChildRef> {
        Some(&self.children[byte as usize])
    }

    pub(crate) fn iterate(&self, mut f: impl FnMut(u8, ChildRef)) {
        for (i, slot) in self.children.iter().enumerate() {
            let child = slot.load(std::sync::atomic::Ordering::Acquire);
            if !child.is_null() {
                f(i as u8, child);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.children
            .iter()
            .filter(|c| !c.load(std::sync::atomic::Ordering::Relaxed).is_null())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_indexed_round_trip() {
        let n = PigeonNode::empty();
        let child = ChildRef::make((&0u64 as *const u64 as usize & !0b111) as *mut (), 1);
        assert!(matches!(n.set_nth(200, child), SetResult::Inserted));
        assert_eq!(n.get_nth(200), child);
        assert!(n.get_nth(199).is_null());
        assert_eq!(n.len(), 1);
    }

    #[test]
    fn rejects_duplicate() {
        let n = PigeonNode::empty();
        let child = ChildRef::make((&0u64 as *const u64 as usize & !0b111) as *mut (), 1);
        let _ = n.set_nth(7, child);
        assert!(matches!(n.set_nth(7, child), SetResult::AlreadyPresent));
    }
}
