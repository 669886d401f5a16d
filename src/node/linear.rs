//! Linear node shapes (catalog indices 0..=4): a flat array of `(key, child)`
//! pairs scanned linearly. `C` is the shape's `max_linear_child`.
//!
//! Single-writer discipline: the shadow node's lock (held by the caller, see
//! [`crate::attach`] and [`crate::recompact`]) excludes concurrent writers, so
//! slot writes need no CAS. Readers never lock; they only ever see a published
//! slot because `nr_child` is bumped last, with `Release`, after the slot's
//! key and child have already been written.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::childref::{AtomicChildRef, ChildRef};

pub(crate) enum SetResult {
    Inserted,
    AlreadyPresent,
    Full,
}

#[repr(C)]
pub(crate) struct LinearNode<const C: usize> {
    nr_child: AtomicU8,
    keys: [AtomicU8; C],
    children: [AtomicChildRef; C],
}

impl<const C: usize> LinearNode<C> {
    pub(crate) fn new() -> Self {
        Self {
            nr_child: AtomicU8::new(0),
            keys: std::array::from_fn(|_| AtomicU8::new(0)),
            children: std::array::from_fn(|_| AtomicChildRef::default()),
        }
    }

    pub(crate) fn empty() -> Box<Self> {
        Box::new(Self::new())
    }

    pub(crate) fn get_nth(&self, byte: u8) -> ChildRef {
        let n = self.nr_child.load(Ordering::Acquire) as usize;
        for i in 0..n {
            if self.keys[i].load(Ordering::Relaxed) == byte {
                return self.children[i].load(Ordering::Relaxed);
            }
        }
        ChildRef::NULL
    }

    /// Caller holds the owning shadow node's lock.
    pub(crate) fn set_nth(&self, byte: u8, child: ChildRef) -> SetResult {
        let n = self.nr_child.load(Ordering::Relaxed) as usize;
        for i in 0..n {
            if self.keys[i].load(Ordering::Relaxed) == byte {
                return SetResult::AlreadyPresent;
            }
        }
        if n == C {
            return SetResult::Full;
        }
        self.keys[n].store(byte, Ordering::Relaxed);
        self.children[n].store(child, Ordering::Relaxed);
        self.nr_child.store(n as u8 + 1, Ordering::Release);
        SetResult::Inserted
    }

    /// Address of the atomic cell already holding `byte`'s child, for a
    /// caller that needs to replace the whole node one level up (the
    /// recompaction engine growing this node's *parent*, not this node).
    pub(crate) fn slot(&self, byte: u8) -> Option<&AtomicChildRef> {
        let n = self.nr_child.load(Ordering::Acquire) as usize;
        (0..n)
            .find(|&i| self.keys[i].load(Ordering::Relaxed) == byte)
            .map(|i| &self.children[i])
    }

    pub(crate) fn iterate(&self, mut f: impl FnMut(u8, ChildRef)) {
        let n = self.nr_child.load(Ordering::Acquire) as usize;
        for i in 0..n {
            f(self.keys[i].load(Ordering::Relaxed), self.children[i].load(Ordering::Relaxed));
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nr_child.load(Ordering::Acquire) as usize
    }
}
