//! Static catalog of the internal-node shapes (C1).
//!
//! Values are the 64-bit catalog from the source this crate is grounded on,
//! carried over unchanged: shapes grow strictly by `max_child`, and shape 7
//! (pigeon) is the universal fallback target for recompaction.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ShapeClass {
    Linear,
    Pool,
    Pigeon,
    Null,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct ShapeInfo {
    pub class: ShapeClass,
    pub min_child: u16,
    pub max_child: u16,
    pub max_linear_child: u16,
    pub nr_pool_order: u8,
}

/// Synthetic shape index used only to mean "this slot is empty" when computing
/// `new_idx = old_idx + 1`. Never stored in a [`crate::childref::ChildRef`] tag.
pub(crate) const NULL_SHAPE: u8 = 8;

/// Shape 7: the pigeon node, the universal fallback target of recompaction.
pub(crate) const PIGEON_SHAPE: u8 = 7;

pub(crate) const SHAPES: [ShapeInfo; 9] = [
    ShapeInfo { class: ShapeClass::Linear, min_child: 1, max_child: 1, max_linear_child: 1, nr_pool_order: 0 },
    ShapeInfo { class: ShapeClass::Linear, min_child: 1, max_child: 3, max_linear_child: 3, nr_pool_order: 0 },
    ShapeInfo { class: ShapeClass::Linear, min_child: 1, max_child: 7, max_linear_child: 7, nr_pool_order: 0 },
    ShapeInfo { class: ShapeClass::Linear, min_child: 3, max_child: 14, max_linear_child: 14, nr_pool_order: 0 },
    ShapeInfo { class: ShapeClass::Linear, min_child: 5, max_child: 28, max_linear_child: 28, nr_pool_order: 0 },
    ShapeInfo { class: ShapeClass::Pool, min_child: 10, max_child: 54, max_linear_child: 27, nr_pool_order: 1 },
    ShapeInfo { class: ShapeClass::Pool, min_child: 22, max_child: 104, max_linear_child: 26, nr_pool_order: 2 },
    ShapeInfo { class: ShapeClass::Pigeon, min_child: 51, max_child: 256, max_linear_child: 0, nr_pool_order: 0 },
    ShapeInfo { class: ShapeClass::Null, min_child: 0, max_child: 256, max_linear_child: 0, nr_pool_order: 0 },
];

pub(crate) fn shape(idx: u8) -> &'static ShapeInfo {
    &SHAPES[idx as usize]
}

/// Next shape in the growth sequence, or `PIGEON_SHAPE` once a pool shape's own
/// sub-pool overflows (the caller, not this function, detects that case and
/// forces the jump — see [`crate::recompact::recompact_add`]).
pub(crate) fn next_shape(old_idx: u8) -> u8 {
    if old_idx == NULL_SHAPE {
        0
    } else {
        old_idx + 1
    }
}
