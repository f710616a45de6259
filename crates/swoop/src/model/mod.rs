//! This module defines the [`LayoutTree`] data structure, on which all
//! tiling logic is defined.

mod frames;
mod layout;
mod layout_tree;
mod tree;

pub use layout::{Leaf, NodeKind, Orientation, Split, MAX_RATIO, MIN_RATIO};
pub use layout_tree::{ForceSplit, LayoutTree, TreeSettings};
