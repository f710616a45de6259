use serde::{Deserialize, Serialize};

use super::{
    frames::Frames,
    tree::{NodeId, NodeMap},
};
use crate::{
    animation::Transition,
    geometry::{Rect, Size, WindowId},
};

pub const MIN_RATIO: f32 = 0.1;
pub const MAX_RATIO: f32 = 0.9;

/// How a split divides its area between its two children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Children side by side, first on the left.
    Horizontal,
    /// Children stacked, first on top.
    Vertical,
}

impl Orientation {
    /// Splits wide areas side by side and tall areas top to bottom.
    /// `split_width_multiplier` biases the comparison for ultrawide outputs.
    pub fn from_aspect(bounds: Rect, split_width_multiplier: f32) -> Orientation {
        let effective_width = bounds.width as f32 * split_width_multiplier;
        if effective_width > bounds.height as f32 {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }

    pub fn flip(self) -> Orientation {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Split {
    pub orientation: Orientation,
    ratio: f32,
    /// Set by an explicit toggle; a locked split keeps its orientation when
    /// the layout is recalculated.
    pub locked: bool,
}

impl Split {
    pub fn new(orientation: Orientation) -> Split {
        Split { orientation, ratio: 0.5, locked: false }
    }

    /// Share of the area given to the first child.
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        // NaN would survive clamp().
        self.ratio = if ratio.is_nan() { 0.5 } else { ratio.clamp(MIN_RATIO, MAX_RATIO) };
    }

    /// Divides `bounds` into the two child areas with `gap` pixels between
    /// them.
    pub fn partition(&self, bounds: Rect, gap: i32) -> (Rect, Rect) {
        match self.orientation {
            Orientation::Horizontal => {
                let available = bounds.width - gap;
                let first = (available as f32 * self.ratio).floor() as i32;
                (
                    Rect::new(bounds.x, bounds.y, first, bounds.height),
                    Rect::new(bounds.x + first + gap, bounds.y, available - first, bounds.height),
                )
            }
            Orientation::Vertical => {
                let available = bounds.height - gap;
                let first = (available as f32 * self.ratio).floor() as i32;
                (
                    Rect::new(bounds.x, bounds.y, bounds.width, first),
                    Rect::new(bounds.x, bounds.y + first + gap, bounds.width, available - first),
                )
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Leaf(Leaf),
    Split(Split),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Leaf {
    pub window: WindowId,
    pub pseudotiled: bool,
    /// Size the window asked for when pseudotiling was turned on.
    pub preferred_size: Size,
}

/// Parameters of one layout pass, shared by every node it visits.
#[derive(Clone, Copy, Debug)]
pub struct LayoutParams {
    pub gap_in: i32,
    pub preserve_split: bool,
    pub split_width_multiplier: f32,
    pub transition: Transition,
}

#[derive(Default)]
pub struct Layout {
    info: slotmap::SecondaryMap<NodeId, NodeKind>,
}

impl Layout {
    pub(super) fn removed_from_forest(&mut self, node: NodeId) {
        self.info.remove(node);
    }

    pub(super) fn set_leaf(&mut self, node: NodeId, window: WindowId) {
        self.info.insert(
            node,
            NodeKind::Leaf(Leaf {
                window,
                pseudotiled: false,
                preferred_size: Size::default(),
            }),
        );
    }

    pub(super) fn set_split(&mut self, node: NodeId, orientation: Orientation) {
        self.info.insert(node, NodeKind::Split(Split::new(orientation)));
    }

    #[cfg(test)]
    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.info.get(node)
    }

    pub fn leaf(&self, node: NodeId) -> Option<&Leaf> {
        match self.info.get(node)? {
            NodeKind::Leaf(leaf) => Some(leaf),
            NodeKind::Split(_) => None,
        }
    }

    pub fn split(&self, node: NodeId) -> Option<&Split> {
        match self.info.get(node)? {
            NodeKind::Split(split) => Some(split),
            NodeKind::Leaf(_) => None,
        }
    }

    fn leaf_mut(&mut self, node: NodeId) -> Option<&mut Leaf> {
        match self.info.get_mut(node)? {
            NodeKind::Leaf(leaf) => Some(leaf),
            NodeKind::Split(_) => None,
        }
    }

    fn split_mut(&mut self, node: NodeId) -> Option<&mut Split> {
        match self.info.get_mut(node)? {
            NodeKind::Split(split) => Some(split),
            NodeKind::Leaf(_) => None,
        }
    }

    pub fn window(&self, node: NodeId) -> Option<WindowId> {
        self.leaf(node).map(|leaf| leaf.window)
    }

    pub(super) fn set_orientation(&mut self, node: NodeId, orientation: Orientation) {
        if let Some(split) = self.split_mut(node) {
            split.orientation = orientation;
        }
    }

    pub(super) fn lock_orientation(&mut self, node: NodeId) {
        if let Some(split) = self.split_mut(node) {
            split.locked = true;
        }
    }

    pub(super) fn set_ratio(&mut self, node: NodeId, ratio: f32) {
        if let Some(split) = self.split_mut(node) {
            split.set_ratio(ratio);
        }
    }

    /// Flips the orientation and pins it against recalculation.
    pub(super) fn toggle_orientation(&mut self, node: NodeId) {
        if let Some(orientation) = self.split(node).map(|s| s.orientation) {
            self.set_orientation(node, orientation.flip());
            self.lock_orientation(node);
        }
    }

    /// Turns pseudotiling on or off.
    ///
    /// When turning it on, a usable `reported_size` is remembered as the
    /// preferred size. Without one, an earlier preferred size is kept, and
    /// failing that the window keeps the size of its `tile`.
    pub(super) fn toggle_pseudotile(
        &mut self,
        node: NodeId,
        reported_size: Option<Size>,
        tile: Size,
    ) {
        let Some(leaf) = self.leaf_mut(node) else { return };
        leaf.pseudotiled = !leaf.pseudotiled;
        if !leaf.pseudotiled {
            return;
        }
        match reported_size.filter(|size| !size.is_degenerate()) {
            Some(size) => leaf.preferred_size = size,
            None if leaf.preferred_size.is_degenerate() => leaf.preferred_size = tile,
            None => (),
        }
    }

    /// Depth-first search for the leaf holding `window`, first child first.
    pub fn find_leaf(&self, map: &NodeMap, from: NodeId, window: WindowId) -> Option<NodeId> {
        from.leaves(map).find(|&node| self.window(node) == Some(window))
    }

    /// Lays out the subtree at `node` within `bounds`.
    ///
    /// Unless `preserve_split` is set or the split is locked, each split's
    /// orientation is re-derived from the aspect ratio of the area it is given,
    /// so splits follow the shape of their region as it changes.
    pub(super) fn apply(
        &mut self,
        map: &NodeMap,
        frames: &mut Frames,
        node: NodeId,
        bounds: Rect,
        params: &LayoutParams,
    ) {
        frames.set_goal(node, bounds, params.transition);

        let Some([first, second]) = node.children(map) else {
            return;
        };
        let Some(split) = self.split_mut(node) else {
            debug_assert!(false, "split node {node:?} has no split info");
            return;
        };
        if !params.preserve_split && !split.locked {
            split.orientation = Orientation::from_aspect(bounds, params.split_width_multiplier);
        }
        let (first_bounds, second_bounds) = split.partition(bounds, params.gap_in);

        self.apply(map, frames, first, first_bounds, params);
        self.apply(map, frames, second, second_bounds, params);
    }

    pub(super) fn debug(&self, node: NodeId) -> String {
        match self.info.get(node) {
            Some(NodeKind::Leaf(leaf)) if leaf.pseudotiled => {
                format!("{:?} pseudo {:?}", leaf.window, leaf.preferred_size)
            }
            Some(NodeKind::Leaf(leaf)) => format!("{:?}", leaf.window),
            Some(NodeKind::Split(split)) => format!(
                "{:?} {:.2}{}",
                split.orientation,
                split.ratio,
                if split.locked { " locked" } else { "" }
            ),
            None => "?".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn ratio_is_clamped() {
        let mut split = Split::new(Orientation::Horizontal);
        for (input, expected) in [
            (0.0, MIN_RATIO),
            (-3.0, MIN_RATIO),
            (0.05, MIN_RATIO),
            (0.3, 0.3),
            (0.95, MAX_RATIO),
            (42.0, MAX_RATIO),
            (f32::INFINITY, MAX_RATIO),
            (f32::NEG_INFINITY, MIN_RATIO),
        ] {
            split.set_ratio(input);
            assert_eq!(split.ratio(), expected, "set_ratio({input})");
        }
        split.set_ratio(f32::NAN);
        assert!((MIN_RATIO..=MAX_RATIO).contains(&split.ratio()));
    }

    #[test]
    fn aspect_decides_orientation() {
        let wide = Rect::new(0, 0, 1920, 1080);
        let tall = Rect::new(0, 0, 1080, 1920);
        let square = Rect::new(0, 0, 1000, 1000);
        assert_eq!(Orientation::from_aspect(wide, 1.0), Orientation::Horizontal);
        assert_eq!(Orientation::from_aspect(tall, 1.0), Orientation::Vertical);
        assert_eq!(Orientation::from_aspect(square, 1.0), Orientation::Vertical);
        assert_eq!(Orientation::from_aspect(wide, 0.5), Orientation::Vertical);
        assert_eq!(Orientation::from_aspect(tall, 2.0), Orientation::Horizontal);
    }

    #[test]
    fn partition_leaves_gap_between_children() {
        let bounds = Rect::new(10, 10, 1900, 1060);
        let mut split = Split::new(Orientation::Horizontal);
        let (a, b) = split.partition(bounds, 5);
        assert_eq!(a, Rect::new(10, 10, 947, 1060));
        assert_eq!(b, Rect::new(962, 10, 948, 1060));
        assert_eq!(a.width + 5 + b.width, bounds.width);

        split.orientation = Orientation::Vertical;
        split.set_ratio(0.25);
        let (a, b) = split.partition(bounds, 5);
        assert_eq!(a, Rect::new(10, 10, 1900, 263));
        assert_eq!(b, Rect::new(10, 278, 1900, 792));
        assert_eq!(a.height + 5 + b.height, bounds.height);
    }
}
