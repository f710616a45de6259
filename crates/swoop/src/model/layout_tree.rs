use std::{iter, time::Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use super::{
    frames::Frames,
    layout::{Layout, LayoutParams, Orientation},
    tree::{self, NodeId, NodeMap, Tree},
};
use crate::{
    animation::{AnimatedRect, AnimationConfig, Transition},
    geometry::{Point, Rect, Size, WindowId},
    layout::LayoutCommand,
};

/// Which side of a split a newly inserted window takes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceSplit {
    /// Second slot, or the side of the cursor when smart-split is on.
    #[default]
    Cursor,
    /// Always the first slot (left or top).
    First,
    /// Always the second slot (right or bottom).
    Second,
}

/// Everything a [`LayoutTree`] needs to know about the user's preferences.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeSettings {
    pub enter: AnimationConfig,
    pub exit: AnimationConfig,
    pub movement: AnimationConfig,
    pub gaps_in: i32,
    pub gaps_out: i32,
    pub preserve_split: bool,
    pub split_width_multiplier: f32,
    pub force_split: ForceSplit,
    pub smart_split: bool,
    /// Scale a window grows from when it enters, and shrinks to when it
    /// leaves.
    pub popin_scale: f32,
}

impl Default for TreeSettings {
    fn default() -> Self {
        TreeSettings {
            enter: AnimationConfig::default(),
            exit: AnimationConfig::default(),
            movement: AnimationConfig::default(),
            gaps_in: 5,
            gaps_out: 10,
            preserve_split: false,
            split_width_multiplier: 1.0,
            force_split: ForceSplit::Cursor,
            smart_split: false,
            popin_scale: 0.8,
        }
    }
}

/// The tiling tree of one workspace.
///
/// All interactions with the data model happen through the public APIs on this
/// type.
pub struct LayoutTree {
    tree: Tree<Components>,
    root: Option<NodeId>,
    settings: TreeSettings,
    bounds: Rect,
    focused: Option<WindowId>,
    cursor: Point,
}

#[derive(Default)]
struct Components {
    layout: Layout,
    frames: Frames,
}

#[derive(Copy, Clone)]
enum TreeEvent {
    /// A node was added to the forest.
    AddedToForest(NodeId),
    /// A node was removed from the forest.
    RemovedFromForest(NodeId),
}

static_assertions::assert_impl_all!(LayoutTree: Send);

impl LayoutTree {
    pub fn new(settings: TreeSettings, bounds: Rect) -> LayoutTree {
        let mut components = Components::default();
        components.frames.set_movement(settings.movement);
        LayoutTree {
            tree: Tree::with_observer(components),
            root: None,
            settings,
            bounds,
            focused: None,
            cursor: Point::default(),
        }
    }

    pub fn settings(&self) -> &TreeSettings {
        &self.settings
    }

    /// Replaces the settings. Takes effect on the next recalculation.
    pub fn set_settings(&mut self, settings: TreeSettings) {
        self.tree.data.frames.set_movement(settings.movement);
        self.settings = settings;
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Replaces the workspace bounds. Takes effect on the next recalculation.
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    pub fn focused(&self) -> Option<WindowId> {
        self.focused
    }

    pub fn set_focused(&mut self, window: Option<WindowId>) {
        self.focused = window;
    }

    pub fn set_cursor(&mut self, cursor: Point) {
        self.cursor = cursor;
    }

    /// The workspace bounds minus the outer gap.
    pub fn tiling_area(&self) -> Rect {
        self.bounds.inset(self.settings.gaps_out)
    }

    /// Adds a window, splitting the focused window's tile if there is one.
    ///
    /// `focused` and `cursor` are remembered for later messages and inserts.
    /// The enter effect always starts at `now`; `animate` only decides whether
    /// the other tiles move or jump to their new places.
    #[instrument(skip(self))]
    pub fn insert(
        &mut self,
        window: WindowId,
        focused: Option<WindowId>,
        cursor: Point,
        now: Instant,
        animate: bool,
    ) {
        if self.contains(window) {
            debug!(?window, "window is already tiled");
            return;
        }
        self.focused = focused;
        self.cursor = cursor;

        let area = self.tiling_area();
        let leaf = self.tree.mk_leaf();
        self.tree.data.layout.set_leaf(leaf, window);

        match self.root {
            None => {
                self.root = Some(leaf);
                self.tree.data.frames.warp(leaf, area);
            }
            Some(root) if root.is_leaf(&self.tree.map) => {
                let orientation = self.split_orientation(area, root);
                let new_first = self.settings.force_split == ForceSplit::First;
                // Start from the half it will end up in, not from wherever a
                // fresh frame happens to be.
                let start = new_window_start(area, orientation, new_first);
                self.tree.data.frames.warp(leaf, start);
                let (first, second) = if new_first { (leaf, root) } else { (root, leaf) };
                let split = self.tree.mk_split(first, second);
                self.tree.data.layout.set_split(split, orientation);
                self.tree.data.frames.warp(split, area);
                self.root = Some(split);
            }
            Some(root) => {
                let target = focused
                    .and_then(|f| self.tree.data.layout.find_leaf(&self.tree.map, root, f))
                    .unwrap_or_else(|| self.dwindle_leaf(root));
                trace!(?target, "splitting leaf");
                self.split_leaf(target, leaf);
            }
        }

        let (scale, config) = (self.settings.popin_scale, self.settings.enter);
        if let Some(frame) = self.tree.data.frames.get_mut(leaf) {
            frame.start_enter_effect(scale, config, now);
        }
        self.recalculate_layout(Transition::new(animate, now));
    }

    /// Removes a window and collapses its parent split into the sibling.
    ///
    /// The window's frame is handed back with its exit effect started, so the
    /// caller can keep drawing it while it fades; the tree has already
    /// forgotten it. The last window of a tree leaves without an effect.
    #[instrument(skip(self))]
    pub fn remove(
        &mut self,
        window: WindowId,
        now: Instant,
        animate: bool,
    ) -> Option<AnimatedRect> {
        let leaf = self.find_leaf(window)?;
        let map = &mut self.tree.map;
        let parent = leaf.parent(map);
        if let Some(parent) = parent {
            let sibling = leaf.sibling(map).expect("split with a single child");
            match parent.parent(map) {
                None => {
                    sibling.clear_parent(map);
                    self.root = Some(sibling);
                }
                Some(grandparent) => {
                    let index = parent.child_index(map).expect("parent is not a child of its parent");
                    grandparent.set_child(index, sibling, map);
                }
            }
        } else {
            self.root = None;
        }

        let mut frame = self.tree.data.frames.take(leaf);
        leaf.discard(&mut self.tree);
        if let Some(parent) = parent {
            parent.discard(&mut self.tree);
        }
        if self.focused == Some(window) {
            self.focused = None;
        }

        if let (Some(frame), Some(_)) = (frame.as_mut(), parent) {
            frame.start_exit_effect(self.settings.popin_scale, self.settings.exit, now);
        }
        self.recalculate_layout(Transition::new(animate, now));
        frame
    }

    /// Applies a layout command to `target`, or to the focused window.
    ///
    /// Returns false if there was no such window, or it has no parent split
    /// to act on.
    #[instrument(skip(self))]
    pub fn message(
        &mut self,
        command: LayoutCommand,
        target: Option<WindowId>,
        now: Instant,
    ) -> bool {
        let Some(node) = target.or(self.focused).and_then(|w| self.find_leaf(w)) else {
            debug!("no target window for command");
            return false;
        };
        let Some(parent) = node.parent(&self.tree.map) else {
            return false;
        };
        match command {
            LayoutCommand::ToggleSplit => {
                self.tree.data.layout.toggle_orientation(parent);
            }
            LayoutCommand::SwapSibling => {
                parent.swap_children(&mut self.tree.map);
            }
            LayoutCommand::TogglePseudotile { reported_size } => {
                let tile = self.tree.data.frames.get(node).map(|f| f.goal().size());
                let tile = tile.unwrap_or_default();
                self.tree.data.layout.toggle_pseudotile(node, reported_size, tile);
            }
        }
        self.recalculate_layout(Transition::Animate(now));
        true
    }

    /// Sets the share of the window's parent split given to its first child.
    pub fn set_split_ratio(&mut self, window: WindowId, ratio: f32, transition: Transition) -> bool {
        let Some(parent) = self.find_leaf(window).and_then(|n| n.parent(&self.tree.map)) else {
            return false;
        };
        self.tree.data.layout.set_ratio(parent, ratio);
        self.recalculate_layout(transition);
        true
    }

    /// Re-derives every node's goal rectangle from the root down.
    #[instrument(skip(self))]
    pub fn recalculate_layout(&mut self, transition: Transition) {
        let Some(root) = self.root else { return };
        let params = LayoutParams {
            gap_in: self.settings.gaps_in,
            preserve_split: self.settings.preserve_split,
            split_width_multiplier: self.settings.split_width_multiplier,
            transition,
        };
        let area = self.tiling_area();
        let Components { layout, frames } = &mut self.tree.data;
        layout.apply(&self.tree.map, frames, root, area, &params);
        debug!("Tree:\n{}", self.draw_tree().trim());
    }

    /// Ticks every frame in the tree. Returns whether anything is still
    /// animating.
    #[instrument(skip(self), level = "trace")]
    pub fn advance(&mut self, now: Instant) -> bool {
        let Some(root) = self.root else { return false };
        self.tree.data.frames.advance(&self.tree.map, root, now)
    }

    pub fn contains(&self, window: WindowId) -> bool {
        self.find_leaf(window).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of tiled windows.
    pub fn len(&self) -> usize {
        self.root.map_or(0, |root| root.count_leaves(&self.tree.map))
    }

    /// All windows, in left-to-right order.
    pub fn windows(&self) -> Vec<WindowId> {
        let Some(root) = self.root else { return vec![] };
        root.leaves(&self.tree.map)
            .filter_map(|node| self.tree.data.layout.window(node))
            .collect()
    }

    pub fn current_rect(&self, window: WindowId) -> Option<Rect> {
        self.frame(window).map(|f| f.current())
    }

    pub fn goal_rect(&self, window: WindowId) -> Option<Rect> {
        self.frame(window).map(|f| f.goal())
    }

    /// Effect scale and alpha; `(1.0, 1.0)` for unknown windows.
    pub fn scale_alpha(&self, window: WindowId) -> (f32, f32) {
        self.frame(window).map_or((1.0, 1.0), |f| f.scale_alpha())
    }

    /// The preferred size of a pseudotiled window.
    pub fn pseudotile(&self, window: WindowId) -> Option<Size> {
        let leaf = self.tree.data.layout.leaf(self.find_leaf(window)?)?;
        leaf.pseudotiled.then_some(leaf.preferred_size)
    }

    fn frame(&self, window: WindowId) -> Option<&AnimatedRect> {
        self.tree.data.frames.get(self.find_leaf(window)?)
    }

    fn find_leaf(&self, window: WindowId) -> Option<NodeId> {
        self.tree.data.layout.find_leaf(&self.tree.map, self.root?, window)
    }

    /// Picks the axis for splitting `existing`, whose area is `area`.
    fn split_orientation(&self, area: Rect, existing: NodeId) -> Orientation {
        if self.settings.smart_split {
            if let Some(frame) = self.tree.data.frames.get(existing) {
                return orientation_toward(frame.goal(), self.cursor);
            }
        }
        Orientation::from_aspect(area, self.settings.split_width_multiplier)
    }

    /// Follows second children down to a leaf.
    fn dwindle_leaf(&self, root: NodeId) -> NodeId {
        let map = &self.tree.map;
        iter::successors(Some(root), |&n| n.child(1, map)).last().unwrap_or(root)
    }

    /// Replaces `target` with a split holding `target` and `leaf`.
    fn split_leaf(&mut self, target: NodeId, leaf: NodeId) {
        let existing = self.tree.data.frames.get(target).map(|f| f.goal()).unwrap_or_default();
        let parent = target.parent(&self.tree.map);
        let index = target.child_index(&self.tree.map);

        let orientation = self.split_orientation(existing, target);
        let new_second = match self.settings.force_split {
            ForceSplit::First => false,
            ForceSplit::Second => true,
            ForceSplit::Cursor if self.settings.smart_split => {
                let center = existing.center();
                match orientation {
                    Orientation::Horizontal => self.cursor.x > center.x,
                    Orientation::Vertical => self.cursor.y > center.y,
                }
            }
            ForceSplit::Cursor => true,
        };
        self.tree.data.frames.warp(leaf, new_window_start(existing, orientation, !new_second));

        let (first, second) = if new_second { (target, leaf) } else { (leaf, target) };
        let split = self.tree.mk_split(first, second);
        self.tree.data.layout.set_split(split, orientation);
        self.tree.data.frames.warp(split, existing);
        match parent.zip(index) {
            Some((parent, index)) => parent.set_child(index, split, &mut self.tree.map),
            None => self.root = Some(split),
        }
    }

    pub fn draw_tree(&self) -> String {
        let Some(root) = self.root else {
            return "(empty)\n".to_string();
        };
        let tree = self.get_ascii_tree(root);
        let mut out = String::new();
        // Writing to a String can't fail.
        let _ = ascii_tree::write_tree(&mut out, &tree);
        out
    }

    fn get_ascii_tree(&self, node: NodeId) -> ascii_tree::Tree {
        let goal = self.tree.data.frames.get(node).map(|f| f.goal()).unwrap_or_default();
        let desc = format!(
            "{} ({}, {}) {}x{}",
            self.tree.data.layout.debug(node),
            goal.x,
            goal.y,
            goal.width,
            goal.height
        );
        match node.children(&self.tree.map) {
            Some(children) => {
                ascii_tree::Tree::Node(desc, children.map(|c| self.get_ascii_tree(c)).to_vec())
            }
            None => ascii_tree::Tree::Leaf(vec![desc]),
        }
    }
}

/// Half of `area` on the side a new window will occupy.
fn new_window_start(area: Rect, orientation: Orientation, first: bool) -> Rect {
    match orientation {
        Orientation::Horizontal => {
            let half = area.width / 2;
            let x = if first { area.x } else { area.x + half };
            Rect::new(x, area.y, half, area.height)
        }
        Orientation::Vertical => {
            let half = area.height / 2;
            let y = if first { area.y } else { area.y + half };
            Rect::new(area.x, y, area.width, half)
        }
    }
}

/// Splits along the axis on which the cursor is relatively further from the
/// center of `rect`.
fn orientation_toward(rect: Rect, cursor: Point) -> Orientation {
    let center = rect.center();
    let dx = (cursor.x - center.x).abs() as f32;
    let dy = (cursor.y - center.y).abs() as f32;
    let rel_x = dx / (rect.width / 2).max(1) as f32;
    let rel_y = dy / (rect.height / 2).max(1) as f32;
    if rel_x > rel_y {
        Orientation::Horizontal
    } else {
        Orientation::Vertical
    }
}

impl Components {
    fn dispatch_event(&mut self, event: TreeEvent) {
        match event {
            TreeEvent::AddedToForest(node) => {
                self.frames.added_to_forest(node);
            }
            TreeEvent::RemovedFromForest(node) => {
                self.layout.removed_from_forest(node);
                self.frames.removed_from_forest(node);
            }
        }
    }
}

impl tree::Observer for Components {
    fn added_to_forest(&mut self, _map: &NodeMap, node: NodeId) {
        self.dispatch_event(TreeEvent::AddedToForest(node))
    }

    fn removed_from_forest(&mut self, _map: &NodeMap, node: NodeId) {
        self.dispatch_event(TreeEvent::RemovedFromForest(node))
    }
}
