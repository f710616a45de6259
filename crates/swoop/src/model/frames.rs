use std::time::Instant;

use super::tree::{NodeId, NodeMap};
use crate::{
    animation::{AnimatedRect, AnimationConfig, Transition},
    geometry::Rect,
};

/// The animated rectangle of every node in the forest.
#[derive(Default)]
pub struct Frames {
    rects: slotmap::SecondaryMap<NodeId, AnimatedRect>,
    movement: AnimationConfig,
}

impl Frames {
    pub(super) fn added_to_forest(&mut self, node: NodeId) {
        let mut rect = AnimatedRect::default();
        rect.configure(self.movement);
        self.rects.insert(node, rect);
    }

    pub(super) fn removed_from_forest(&mut self, node: NodeId) {
        self.rects.remove(node);
    }

    /// Changes movement timing for existing and future nodes.
    pub(super) fn set_movement(&mut self, movement: AnimationConfig) {
        self.movement = movement;
        for rect in self.rects.values_mut() {
            rect.configure(movement);
        }
    }

    pub fn get(&self, node: NodeId) -> Option<&AnimatedRect> {
        self.rects.get(node)
    }

    pub(super) fn get_mut(&mut self, node: NodeId) -> Option<&mut AnimatedRect> {
        self.rects.get_mut(node)
    }

    /// Detaches a node's rectangle so it can outlive the node.
    pub(super) fn take(&mut self, node: NodeId) -> Option<AnimatedRect> {
        self.rects.remove(node)
    }

    pub(super) fn set_goal(&mut self, node: NodeId, rect: Rect, transition: Transition) {
        if let Some(frame) = self.rects.get_mut(node) {
            frame.set_goal(rect, transition);
        }
    }

    pub(super) fn warp(&mut self, node: NodeId, rect: Rect) {
        if let Some(frame) = self.rects.get_mut(node) {
            frame.warp(rect);
        }
    }

    /// Ticks `node` and everything under it. Returns whether anything is
    /// still animating.
    pub(super) fn advance(&mut self, map: &NodeMap, node: NodeId, now: Instant) -> bool {
        let mut animating = self.rects.get_mut(node).is_some_and(|r| r.advance(now));
        if let Some([first, second]) = node.children(map) {
            // Both subtrees advance regardless of the other's result.
            animating |= self.advance(map, first, now);
            animating |= self.advance(map, second, now);
        }
        animating
    }
}
