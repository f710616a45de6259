//! The driver side of the layout core.
//!
//! The reactor turns compositor events into tree operations and, once per
//! frame, turns the animated trees into per-window geometry and transforms.

use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::{
    animation::{AnimatedRect, Transition},
    config::Config,
    geometry::{Point, Rect, WindowId, WorkspaceId},
    layout::{LayoutCommand, LayoutManager},
    model::LayoutTree,
};

#[derive(Debug, Clone)]
pub enum Event {
    WindowMapped { wid: WindowId },
    WindowUnmapped { wid: WindowId },
    WindowFocused { wid: Option<WindowId> },
    CursorMoved { position: Point },
    WorkareaChanged { bounds: Rect },
    WorkspaceChanged { workspace: WorkspaceId },
    ConfigChanged(Config),
    Command { command: LayoutCommand, target: Option<WindowId> },
}

#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventResponse {
    /// Geometry to apply right away, without animation.
    pub snapped: Vec<WindowFrame>,
    /// Whether the driver should start calling [`Reactor::frame`].
    pub schedule_frames: bool,
}

/// Visual adjustment applied on top of a window's real geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale_x: f32,
    pub scale_y: f32,
    pub translate_x: f32,
    pub translate_y: f32,
    pub alpha: f32,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        scale_x: 1.0,
        scale_y: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
        alpha: 1.0,
    };

    /// Makes a window configured at `goal` look like it is at `current`.
    pub fn between(current: Rect, goal: Rect, effect_scale: f32, alpha: f32) -> Transform {
        let ratio = |current: i32, goal: i32| (current as f32 / goal as f32).clamp(0.1, 10.0);
        let center = |r: Rect| (r.x as f32 + r.width as f32 / 2.0, r.y as f32 + r.height as f32 / 2.0);
        let (cx, cy) = center(current);
        let (gx, gy) = center(goal);
        Transform {
            scale_x: ratio(current.width, goal.width) * effect_scale,
            scale_y: ratio(current.height, goal.height) * effect_scale,
            translate_x: cx - gx,
            translate_y: cy - gy,
            alpha,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowFrame {
    pub wid: WindowId,
    /// Where the window should actually be configured.
    pub frame: Rect,
    pub transform: Transform,
}

/// A window that has left the tree and is still playing its exit effect.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitingFrame {
    pub wid: WindowId,
    pub rect: Rect,
    pub scale: f32,
    pub alpha: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameUpdate {
    pub windows: Vec<WindowFrame>,
    pub exiting: Vec<ExitingFrame>,
    /// Nothing is animating any more; the driver can stop ticking.
    pub finished: bool,
}

pub struct Reactor {
    layout: LayoutManager,
    workspace: WorkspaceId,
    focused: Option<WindowId>,
    cursor: Point,
    tile_by_default: bool,
    exiting: Vec<(WindowId, AnimatedRect)>,
}

static_assertions::assert_impl_all!(Reactor: Send);

impl Reactor {
    pub fn new(config: &Config, bounds: Rect) -> Reactor {
        Reactor {
            layout: LayoutManager::new(config.tree_settings(), bounds),
            workspace: WorkspaceId::default(),
            focused: None,
            cursor: Point::default(),
            tile_by_default: config.tile_by_default,
            exiting: Vec::new(),
        }
    }

    pub fn layout(&self) -> &LayoutManager {
        &self.layout
    }

    pub fn workspace(&self) -> WorkspaceId {
        self.workspace
    }

    pub fn focused(&self) -> Option<WindowId> {
        self.focused
    }

    fn current_tree(&self) -> Option<&LayoutTree> {
        self.layout.tree(self.workspace)
    }

    #[instrument(skip(self))]
    pub fn handle_event(&mut self, event: Event, now: Instant) -> EventResponse {
        let animate = Transition::Animate(now);
        match event {
            Event::WindowMapped { wid } => {
                if !self.tile_by_default {
                    debug!(?wid, "not tiling new window");
                    return EventResponse::default();
                }
                self.layout.add_window(self.workspace, wid, self.focused, self.cursor, now, true);
                self.set_focus(Some(wid));
            }
            Event::WindowUnmapped { wid } => {
                let workspace = self.layout.workspace_of(wid);
                let Some(frame) = self.layout.remove_window(wid, now, true) else {
                    return EventResponse::default();
                };
                if self.focused == Some(wid) {
                    self.set_focus(None);
                }
                // Only the visible workspace needs to see the window leave.
                if workspace == Some(self.workspace) && frame.is_animating() {
                    self.exiting.push((wid, frame));
                }
            }
            Event::WindowFocused { wid } => {
                self.set_focus(wid);
                return EventResponse::default();
            }
            Event::CursorMoved { position } => {
                self.cursor = position;
                if let Some(tree) = self.layout.existing_tree_mut(self.workspace) {
                    tree.set_cursor(position);
                }
                return EventResponse::default();
            }
            Event::WorkareaChanged { bounds } => {
                self.layout.set_bounds(bounds, animate);
            }
            Event::WorkspaceChanged { workspace } => {
                info!(?workspace, "switched workspace");
                self.workspace = workspace;
                self.exiting.clear();
                return EventResponse {
                    snapped: self.snapped_frames(),
                    schedule_frames: false,
                };
            }
            Event::ConfigChanged(config) => {
                self.tile_by_default = config.tile_by_default;
                self.layout.set_settings(config.tree_settings(), animate);
            }
            Event::Command { command, target } => {
                let target = target.or(self.focused);
                if !self.layout.handle_command(self.workspace, command, target, now) {
                    return EventResponse::default();
                }
            }
        }
        EventResponse { snapped: vec![], schedule_frames: true }
    }

    fn set_focus(&mut self, wid: Option<WindowId>) {
        self.focused = wid;
        if let Some(tree) = self.layout.existing_tree_mut(self.workspace) {
            tree.set_focused(wid);
        }
    }

    /// Every window of the current workspace at its goal, untransformed.
    fn snapped_frames(&self) -> Vec<WindowFrame> {
        let Some(tree) = self.current_tree() else { return vec![] };
        tree.windows()
            .into_iter()
            .filter_map(|wid| {
                let frame = window_frame(tree, wid)?;
                Some(WindowFrame { wid, frame, transform: Transform::IDENTITY })
            })
            .collect()
    }

    /// Ticks every tree and exiting window to `now` and reports what the
    /// current workspace should look like.
    #[instrument(skip(self), level = "debug")]
    pub fn frame(&mut self, now: Instant) -> FrameUpdate {
        let animating = self.layout.advance(now);
        self.exiting.retain_mut(|(_, frame)| frame.advance(now));
        let finished = !animating && self.exiting.is_empty();
        if finished {
            debug!("animations finished");
            return FrameUpdate {
                windows: self.snapped_frames(),
                exiting: vec![],
                finished,
            };
        }

        let Some(tree) = self.current_tree() else {
            return FrameUpdate { finished, ..Default::default() };
        };
        let windows = tree
            .windows()
            .into_iter()
            .filter_map(|wid| {
                let frame = window_frame(tree, wid)?;
                let (current, goal) = (tree.current_rect(wid)?, tree.goal_rect(wid)?);
                let (scale, alpha) = tree.scale_alpha(wid);
                let transform = Transform::between(current, goal, scale, alpha);
                Some(WindowFrame { wid, frame, transform })
            })
            .collect();
        let exiting = self
            .exiting
            .iter()
            .map(|(wid, frame)| {
                let (scale, alpha) = frame.scale_alpha();
                ExitingFrame { wid: *wid, rect: frame.current(), scale, alpha }
            })
            .collect();
        FrameUpdate { windows, exiting, finished }
    }
}

/// The geometry to configure `wid` with: its goal tile, or its preferred size
/// centered in the tile when pseudotiled. Degenerate results are skipped.
fn window_frame(tree: &LayoutTree, wid: WindowId) -> Option<Rect> {
    let goal = tree.goal_rect(wid)?;
    let frame = match tree.pseudotile(wid) {
        Some(size) => goal.centered(size),
        None => goal,
    };
    (!frame.is_degenerate()).then_some(frame)
}
