use std::{
    collections::{BTreeMap, HashMap},
    time::Instant,
};

use tracing::{debug, instrument};

use crate::{
    animation::{AnimatedRect, Transition},
    geometry::{Point, Rect, Size, WindowId, WorkspaceId},
    model::{LayoutTree, TreeSettings},
};

/// Structural edits a user can request on a tiled window.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutCommand {
    /// Flip the parent split between side-by-side and stacked, and lock it.
    ToggleSplit,
    /// Exchange the window with its sibling subtree.
    SwapSibling,
    /// Toggle floating the window at its own size within its tile.
    TogglePseudotile { reported_size: Option<Size> },
}

/// Owns one [`LayoutTree`] per workspace.
pub struct LayoutManager {
    trees: BTreeMap<WorkspaceId, LayoutTree>,
    window_workspaces: HashMap<WindowId, WorkspaceId>,
    settings: TreeSettings,
    bounds: Rect,
}

impl LayoutManager {
    pub fn new(settings: TreeSettings, bounds: Rect) -> Self {
        LayoutManager {
            trees: BTreeMap::new(),
            window_workspaces: HashMap::new(),
            settings,
            bounds,
        }
    }

    pub fn tree(&self, workspace: WorkspaceId) -> Option<&LayoutTree> {
        self.trees.get(&workspace)
    }

    /// Returns the tree for `workspace`, creating it on first use.
    pub fn tree_mut(&mut self, workspace: WorkspaceId) -> &mut LayoutTree {
        let (settings, bounds) = (&self.settings, self.bounds);
        self.trees
            .entry(workspace)
            .or_insert_with(|| LayoutTree::new(settings.clone(), bounds))
    }

    pub fn existing_tree_mut(&mut self, workspace: WorkspaceId) -> Option<&mut LayoutTree> {
        self.trees.get_mut(&workspace)
    }

    pub fn workspace_of(&self, wid: WindowId) -> Option<WorkspaceId> {
        self.window_workspaces.get(&wid).copied()
    }

    pub fn windows(&self, workspace: WorkspaceId) -> Vec<WindowId> {
        self.tree(workspace).map(|t| t.windows()).unwrap_or_default()
    }

    pub fn add_window(
        &mut self,
        workspace: WorkspaceId,
        wid: WindowId,
        focused: Option<WindowId>,
        cursor: Point,
        now: Instant,
        animate: bool,
    ) {
        match self.workspace_of(wid) {
            Some(old) if old == workspace => return,
            Some(old) => {
                debug!(?wid, ?old, ?workspace, "window changed workspace");
                let _ = self.remove_window(wid, now, false);
            }
            None => (),
        }
        let tree = self.tree_mut(workspace);
        tree.insert(wid, focused, cursor, now, animate);
        let windows = tree.len();
        self.window_workspaces.insert(wid, workspace);
        debug!(?wid, ?workspace, windows, "inserted window");
    }

    /// Removes a window from whichever tree holds it and returns its frame
    /// with the exit effect started.
    pub fn remove_window(
        &mut self,
        wid: WindowId,
        now: Instant,
        animate: bool,
    ) -> Option<AnimatedRect> {
        let recorded = self.window_workspaces.remove(&wid);
        if let Some(frame) = recorded
            .and_then(|ws| self.trees.get_mut(&ws))
            .and_then(|tree| tree.remove(wid, now, animate))
        {
            return Some(frame);
        }
        // Recorded workspace was stale; look everywhere.
        let found = self.trees.iter_mut().find_map(|(ws, tree)| {
            let frame = tree.remove(wid, now, animate)?;
            Some((*ws, frame))
        });
        match found {
            Some((ws, frame)) => {
                debug!(?wid, ?recorded, found = ?ws, "window was in an unexpected workspace");
                Some(frame)
            }
            None => {
                debug!(?wid, "remove of unknown window");
                None
            }
        }
    }

    #[instrument(skip(self))]
    pub fn handle_command(
        &mut self,
        workspace: WorkspaceId,
        command: LayoutCommand,
        target: Option<WindowId>,
        now: Instant,
    ) -> bool {
        let Some(tree) = self.trees.get_mut(&workspace) else {
            return false;
        };
        debug!("Tree:\n{}", tree.draw_tree().trim());
        tree.message(command, target, now)
    }

    /// Applies a new work area to every workspace.
    pub fn set_bounds(&mut self, bounds: Rect, transition: Transition) {
        self.bounds = bounds;
        for tree in self.trees.values_mut() {
            tree.set_bounds(bounds);
            tree.recalculate_layout(transition);
        }
    }

    /// Pushes new settings to every workspace.
    pub fn set_settings(&mut self, settings: TreeSettings, transition: Transition) {
        for tree in self.trees.values_mut() {
            tree.set_settings(settings.clone());
            tree.recalculate_layout(transition);
        }
        self.settings = settings;
    }

    /// Ticks every workspace. Returns whether any is still animating.
    pub fn advance(&mut self, now: Instant) -> bool {
        let mut animating = false;
        for tree in self.trees.values_mut() {
            animating |= tree.advance(now);
        }
        animating
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    const SCREEN: Rect = Rect::new(0, 0, 1920, 1080);

    fn w(id: u64) -> WindowId {
        WindowId::new(id)
    }

    fn manager() -> LayoutManager {
        LayoutManager::new(TreeSettings::default(), SCREEN)
    }

    #[test]
    fn trees_are_created_lazily() {
        let t0 = Instant::now();
        let mut mgr = manager();
        let ws = WorkspaceId::from_grid(1, 0, 3);
        assert!(mgr.tree(ws).is_none());
        mgr.add_window(ws, w(1), None, Point::default(), t0, false);
        assert_eq!(mgr.windows(ws), vec![w(1)]);
        assert_eq!(mgr.workspace_of(w(1)), Some(ws));
        assert!(mgr.tree(WorkspaceId::new(0)).is_none());
    }

    #[test]
    fn workspaces_are_independent() {
        let t0 = Instant::now();
        let mut mgr = manager();
        let (a, b) = (WorkspaceId::new(0), WorkspaceId::new(1));
        mgr.add_window(a, w(1), None, Point::default(), t0, false);
        mgr.add_window(a, w(2), None, Point::default(), t0, false);
        mgr.add_window(b, w(3), None, Point::default(), t0, false);
        let tile = |mgr: &LayoutManager, ws, id| mgr.tree(ws).unwrap().goal_rect(w(id));
        assert_eq!(tile(&mgr, a, 1), Some(Rect::new(10, 10, 947, 1060)));
        assert_eq!(tile(&mgr, b, 3), Some(Rect::new(10, 10, 1900, 1060)));

        assert!(mgr.remove_window(w(1), t0, false).is_some());
        assert_eq!(mgr.windows(a), vec![w(2)]);
        assert_eq!(mgr.windows(b), vec![w(3)]);
        assert!(mgr.remove_window(w(1), t0, false).is_none());
    }

    #[test]
    fn adding_to_another_workspace_moves_window() {
        let t0 = Instant::now();
        let mut mgr = manager();
        let (a, b) = (WorkspaceId::new(0), WorkspaceId::new(1));
        mgr.add_window(a, w(1), None, Point::default(), t0, false);
        mgr.add_window(a, w(1), None, Point::default(), t0, false);
        assert_eq!(mgr.windows(a), vec![w(1)]);
        mgr.add_window(b, w(1), None, Point::default(), t0, false);
        assert_eq!(mgr.windows(a), vec![]);
        assert_eq!(mgr.windows(b), vec![w(1)]);
        assert_eq!(mgr.workspace_of(w(1)), Some(b));
    }

    #[test]
    fn remove_falls_back_to_search() {
        let t0 = Instant::now();
        let mut mgr = manager();
        let (a, b) = (WorkspaceId::new(0), WorkspaceId::new(1));
        mgr.add_window(a, w(1), None, Point::default(), t0, false);
        mgr.tree_mut(b);
        mgr.window_workspaces.insert(w(1), b);
        assert!(mgr.remove_window(w(1), t0, false).is_some());
        assert!(mgr.tree(a).unwrap().is_empty());
        assert_eq!(mgr.workspace_of(w(1)), None);
    }

    #[test]
    fn bounds_change_reaches_every_tree() {
        let t0 = Instant::now();
        let mut mgr = manager();
        let (a, b) = (WorkspaceId::new(0), WorkspaceId::new(1));
        mgr.add_window(a, w(1), None, Point::default(), t0, false);
        mgr.add_window(b, w(2), None, Point::default(), t0, false);
        mgr.set_bounds(Rect::new(0, 30, 1920, 1050), Transition::Snap);
        for (ws, id) in [(a, 1), (b, 2)] {
            assert_eq!(
                mgr.tree(ws).unwrap().goal_rect(w(id)),
                Some(Rect::new(10, 40, 1900, 1030))
            );
        }
        // Trees created later pick up the new bounds too.
        mgr.add_window(WorkspaceId::new(2), w(3), None, Point::default(), t0, false);
        assert_eq!(
            mgr.tree(WorkspaceId::new(2)).unwrap().goal_rect(w(3)),
            Some(Rect::new(10, 40, 1900, 1030))
        );
    }

    #[test]
    fn settings_reach_every_tree() {
        let t0 = Instant::now();
        let mut mgr = manager();
        mgr.add_window(WorkspaceId::new(0), w(1), None, Point::default(), t0, false);
        let settings = TreeSettings { gaps_out: 0, ..Default::default() };
        mgr.set_settings(settings.clone(), Transition::Snap);
        let tree = mgr.tree(WorkspaceId::new(0)).unwrap();
        assert_eq!(tree.settings(), &settings);
        assert_eq!(tree.goal_rect(w(1)), Some(SCREEN));
    }

    #[test]
    fn advance_ticks_every_workspace() {
        let t0 = Instant::now();
        let mut mgr = manager();
        let (a, b) = (WorkspaceId::new(0), WorkspaceId::new(1));
        mgr.add_window(a, w(1), None, Point::default(), t0, true);
        mgr.add_window(b, w(2), None, Point::default(), t0, true);
        assert!(mgr.advance(t0 + Duration::from_millis(100)));
        for (ws, id) in [(a, 1), (b, 2)] {
            let (scale, _) = mgr.tree(ws).unwrap().scale_alpha(w(id));
            assert!(scale > 0.8 && scale < 1.0, "{scale}");
        }
        assert!(!mgr.advance(t0 + Duration::from_millis(300)));
    }

    #[test]
    fn commands_go_to_the_workspace_tree() {
        let t0 = Instant::now();
        let mut mgr = manager();
        let ws = WorkspaceId::new(0);
        assert!(!mgr.handle_command(ws, LayoutCommand::SwapSibling, Some(w(1)), t0));
        mgr.add_window(ws, w(1), None, Point::default(), t0, false);
        mgr.add_window(ws, w(2), None, Point::default(), t0, false);
        assert!(mgr.handle_command(ws, LayoutCommand::SwapSibling, Some(w(1)), t0));
        assert_eq!(mgr.windows(ws), vec![w(2), w(1)]);
        assert!(!mgr.handle_command(WorkspaceId::new(5), LayoutCommand::ToggleSplit, None, t0));
    }
}
