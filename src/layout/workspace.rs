use glam::DVec2;
use tracing::{debug, trace, warn};

use super::carousel;
use super::grid::Grid;
use super::{Dirty, Lock, NodeRef, Overview, Owner, WindowKey, WorkspaceKey};
use crate::animation::{ValueKey, UNIT};
use crate::host::{Host, Placement, Visual, WindowId, WindowInfo, WorkspaceId};
use crate::utils::{clamp, lerp};

/// A desktop workspace in the overview.
///
/// Window nodes only exist while the workspace is loaded.
#[derive(Debug)]
pub struct Workspace {
    pub(crate) id: WorkspaceId,
    pub(crate) dirty: Dirty,
    pub(crate) loaded: bool,

    /// Windows taking part in the thumbnail grid.
    pub(crate) windows: Vec<WindowKey>,
    pub(crate) idle_windows: Vec<WindowKey>,
    /// `windows` in grid order.
    pub(crate) sorted: Vec<WindowKey>,

    /// Carousel position in `sorted`.
    pub(crate) active_index: usize,
    /// Whole carousel steps not applied yet.
    pub(crate) carry: i64,
    pub(crate) window_switch_happened: bool,

    pub(crate) maximized_app: bool,
    /// Window reveal as seen by this workspace, in `0..=1`.
    pub(crate) reveal_fraction: f64,
    pub(crate) prevent_empty_label: bool,
    pub(crate) hovered: bool,
    pub(crate) clicked: bool,
    pub(crate) grid_row: usize,

    pub(crate) hover: ValueKey,
    pub(crate) dest_x: ValueKey,
    pub(crate) dest_y: ValueKey,
    pub(crate) dest_scale: ValueKey,
}

impl Workspace {
    pub fn id(&self) -> WorkspaceId {
        self.id
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn has_maximized_app(&self) -> bool {
        self.maximized_app
    }

    pub fn reveal_fraction(&self) -> f64 {
        self.reveal_fraction
    }

    pub fn grid_row(&self) -> usize {
        self.grid_row
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    /// Interesting windows in grid order.
    pub fn sorted_windows(&self) -> &[WindowKey] {
        &self.sorted
    }

    pub fn idle_windows(&self) -> &[WindowKey] {
        &self.idle_windows
    }

    /// Whether the workspace has no interesting windows. Unloaded workspaces never count as empty.
    pub fn is_empty(&self) -> bool {
        self.loaded && self.windows.is_empty()
    }

    fn all_windows(&self) -> impl Iterator<Item = WindowKey> + '_ {
        self.windows.iter().chain(&self.idle_windows).copied()
    }
}

impl<H: Host> Overview<H> {
    pub(crate) fn create_workspace(&mut self, id: WorkspaceId) -> anyhow::Result<WorkspaceKey> {
        let hover = self.options.hover(self.options.released_slope)?;
        let dest_x = self.options.destination(1.)?;
        let dest_y = self.options.destination(1.)?;
        let dest_scale = self.options.destination(0.01)?;

        let reveal_fraction = lerp(
            self.window_reveal().current() / UNIT,
            1.,
            self.workspace_reveal().current() / UNIT,
        );

        let ticker = &mut self.ticker;
        let key = self.workspaces.insert_with_key(|key| {
            let node = NodeRef::Workspace(key);
            let placement = Owner::new(node, Dirty::PLACEMENT);
            Workspace {
                id,
                dirty: Dirty::empty(),
                loaded: false,
                windows: Vec::new(),
                idle_windows: Vec::new(),
                sorted: Vec::new(),
                active_index: 0,
                carry: 0,
                window_switch_happened: false,
                maximized_app: false,
                reveal_fraction,
                prevent_empty_label: false,
                hovered: false,
                clicked: false,
                grid_row: 0,
                hover: ticker.insert(hover, Owner::new(node, Dirty::HOVER)),
                dest_x: ticker.insert(dest_x, placement),
                dest_y: ticker.insert(dest_y, placement),
                dest_scale: ticker.insert(dest_scale, placement),
            }
        });

        debug!("created workspace node for {id:?}");
        Ok(key)
    }

    pub(crate) fn destroy_workspace(&mut self, key: WorkspaceKey) {
        self.unload_workspace(key);
        let Some(ws) = self.workspaces.remove(key) else {
            return;
        };
        for value in [ws.hover, ws.dest_x, ws.dest_y, ws.dest_scale] {
            self.ticker.remove(value);
        }
        let id = ws.id;
        for visual in [
            Visual::Workspace(id),
            Visual::WorkspaceShade(id),
            Visual::WorkspaceCaptions(id),
            Visual::EmptyLabel(id),
        ] {
            self.host.remove(visual);
        }
    }

    /// Creates the window nodes of a workspace.
    pub(crate) fn load_workspace(&mut self, key: WorkspaceKey) -> anyhow::Result<()> {
        let Some(ws) = self.workspaces.get_mut(key) else {
            return Ok(());
        };
        if ws.loaded {
            return Ok(());
        }
        trace!("loading workspace {:?}", ws.id);
        ws.active_index = 0;
        ws.loaded = true;

        self.sync_windows(key)?;
        self.mark_dirty(
            NodeRef::Workspace(key),
            Dirty::WINDOW_REVEAL | Dirty::PLACEMENT,
        );
        Ok(())
    }

    pub(crate) fn unload_workspace(&mut self, key: WorkspaceKey) {
        let Some(ws) = self.workspaces.get_mut(key) else {
            return;
        };
        if !ws.loaded {
            return;
        }
        trace!("unloading workspace {:?}", ws.id);
        let windows: Vec<_> = ws.all_windows().collect();
        ws.windows.clear();
        ws.idle_windows.clear();
        ws.sorted.clear();
        ws.maximized_app = false;
        ws.loaded = false;
        for win in windows {
            self.destroy_window(win);
        }
    }

    /// Adds nodes for windows of the inventory that have none yet, then lays them out.
    pub(crate) fn sync_windows(&mut self, key: WorkspaceKey) -> anyhow::Result<()> {
        let Some(ws) = self.workspaces.get_mut(key) else {
            return Ok(());
        };
        ws.maximized_app = false;
        let id = ws.id;
        for info in self.host.windows(id) {
            self.add_window_if_missing(key, info)?;
        }
        self.layout_windows(key);
        Ok(())
    }

    fn add_window_if_missing(&mut self, key: WorkspaceKey, info: WindowInfo) -> anyhow::Result<()> {
        let Some(ws) = self.workspaces.get(key) else {
            return Ok(());
        };
        let interesting = info.interesting;
        let maximized = interesting && info.maximized && !info.minimized;

        let existing = ws
            .all_windows()
            .find(|&win| self.windows.get(win).is_some_and(|win| win.info.id == info.id));
        match existing {
            Some(win) => self.refresh_window(win),
            None => {
                let win = self.create_window(key, info, !interesting)?;
                if let Some(ws) = self.workspaces.get_mut(key) {
                    if interesting {
                        ws.windows.push(win);
                    } else {
                        ws.idle_windows.push(win);
                    }
                }
            }
        }

        if maximized {
            if let Some(ws) = self.workspaces.get_mut(key) {
                ws.maximized_app = true;
            }
        }
        Ok(())
    }

    /// Sorts the interesting windows and assigns them their grid cells.
    pub(crate) fn layout_windows(&mut self, key: WorkspaceKey) {
        let Some(ws) = self.workspaces.get(key) else {
            return;
        };

        let mut sorted = ws.windows.clone();
        sorted.sort_by(|&a, &b| {
            let (a, b) = (&self.windows[a].info, &self.windows[b].info);
            a.minimized
                .cmp(&b.minimized)
                .then(b.user_time.cmp(&a.user_time))
        });

        let windows: Vec<_> = ws.all_windows().collect();
        let grid = Grid::new(sorted.len());
        let fraction = grid.cell_fraction(self.options.window_slot_fraction);
        let output_size = self.host.output_size();
        for (win, cell) in sorted.iter().zip(&grid.cells) {
            let center = (cell.center * output_size).round();
            self.set_window_destination(*win, center, fraction);
        }

        if let Some(ws) = self.workspaces.get_mut(key) {
            ws.sorted = sorted;
            ws.active_index = ws.active_index.min(ws.sorted.len().saturating_sub(1));
        }
        for win in windows {
            self.mark_dirty(NodeRef::Window(win), Dirty::PLACEMENT);
        }
    }

    pub(crate) fn set_workspace_destination(
        &mut self,
        key: WorkspaceKey,
        position: DVec2,
        scale: f64,
        grid_row: usize,
    ) {
        let Some(ws) = self.workspaces.get_mut(key) else {
            return;
        };
        ws.grid_row = grid_row;
        self.ticker.set_target(ws.dest_x, position.x);
        self.ticker.set_target(ws.dest_y, position.y);
        self.ticker.set_target(ws.dest_scale, scale);
        self.mark_dirty(NodeRef::Workspace(key), Dirty::PLACEMENT);
    }

    /// Handles a window appearing on a workspace.
    pub fn on_window_added(&mut self, workspace: WorkspaceId, window: WindowId) -> anyhow::Result<()> {
        let Some(key) = self.workspace_key(workspace) else {
            return Ok(());
        };
        if !self.workspaces[key].loaded {
            return Ok(());
        }
        let Some(info) = self.host.window(window) else {
            debug!("added window {window:?} is not in the inventory");
            return Ok(());
        };
        self.add_window_if_missing(key, info)?;
        self.mark_dirty(NodeRef::Workspace(key), Dirty::LAYOUT);
        Ok(())
    }

    /// Handles a window disappearing from a workspace.
    pub fn on_window_removed(
        &mut self,
        workspace: WorkspaceId,
        window: WindowId,
    ) -> anyhow::Result<()> {
        let Some(key) = self.workspace_key(workspace) else {
            return Ok(());
        };
        let Some(win_key) = self.window_key(window) else {
            return Ok(());
        };

        let told_maximized = self.closed_maximized.remove(&window);
        let win = &self.windows[win_key];
        let need_recheck = !win.info.minimized && (told_maximized || win.info.maximized);

        self.destroy_window(win_key);
        if let Some(ws) = self.workspaces.get_mut(key) {
            ws.windows.retain(|&k| k != win_key);
            ws.idle_windows.retain(|&k| k != win_key);
        }
        self.layout_windows(key);

        let Some(ws) = self.workspaces.get(key) else {
            return Ok(());
        };
        if need_recheck {
            let maximized_app = ws.windows.iter().any(|&k| {
                let info = &self.windows[k].info;
                !info.minimized && info.maximized
            });
            self.workspaces[key].maximized_app = maximized_app;
        }

        if self.workspaces[key].windows.is_empty() {
            self.workspaces[key].prevent_empty_label = true;
            self.set_window_target(0., Some(Lock::Down))?;
        }
        Ok(())
    }

    /// Raises a window above its siblings and activates it on the desktop.
    pub(crate) fn activate_window_on_workspace(&mut self, key: WindowKey) {
        let Some(win) = self.windows.get(key) else {
            return;
        };
        let Some(ws) = self.workspaces.get(win.workspace) else {
            return;
        };

        let id = win.info.id;
        let on_top: Vec<_> = ws
            .windows
            .iter()
            .filter_map(|&k| self.windows.get(k))
            .filter(|win| win.info.always_on_top)
            .map(|win| win.info.id)
            .collect();

        self.host.raise(Visual::Window(id));
        for other in on_top {
            self.host.raise(Visual::Window(other));
        }
        if win.info.always_on_top {
            self.host.raise(Visual::Window(id));
        }
        self.host.activate_window(id);
    }

    /// Activates the window the carousel ended on.
    pub(crate) fn perform_window_switch(&mut self, key: WorkspaceKey) {
        let Some(ws) = self.workspaces.get(key) else {
            return;
        };
        if !ws.window_switch_happened {
            return;
        }
        if let Some(&win) = ws.sorted.get(ws.active_index) {
            self.activate_window_on_workspace(win);
        }
    }

    /// Restores the stacking the carousel shuffled.
    pub(crate) fn reset_window_switch_order_of(&mut self, key: WorkspaceKey) {
        let Some(ws) = self.workspaces.get(key) else {
            return;
        };
        if !ws.window_switch_happened {
            return;
        }

        let (on_top, normal): (Vec<_>, Vec<_>) = ws
            .sorted
            .iter()
            .filter_map(|&k| self.windows.get(k))
            .partition(|win| win.info.always_on_top);
        let order: Vec<_> = on_top
            .into_iter()
            .chain(normal)
            .map(|win| win.info.id)
            .collect();
        for id in order {
            self.host.lower(Visual::Window(id));
        }
    }

    pub(crate) fn renew_workspace_hover(&mut self, key: WorkspaceKey) {
        let enabled = self.workspace_overview_enabled;
        let count = self.order.len();
        let Some(ws) = self.workspaces.get(key) else {
            return;
        };
        let target = if ws.hovered && enabled && !ws.clicked && count > 1 {
            UNIT
        } else {
            0.
        };
        self.ticker.set_target(ws.hover, target);
    }

    pub(crate) fn recompute_workspace(&mut self, key: WorkspaceKey) -> bool {
        let Some(ws) = self.workspaces.get_mut(key) else {
            return false;
        };
        let dirty = std::mem::take(&mut ws.dirty);

        if dirty.intersects(
            Dirty::PLACEMENT | Dirty::WORKSPACE_REVEAL | Dirty::WORKSPACE_SWITCH | Dirty::HOVER,
        ) {
            self.place_workspace(key);
        }

        if dirty.intersects(Dirty::WORKSPACE_REVEAL | Dirty::WINDOW_REVEAL | Dirty::HOVER) {
            self.reveal_windows(key);
        }

        if dirty.contains(Dirty::LAYOUT) {
            self.layout_windows(key);
        }

        if dirty.contains(Dirty::WINDOW_SWITCH) {
            self.rotate_carousel(key);
        }

        self.workspaces
            .get(key)
            .is_some_and(|ws| !ws.dirty.is_empty())
    }

    fn place_workspace(&mut self, key: WorkspaceKey) {
        let Some(idx) = self.workspace_index(key) else {
            return;
        };
        let ws = &self.workspaces[key];
        let Some(current_ws) = self
            .order
            .get(self.current)
            .and_then(|&k| self.workspaces.get(k))
        else {
            warn!("active workspace {} has no node", self.current);
            return;
        };

        let reveal = self.workspace_reveal().current();
        let progress = reveal / UNIT;
        let hover = self.ticker.current(ws.hover) / UNIT;
        let current = self.current as f64;
        let i = idx as f64;
        let step = self.strip_step();
        let release_x = step * current;

        let dest = DVec2::new(self.ticker.current(ws.dest_x), self.ticker.current(ws.dest_y));
        let mut dest_scale = self.ticker.current(ws.dest_scale);
        if dest_scale <= 0. {
            dest_scale = 1.;
        }
        let current_dest = DVec2::new(
            self.ticker.current(current_ws.dest_x),
            self.ticker.current(current_ws.dest_y),
        );
        let relative = (dest - current_dest) / dest_scale;

        let flee = self.options.flee;
        let should_flee = idx.abs_diff(self.current) == 1 && current_ws.grid_row != ws.grid_row;
        let slide = lerp(self.switch_offset, release_x, clamp(10. * progress, 0., 1.));

        let position = if reveal < flee.start {
            let x = i * step - slide;
            if idx == self.current {
                DVec2::new(lerp(x, dest.x, progress), dest.y * progress)
            } else {
                DVec2::new(x, dest.y * progress)
            }
        } else if reveal > flee.end || !should_flee {
            DVec2::new(
                lerp(current * step + relative.x - slide, dest.x, progress),
                lerp(relative.y, dest.y, progress),
            )
        } else if reveal >= flee.turn {
            let t = (flee.start + (reveal - flee.turn) * (flee.end - flee.start)
                / (flee.end - flee.turn))
                / UNIT;
            DVec2::new(
                lerp(current * step + relative.x - release_x, dest.x, t),
                lerp(relative.y, dest.y, t),
            )
        } else {
            DVec2::new(i * step - slide, dest.y * progress)
        };

        let scale =
            lerp(1., dest_scale, progress) * (1. + self.options.workspace_hover_growth * hover);
        let id = ws.id;
        self.host
            .place(Visual::Workspace(id), Placement::new(position, scale, 1.));
    }

    fn reveal_windows(&mut self, key: WorkspaceKey) {
        let window_reveal = self.window_reveal();
        let opening = window_reveal.current() > window_reveal.previous();
        let fraction = lerp(
            window_reveal.current() / UNIT,
            1.,
            self.workspace_reveal().current() / UNIT,
        );

        let Some(ws) = self.workspaces.get_mut(key) else {
            return;
        };
        ws.reveal_fraction = fraction;
        if opening {
            ws.prevent_empty_label = false;
        }
        let id = ws.id;
        let empty_label = if ws.windows.is_empty() && !ws.prevent_empty_label {
            fraction
        } else {
            0.
        };
        let windows: Vec<_> = ws.all_windows().collect();

        for win in windows {
            self.mark_dirty(NodeRef::Window(win), Dirty::PLACEMENT);
        }
        self.host.set_alpha(
            Visual::WorkspaceShade(id),
            lerp(0., self.options.shade_alpha, fraction) as f32,
        );
        self.host.set_alpha(
            Visual::WorkspaceCaptions(id),
            (fraction * 20. - 19.).max(0.) as f32,
        );
        self.host
            .set_alpha(Visual::EmptyLabel(id), empty_label as f32);
    }

    fn rotate_carousel(&mut self, key: WorkspaceKey) {
        let phase = self.window_switch_phase();
        let Some(ws) = self.workspaces.get_mut(key) else {
            return;
        };
        let carry = std::mem::take(&mut ws.carry);
        if ws.sorted.len() < 2 {
            return;
        }

        let step = carousel::step(ws.active_index, ws.sorted.len(), carry, phase);
        ws.active_index = step.active;
        if step.switched {
            ws.window_switch_happened = true;
            trace!("carousel moved to window {}", step.active);
        }

        let sorted = ws.sorted.clone();
        for idx in step.raise {
            if let Some(win) = self.windows.get(sorted[idx]) {
                self.host.raise(Visual::Window(win.info.id));
            }
        }
        for (idx, phase) in step.phases {
            self.set_window_switch_phase(sorted[idx], phase);
        }
    }
}
