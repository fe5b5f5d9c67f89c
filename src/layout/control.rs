use anyhow::Context;
use tracing::{debug, trace};

use super::{switch_goals, Dirty, Lock, NodeRef, Overview, WindowKey, WorkspaceKey};
use crate::animation::{SwitchDirection, UNIT};
use crate::diagnostics::Site;
use crate::host::{Host, Visual, WindowId, WorkspaceId};
use crate::utils::clamp;

impl<H: Host> Overview<H> {
    /// Opens an overview session, creating the workspace nodes.
    pub fn start(&mut self, controlled: bool) -> anyhow::Result<()> {
        if self.started {
            return Ok(());
        }
        debug!("starting overview session, controlled: {controlled}");

        self.window_lock = Lock::Down;
        self.workspace_lock = Lock::Down;
        self.workspace_overview_enabled = false;
        self.closed_maximized.clear();
        self.switch_direction = SwitchDirection::Still;
        self.retained = 0;
        self.pending_carry = 0;
        self.should_window_switch = false;

        self.host.show(true);
        self.host.set_alpha(Visual::Backdrop, 1.);

        self.started = true;

        self.refresh_workspaces()?;
        for id in self.host.workspaces() {
            let key = self.create_workspace(id)?;
            self.order.push(key);
        }
        self.compute_workspace_destinations();
        self.update_switch_offset();

        self.all_loaded = false;
        self.load_threshold = None;

        if let Some(&key) = self.order.get(self.current) {
            self.load_workspace(key)?;
        }
        self.panels_enabled = true;
        self.focus = None;

        self.set_fine_controlled(controlled);
        Ok(())
    }

    /// Resynchronizes the workspace list and the switch value with the desktop.
    fn refresh_workspaces(&mut self) -> anyhow::Result<()> {
        let count = self.host.workspaces().len();
        self.current = self.host.active_workspace().min(count.saturating_sub(1));
        let current = self.current as f64 * UNIT;
        let res = self.ticker.update(self.workspace_switch, |value| {
            value.set_goals(switch_goals(count))?;
            value.jump_to(current);
            anyhow::Ok(())
        });
        if let Some(res) = res {
            res?;
        }
        Ok(())
    }

    /// Ends the session, destroying every node.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        debug!("stopping overview session");

        self.all_loaded = false;
        self.load_threshold = None;
        self.host.show(false);
        self.focus = None;

        for key in std::mem::take(&mut self.order) {
            self.destroy_workspace(key);
        }
        self.host.remove(Visual::Backdrop);

        self.enable_panels(true);
        self.host.set_panels_alpha(1.);
        self.started = false;
    }

    /// Switches between finger-controlled and released animation.
    ///
    /// On release the reveals go to their lock positions and the switch values snap to a goal.
    pub fn set_fine_controlled(&mut self, controlled: bool) {
        self.fine_controlled = controlled;
        let slope = self.options.slope(controlled);
        self.ticker.set_slope(self.window_reveal, slope);
        self.ticker.set_slope(self.workspace_reveal, slope);
        if let Some(focus) = self.focus {
            self.set_window_focus(focus, true);
        }

        let last = self.order.len().saturating_sub(1) as f64 * UNIT;
        let switch = self.workspace_switch().current();
        let switch_slope = if !controlled && (switch < 0. || switch > last) {
            self.options.overdraft_slope()
        } else if controlled {
            slope * self.options.switch_controlled_factor
        } else {
            slope * self.options.switch_released_factor
        };
        self.ticker.set_slope(self.workspace_switch, switch_slope);

        if !controlled {
            if let Some(focus) = self.focus {
                let minimizer = self.windows[focus].minimizer;
                if self.ticker.current(minimizer) > UNIT / 2. {
                    self.minimize_focus_window();
                } else {
                    self.set_minimizer_target(focus, 0.);
                }
            }

            self.ticker
                .set_target(self.window_reveal, self.window_lock.target());
            self.ticker
                .set_target(self.workspace_reveal, self.workspace_lock.target());
        }

        let (direction, min_delta) = (self.switch_direction, self.options.release_min_delta);
        self.ticker.update(self.workspace_switch, |value| {
            value.snap_to_goal_with_direction(direction, min_delta)
        });
        self.snap_window_switch();
        self.mark_dirty(NodeRef::Overview, Dirty::FINE_CONTROL);
    }

    pub fn set_window_target(&mut self, target: f64, lock: Option<Lock>) -> anyhow::Result<()> {
        self.start(false)?;
        if let Some(lock) = lock {
            self.window_lock = lock;
        }
        self.ticker
            .set_target(self.window_reveal, clamp(target, 0., UNIT));
        Ok(())
    }

    pub fn set_workspace_switch_target(
        &mut self,
        target: f64,
        direction: SwitchDirection,
    ) -> anyhow::Result<()> {
        self.start(false)?;
        self.ticker.set_target(self.workspace_switch, target);
        self.switch_direction = direction;
        Ok(())
    }

    pub fn set_workspace_overview_target(
        &mut self,
        target: f64,
        lock: Option<Lock>,
    ) -> anyhow::Result<()> {
        self.start(false)?;
        if let Some(lock) = lock {
            self.workspace_lock = lock;
        }
        self.ticker
            .set_target(self.workspace_reveal, clamp(target, 0., UNIT));
        Ok(())
    }

    pub fn set_switch_direction(&mut self, direction: SwitchDirection) {
        self.switch_direction = direction;
    }

    pub fn snap_workspace_switch(&mut self) {
        self.ticker
            .update(self.workspace_switch, |value| value.snap_to_goal());
    }

    pub fn add_window_switch_delta(&mut self, delta: f64) {
        self.ticker
            .update_cyclic(self.window_switch, |value| value.add_delta(delta));
    }

    pub fn snap_window_switch(&mut self) {
        self.ticker
            .update_cyclic(self.window_switch, |value| value.snap_to_goal());
    }

    pub fn reset_window_switch_order(&mut self) {
        if let Some(&key) = self.order.get(self.current) {
            self.reset_window_switch_order_of(key);
        }
    }

    pub fn set_should_window_switch(&mut self, value: bool) {
        self.should_window_switch = value;
    }

    pub fn toggle_window_overview(&mut self) -> anyhow::Result<()> {
        if self.fine_controlled {
            return Ok(());
        }
        match self.window_lock {
            Lock::Up => self.set_window_target(0., Some(Lock::Down)),
            Lock::Down => self.set_window_target(UNIT, Some(Lock::Up)),
        }
    }

    pub fn toggle_workspace_overview(&mut self) -> anyhow::Result<()> {
        if self.fine_controlled {
            return Ok(());
        }
        match self.workspace_lock {
            Lock::Up => self.set_workspace_overview_target(0., Some(Lock::Down)),
            Lock::Down => self.set_workspace_overview_target(UNIT, Some(Lock::Up)),
        }
    }

    /// Activates a window from the overview and closes both reveals.
    pub(crate) fn activate_clone(&mut self, key: WindowKey) -> anyhow::Result<()> {
        self.activate_window_on_workspace(key);
        self.set_window_target(0., Some(Lock::Down))?;
        self.set_workspace_overview_target(0., Some(Lock::Down))
    }

    pub(crate) fn enable_panels(&mut self, force: bool) {
        if self.panels_enabled && !force {
            return;
        }
        self.panels_enabled = true;
        self.host.set_panels_visible(true);
    }

    pub(crate) fn disable_panels(&mut self, force: bool) {
        if self.options.keep_panels || (!self.panels_enabled && !force) {
            return;
        }
        self.panels_enabled = false;
        self.host.set_panels_visible(false);
    }

    /// Activates the workspace at `idx` and closes the workspace overview.
    pub(crate) fn activate_workspace(&mut self, idx: usize) -> anyhow::Result<()> {
        let Some(&key) = self.order.get(idx) else {
            return Ok(());
        };
        let id = self.workspaces[key].id;
        trace!("activating workspace {idx}");
        self.host.activate_workspace(id).context(Site::here())?;
        self.current = idx;
        self.set_workspace_overview_target(0., Some(Lock::Down))?;
        self.load_workspace(key)
    }

    /// Handles the desktop switching workspaces.
    pub fn on_workspace_activated(&mut self) -> anyhow::Result<()> {
        let count = if self.started {
            self.order.len()
        } else {
            self.host.workspaces().len()
        };
        self.current = self.host.active_workspace().min(count.saturating_sub(1));

        if self.started {
            if let Some(&key) = self.order.get(self.current) {
                self.load_workspace(key)?;
            }
        } else if self.workspace_switch().on_goal() {
            let current = self.current as f64 * UNIT;
            self.ticker.jump_to(self.workspace_switch, current);
        }
        Ok(())
    }

    pub(crate) fn on_workspace_clicked(&mut self, key: WorkspaceKey) -> anyhow::Result<()> {
        let Some(idx) = self.workspace_index(key) else {
            return Ok(());
        };
        self.activate_workspace(idx)?;
        let current = self.current as f64 * UNIT;
        self.ticker.jump_to(self.workspace_switch, current);
        self.mark_dirty(NodeRef::Overview, Dirty::WORKSPACE_SWITCH);
        Ok(())
    }

    /// Removes a workspace from the desktop and the overview.
    pub(crate) fn remove_workspace(&mut self, key: WorkspaceKey) -> anyhow::Result<()> {
        let Some(idx) = self.workspace_index(key) else {
            return Ok(());
        };
        let id = self.workspaces[key].id;
        debug!("removing workspace {id:?}");

        self.order.remove(idx);
        self.compute_workspace_destinations();
        self.host.remove_workspace(id);
        self.destroy_workspace(key);

        for idx in 0..self.order.len() {
            let key = self.order[idx];
            if self.workspaces[key].loaded {
                self.sync_windows(key)?;
            }
        }

        let count = self.order.len();
        self.current = self.host.active_workspace().min(count.saturating_sub(1));
        let current = self.current as f64 * UNIT;
        let res = self.ticker.update(self.workspace_switch, |value| {
            value.set_goals(switch_goals(count))?;
            value.jump_to(current);
            anyhow::Ok(())
        });
        if let Some(res) = res {
            res?;
        }
        if let Some(&key) = self.order.get(self.current) {
            self.load_workspace(key)?;
        }

        self.mark_dirty(NodeRef::Overview, Dirty::LAYOUT | Dirty::WORKSPACE_SWITCH);
        Ok(())
    }

    /// Handles a window changing geometry or state on the desktop.
    pub fn on_window_changed(&mut self, window: WindowId) {
        let Some(key) = self.window_key(window) else {
            return;
        };
        self.refresh_window(key);
        let workspace = self.windows[key].workspace;
        self.mark_dirty(NodeRef::Workspace(workspace), Dirty::LAYOUT);
    }

    pub fn load_neighbor_workspaces(&mut self) -> anyhow::Result<()> {
        let current = self.current;
        for idx in current.saturating_sub(1)..=current + 1 {
            if let Some(&key) = self.order.get(idx) {
                self.load_workspace(key)?;
            }
        }
        Ok(())
    }

    pub(crate) fn load_only_neighbor_workspaces(&mut self, center: usize) -> anyhow::Result<()> {
        for idx in 0..self.order.len() {
            let key = self.order[idx];
            if idx.abs_diff(center) < 2 {
                self.load_workspace(key)?;
            } else {
                self.unload_workspace(key);
            }
        }
        Ok(())
    }

    pub(crate) fn load_all_workspaces(&mut self) -> anyhow::Result<()> {
        for idx in 0..self.order.len() {
            self.load_workspace(self.order[idx])?;
        }
        Ok(())
    }

    /// Makes the desktop's focused window the one a downward swipe minimizes.
    pub fn reset_focus_window(&mut self) -> anyhow::Result<()> {
        let focused = self.host.focused_window().and_then(|id| self.host.window(id));
        let key = match focused {
            Some(info) if info.interesting => {
                let key = self.load_window_node(info.workspace, info.id)?;
                key.filter(|&key| !self.windows[key].focus_inhibition)
            }
            _ => None,
        };
        self.set_focus(key);
        Ok(())
    }

    fn load_window_node(
        &mut self,
        workspace: WorkspaceId,
        window: WindowId,
    ) -> anyhow::Result<Option<WindowKey>> {
        let Some(ws) = self.workspace_key(workspace) else {
            return Ok(None);
        };
        self.load_workspace(ws)?;
        Ok(self.workspaces[ws]
            .windows
            .iter()
            .copied()
            .find(|&key| self.windows[key].info.id == window))
    }

    pub fn drop_focus_window(&mut self) {
        if self.focus.is_some() {
            self.set_focus(None);
        }
    }

    fn set_focus(&mut self, key: Option<WindowKey>) {
        if self.focus == key {
            return;
        }
        if let Some(old) = self.focus {
            self.set_window_focus(old, false);
        }
        self.focus = key;
        if let Some(new) = key {
            self.set_window_focus(new, true);
        }
    }

    pub fn set_focus_minimizer_target(&mut self, target: f64) {
        if let Some(focus) = self.focus {
            self.set_minimizer_target(focus, target);
        }
    }

    pub(crate) fn minimize_focus_window(&mut self) {
        let Some(focus) = self.focus else {
            return;
        };
        self.set_focus(None);
        self.minimize_window(focus);
    }

    /// Remembers that a window closed from the overview was maximized.
    pub(crate) fn note_closed_maximized(&mut self, window: WindowId) {
        self.closed_maximized.insert(window);
    }
}
