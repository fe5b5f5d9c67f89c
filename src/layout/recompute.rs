use glam::DVec2;
use tracing::{debug, info};

use super::grid::Grid;
use super::{switch_goals, Dirty, NodeRef, Overview};
use crate::animation::UNIT;
use crate::host::{Host, Visual};
use crate::utils::{clamp, clamp_log};

impl<H: Host> Overview<H> {
    pub(crate) fn recompute_overview(&mut self) -> anyhow::Result<bool> {
        let dirty = std::mem::take(&mut self.dirty);
        if !self.started {
            return Ok(false);
        }

        if let Err(err) = self.follow_controller_values(dirty) {
            // Retried on the next frame.
            self.dirty |= dirty;
            return Err(err);
        }

        if !self.fine_controlled {
            if self.is_at_rest() {
                if self.should_window_switch {
                    if let Some(&key) = self.order.get(self.current) {
                        self.perform_window_switch(key);
                    }
                }
                self.stop();
                return Ok(false);
            } else if self.window_reveal().current() == UNIT {
                self.disable_panels(false);
            }
        }

        Ok(self.started && !self.dirty.is_empty())
    }

    fn follow_controller_values(&mut self, dirty: Dirty) -> anyhow::Result<()> {
        if dirty.contains(Dirty::WINDOW_REVEAL) {
            self.mark_all_workspaces(Dirty::WINDOW_REVEAL);
            let reveal = self.window_reveal();
            if reveal.current() < UNIT && reveal.previous() == UNIT {
                self.enable_panels(false);
            }
        }

        if dirty.contains(Dirty::WINDOW_SWITCH) {
            let carry = std::mem::take(&mut self.pending_carry);
            if let Some(&key) = self.order.get(self.current) {
                self.workspaces[key].carry += carry;
                self.mark_dirty(NodeRef::Workspace(key), Dirty::WINDOW_SWITCH);
            }
        }

        if dirty.contains(Dirty::WORKSPACE_SWITCH) {
            self.create_workspace_on_overdraft()?;
            self.check_load_threshold()?;
        }

        if dirty.intersects(Dirty::WORKSPACE_REVEAL | Dirty::WORKSPACE_SWITCH) {
            self.follow_workspace_switch()?;
        }

        if dirty.intersects(Dirty::WORKSPACE_REVEAL | Dirty::WORKSPACE_SWITCH | Dirty::WINDOW_REVEAL)
        {
            self.update_panels_alpha();
        }

        if dirty.contains(Dirty::LAYOUT) {
            self.mark_loaded_workspaces(Dirty::PLACEMENT);
        }

        if dirty.contains(Dirty::WORKSPACE_REVEAL) {
            self.follow_workspace_reveal()?;
        }
        Ok(())
    }

    /// Whether the released overview has nothing left to show.
    fn is_at_rest(&self) -> bool {
        let window_switch_on_goal = self
            .ticker
            .get_cyclic(self.window_switch)
            .map_or(true, |value| value.on_goal());

        self.window_reveal().current() == 0.
            && self.retained == 0
            && self.workspace_switch().on_goal()
            && self.workspace_reveal().current() == 0.
            && window_switch_on_goal
    }

    /// Appends a workspace when the switch is dragged far enough past the last one.
    fn create_workspace_on_overdraft(&mut self) -> anyhow::Result<()> {
        let count = self.order.len();
        let last = count.saturating_sub(1) as f64 * UNIT;
        let switch = self.workspace_switch();
        let (current, previous, target) = (switch.current(), switch.previous(), switch.target());
        if current <= last + self.options.creation_threshold {
            return Ok(());
        }
        let Some(&last_key) = self.order.last() else {
            return Ok(());
        };
        if self.workspaces[last_key].is_empty() {
            return Ok(());
        }

        let band = self.options.rubber_band;
        let effective = clamp_log(current, 0., last, band);
        let effective_previous = clamp_log(previous, 0., last, band);

        let id = self.host.append_workspace();
        info!("appending workspace {id:?} after overdraft to {current}");
        let key = self.create_workspace(id)?;
        self.order.push(key);
        self.compute_workspace_destinations();

        let goals = switch_goals(self.order.len());
        let rebased = self.ticker.update(self.workspace_switch, |value| {
            value.set_goals(goals)?;
            value.full_jump_to(effective, effective_previous, target);
            anyhow::Ok(())
        });
        if let Some(res) = rebased {
            res?;
        }

        self.load_workspace(key)?;
        self.mark_loaded_workspaces(Dirty::PLACEMENT);
        self.load_threshold = None;
        Ok(())
    }

    /// Reloads only the neighbours once the switch crosses the pending threshold.
    fn check_load_threshold(&mut self) -> anyhow::Result<()> {
        let Some(threshold) = self.load_threshold else {
            return Ok(());
        };
        let switch = self.workspace_switch();
        let (current, previous) = (switch.current(), switch.previous());
        if (current - threshold) * (previous - threshold) <= 0. {
            if self.fine_controlled && !self.all_loaded {
                let next = self.nearest_workspace(current);
                self.load_only_neighbor_workspaces(next)?;
            }
            self.load_threshold = None;
        }
        Ok(())
    }

    fn nearest_workspace(&self, switch: f64) -> usize {
        let last = self.order.len().saturating_sub(1) as f64;
        clamp((switch / UNIT).round(), 0., last) as usize
    }

    /// Activates the workspace the switch moved onto and slides the workspace strip.
    fn follow_workspace_switch(&mut self) -> anyhow::Result<()> {
        let switch = self.workspace_switch();
        let (x, previous) = (switch.current(), switch.previous());

        if x != previous {
            let next = self.nearest_workspace(x);
            let current = self.current;
            if current != next {
                self.activate_workspace(next)?;
            }

            let threshold = self.options.load_threshold;
            if next + 1 == current {
                self.load_threshold = Some((current as f64 - threshold) * UNIT);
            } else if current + 1 == next {
                self.load_threshold = Some((current as f64 + threshold) * UNIT);
            }
        }

        self.update_switch_offset();
        self.mark_all_workspaces(Dirty::WORKSPACE_REVEAL | Dirty::WORKSPACE_SWITCH);

        let reveal = self.workspace_reveal().current() / UNIT;
        let dim = self.options.backdrop_dim;
        self.host.set_alpha(Visual::Backdrop, (1. - dim * reveal) as f32);
        Ok(())
    }

    pub(crate) fn update_switch_offset(&mut self) {
        let last = self.order.len().saturating_sub(1) as f64 * UNIT;
        let x = self.workspace_switch().current();
        let band = self.options.rubber_band;
        self.switch_offset = self.strip_step() * clamp_log(x, 0., last, band) / UNIT;
    }

    fn update_panels_alpha(&mut self) {
        let workspace = self.workspace_reveal().current() / UNIT;
        let window = self.window_reveal().current() / UNIT;
        let alpha = if self.host.is_fullscreen() {
            0.
        } else {
            (1. - workspace).powi(2) * (1. - window).powi(2)
        };
        self.host.set_panels_alpha(alpha as f32);
    }

    fn follow_workspace_reveal(&mut self) -> anyhow::Result<()> {
        let reveal = self.workspace_reveal();
        let (current, previous) = (reveal.current(), reveal.previous());

        if current == UNIT && previous != UNIT {
            debug!("workspace overview enabled");
            self.workspace_overview_enabled = true;
            for ws in self.workspaces.values_mut() {
                ws.hovered = false;
                ws.clicked = false;
            }
        } else if current != UNIT && previous == UNIT {
            debug!("workspace overview disabled");
            self.workspace_overview_enabled = false;
            for idx in 0..self.order.len() {
                let key = self.order[idx];
                let ws = &mut self.workspaces[key];
                ws.hovered = false;
                ws.clicked = false;
                self.renew_workspace_hover(key);
            }
        }

        let load_all = self.options.load_all_threshold;
        if current > load_all && previous <= load_all {
            self.all_loaded = true;
            self.load_all_workspaces()?;
        } else if current < load_all && previous >= load_all {
            self.all_loaded = false;
            self.load_only_neighbor_workspaces(self.current)?;
        }
        Ok(())
    }

    /// Assigns every workspace its cell in the workspace overview grid.
    pub(crate) fn compute_workspace_destinations(&mut self) {
        let count = self.order.len();
        let grid = Grid::new(count);
        let fraction = grid.cell_fraction(self.options.workspace_slot_fraction);
        let scale = if count == 1 {
            1.
        } else {
            fraction.x.min(fraction.y)
        };
        let output_size = self.host.output_size();

        for (idx, cell) in grid.cells.iter().enumerate() {
            let position = ((cell.center - DVec2::splat(0.5)) * output_size).round();
            self.set_workspace_destination(self.order[idx], position, scale, cell.row);
        }
    }
}
