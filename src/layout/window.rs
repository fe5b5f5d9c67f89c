use std::f64::consts::PI;

use glam::DVec2;
use tracing::{debug, warn};

use super::{Dirty, NodeRef, Overview, OverviewTicker, Owner, WindowKey, WorkspaceKey};
use crate::animation::{ValueKey, UNIT};
use crate::host::{Host, Placement, Visual, WindowInfo};
use crate::layout::Options;
use crate::utils::{clamp, lerp};

/// A window on a loaded workspace.
#[derive(Debug)]
pub struct Window {
    pub(crate) info: WindowInfo,
    pub(crate) workspace: WorkspaceKey,
    pub(crate) dirty: Dirty,

    /// Not part of the thumbnail grid: docks, desktop icons and the like.
    pub(crate) idle: bool,
    pub(crate) hovered: bool,
    pub(crate) clicked: bool,
    pub(crate) activated: bool,
    pub(crate) is_focus: bool,
    pub(crate) retains_overview: bool,
    /// Set while the window minimizes on release, so that it cannot become the focus again.
    pub(crate) focus_inhibition: bool,
    /// Carousel rotation phase, in `-UNIT..=UNIT`.
    pub(crate) switch_phase: f64,

    /// Real position of the window on its workspace.
    pub(crate) location: DVec2,
    pub(crate) minimized_location: DVec2,
    pub(crate) minimized_scale: f64,
    /// Center of the grid cell.
    pub(crate) thumbnail: DVec2,
    /// Largest scale of the thumbnail per axis, as a fraction of the output.
    pub(crate) max_fraction: DVec2,
    pub(crate) dest_scale: f64,

    pub(crate) dest_x: ValueKey,
    pub(crate) dest_y: ValueKey,
    pub(crate) hover: ValueKey,
    pub(crate) minimizer: ValueKey,
}

impl Window {
    pub fn info(&self) -> &WindowInfo {
        &self.info
    }

    pub fn workspace(&self) -> WorkspaceKey {
        self.workspace
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn has_focus_inhibition(&self) -> bool {
        self.focus_inhibition
    }

    pub fn switch_phase(&self) -> f64 {
        self.switch_phase
    }

    pub fn dest_scale(&self) -> f64 {
        self.dest_scale
    }

    pub fn minimized_location(&self) -> DVec2 {
        self.minimized_location
    }

    pub fn minimized_scale(&self) -> f64 {
        self.minimized_scale
    }

    /// Re-reads the real and minimized locations from `info`.
    fn refresh_location(&mut self, info: WindowInfo, output_size: DVec2, options: &Options) {
        let size = info.geometry.size;
        match info.icon_geometry {
            Some(icon) => {
                self.minimized_location = icon.center() - size / 2.;
                self.minimized_scale = (icon.size.x / size.x).min(icon.size.y / size.y);
            }
            None => {
                self.minimized_location =
                    DVec2::new(output_size.x / 2. - size.x / 2., output_size.y - size.y / 2.);
                self.minimized_scale = options.minimized_scale;
            }
        }
        self.location = info.geometry.loc;
        self.info = info;
    }
}

impl<H: Host> Overview<H> {
    pub(crate) fn create_window(
        &mut self,
        workspace: WorkspaceKey,
        info: WindowInfo,
        idle: bool,
    ) -> anyhow::Result<WindowKey> {
        let dest_x = self.options.destination(1.)?;
        let dest_y = self.options.destination(1.)?;
        let hover = self.options.hover(self.options.controlled_slope)?;
        let minimizer = self.options.minimizer()?;

        let output_size = self.host.output_size();
        let (id, title) = (info.id, info.title.clone());
        let options = &self.options;
        let ticker = &mut self.ticker;
        let key = self.windows.insert_with_key(|key| {
            let node = NodeRef::Window(key);
            let placement = Owner::new(node, Dirty::PLACEMENT);
            let mut win = Window {
                info: info.clone(),
                workspace,
                dirty: Dirty::empty(),
                idle,
                hovered: false,
                clicked: false,
                activated: false,
                is_focus: false,
                retains_overview: false,
                focus_inhibition: false,
                switch_phase: 0.,
                location: DVec2::ZERO,
                minimized_location: DVec2::ZERO,
                minimized_scale: options.minimized_scale,
                thumbnail: DVec2::ZERO,
                max_fraction: DVec2::ONE,
                dest_scale: 1.,
                dest_x: ticker.insert(dest_x, placement),
                dest_y: ticker.insert(dest_y, placement),
                hover: ticker.insert(hover, placement),
                minimizer: ticker.insert(minimizer, Owner::new(node, Dirty::MINIMIZE)),
            };
            win.refresh_location(info, output_size, options);
            win
        });

        self.host.set_caption(id, &title);
        self.mark_dirty(NodeRef::Window(key), Dirty::PLACEMENT);
        Ok(key)
    }

    /// Forgets the values of a window node and removes its visuals.
    pub(crate) fn destroy_window(&mut self, key: WindowKey) {
        self.release_overview(key);
        let Some(win) = self.windows.remove(key) else {
            return;
        };
        if self.focus == Some(key) {
            self.focus = None;
        }
        for value in [win.dest_x, win.dest_y, win.hover, win.minimizer] {
            self.ticker.remove(value);
        }
        self.host.remove(Visual::Window(win.info.id));
        self.host.remove(Visual::Caption(win.info.id));
    }

    /// Re-reads the window from the inventory after it moved or changed state.
    pub(crate) fn refresh_window(&mut self, key: WindowKey) {
        let Some(win) = self.windows.get(key) else {
            return;
        };
        let Some(info) = self.host.window(win.info.id) else {
            debug!("window {:?} is gone from the inventory", win.info.id);
            return;
        };
        if info.title != win.info.title {
            self.host.set_caption(info.id, &info.title);
        }
        let output_size = self.host.output_size();
        if let Some(win) = self.windows.get_mut(key) {
            win.refresh_location(info, output_size, &self.options);
        }
        self.refresh_destination(key);
        self.mark_dirty(NodeRef::Window(key), Dirty::PLACEMENT);
    }

    pub(crate) fn set_window_destination(
        &mut self,
        key: WindowKey,
        center: DVec2,
        max_fraction: DVec2,
    ) {
        if let Some(win) = self.windows.get_mut(key) {
            win.thumbnail = center;
            win.max_fraction = max_fraction;
        }
        self.mark_dirty(NodeRef::Window(key), Dirty::PLACEMENT);
        self.refresh_destination(key);
    }

    fn refresh_destination(&mut self, key: WindowKey) {
        let output_size = self.host.output_size();
        let Some(win) = self.windows.get_mut(key) else {
            return;
        };

        let size = win.info.geometry.size;
        let origin = win.thumbnail - size / 2.;
        self.ticker.set_target(win.dest_x, origin.x);
        self.ticker.set_target(win.dest_y, origin.y);

        let ratio = win.max_fraction * output_size / size;
        let dest_scale = ratio.x.min(ratio.y).min(1.);
        if dest_scale != win.dest_scale {
            win.dest_scale = dest_scale;
            self.mark_dirty(NodeRef::Window(key), Dirty::PLACEMENT);
        }
    }

    pub(crate) fn set_window_switch_phase(&mut self, key: WindowKey, phase: f64) {
        let Some(win) = self.windows.get_mut(key) else {
            return;
        };
        if win.switch_phase != phase {
            win.switch_phase = phase;
            self.mark_dirty(NodeRef::Window(key), Dirty::PLACEMENT);
        }
    }

    pub(crate) fn set_window_focus(&mut self, key: WindowKey, is_focus: bool) {
        let controlled = self.fine_controlled;
        let Some(win) = self.windows.get_mut(key) else {
            return;
        };
        win.is_focus = is_focus;
        let slope = self.options.slope(is_focus && controlled) * self.options.minimize_factor;
        self.ticker.set_slope(win.minimizer, slope);
    }

    pub(crate) fn set_window_hover(&mut self, key: WindowKey, target: f64) {
        if let Some(win) = self.windows.get(key) {
            self.ticker.set_target(win.hover, target);
        }
    }

    pub(crate) fn set_minimizer_target(&mut self, key: WindowKey, target: f64) {
        let Some(win) = self.windows.get(key) else {
            return;
        };
        if !win.info.can_minimize {
            return;
        }
        let minimizer = win.minimizer;
        self.ticker.set_target(minimizer, target);
        if self.ticker.get(minimizer).is_some_and(|value| !value.is_paused()) {
            self.retain_overview(key);
        }
    }

    pub(crate) fn minimize_window(&mut self, key: WindowKey) {
        let Some(win) = self.windows.get_mut(key) else {
            return;
        };
        if !win.info.can_minimize {
            return;
        }
        if self.ticker.current(win.minimizer) != UNIT {
            win.focus_inhibition = true;
        }
        let id = win.info.id;
        self.set_minimizer_target(key, UNIT);
        self.host.minimize_window(id);
        self.refresh_window(key);
    }

    fn retain_overview(&mut self, key: WindowKey) {
        let Some(win) = self.windows.get_mut(key) else {
            return;
        };
        if !win.retains_overview {
            win.retains_overview = true;
            self.retained += 1;
            self.mark_dirty(NodeRef::Overview, Dirty::RETAIN_COUNT);
        }
    }

    pub(crate) fn release_overview(&mut self, key: WindowKey) {
        let Some(win) = self.windows.get_mut(key) else {
            return;
        };
        if win.retains_overview {
            win.retains_overview = false;
            match self.retained.checked_sub(1) {
                Some(retained) => self.retained = retained,
                None => warn!("overview retain count underflow"),
            }
            self.mark_dirty(NodeRef::Overview, Dirty::RETAIN_COUNT);
        }
    }

    pub(crate) fn recompute_window(&mut self, key: WindowKey) -> bool {
        let Some(win) = self.windows.get_mut(key) else {
            return false;
        };
        let dirty = std::mem::take(&mut win.dirty);

        if dirty.contains(Dirty::MINIMIZE)
            && self.ticker.get(win.minimizer).is_some_and(|value| value.on_goal())
        {
            win.focus_inhibition = false;
            self.release_overview(key);
        }

        let Some(win) = self.windows.get(key) else {
            return false;
        };
        let Some(ws) = self.workspaces.get(win.workspace) else {
            warn!("window {:?} outlived its workspace", win.info.id);
            return false;
        };

        let placement = window_placement(
            win,
            &self.ticker,
            &self.options,
            ws.reveal_fraction,
            ws.maximized_app,
        );
        let id = win.info.id;
        self.host.place(Visual::Window(id), placement.window);
        if let Some(caption) = placement.caption {
            self.host.place(Visual::Caption(id), caption);
        }
        false
    }
}

struct WindowPlacement {
    window: Placement,
    caption: Option<Placement>,
}

fn window_placement(
    win: &Window,
    ticker: &OverviewTicker,
    options: &Options,
    reveal: f64,
    maximized_app: bool,
) -> WindowPlacement {
    let hover = ticker.current(win.hover) / UNIT;
    let minimize = ticker.current(win.minimizer) / UNIT;

    if win.idle {
        let alpha = if maximized_app && reveal > 0. {
            0.
        } else {
            (1. - reveal).powi(3)
        };
        return WindowPlacement {
            window: Placement::new(win.location, 1., alpha as f32),
            caption: None,
        };
    }

    if minimize > 0. && reveal == 0. {
        let scale = lerp(
            1.,
            win.minimized_scale,
            clamp(1. - (1. - 1.1 * minimize).powi(2), 0., 1.),
        );
        let position = DVec2::new(
            lerp(win.location.x, win.minimized_location.x, minimize),
            lerp(win.location.y, win.minimized_location.y, minimize * minimize),
        );
        let alpha = clamp(1. - 1.1 * minimize * minimize, 0., 1.);
        return WindowPlacement {
            window: Placement::new(position, scale, alpha as f32),
            caption: None,
        };
    }

    let rotation = (PI * win.switch_phase / UNIT).sin();
    let (base_location, base_scale) = if win.info.minimized {
        (win.minimized_location, win.minimized_scale)
    } else {
        (win.location, 1.)
    };
    let dest = DVec2::new(ticker.current(win.dest_x), ticker.current(win.dest_y));

    let scale = lerp(
        lerp(base_scale, options.window_switch_scale, rotation * rotation),
        win.dest_scale,
        reveal,
    ) * (1. + reveal * options.window_hover_growth * hover);
    let position = base_location.lerp(dest, reveal) + rotation * options.window_switch_offset;
    let alpha = if win.info.minimized { reveal } else { 1. };

    let size = win.info.geometry.size;
    let caption = DVec2::new(dest.x + size.x / 2., dest.y + size.y / 2. * (1. + scale));

    WindowPlacement {
        window: Placement::new(position, scale, alpha as f32),
        caption: Some(Placement::new(caption, 1., 1.)),
    }
}
