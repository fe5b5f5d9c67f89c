use glam::DVec2;
use swipeview_config::Config;

use crate::animation::{CyclicEasedValue, EasedValue, ValueConfig, UNIT};

/// Workspace reveal band in which a neighbour from another grid row moves out of the way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FleeBand {
    pub start: f64,
    pub turn: f64,
    pub end: f64,
}

/// Runtime settings of the overview, derived from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub frame_rate: u32,
    pub controlled_slope: f64,
    pub released_slope: f64,
    pub switch_controlled_factor: f64,
    pub switch_released_factor: f64,
    pub overdraft_factor: f64,
    pub minimize_factor: f64,
    pub release_min_delta: f64,
    pub workspace_margin: f64,
    pub window_slot_fraction: f64,
    pub workspace_slot_fraction: f64,
    pub window_hover_growth: f64,
    pub workspace_hover_growth: f64,
    pub load_threshold: f64,
    pub creation_threshold: f64,
    pub load_all_threshold: f64,
    pub flee: FleeBand,
    pub window_switch_scale: f64,
    /// Displacement of a carousel window at a quarter turn.
    pub window_switch_offset: DVec2,
    pub minimized_scale: f64,
    pub shade_alpha: f64,
    pub backdrop_dim: f64,
    pub rubber_band: f64,
    pub keep_panels: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Options {
    pub fn from_config(config: &Config) -> Self {
        let animations = &config.animations;
        let layout = &config.layout;

        Self {
            frame_rate: animations.frame_rate,
            controlled_slope: animations.controlled_slope(),
            released_slope: animations.released_slope(),
            switch_controlled_factor: animations.switch_controlled_factor.0,
            switch_released_factor: animations.switch_released_factor.0,
            overdraft_factor: animations.overdraft_factor.0,
            minimize_factor: animations.minimize_factor.0,
            release_min_delta: config.gestures.release_min_delta.0,
            workspace_margin: layout.workspace_margin.0,
            window_slot_fraction: layout.window_slot_fraction.0,
            workspace_slot_fraction: layout.workspace_slot_fraction.0,
            window_hover_growth: layout.window_hover_growth.0,
            workspace_hover_growth: layout.workspace_hover_growth.0,
            load_threshold: layout.load_threshold.0,
            creation_threshold: layout.creation_threshold.0,
            load_all_threshold: layout.load_all_threshold.0,
            flee: FleeBand {
                start: layout.flee_start.0,
                turn: layout.flee_return.0,
                end: layout.flee_end.0,
            },
            window_switch_scale: layout.window_switch_scale.0,
            window_switch_offset: DVec2::new(layout.window_switch_shift.0, 0.),
            minimized_scale: layout.minimized_scale.0,
            shade_alpha: layout.shade_alpha.0,
            backdrop_dim: layout.backdrop_dim.0,
            rubber_band: layout.rubber_band.0,
            keep_panels: config.debug.keep_panels,
        }
    }

    pub fn slope(&self, controlled: bool) -> f64 {
        if controlled {
            self.controlled_slope
        } else {
            self.released_slope
        }
    }

    pub fn overdraft_slope(&self) -> f64 {
        self.released_slope * self.overdraft_factor
    }

    /// Window and workspace reveals.
    pub fn reveal(&self) -> anyhow::Result<EasedValue> {
        EasedValue::new(
            ValueConfig::new(self.controlled_slope)
                .stick(90.)
                .range(0., UNIT)
                .goals(vec![0., UNIT]),
        )
    }

    pub fn workspace_switch(&self, count: usize) -> anyhow::Result<EasedValue> {
        EasedValue::new(
            ValueConfig::new(self.controlled_slope * self.switch_controlled_factor)
                .stick(3.)
                .goals(switch_goals(count)),
        )
    }

    pub fn window_switch(&self) -> anyhow::Result<CyclicEasedValue> {
        CyclicEasedValue::new(self.controlled_slope * self.switch_controlled_factor, 90.)
    }

    pub fn hover(&self, slope: f64) -> anyhow::Result<EasedValue> {
        EasedValue::new(
            ValueConfig::new(slope)
                .stick(90.)
                .range(0., UNIT)
                .goals(vec![0., UNIT]),
        )
    }

    pub fn minimizer(&self) -> anyhow::Result<EasedValue> {
        EasedValue::new(
            ValueConfig::new(self.released_slope * self.minimize_factor)
                .stick(90.)
                .range(0., UNIT)
                .goals(vec![0., UNIT]),
        )
    }

    /// Destination coordinate of a node, in pixels.
    pub fn destination(&self, stick: f64) -> anyhow::Result<EasedValue> {
        EasedValue::new(
            ValueConfig::new(self.released_slope)
                .stick(stick)
                .continuous()
                .uninitialized(),
        )
    }
}

/// One resting point per workspace.
pub fn switch_goals(count: usize) -> Vec<f64> {
    (0..count.max(1)).map(|idx| idx as f64 * UNIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = Options::default();
        assert_eq!(options.frame_rate, 120);
        assert_eq!(options.controlled_slope, 1. / 32.);
        assert_eq!(options.overdraft_slope(), 1. / 64. * 1.5);
        assert_eq!(options.flee.turn, 150_000.);
        assert_eq!(options.window_switch_offset, DVec2::new(-300., 0.));
        assert_eq!(options.rubber_band, UNIT / 70.);
    }

    #[test]
    fn goals_per_workspace() {
        assert_eq!(switch_goals(3), [0., UNIT, 2. * UNIT]);
        assert_eq!(switch_goals(0), [0.]);
    }

    #[test]
    fn value_configs_are_valid() {
        let options = Options::default();
        options.reveal().unwrap();
        options.workspace_switch(4).unwrap();
        options.window_switch().unwrap();
        options.hover(options.released_slope).unwrap();
        options.minimizer().unwrap();
        options.destination(0.01).unwrap();
    }
}
