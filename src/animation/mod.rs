//! Exponentially eased values and the frame ticker that drives them.
//!
//! Every animated quantity of the overview is an [`EasedValue`] (or its wrapping sibling
//! [`CyclicEasedValue`]) that approaches its target by a fixed fraction of the remaining distance
//! per millisecond. Values live inside a [`Ticker`] which advances the active ones once per frame
//! and tells their owners what changed.

use anyhow::ensure;
use tracing::warn;

mod clock;
mod cyclic;
mod ticker;

pub use clock::Clock;
pub use cyclic::CyclicEasedValue;
pub use ticker::{AnyValue, CyclicKey, Priority, Ticker, ValueChange, ValueKey};

/// Fixed-point unit of progress. A fully revealed overview is at `UNIT`.
pub const UNIT: f64 = 1_000_000.;

/// Requested direction of a release snap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchDirection {
    Left,
    #[default]
    Still,
    Right,
}

/// Static description of how an eased value behaves.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueConfig {
    /// Fraction of the remaining distance covered per millisecond.
    pub slope: f64,
    /// Distance below which the value snaps onto its target.
    pub stick: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Keep fractional values instead of rounding every step.
    pub continuous: bool,
    /// Start without a value; the first target is taken over immediately.
    pub uninitialized: bool,
    /// Ordered resting points used by the snapping operations.
    pub goals: Vec<f64>,
}

impl ValueConfig {
    pub fn new(slope: f64) -> Self {
        Self {
            slope,
            stick: 0.,
            min: None,
            max: None,
            continuous: false,
            uninitialized: false,
            goals: Vec::new(),
        }
    }

    pub fn stick(mut self, stick: f64) -> Self {
        self.stick = stick;
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn continuous(mut self) -> Self {
        self.continuous = true;
        self
    }

    pub fn uninitialized(mut self) -> Self {
        self.uninitialized = true;
        self
    }

    pub fn goals(mut self, goals: Vec<f64>) -> Self {
        self.goals = goals;
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.slope.is_finite() && self.slope > 0.,
            "slope must be positive, got {}",
            self.slope
        );
        ensure!(
            self.stick.is_finite() && self.stick >= 0.,
            "stick threshold must be non-negative, got {}",
            self.stick
        );
        if let (Some(min), Some(max)) = (self.min, self.max) {
            ensure!(min <= max, "empty range {min}..{max}");
        }
        validate_goals(&self.goals)
    }

    fn clamp(&self, value: f64) -> f64 {
        let mut value = value;
        if let Some(min) = self.min {
            value = value.max(min);
        }
        if let Some(max) = self.max {
            value = value.min(max);
        }
        value
    }
}

fn validate_goals(goals: &[f64]) -> anyhow::Result<()> {
    ensure!(
        goals.iter().all(|goal| goal.is_finite()),
        "goals must be finite: {goals:?}"
    );
    ensure!(
        goals.windows(2).all(|pair| pair[0] < pair[1]),
        "goals must be strictly increasing: {goals:?}"
    );
    Ok(())
}

/// Scalar that eases toward a target, one frame at a time.
#[derive(Debug, Clone)]
pub struct EasedValue {
    config: ValueConfig,
    current: f64,
    previous: f64,
    target: f64,
    initialized: bool,
    paused: bool,
}

impl EasedValue {
    pub fn new(config: ValueConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let initialized = !config.uninitialized;
        Ok(Self {
            config,
            current: 0.,
            previous: 0.,
            target: 0.,
            initialized,
            paused: true,
        })
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn previous(&self) -> f64 {
        self.previous
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &ValueConfig {
        &self.config
    }

    pub fn goals(&self) -> &[f64] {
        &self.config.goals
    }

    pub fn slope(&self) -> f64 {
        self.config.slope
    }

    pub fn set_slope(&mut self, slope: f64) {
        if slope.is_finite() && slope > 0. {
            self.config.slope = slope;
        } else {
            warn!("ignoring invalid slope {slope}");
        }
    }

    pub fn set_goals(&mut self, goals: Vec<f64>) -> anyhow::Result<()> {
        validate_goals(&goals)?;
        self.config.goals = goals;
        Ok(())
    }

    /// Whether the value sits exactly on one of its goals.
    pub fn on_goal(&self) -> bool {
        self.config.goals.contains(&self.current)
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target;
        if !self.initialized {
            self.initialized = true;
            self.current = target;
            self.previous = target;
        }
        if self.target != self.current {
            self.paused = false;
        }
    }

    /// Places the value on `value` with no animation.
    pub fn jump_to(&mut self, value: f64) {
        self.initialized = true;
        self.current = value;
        self.previous = value;
        self.target = value;
        self.paused = true;
    }

    /// Overwrites the whole state, then retargets.
    pub fn full_jump_to(&mut self, current: f64, previous: f64, target: f64) {
        self.initialized = true;
        self.current = current;
        self.previous = previous;
        self.set_target(target);
    }

    /// Goal nearest to the current value. The earlier goal wins ties.
    pub fn closest_goal_index(&self) -> Option<usize> {
        let current = self.current;
        self.config
            .goals
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - current).abs().total_cmp(&(*b - current).abs()))
            .map(|(idx, _)| idx)
    }

    pub fn snap_to_goal(&mut self) {
        match self.closest_goal_index() {
            Some(idx) => self.set_target(self.config.goals[idx]),
            None => warn!("cannot snap a value without goals"),
        }
    }

    /// Snaps to the nearest goal, moving one goal further in `direction` when the value is
    /// already past the nearest goal by more than `min_delta` that way.
    pub fn snap_to_goal_with_direction(&mut self, direction: SwitchDirection, min_delta: f64) {
        let Some(mut idx) = self.closest_goal_index() else {
            warn!("cannot snap a value without goals");
            return;
        };

        let goal = self.config.goals[idx];
        match direction {
            SwitchDirection::Right if self.current > goal + min_delta => {
                idx = (idx + 1).min(self.config.goals.len() - 1);
            }
            SwitchDirection::Left if self.current < goal - min_delta => {
                idx = idx.saturating_sub(1);
            }
            _ => (),
        }

        self.set_target(self.config.goals[idx]);
    }

    /// Advances by `dt_ms` milliseconds. Returns whether the value changed.
    pub fn advance(&mut self, dt_ms: f64) -> bool {
        if self.paused || dt_ms <= 0. {
            return false;
        }

        let factor = (dt_ms * self.config.slope).min(1.);
        let mut next = self.current + factor * (self.target - self.current);
        if !self.config.continuous {
            next = next.round();
        }
        if (next - self.target).abs() <= self.config.stick || next == self.current {
            next = self.target;
        }
        next = self.config.clamp(next);

        self.previous = self.current;
        self.current = next;

        if self.current == self.previous {
            // Only a clamp can hold the value away from its target here.
            self.paused = true;
            return false;
        }

        true
    }
}
