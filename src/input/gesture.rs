//! Touchpad swipe sessions.
//!
//! Three-finger swipes drive the window overview and the window carousel, four-finger swipes drive
//! the workspace overview and the workspace switch.

use std::collections::VecDeque;
use std::time::Duration;

use swipeview_config::{Gestures, Watchdog};
use tracing::{debug, trace, warn};

use crate::animation::{Clock, SwitchDirection, UNIT};
use crate::host::Host;
use crate::layout::{Lock, Overview};
use crate::utils::clamp;

/// Gesture event as delivered by the gesture source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    Begin { fingers: i16, dx: f64, dy: f64 },
    Update { dx: f64, dy: f64 },
    End,
}

impl GestureEvent {
    /// Decodes the `(type, fingers, dx, dy)` tuple of the gesture source.
    ///
    /// Types above 2 are pinches and decode to `None`.
    pub fn from_wire(kind: u8, fingers: i16, dx: f64, dy: f64) -> Option<Self> {
        match kind {
            0 => Some(Self::Begin { fingers, dx, dy }),
            1 => Some(Self::End),
            2 => Some(Self::Update { dx, dy }),
            _ => None,
        }
    }
}

const HISTORY_LIMIT: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy)]
struct Sample {
    delta: f64,
    timestamp: Duration,
}

/// Recent one-dimensional finger motion, for velocity estimation.
#[derive(Debug, Default)]
pub struct SwipeTracker {
    history: VecDeque<Sample>,
    position: f64,
}

impl SwipeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a new motion sample.
    pub fn push(&mut self, delta: f64, timestamp: Duration) {
        if let Some(last) = self.history.back() {
            if timestamp < last.timestamp {
                trace!("ignoring out-of-order swipe sample");
                return;
            }
        }

        self.history.push_back(Sample { delta, timestamp });
        self.position += delta;
        self.trim_history();
    }

    /// Current finger velocity in units per second.
    pub fn velocity(&self) -> f64 {
        let (Some(first), Some(last)) = (self.history.front(), self.history.back()) else {
            return 0.;
        };

        let total_time = (last.timestamp - first.timestamp).as_secs_f64();
        if total_time == 0. {
            return 0.;
        }

        let total_delta = self.history.iter().map(|sample| sample.delta).sum::<f64>();
        total_delta / total_time
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    fn trim_history(&mut self) {
        let Some(&last) = self.history.back() else {
            return;
        };
        while let Some(first) = self.history.front() {
            if last.timestamp <= first.timestamp + HISTORY_LIMIT {
                break;
            }
            self.history.pop_front();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Window,
    Workspace,
}

#[derive(Debug)]
struct Session {
    workspace_mode: bool,
    fingers: i16,
    x: f64,
    y: f64,
    ax: f64,
    ay: f64,
    started_at: Duration,
    start_reveal: f64,
    start_switch: f64,
    start_workspace_reveal: f64,
    can_switch: bool,
    can_switch_workspaces: bool,
    tracker: SwipeTracker,
    watchdog_fired: bool,
}

/// Turns touchpad swipes into overview targets.
pub struct GestureController {
    config: Gestures,
    watchdog: Watchdog,
    clock: Clock,
    session: Option<Session>,
}

impl GestureController {
    pub fn new(config: Gestures, watchdog: Watchdog, clock: Clock) -> Self {
        Self {
            config,
            watchdog,
            clock,
            session: None,
        }
    }

    pub fn state(&self) -> GestureState {
        match &self.session {
            None => GestureState::Idle,
            Some(session) if session.workspace_mode => GestureState::Workspace,
            Some(_) => GestureState::Window,
        }
    }

    pub fn is_gesturing(&self) -> bool {
        self.session.is_some()
    }

    pub fn handle<H: Host>(
        &mut self,
        overview: &mut Overview<H>,
        event: GestureEvent,
    ) -> anyhow::Result<()> {
        match event {
            GestureEvent::Begin { fingers, dx, dy } => {
                if self.session.is_some() {
                    self.end(overview);
                }
                self.begin(overview, fingers, dx, dy)
            }
            GestureEvent::Update { dx, dy } => {
                if self.session.is_none() {
                    trace!("ignoring gesture update without a session");
                    return Ok(());
                }
                self.update(overview, dx, dy)
            }
            GestureEvent::End => {
                if self.session.is_none() {
                    trace!("ignoring gesture end without a session");
                    return Ok(());
                }
                self.end(overview);
                Ok(())
            }
        }
    }

    fn begin<H: Host>(
        &mut self,
        overview: &mut Overview<H>,
        fingers: i16,
        dx: f64,
        dy: f64,
    ) -> anyhow::Result<()> {
        if !matches!(fingers, 3 | 4) {
            trace!("ignoring {fingers}-finger gesture");
            return Ok(());
        }
        debug!("{fingers}-finger gesture started");

        overview.start(true)?;
        overview.set_fine_controlled(true);

        let window_reveal = overview.window_reveal().current();
        let workspace_reveal = overview.workspace_reveal().current();
        self.session = Some(Session {
            workspace_mode: fingers == 4,
            fingers,
            x: 0.,
            y: 0.,
            ax: 0.,
            ay: 0.,
            started_at: self.clock.now(),
            start_reveal: window_reveal,
            start_switch: overview.workspace_switch().current(),
            start_workspace_reveal: workspace_reveal,
            can_switch: true,
            can_switch_workspaces: workspace_reveal <= self.config.switch_latch.0,
            tracker: SwipeTracker::new(),
            watchdog_fired: false,
        });

        if fingers == 3 {
            if window_reveal != 0. {
                overview.drop_focus_window();
            } else {
                overview.reset_focus_window()?;
            }
        } else {
            overview.drop_focus_window();
            overview.load_neighbor_workspaces()?;
        }

        self.update(overview, dx, dy)
    }

    fn update<H: Host>(
        &mut self,
        overview: &mut Overview<H>,
        mut dx: f64,
        dy: f64,
    ) -> anyhow::Result<()> {
        let now = self.clock.now();
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        if !self.config.window_switch && session.fingers == 3 {
            dx = 0.;
        }
        session.x += dx;
        session.y += dy;
        session.ax += dx.abs();
        session.ay += dy.abs();
        session.tracker.push(dx, now);

        self.poll_watchdog(overview.host_mut());

        if !overview.is_started() {
            return Ok(());
        }

        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if session.workspace_mode {
            update_workspace_mode(&self.config, session, overview)
        } else {
            update_window_mode(&self.config, session, overview, dx)
        }
    }

    fn end<H: Host>(&mut self, overview: &mut Overview<H>) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        debug!(
            "{}-finger gesture ended after moving ({}, {})",
            session.fingers, session.x, session.y
        );

        if !overview.is_started() {
            return;
        }

        if session.workspace_mode && session.can_switch_workspaces {
            // The fingers may have rested before lifting.
            session.tracker.push(0., self.clock.now());
            overview.set_switch_direction(classify(&self.config, session.tracker.velocity()));
        }
        overview.set_fine_controlled(false);
    }

    /// Asks for a safe restart when a four-finger hold stays still for too long.
    pub fn poll_watchdog(&mut self, host: &mut impl Host) {
        if self.watchdog.off {
            return;
        }
        let now = self.clock.now();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.fingers != 4 || session.watchdog_fired {
            return;
        }

        let held = now.saturating_sub(session.started_at);
        let still = session.ax + session.ay < self.watchdog.motion_threshold.0;
        if held > Duration::from_millis(self.watchdog.hold_ms) && still {
            warn!("four-finger hold for {held:?} without motion, requesting a safe restart");
            session.watchdog_fired = true;
            host.request_safe_restart();
        }
    }
}

/// Direction the workspace switch keeps going after the fingers lift.
fn classify(config: &Gestures, velocity: f64) -> SwitchDirection {
    let offset = -config.direction_gain.0 * velocity;
    let hysteresis = config.direction_hysteresis.0;
    if offset > hysteresis {
        SwitchDirection::Right
    } else if offset < -hysteresis {
        SwitchDirection::Left
    } else {
        SwitchDirection::Still
    }
}

fn update_window_mode<H: Host>(
    config: &Gestures,
    session: &mut Session,
    overview: &mut Overview<H>,
    dx: f64,
) -> anyhow::Result<()> {
    let wanted = session.start_reveal - session.y * config.reveal_gain.0;
    let lock = if session.y <= 0. { Lock::Up } else { Lock::Down };
    overview.set_should_window_switch(session.y >= 0.);
    if wanted >= config.focus_drop_reveal.0 {
        overview.drop_focus_window();
    }

    if session.start_reveal != 0. {
        overview.snap_window_switch();
        overview.set_focus_minimizer_target(0.);
        return overview.set_window_target(clamp(wanted, 0., UNIT), Some(lock));
    }

    let horizontal = config.window_switch_weight.0 * session.x.abs() >= session.y.abs();
    if session.can_switch && horizontal && wanted < config.window_switch_reveal_slack.0 {
        overview.add_window_switch_delta(-config.window_switch_gain.0 * dx);
        overview.set_window_target(0., Some(Lock::Down))?;
        overview.set_focus_minimizer_target(0.);
    } else {
        if session.can_switch {
            overview.reset_window_switch_order();
        }
        session.can_switch = false;
        overview.snap_window_switch();
        overview.set_window_target(clamp(wanted, 0., UNIT), Some(lock))?;
        overview.set_focus_minimizer_target(clamp(-wanted * config.minimize_gain.0, 0., UNIT));
    }
    Ok(())
}

fn update_workspace_mode<H: Host>(
    config: &Gestures,
    session: &mut Session,
    overview: &mut Overview<H>,
) -> anyhow::Result<()> {
    let wanted = session.start_workspace_reveal - session.y * config.reveal_gain.0;

    if wanted <= config.switch_latch.0 && session.can_switch_workspaces {
        let target = session.start_switch - session.x * config.switch_gain.0;
        let direction = classify(config, session.tracker.velocity());
        overview.set_workspace_switch_target(target, direction)?;
    } else {
        session.can_switch_workspaces = false;
        overview.snap_workspace_switch();
    }

    let lock = if wanted > config.reveal_lock.0 && session.y <= 0. {
        Lock::Up
    } else {
        Lock::Down
    };
    overview.set_workspace_overview_target(wanted, Some(lock))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn wire_decoding() {
        assert_eq!(
            GestureEvent::from_wire(0, 3, 1., -2.),
            Some(GestureEvent::Begin {
                fingers: 3,
                dx: 1.,
                dy: -2.
            })
        );
        assert_eq!(GestureEvent::from_wire(1, 3, 5., 5.), Some(GestureEvent::End));
        assert_eq!(
            GestureEvent::from_wire(2, 4, 0.5, 0.),
            Some(GestureEvent::Update { dx: 0.5, dy: 0. })
        );
        assert_eq!(GestureEvent::from_wire(3, 2, 0., 0.), None);
        assert_eq!(GestureEvent::from_wire(7, 2, 0., 0.), None);
    }

    #[test]
    fn tracker_velocity() {
        let mut tracker = SwipeTracker::new();
        assert_eq!(tracker.velocity(), 0.);

        tracker.push(-10., Duration::from_millis(0));
        tracker.push(-10., Duration::from_millis(10));
        tracker.push(-10., Duration::from_millis(20));
        assert_abs_diff_eq!(tracker.velocity(), -1500., epsilon = 1e-6);
        assert_eq!(tracker.position(), -30.);
    }

    #[test]
    fn tracker_forgets_old_motion() {
        let mut tracker = SwipeTracker::new();
        tracker.push(-10., Duration::from_millis(0));
        tracker.push(-10., Duration::from_millis(10));
        tracker.push(0., Duration::from_millis(400));
        assert_eq!(tracker.velocity(), 0.);
        assert_eq!(tracker.position(), -20.);
    }

    #[test]
    fn tracker_ignores_out_of_order_samples() {
        let mut tracker = SwipeTracker::new();
        tracker.push(1., Duration::from_millis(50));
        tracker.push(1., Duration::from_millis(40));
        assert_eq!(tracker.position(), 1.);
    }

    #[test]
    fn classifier_hysteresis() {
        let config = Gestures::default();
        assert_eq!(classify(&config, -1000.), SwitchDirection::Right);
        assert_eq!(classify(&config, 1000.), SwitchDirection::Left);
        assert_eq!(classify(&config, -30.), SwitchDirection::Still);
        assert_eq!(classify(&config, 0.), SwitchDirection::Still);
    }
}
