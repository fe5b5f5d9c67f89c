use crate::FloatOrInt;

/// Mapping of touchpad motion onto overview progress.
#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub struct Gestures {
    /// Lets a horizontal three-finger swipe cycle through the windows of the workspace.
    #[knuffel(child)]
    pub window_switch: bool,
    #[knuffel(child, unwrap(argument), default = Self::default().window_switch_gain)]
    pub window_switch_gain: FloatOrInt<0, 1000000>,
    /// How much more horizontal than vertical a swipe must be to keep cycling windows.
    #[knuffel(child, unwrap(argument), default = Self::default().window_switch_weight)]
    pub window_switch_weight: FloatOrInt<0, 1000>,
    #[knuffel(child, unwrap(argument), default = Self::default().reveal_gain)]
    pub reveal_gain: FloatOrInt<0, 1000000>,
    #[knuffel(child, unwrap(argument), default = Self::default().switch_gain)]
    pub switch_gain: FloatOrInt<0, 1000000>,
    #[knuffel(child, unwrap(argument), default = Self::default().minimize_gain)]
    pub minimize_gain: FloatOrInt<0, 100>,
    /// Scale of the finger velocity when picking a release direction.
    #[knuffel(child, unwrap(argument), default = Self::default().direction_gain)]
    pub direction_gain: FloatOrInt<0, 1000>,
    #[knuffel(child, unwrap(argument), default = Self::default().direction_hysteresis)]
    pub direction_hysteresis: FloatOrInt<0, 1000000>,
    /// Workspace reveal above which a four-finger swipe stops switching workspaces.
    #[knuffel(child, unwrap(argument), default = Self::default().switch_latch)]
    pub switch_latch: FloatOrInt<0, 1000000>,
    /// Workspace reveal above which lifting the fingers keeps the overview open.
    #[knuffel(child, unwrap(argument), default = Self::default().reveal_lock)]
    pub reveal_lock: FloatOrInt<0, 1000000>,
    #[knuffel(child, unwrap(argument), default = Self::default().release_min_delta)]
    pub release_min_delta: FloatOrInt<0, 1000000>,
    /// Window reveal past which the focused window is no longer the one to minimize.
    #[knuffel(child, unwrap(argument), default = Self::default().focus_drop_reveal)]
    pub focus_drop_reveal: FloatOrInt<0, 1000000>,
    /// Window reveal below which a horizontal swipe still cycles windows.
    #[knuffel(child, unwrap(argument), default = Self::default().window_switch_reveal_slack)]
    pub window_switch_reveal_slack: FloatOrInt<0, 1000000>,
}

impl Default for Gestures {
    fn default() -> Self {
        Self {
            window_switch: false,
            window_switch_gain: FloatOrInt(3000.),
            window_switch_weight: FloatOrInt(3.),
            reveal_gain: FloatOrInt(5000.),
            switch_gain: FloatOrInt(2500.),
            minimize_gain: FloatOrInt(0.66),
            direction_gain: FloatOrInt(5.),
            direction_hysteresis: FloatOrInt(200.),
            switch_latch: FloatOrInt(200000.),
            reveal_lock: FloatOrInt(300000.),
            release_min_delta: FloatOrInt(25000.),
            focus_drop_reveal: FloatOrInt(20000.),
            window_switch_reveal_slack: FloatOrInt(10.),
        }
    }
}

/// Restart request when a four-finger hold stays still for too long.
#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub struct Watchdog {
    #[knuffel(child)]
    pub off: bool,
    #[knuffel(child, unwrap(argument), default = Self::default().hold_ms)]
    pub hold_ms: u64,
    /// Total finger travel below which a hold counts as still.
    #[knuffel(child, unwrap(argument), default = Self::default().motion_threshold)]
    pub motion_threshold: FloatOrInt<0, 1000000>,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self {
            off: false,
            hold_ms: 4000,
            motion_threshold: FloatOrInt(100.),
        }
    }
}
