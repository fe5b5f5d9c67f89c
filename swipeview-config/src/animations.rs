use crate::FloatOrInt;

/// Timing of the eased values.
#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub struct Animations {
    /// Frames per second of the animation timer.
    #[knuffel(child, unwrap(argument), default = Self::default().frame_rate)]
    pub frame_rate: u32,
    /// Time constant while the fingers are on the touchpad.
    #[knuffel(child, unwrap(argument), default = Self::default().controlled_tau_ms)]
    pub controlled_tau_ms: FloatOrInt<1, 10000>,
    /// Time constant after the fingers are lifted.
    #[knuffel(child, unwrap(argument), default = Self::default().released_tau_ms)]
    pub released_tau_ms: FloatOrInt<1, 10000>,
    #[knuffel(child, unwrap(argument), default = Self::default().switch_controlled_factor)]
    pub switch_controlled_factor: FloatOrInt<0, 100>,
    #[knuffel(child, unwrap(argument), default = Self::default().switch_released_factor)]
    pub switch_released_factor: FloatOrInt<0, 100>,
    /// Speed-up of the workspace switch when released beyond the first or last workspace.
    #[knuffel(child, unwrap(argument), default = Self::default().overdraft_factor)]
    pub overdraft_factor: FloatOrInt<0, 100>,
    #[knuffel(child, unwrap(argument), default = Self::default().minimize_factor)]
    pub minimize_factor: FloatOrInt<0, 100>,
}

impl Default for Animations {
    fn default() -> Self {
        Self {
            frame_rate: 120,
            controlled_tau_ms: FloatOrInt(32.),
            released_tau_ms: FloatOrInt(64.),
            switch_controlled_factor: FloatOrInt(0.5),
            switch_released_factor: FloatOrInt(0.8),
            overdraft_factor: FloatOrInt(1.5),
            minimize_factor: FloatOrInt(0.8),
        }
    }
}

impl Animations {
    /// Per-millisecond easing slope while the gesture is held.
    pub fn controlled_slope(&self) -> f64 {
        1. / self.controlled_tau_ms.0
    }

    /// Per-millisecond easing slope after release.
    pub fn released_slope(&self) -> f64 {
        1. / self.released_tau_ms.0
    }
}
