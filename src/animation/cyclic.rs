use anyhow::ensure;

use super::UNIT;

/// Eased value on a circle of [`UNIT`] per turn.
///
/// Whenever the value drifts past half a turn, whole turns are taken out of both the value and
/// its target and reported as a carry, so the value itself always stays within half a turn of
/// zero while the carries keep count of full rotations.
#[derive(Debug, Clone)]
pub struct CyclicEasedValue {
    slope: f64,
    stick: f64,
    current: f64,
    previous: f64,
    target: f64,
    paused: bool,
    carry: i64,
}

impl CyclicEasedValue {
    pub fn new(slope: f64, stick: f64) -> anyhow::Result<Self> {
        ensure!(
            slope.is_finite() && slope > 0.,
            "slope must be positive, got {slope}"
        );
        ensure!(
            stick.is_finite() && stick >= 0.,
            "stick threshold must be non-negative, got {stick}"
        );
        Ok(Self {
            slope,
            stick,
            current: 0.,
            previous: 0.,
            target: 0.,
            paused: true,
            carry: 0,
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

    /// Whole turns removed during the most recent advance.
    pub fn carry(&self) -> i64 {
        self.carry
    }

    pub fn set_slope(&mut self, slope: f64) {
        if slope.is_finite() && slope > 0. {
            self.slope = slope;
        }
    }

    pub fn add_delta(&mut self, delta: f64) {
        self.set_target(self.target + delta);
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target;
        if self.target != self.current {
            self.paused = false;
        }
    }

    /// The only resting point of a cyclic value is zero.
    pub fn snap_to_goal(&mut self) {
        self.set_target(0.);
    }

    pub fn on_goal(&self) -> bool {
        self.current == 0.
    }

    pub fn jump_to(&mut self, value: f64) {
        self.current = value;
        self.previous = value;
        self.target = value;
        self.carry = 0;
        self.paused = true;
    }

    /// Advances by `dt_ms` milliseconds. Returns whether the value changed or wrapped.
    pub fn advance(&mut self, dt_ms: f64) -> bool {
        self.carry = 0;
        if self.paused || dt_ms <= 0. {
            return false;
        }

        let factor = (dt_ms * self.slope).min(1.);
        let mut next = self.current + (factor * (self.target - self.current)).round();
        if (next - self.target).abs() <= self.stick || next == self.current {
            next = self.target;
        }

        let carry = (next / UNIT + 0.5).floor();
        self.target -= carry * UNIT;
        next -= carry * UNIT;
        self.carry = carry as i64;

        self.previous = self.current;
        self.current = next;

        if self.current == self.previous && self.carry == 0 && self.current == self.target {
            self.paused = true;
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn wraps_and_reports_carry() {
        let mut v = CyclicEasedValue::new(1. / 32., 0.).unwrap();
        v.add_delta(1_400_000.);
        let mut carried = 0;
        while !v.is_paused() {
            v.advance(8.);
            carried += v.carry();
            assert!(v.current().abs() <= UNIT / 2.);
        }
        assert_eq!(carried, 1);
        assert_eq!(v.current(), 400_000.);
    }

    #[test]
    fn backwards_carry_is_negative() {
        let mut v = CyclicEasedValue::new(0.5, 0.).unwrap();
        v.add_delta(-UNIT);
        let mut carried = 0;
        while !v.is_paused() {
            v.advance(8.);
            carried += v.carry();
        }
        assert_eq!(carried, -1);
        assert_eq!(v.current(), 0.);
        assert!(v.on_goal());
    }

    #[test]
    fn snapping_returns_to_zero() {
        let mut v = CyclicEasedValue::new(0.05, 0.).unwrap();
        v.add_delta(300_000.);
        v.advance(8.);
        assert!(!v.on_goal());
        v.snap_to_goal();
        while !v.is_paused() {
            v.advance(8.);
        }
        assert!(v.on_goal());
    }

    proptest! {
        #[test]
        fn carries_account_for_displacement(
            deltas in prop::collection::vec(-2_500_000f64..2_500_000., 1..6),
            slope in 0.005f64..0.3,
        ) {
            let mut v = CyclicEasedValue::new(slope, 0.).unwrap();
            let mut total = 0.;
            let mut carried = 0i64;
            for delta in deltas {
                let delta = delta.round();
                total += delta;
                v.add_delta(delta);
                for _ in 0..3 {
                    v.advance(8.);
                    carried += v.carry();
                }
            }
            let mut ticks = 0;
            while !v.is_paused() {
                v.advance(8.);
                carried += v.carry();
                ticks += 1;
                prop_assert!(ticks < 100_000);
            }
            prop_assert_eq!(carried as f64 * UNIT + v.current(), total);
        }
    }
}
