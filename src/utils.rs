use glam::DVec2;

/// Axis-aligned rectangle in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub loc: DVec2,
    pub size: DVec2,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            loc: DVec2::new(x, y),
            size: DVec2::new(w, h),
        }
    }

    pub fn center(&self) -> DVec2 {
        self.loc + self.size / 2.
    }
}

pub fn lerp(from: f64, to: f64, progress: f64) -> f64 {
    from * (1. - progress) + to * progress
}

/// Clamp that does not panic on an inverted range, unlike [`f64::clamp`].
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Soft clamp: values outside `min..=max` are pulled back logarithmically with stiffness `b`.
pub fn clamp_log(value: f64, min: f64, max: f64, b: f64) -> f64 {
    if value > max {
        b * ((value - max + b).ln() - b.ln()) + max
    } else if value < min {
        -b * ((min - value + b).ln() - b.ln()) + min
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn clamp_log_is_identity_inside_range() {
        assert_eq!(clamp_log(5., 0., 10., 1.), 5.);
        assert_eq!(clamp_log(0., 0., 10., 1.), 0.);
    }

    #[test]
    fn clamp_log_resists_overdraft() {
        let b = 1e6 / 70.;
        let over = clamp_log(1_300_000., 0., 1e6, b);
        assert!(over > 1e6);
        assert!(over < 1_300_000.);

        let under = clamp_log(-300_000., 0., 1e6, b);
        assert_abs_diff_eq!(under, 1e6 - over, epsilon = 1e-6);
    }

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(3., 7., 0.), 3.);
        assert_eq!(lerp(3., 7., 1.), 7.);
        assert_eq!(lerp(3., 7., 0.5), 5.);
    }

    #[test]
    fn rect_center() {
        assert_eq!(Rect::new(10., 20., 100., 50.).center(), DVec2::new(60., 45.));
    }
}
