//! Active-window selection while cycling through the windows of a workspace.
//!
//! The window switch value is cyclic: its wrapped phase animates the rotation of the windows
//! around the active one, and every whole turn it wraps moves the active index by one.

use crate::animation::UNIT;
use crate::utils::clamp;

/// Outcome of one carousel update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CarouselStep {
    pub active: usize,
    /// Rotation phases by window index. Later entries override earlier ones.
    pub phases: Vec<(usize, f64)>,
    /// Windows to raise, the last one ends up frontmost.
    pub raise: Vec<usize>,
    /// Whether the active index moved.
    pub switched: bool,
}

/// Advances a carousel of `len` windows by `carry` whole steps at sub-step `phase`.
pub fn step(active: usize, len: usize, carry: i64, phase: f64) -> CarouselStep {
    if len < 2 {
        return CarouselStep {
            active: 0,
            ..CarouselStep::default()
        };
    }

    let active = active.min(len - 1);
    if len == 2 {
        return toggle(active, carry, phase);
    }

    let mut step = CarouselStep {
        active,
        ..CarouselStep::default()
    };
    let next = |idx: usize| (idx + 1) % len;
    let prev = |idx: usize| (idx + len - 1) % len;

    if carry != 0 {
        let active = (active as i64 + carry).rem_euclid(len as i64) as usize;
        step.active = active;
        step.switched = true;

        step.raise.push(if phase >= 0. { next(active) } else { prev(active) });
        step.raise.push(active);

        if carry.abs() == 1 {
            step.phases.push((next(next(active)), 0.));
            step.phases.push((prev(prev(active)), 0.));
        } else {
            step.phases.extend((0..len).map(|idx| (idx, 0.)));
        }
    }

    let active = step.active;
    step.phases.push((active, phase));
    step.phases.push((next(active), clamp(phase - UNIT, -UNIT, UNIT)));
    step.phases.push((prev(active), clamp(phase + UNIT, -UNIT, UNIT)));
    step
}

fn toggle(active: usize, carry: i64, phase: f64) -> CarouselStep {
    let mut step = CarouselStep {
        active,
        ..CarouselStep::default()
    };

    if carry != 0 {
        if carry.rem_euclid(2) == 1 {
            step.active = 1 - active;
        }
        step.switched = true;
        step.raise.push(step.active);
    }

    step.phases.push((step.active, phase));
    step.phases.push((1 - step.active, (phase - UNIT) % (2. * UNIT)));
    step
}
