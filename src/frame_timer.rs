//! Periodic frame timers.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use calloop::timer::{TimeoutAction, Timer};
use calloop::{LoopHandle, RegistrationToken};
use tracing::{trace, warn};

/// Periodic timer that drives animation frames.
///
/// The ticker arms it when something starts animating and disarms it once everything is at rest.
/// Disarming may happen from inside the timer's own callback.
pub trait FrameTimer {
    fn arm(&mut self, interval: Duration);
    fn disarm(&mut self);
}

/// Timer that only records its state. Frames are delivered by calling the ticker by hand.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    armed: Rc<Cell<bool>>,
    arm_count: Rc<Cell<usize>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.get()
    }

    pub fn arm_count(&self) -> usize {
        self.arm_count.get()
    }
}

impl FrameTimer for ManualTimer {
    fn arm(&mut self, _interval: Duration) {
        self.armed.set(true);
        self.arm_count.set(self.arm_count.get() + 1);
    }

    fn disarm(&mut self) {
        self.armed.set(false);
    }
}

#[derive(Debug, Default)]
struct Dispatch {
    running: Cell<bool>,
    drop_requested: Cell<bool>,
}

/// Frame timer on a calloop event loop.
pub struct LoopTimer<D: 'static> {
    handle: LoopHandle<'static, D>,
    on_frame: fn(&mut D),
    token: Option<RegistrationToken>,
    dropping: Option<RegistrationToken>,
    dispatch: Rc<Dispatch>,
}

impl<D: 'static> LoopTimer<D> {
    pub fn new(handle: LoopHandle<'static, D>, on_frame: fn(&mut D)) -> Self {
        Self {
            handle,
            on_frame,
            token: None,
            dropping: None,
            dispatch: Rc::new(Dispatch::default()),
        }
    }
}

impl<D: 'static> FrameTimer for LoopTimer<D> {
    fn arm(&mut self, interval: Duration) {
        if self.token.is_some() {
            return;
        }

        // A drop requested earlier in this dispatch is cancelled by re-arming.
        if self.dispatch.running.get() && self.dispatch.drop_requested.replace(false) {
            self.token = self.dropping.take();
            return;
        }
        self.dropping = None;

        let dispatch = self.dispatch.clone();
        let on_frame = self.on_frame;
        let timer = Timer::from_duration(interval);
        let res = self.handle.insert_source(timer, move |_, _, data| {
            dispatch.running.set(true);
            on_frame(data);
            dispatch.running.set(false);

            if dispatch.drop_requested.replace(false) {
                trace!("frame timer dropped");
                TimeoutAction::Drop
            } else {
                TimeoutAction::ToDuration(interval)
            }
        });

        match res {
            Ok(token) => self.token = Some(token),
            Err(err) => warn!("error inserting frame timer: {}", err.error),
        }
    }

    fn disarm(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };

        if self.dispatch.running.get() {
            // Removing a source from inside its own callback is not allowed.
            self.dispatch.drop_requested.set(true);
            self.dropping = Some(token);
        } else {
            self.handle.remove(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use calloop::EventLoop;

    use super::*;

    struct Data {
        frames: usize,
        timer: Option<LoopTimer<Data>>,
    }

    fn on_frame(data: &mut Data) {
        data.frames += 1;
        if data.frames == 3 {
            if let Some(timer) = &mut data.timer {
                timer.disarm();
            }
        }
    }

    #[test]
    fn loop_timer_stops_from_its_callback() {
        let mut event_loop = EventLoop::<'static, Data>::try_new().unwrap();
        let mut timer = LoopTimer::new(event_loop.handle(), on_frame);
        timer.arm(Duration::from_millis(1));

        let mut data = Data {
            frames: 0,
            timer: Some(timer),
        };
        for _ in 0..10 {
            event_loop
                .dispatch(Some(Duration::from_millis(5)), &mut data)
                .unwrap();
        }
        assert_eq!(data.frames, 3);
    }

    #[test]
    fn manual_timer_records_state() {
        let timer = ManualTimer::new();
        let mut boxed: Box<dyn FrameTimer> = Box::new(timer.clone());
        boxed.arm(Duration::from_millis(8));
        assert!(timer.is_armed());
        boxed.disarm();
        assert!(!timer.is_armed());
        assert_eq!(timer.arm_count(), 1);
    }
}
