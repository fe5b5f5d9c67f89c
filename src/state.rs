use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;

use swipeview_config::Config;
use tracing::trace;

use crate::animation::Clock;
use crate::diagnostics::{FaultReporter, LogFile};
use crate::frame_timer::FrameTimer;
use crate::host::Host;
use crate::input::{process_event, Event, GestureController};
use crate::layout::{Options, Overview};

/// The overview together with its input handling and the inbound event queue.
pub struct State<H: Host> {
    pub overview: Overview<H>,
    pub gestures: GestureController,
    queue: VecDeque<Event>,
    faults: FaultReporter,
}

impl<H: Host> State<H> {
    pub fn new(
        host: H,
        config: &Config,
        clock: Clock,
        timer: Box<dyn FrameTimer>,
    ) -> anyhow::Result<Self> {
        let options = Rc::new(Options::from_config(config));
        let overview = Overview::new(host, options, clock.clone(), timer)?;
        let gestures =
            GestureController::new(config.gestures.clone(), config.watchdog.clone(), clock);
        let log_file = match &config.debug.log_file {
            Some(path) => LogFile::new(PathBuf::from(path)),
            None => LogFile::in_temp_dir(),
        };

        Ok(Self {
            overview,
            gestures,
            queue: VecDeque::new(),
            faults: FaultReporter::new(Some(log_file)),
        })
    }

    pub fn faults(&self) -> &FaultReporter {
        &self.faults
    }

    pub fn queue_event(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    /// Queues an event and processes the queue right away.
    pub fn handle_event(&mut self, event: Event) {
        self.queue_event(event);
        self.dispatch();
    }

    /// Processes queued events in order, including the notifications they cause on the host.
    pub fn dispatch(&mut self) {
        let Self {
            overview,
            gestures,
            queue,
            faults,
        } = self;

        while let Some(event) = queue.pop_front() {
            faults.protect("dispatch", || process_event(overview, gestures, event));
            queue.extend(overview.host_mut().take_events());
        }
    }

    /// Runs one animation frame.
    pub fn on_frame(&mut self) {
        let failed = self
            .faults
            .protect("frame", || self.overview.on_frame())
            .is_none();
        if failed {
            trace!("recovering from a failed frame");
            self.overview.recover_from_failed_frame();
        }

        let events = self.overview.host_mut().take_events();
        if !events.is_empty() {
            self.queue.extend(events);
            self.dispatch();
        }
    }

    /// Periodic keep-alive check of the gesture watchdog.
    pub fn poll_watchdog(&mut self) {
        self.gestures.poll_watchdog(self.overview.host_mut());
    }
}
