use std::time::Duration;

use glam::DVec2;
use pretty_assertions::assert_eq;
use swipeview_config::{Config, Gestures};

use super::*;
use crate::frame_timer::ManualTimer;
use crate::host::{Fault, Inventory, MemoryHost, Request, Visual};
use crate::input::{
    Event, GestureEvent, GestureState, PointerAction, PointerEvent, PointerTarget,
};
use crate::state::State;

const OUTPUT: DVec2 = DVec2::new(1920., 1080.);

struct Fixture {
    state: State<MemoryHost>,
    clock: Clock,
    timer: ManualTimer,
}

impl Fixture {
    fn new(layout: &[usize]) -> Self {
        Self::with_config(layout, &Config::default())
    }

    fn with_config(layout: &[usize], config: &Config) -> Self {
        Self::with_host(MemoryHost::with_layout(OUTPUT, layout), config)
    }

    fn with_host(host: MemoryHost, config: &Config) -> Self {
        let clock = Clock::with_time(Duration::from_secs(1));
        let timer = ManualTimer::new();
        let state = State::new(host, config, clock.clone(), Box::new(timer.clone())).unwrap();
        Self {
            state,
            clock,
            timer,
        }
    }

    fn overview(&self) -> &Overview<MemoryHost> {
        &self.state.overview
    }

    fn host(&self) -> &MemoryHost {
        self.state.overview.host()
    }

    fn event(&mut self, event: Event) {
        self.state.handle_event(event);
    }

    fn begin(&mut self, fingers: i16) {
        self.event(Event::Gesture(GestureEvent::Begin {
            fingers,
            dx: 0.,
            dy: 0.,
        }));
    }

    fn swipe(&mut self, dx: f64, dy: f64) {
        self.event(Event::Gesture(GestureEvent::Update { dx, dy }));
    }

    fn end(&mut self) {
        self.event(Event::Gesture(GestureEvent::End));
    }

    fn click(&mut self, target: PointerTarget, button: u32) {
        for action in [
            PointerAction::Enter,
            PointerAction::Press(button),
            PointerAction::Release(button),
        ] {
            self.event(Event::Pointer(PointerEvent::new(target, action)));
        }
    }

    fn frame(&mut self) {
        self.clock.advance(self.overview().ticker().interval());
        self.state.on_frame();
    }

    fn frames(&mut self, count: usize) {
        for _ in 0..count {
            self.frame();
        }
    }

    /// Runs frames until the frame timer stops. Returns the number of frames.
    fn settle(&mut self) -> usize {
        let mut frames = 0;
        while self.timer.is_armed() {
            self.frame();
            frames += 1;
            assert!(frames < 5000, "overview never settled");
        }
        frames
    }

    fn assert_quiescent(&self) {
        let ticker = self.overview().ticker();
        assert!(!self.timer.is_armed());
        assert_eq!(ticker.active_count(), 0);
        assert_eq!(ticker.dirty_count(), 0);
    }
}

fn window_switch_config() -> Config {
    Config {
        gestures: Gestures {
            window_switch: true,
            ..Gestures::default()
        },
        ..Config::default()
    }
}

#[test]
fn overview_starts_idle() {
    let f = Fixture::new(&[2, 1]);
    assert!(!f.overview().is_started());
    assert_eq!(f.overview().workspace_count(), 0);
    assert_eq!(f.overview().window_reveal().current(), 0.);
    f.assert_quiescent();
}

#[test]
fn window_reveal_opens_and_closes() {
    let mut f = Fixture::new(&[2, 1]);

    f.begin(3);
    assert_eq!(f.state.gestures.state(), GestureState::Window);
    assert!(f.overview().is_started());
    assert!(f.overview().is_fine_controlled());
    assert!(f.host().stage_visible);

    for _ in 0..4 {
        f.swipe(0., -50.);
        f.frames(2);
    }
    assert_eq!(f.overview().window_reveal().target(), UNIT);
    f.settle();
    assert_eq!(f.overview().window_reveal().current(), UNIT);

    // Moving up locks the overview open.
    f.end();
    assert!(!f.state.gestures.is_gesturing());
    assert_eq!(f.overview().window_lock(), Lock::Up);
    f.settle();
    assert!(f.overview().is_started());
    assert_eq!(f.overview().window_reveal().current(), UNIT);
    assert!(!f.host().panels_visible);
    assert_eq!(f.host().panels_alpha, 0.);

    let ws = f.host().workspace_id(0).unwrap();
    for info in f.host().windows(ws) {
        let key = f.overview().window_key(info.id).unwrap();
        let win = f.overview().window(key).unwrap();
        let placement = f.host().placement(Visual::Window(info.id)).unwrap();
        assert_eq!(placement.scale, win.dest_scale());
        assert!(placement.scale < 1.);
    }

    f.begin(3);
    f.swipe(0., 100.);
    f.frames(5);
    f.end();
    assert_eq!(f.overview().window_lock(), Lock::Down);
    f.settle();

    assert!(!f.overview().is_started());
    assert_eq!(f.overview().window_reveal().current(), 0.);
    assert!(!f.host().stage_visible);
    assert!(f.host().panels_visible);
    assert_eq!(f.host().panels_alpha, 1.);
    f.assert_quiescent();
}

#[test]
fn short_swipe_falls_back() {
    let mut f = Fixture::new(&[1]);

    f.begin(3);
    f.swipe(0., -40.);
    f.frames(10);
    // Lifting below the starting point returns the reveal to rest.
    f.swipe(0., 50.);
    assert_eq!(f.overview().window_lock(), Lock::Down);
    f.end();
    f.settle();

    assert!(!f.overview().is_started());
    assert_eq!(f.overview().window_reveal().current(), 0.);
    f.assert_quiescent();
}

#[test]
fn toggles() {
    let mut f = Fixture::new(&[1, 1]);

    f.event(Event::ToggleWindowOverview);
    f.settle();
    assert_eq!(f.overview().window_reveal().current(), UNIT);

    f.event(Event::ToggleWindowOverview);
    f.settle();
    assert!(!f.overview().is_started());

    f.event(Event::ToggleWorkspaceOverview);
    f.settle();
    assert_eq!(f.overview().workspace_reveal().current(), UNIT);
    assert!(f.overview().is_workspace_overview_enabled());
    assert_eq!(f.host().alphas[&Visual::Backdrop], 0.5);

    f.event(Event::ToggleWorkspaceOverview);
    f.settle();
    assert!(!f.overview().is_started());
    f.assert_quiescent();
}

#[test]
fn toggles_are_ignored_during_a_gesture() {
    let mut f = Fixture::new(&[1]);
    f.begin(3);
    f.event(Event::ToggleWindowOverview);
    assert_eq!(f.overview().window_lock(), Lock::Down);
    assert_eq!(f.overview().window_reveal().target(), 0.);
}

#[test]
fn workspace_switch_snaps_to_nearest() {
    let mut f = Fixture::new(&[1, 1, 1]);

    f.begin(4);
    assert_eq!(f.state.gestures.state(), GestureState::Workspace);
    // 580 * 2500 = 1 450 000
    f.swipe(-580., 0.);
    assert_eq!(f.overview().workspace_switch().target(), 1_450_000.);
    f.settle();
    assert_eq!(f.overview().workspace_switch().current(), 1_450_000.);
    assert_eq!(f.overview().current_workspace(), 1);

    f.end();
    f.settle();

    assert_eq!(f.overview().workspace_switch().current(), UNIT);
    assert_eq!(f.host().active_workspace(), 1);
    assert!(!f.overview().is_started());
    let second = f.host().workspace_id(1).unwrap();
    assert!(f
        .host()
        .requests
        .contains(&Request::ActivateWorkspace(second)));
    f.assert_quiescent();
}

#[test]
fn flick_switches_workspace() {
    let mut f = Fixture::new(&[1, 1, 1]);

    f.begin(4);
    for _ in 0..4 {
        f.swipe(-40., 0.);
        f.frames(2);
    }
    let switch = f.overview().workspace_switch().current();
    assert!(switch > 25_000. && switch < UNIT / 2., "{switch}");

    f.end();
    f.settle();

    assert_eq!(f.overview().workspace_switch().current(), UNIT);
    assert_eq!(f.host().active_workspace(), 1);
}

#[test]
fn raised_workspace_reveal_breaks_the_switch_latch() {
    let mut f = Fixture::new(&[1, 1]);

    f.begin(4);
    f.swipe(0., -100.);
    f.swipe(-200., 0.);
    assert_eq!(f.overview().workspace_switch().target(), 0.);
    assert_eq!(f.overview().workspace_reveal().target(), 500_000.);

    f.swipe(0., -100.);
    f.end();
    assert_eq!(f.overview().workspace_lock(), Lock::Up);
    f.settle();
    assert_eq!(f.overview().workspace_reveal().current(), UNIT);
    assert_eq!(f.host().active_workspace(), 0);
}

#[test]
fn overdraft_creates_workspace() {
    let mut f = Fixture::new(&[1, 1]);

    f.begin(4);
    f.swipe(-560., 0.);

    let mut previous = f.overview().workspace_switch().current();
    let mut max_jump: f64 = 0.;
    while f.timer.is_armed() {
        f.frame();
        let current = f.overview().workspace_switch().current();
        max_jump = max_jump.max((current - previous).abs());
        previous = current;
    }

    assert_eq!(f.overview().workspace_count(), 3);
    assert_eq!(f.host().workspaces().len(), 3);
    assert_eq!(f.overview().workspace_switch().goals(), [0., UNIT, 2. * UNIT]);
    assert!(max_jump <= 400_000., "{max_jump}");
    assert!(f
        .host()
        .requests
        .iter()
        .any(|req| matches!(req, Request::AppendWorkspace(_))));

    f.end();
    f.settle();
    assert_eq!(f.host().workspaces().len(), 3);
    assert!(!f.overview().is_started());
}

#[test]
fn overdraft_past_empty_workspace_creates_nothing() {
    let mut f = Fixture::new(&[1, 0]);

    f.begin(4);
    f.swipe(-560., 0.);
    f.settle();
    f.end();
    f.settle();

    assert_eq!(f.host().workspaces().len(), 2);
    assert_eq!(f.overview().workspace_switch().current(), UNIT);
}

#[test]
fn carousel_wraps_backward_and_activates() {
    let mut f = Fixture::with_config(&[3], &window_switch_config());
    let ws = f.host().workspace_id(0).unwrap();
    // Most recently used first.
    let windows: Vec<_> = f.host().windows(ws).iter().rev().map(|win| win.id).collect();

    f.begin(3);
    f.swipe(200., 0.);
    assert_eq!(f.overview().window_reveal().target(), 0.);
    f.settle();

    let key = f.overview().workspace_key(ws).unwrap();
    assert_eq!(f.overview().workspace(key).unwrap().active_index(), 2);
    assert_eq!(f.host().top(), Some(Visual::Window(windows[2])));

    f.end();
    f.settle();

    assert!(!f.overview().is_started());
    assert!(f
        .host()
        .requests
        .contains(&Request::ActivateWindow(windows[2])));
    assert_eq!(f.host().focused_window(), Some(windows[2]));
}

#[test]
fn horizontal_swipe_is_ignored_without_window_switch() {
    let mut f = Fixture::new(&[3]);

    f.begin(3);
    f.swipe(200., 0.);
    f.settle();
    assert_eq!(f.overview().window_switch_phase(), 0.);

    f.end();
    f.settle();
    assert!(!f.overview().is_started());
    assert!(!f
        .host()
        .requests
        .iter()
        .any(|req| matches!(req, Request::ActivateWindow(_))));
}

#[test]
fn focus_window_minimizes_on_release() {
    let mut host = MemoryHost::with_layout(OUTPUT, &[2]);
    let ws = host.workspace_id(0).unwrap();
    let focused = host.windows(ws)[1].id;
    host.set_focused(Some(focused));
    let mut f = Fixture::with_host(host, &Config::default());

    f.begin(3);
    assert_eq!(f.overview().focus_window(), Some(focused));

    f.swipe(0., 200.);
    f.settle();
    assert_eq!(f.overview().focus_window(), Some(focused));

    f.end();
    assert!(f.host().requests.contains(&Request::MinimizeWindow(focused)));
    assert_eq!(f.overview().retained(), 1);

    f.settle();
    assert!(f.host().window(focused).unwrap().minimized);
    assert!(!f.overview().is_started());
    assert_eq!(f.overview().retained(), 0);
    f.assert_quiescent();
}

#[test]
fn focus_window_springs_back_before_half() {
    let mut host = MemoryHost::with_layout(OUTPUT, &[1]);
    let ws = host.workspace_id(0).unwrap();
    let focused = host.windows(ws)[0].id;
    host.set_focused(Some(focused));
    let mut f = Fixture::with_host(host, &Config::default());

    f.begin(3);
    f.swipe(0., 60.);
    f.settle();
    f.end();
    f.settle();

    assert!(!f.host().requests.contains(&Request::MinimizeWindow(focused)));
    assert!(!f.host().window(focused).unwrap().minimized);
    assert!(!f.overview().is_started());
}

#[test]
fn clicking_a_window_activates_it() {
    let mut f = Fixture::new(&[2]);
    let ws = f.host().workspace_id(0).unwrap();
    let older = f.host().windows(ws)[0].id;

    f.event(Event::ToggleWindowOverview);
    f.settle();

    f.click(PointerTarget::Window(older), 1);
    assert!(f.host().requests.contains(&Request::ActivateWindow(older)));
    assert_eq!(f.overview().window_lock(), Lock::Down);

    f.settle();
    assert!(!f.overview().is_started());
    assert_eq!(f.host().focused_window(), Some(older));
}

#[test]
fn middle_click_closes_a_window() {
    let mut f = Fixture::new(&[1, 1]);
    let ws = f.host().workspace_id(0).unwrap();
    let window = f.host().windows(ws)[0].id;

    f.event(Event::ToggleWindowOverview);
    f.settle();

    f.click(PointerTarget::Window(window), 2);
    assert!(f.host().requests.contains(&Request::CloseWindow(window)));
    assert!(f.host().window(window).is_none());
    assert_eq!(f.overview().window_key(window), None);

    // Closing the last window of the workspace closes the overview.
    assert_eq!(f.overview().window_reveal().target(), 0.);
    f.settle();
    assert!(!f.overview().is_started());
}

#[test]
fn idle_windows_ignore_clicks() {
    let mut host = MemoryHost::with_layout(OUTPUT, &[1]);
    let ws = host.workspace_id(0).unwrap();
    let dock = host.add_window(ws, "dock", crate::utils::Rect::new(0., 1040., 1920., 40.));
    host.window_mut(dock).unwrap().interesting = false;
    let mut f = Fixture::with_host(host, &Config::default());

    f.event(Event::ToggleWindowOverview);
    f.settle();
    let key = f.overview().window_key(dock).unwrap();
    let ws_key = f.overview().workspace_key(ws).unwrap();
    assert_eq!(f.overview().workspace(ws_key).unwrap().idle_windows(), [key]);
    assert!(f.overview().window(key).unwrap().is_idle());

    f.click(PointerTarget::Window(dock), 1);

    assert!(!f.host().requests.contains(&Request::ActivateWindow(dock)));
    assert!(f.overview().is_started());
}

#[test]
fn clicking_a_workspace_switches_to_it() {
    let mut f = Fixture::new(&[1, 1, 1]);
    let last = f.host().workspace_id(2).unwrap();

    f.event(Event::ToggleWorkspaceOverview);
    f.settle();
    assert!(f.overview().is_workspace_overview_enabled());

    f.click(PointerTarget::Workspace(last), 1);
    assert_eq!(f.overview().current_workspace(), 2);
    assert_eq!(f.overview().workspace_switch().current(), 2. * UNIT);

    f.settle();
    assert!(!f.overview().is_started());
    assert_eq!(f.host().active_workspace(), 2);
}

#[test]
fn middle_click_removes_a_workspace() {
    let mut f = Fixture::new(&[1, 1, 1]);
    let second = f.host().workspace_id(1).unwrap();

    f.event(Event::ToggleWorkspaceOverview);
    f.settle();

    f.click(PointerTarget::Workspace(second), 2);
    assert!(f.host().requests.contains(&Request::RemoveWorkspace(second)));
    assert_eq!(f.host().workspaces().len(), 2);
    assert_eq!(f.overview().workspace_count(), 2);
    assert_eq!(f.overview().workspace_switch().goals(), [0., UNIT]);

    // The last workspace stays.
    let first = f.host().workspace_id(0).unwrap();
    f.click(PointerTarget::Workspace(first), 2);
    let remaining = f.host().workspace_id(0).unwrap();
    f.click(PointerTarget::Workspace(remaining), 2);
    assert_eq!(f.host().workspaces().len(), 1);
}

#[test]
fn window_added_during_session_gets_a_node() {
    let mut f = Fixture::new(&[1]);
    f.event(Event::ToggleWindowOverview);
    f.settle();

    let ws = f.host().workspace_id(0).unwrap();
    let rect = crate::utils::Rect::new(10., 10., 640., 480.);
    let window = f.state.overview.host_mut().add_window(ws, "new", rect);
    f.event(Event::WindowAdded { workspace: ws, window });
    f.settle();

    let key = f.overview().window_key(window).unwrap();
    let ws_key = f.overview().workspace_key(ws).unwrap();
    assert_eq!(f.overview().workspace(ws_key).unwrap().sorted_windows()[0], key);
    assert!(f.host().placement(Visual::Window(window)).is_some());
}

#[test]
fn captions_show_window_titles() {
    let mut f = Fixture::new(&[2]);
    f.event(Event::ToggleWindowOverview);
    f.settle();

    let ws = f.host().workspace_id(0).unwrap();
    let windows: Vec<_> = f.host().windows(ws).iter().map(|info| info.id).collect();
    assert_eq!(f.host().captions[&windows[0]], "window 0");
    assert_eq!(f.host().captions[&windows[1]], "window 1");

    let host = f.state.overview.host_mut();
    host.window_mut(windows[1]).unwrap().title = String::from("renamed");
    f.event(Event::WindowChanged { window: windows[1] });
    assert_eq!(f.host().captions[&windows[1]], "renamed");

    f.event(Event::ToggleWindowOverview);
    f.settle();
    assert!(!f.overview().is_started());
    assert!(f.host().captions.is_empty());
}

#[test]
fn watchdog_requests_one_restart() {
    let mut f = Fixture::new(&[1]);
    f.begin(4);

    f.clock.advance(Duration::from_secs(5));
    f.state.poll_watchdog();
    f.state.poll_watchdog();

    let restarts = f
        .host()
        .requests
        .iter()
        .filter(|req| **req == Request::SafeRestart)
        .count();
    assert_eq!(restarts, 1);
}

#[test]
fn refused_activation_is_retried_on_later_frames() {
    let mut f = Fixture::new(&[1, 1, 1]);
    f.state.overview.host_mut().activation_fault = Some(Fault::Error);

    f.begin(4);
    f.swipe(-580., 0.);
    // The switch passes the middle of the strip on the fifth frame. Twenty frames let the swipe
    // age out of the velocity window, so the release snaps to the nearest workspace.
    f.frames(20);
    assert!(f.overview().workspace_switch().current() > 0.5 * UNIT);
    assert_eq!(f.overview().current_workspace(), 0);
    assert_eq!(f.host().active_workspace(), 0);
    assert_eq!(f.state.faults().reported(), 1);
    let fault = f.state.faults().last().unwrap();
    assert!(fault.message.contains("refused"));
    assert!(fault.location.contains("control.rs"));
    assert!(f.timer.is_armed());

    f.state.overview.host_mut().activation_fault = None;
    f.frame();
    assert_eq!(f.overview().current_workspace(), 1);
    assert_eq!(f.host().active_workspace(), 1);

    f.end();
    f.settle();
    assert_eq!(f.overview().workspace_switch().current(), UNIT);
    assert!(!f.overview().is_started());
    assert_eq!(f.state.faults().reported(), 1);
    f.assert_quiescent();
}

#[test]
fn crash_on_the_last_frame_does_not_keep_the_session_open() {
    let mut f = Fixture::new(&[1, 1, 1]);
    f.state.overview.host_mut().activation_fault = Some(Fault::Panic);

    f.begin(4);
    f.swipe(-580., 0.);
    f.frames(20);
    f.end();
    f.frames(200);

    // Every frame crashed, down to the one that brought the switch to rest.
    assert_eq!(f.overview().workspace_switch().current(), UNIT);
    assert!(f.overview().is_started());
    assert!(f.timer.is_armed());
    assert_eq!(f.state.faults().reported(), 1);
    let fault = f.state.faults().last().unwrap();
    assert!(fault.message.starts_with("panic: "));
    assert!(fault.location.contains("memory.rs"));

    f.state.overview.host_mut().activation_fault = None;
    f.settle();
    assert!(!f.overview().is_started());
    assert_eq!(f.overview().current_workspace(), 1);
    assert_eq!(f.host().active_workspace(), 1);
    assert_eq!(f.state.faults().reported(), 1);
    f.assert_quiescent();
}
