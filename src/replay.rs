//! Headless replay of recorded gesture scripts.
//!
//! A script is a text file with one command per line:
//!
//! ```text
//! # three workspaces holding two, one and no windows
//! desktop 2 1 0
//! gesture 0 3 0 0        # wire tuple: type, fingers, dx, dy
//! wait 16
//! gesture 2 3 0 -0.05
//! gesture 1 3 0 0
//! toggle workspace
//! click window 2
//! click workspace 1
//! ```
//!
//! `wait` delays every following command by the given number of milliseconds. Commands run on a
//! calloop event loop next to the real frame timer, so the replay animates in real time.

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, ensure, Context};
use calloop::timer::{TimeoutAction, Timer};
use calloop::EventLoop;
use glam::DVec2;
use swipeview_config::Config;
use tracing::{debug, info, warn};

use crate::animation::Clock;
use crate::frame_timer::LoopTimer;
use crate::host::{Inventory, MemoryHost, Request, WindowId, WorkspaceId};
use crate::input::{Event, GestureEvent, PointerAction, PointerEvent, PointerTarget};
use crate::state::State;

/// Interval of the keep-alive poll that also checks the gesture watchdog.
const KEEP_ALIVE: Duration = Duration::from_secs(5);
/// How long the overview may keep animating after the last command.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

const OUTPUT_SIZE: DVec2 = DVec2::new(1920., 1080.);

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub at: Duration,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    /// Number of windows on each workspace of the simulated desktop.
    pub desktop: Vec<usize>,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("error reading {path:?}"))?;
        Self::parse(&text).with_context(|| format!("error parsing {path:?}"))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let mut desktop = None;
        let mut steps = Vec::new();
        let mut at = Duration::ZERO;

        for (idx, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let parse_line = || -> anyhow::Result<Command> {
                let words: Vec<_> = line.split_whitespace().collect();
                parse_command(&words)
            };
            let command = parse_line().with_context(|| format!("line {}: {line:?}", idx + 1))?;

            match command {
                Command::Desktop(layout) => {
                    ensure!(
                        desktop.is_none() && steps.is_empty(),
                        "line {}: desktop must come first and only once",
                        idx + 1
                    );
                    desktop = Some(layout);
                }
                Command::Wait(delay) => at += delay,
                Command::Events(events) => {
                    steps.extend(events.into_iter().map(|event| Step { at, event }));
                }
                Command::Skip => (),
            }
        }

        Ok(Self {
            desktop: desktop.unwrap_or_else(|| vec![1]),
            steps,
        })
    }

    /// Time of the last command.
    pub fn duration(&self) -> Duration {
        self.steps.last().map_or(Duration::ZERO, |step| step.at)
    }
}

enum Command {
    Desktop(Vec<usize>),
    Wait(Duration),
    Events(Vec<Event>),
    /// Valid line with nothing to replay, like a pinch.
    Skip,
}

fn parse_command(words: &[&str]) -> anyhow::Result<Command> {
    let command = match words {
        ["desktop", counts @ ..] => {
            ensure!(!counts.is_empty(), "desktop needs at least one workspace");
            let counts = counts
                .iter()
                .map(|count| count.parse().context("invalid window count"))
                .collect::<anyhow::Result<_>>()?;
            Command::Desktop(counts)
        }
        ["wait", ms] => Command::Wait(Duration::from_millis(
            ms.parse().context("invalid wait duration")?,
        )),
        ["gesture", kind, fingers, dx, dy] => {
            let kind = kind.parse().context("invalid gesture type")?;
            let fingers = fingers.parse().context("invalid finger count")?;
            let dx = dx.parse().context("invalid dx")?;
            let dy = dy.parse().context("invalid dy")?;
            match GestureEvent::from_wire(kind, fingers, dx, dy) {
                Some(event) => Command::Events(vec![Event::Gesture(event)]),
                None => Command::Skip,
            }
        }
        ["toggle", "window"] => Command::Events(vec![Event::ToggleWindowOverview]),
        ["toggle", "workspace"] => Command::Events(vec![Event::ToggleWorkspaceOverview]),
        ["click", kind, id] => {
            let id = id.parse().context("invalid click target")?;
            let target = match *kind {
                "window" => PointerTarget::Window(WindowId(id)),
                // Workspaces of the replay desktop are numbered from 1 in order.
                "workspace" => PointerTarget::Workspace(WorkspaceId(id + 1)),
                other => bail!("unknown click target {other:?}"),
            };
            Command::Events(click(target))
        }
        [] => Command::Skip,
        [other, ..] => bail!("unknown command {other:?}"),
    };
    Ok(command)
}

fn click(target: PointerTarget) -> Vec<Event> {
    [
        PointerAction::Enter,
        PointerAction::Press(1),
        PointerAction::Release(1),
    ]
    .into_iter()
    .map(|action| Event::Pointer(PointerEvent::new(target, action)))
    .collect()
}

/// What happened during a replay.
#[derive(Debug, Default)]
pub struct Summary {
    pub events: usize,
    pub faults: usize,
    pub requests: Vec<Request>,
    pub workspaces: usize,
    pub active_workspace: usize,
    pub settled: bool,
}

struct Replay {
    state: State<MemoryHost>,
    remaining: usize,
    dispatched: usize,
}

fn on_frame(replay: &mut Replay) {
    replay.state.on_frame();
}

/// Replays a script against an in-memory desktop until the overview settles.
pub fn run(script: Script, config: &Config) -> anyhow::Result<Summary> {
    let mut event_loop: EventLoop<'static, Replay> =
        EventLoop::try_new().context("error creating event loop")?;
    let handle = event_loop.handle();

    let duration = script.duration();
    let host = desktop(&script.desktop);
    let timer = LoopTimer::new(handle.clone(), on_frame);
    let state = State::new(host, config, Clock::default(), Box::new(timer))?;

    let mut replay = Replay {
        state,
        remaining: script.steps.len(),
        dispatched: 0,
    };

    let mut steps = VecDeque::from(script.steps);
    while let Some(Step { at, event }) = steps.pop_front() {
        // Steps sharing a timestamp run from a single timer, in order.
        let mut batch = vec![event];
        while steps.front().is_some_and(|next| next.at == at) {
            if let Some(step) = steps.pop_front() {
                batch.push(step.event);
            }
        }

        let mut batch = Some(batch);
        handle
            .insert_source(Timer::from_duration(at), move |_, _, replay| {
                for event in batch.take().unwrap_or_default() {
                    debug!("replaying {event:?}");
                    replay.state.handle_event(event);
                    replay.remaining -= 1;
                    replay.dispatched += 1;
                }
                TimeoutAction::Drop
            })
            .map_err(|err| err.error)
            .context("error scheduling script step")?;
    }

    handle
        .insert_source(Timer::from_duration(KEEP_ALIVE), |_, _, replay| {
            replay.state.poll_watchdog();
            TimeoutAction::ToDuration(KEEP_ALIVE)
        })
        .map_err(|err| err.error)
        .context("error inserting keep-alive timer")?;

    let deadline = replay.state.overview.clock().now() + duration + SETTLE_TIMEOUT;
    let signal = event_loop.get_signal();
    let mut settled = false;
    event_loop
        .run(Some(Duration::from_millis(100)), &mut replay, |replay| {
            let overview = &replay.state.overview;
            if replay.remaining == 0 && !overview.is_animating() && !overview.is_started() {
                settled = true;
                signal.stop();
            } else if overview.clock().now() > deadline {
                warn!("overview did not settle before the deadline");
                signal.stop();
            }
        })
        .context("error running event loop")?;

    let host = replay.state.overview.host();
    let summary = Summary {
        events: replay.dispatched,
        faults: replay.state.faults().reported(),
        requests: host.requests.clone(),
        workspaces: host.workspaces().len(),
        active_workspace: host.active_workspace(),
        settled,
    };
    info!(
        "replayed {} events, {} faults, {} desktop requests",
        summary.events,
        summary.faults,
        summary.requests.len()
    );
    Ok(summary)
}

fn desktop(layout: &[usize]) -> MemoryHost {
    let mut host = MemoryHost::with_layout(OUTPUT_SIZE, layout);
    let first = host
        .workspace_id(0)
        .and_then(|ws| host.windows(ws).last().map(|win| win.id));
    host.set_focused(first);
    host
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_script() {
        let script = Script::parse(
            "
            # comment
            desktop 2 0
            gesture 0 3 0 0
            wait 16
            gesture 2 3 0.5 -1 # trailing comment
            gesture 4 2 0 0
            wait 4
            toggle window
            click window 2
            ",
        )
        .unwrap();

        assert_eq!(script.desktop, [2, 0]);
        assert_eq!(script.steps.len(), 6);
        assert_eq!(script.steps[0].at, Duration::ZERO);
        assert_eq!(
            script.steps[1],
            Step {
                at: Duration::from_millis(16),
                event: Event::Gesture(GestureEvent::Update { dx: 0.5, dy: -1. }),
            }
        );
        assert_eq!(script.steps[2].event, Event::ToggleWindowOverview);
        assert_eq!(
            script.steps[5].event,
            Event::Pointer(PointerEvent::new(
                PointerTarget::Window(WindowId(2)),
                PointerAction::Release(1)
            ))
        );
        assert_eq!(script.duration(), Duration::from_millis(20));
    }

    #[test]
    fn default_desktop() {
        let script = Script::parse("toggle workspace").unwrap();
        assert_eq!(script.desktop, [1]);
    }

    #[test]
    fn parse_errors_name_the_line() {
        let err = Script::parse("wait 1\nfrobnicate").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));

        assert!(Script::parse("wait soon").is_err());
        assert!(Script::parse("gesture 0 3 0").is_err());
        assert!(Script::parse("toggle window\ndesktop 1").is_err());
        assert!(Script::parse("click door 1").is_err());
        assert!(Script::parse("desktop").is_err());
    }

    #[test]
    fn workspace_clicks_use_desktop_ids() {
        let script = Script::parse("desktop 1 1\nclick workspace 1").unwrap();
        let host = desktop(&script.desktop);
        let Event::Pointer(event) = &script.steps[0].event else {
            panic!("expected a pointer event");
        };
        let id = host.workspace_id(1).unwrap();
        assert_eq!(event.target, PointerTarget::Workspace(id));
    }

    #[test]
    fn replay_settles() {
        let script = Script::parse(
            "
            desktop 2 1
            toggle window
            wait 300
            toggle window
            ",
        )
        .unwrap();

        let summary = run(script, &Config::default()).unwrap();
        assert!(summary.settled);
        assert_eq!(summary.events, 2);
        assert_eq!(summary.faults, 0);
        assert_eq!(summary.workspaces, 2);
    }
}
