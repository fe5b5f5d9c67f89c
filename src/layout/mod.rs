//! Overview layout.
//!
//! The overview is a tree of three kinds of nodes, all owned by [`Overview`]:
//!
//! * the overview itself, which owns the reveal, workspace switch and window switch values,
//! * one [`Workspace`] per desktop workspace, laid out on a horizontal strip that folds into a
//!   grid as the workspace overview is revealed,
//! * one [`Window`] per window of a loaded workspace, folding from its real position into a grid
//!   cell as the window overview is revealed.
//!
//! Nodes refer to each other through arena keys. Whenever one of their animated values moves, or
//! something they depend on changes, nodes set [`Dirty`] flags and get queued on the [`Ticker`].
//! Every frame the ticker advances the values, then the dirty nodes are recomputed, controller
//! first, then workspaces, then windows, and push their placements to the [`Stage`].
//!
//! [`Stage`]: crate::host::Stage

use std::collections::HashSet;
use std::rc::Rc;

use bitflags::bitflags;
use slotmap::{new_key_type, SlotMap};
use tracing::trace;

use crate::animation::{
    AnyValue, Clock, CyclicKey, EasedValue, Priority, SwitchDirection, Ticker, ValueChange,
    ValueKey, UNIT,
};
use crate::frame_timer::FrameTimer;
use crate::host::{Host, WindowId, WorkspaceId};

pub mod carousel;
mod control;
pub mod grid;
mod options;
mod recompute;
mod window;
mod workspace;

#[cfg(test)]
mod tests;

pub use self::options::{switch_goals, FleeBand, Options};
pub use self::window::Window;
pub use self::workspace::Workspace;

new_key_type! {
    pub struct WorkspaceKey;
    pub struct WindowKey;
}

bitflags! {
    /// Aspects of a node that need recomputation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Dirty: u32 {
        const WINDOW_REVEAL = 1;
        const WORKSPACE_REVEAL = 1 << 1;
        const WORKSPACE_SWITCH = 1 << 2;
        const FINE_CONTROL = 1 << 3;
        const LAYOUT = 1 << 5;
        const WINDOW_SWITCH = 1 << 6;
        const HOVER = 1 << 7;
        const PLACEMENT = 1 << 8;
        const RETAIN_COUNT = 1 << 9;
        const MINIMIZE = 1 << 10;
    }
}

/// Reference to a node of the overview tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Overview,
    Workspace(WorkspaceKey),
    Window(WindowKey),
}

impl NodeRef {
    pub fn priority(self) -> Priority {
        match self {
            NodeRef::Overview => Priority::Controller,
            NodeRef::Workspace(_) => Priority::Workspace,
            NodeRef::Window(_) => Priority::Window,
        }
    }
}

/// Node to notify when a value moves, and what to mark on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub node: NodeRef,
    pub dirty: Dirty,
}

impl Owner {
    pub fn new(node: NodeRef, dirty: Dirty) -> Self {
        Self { node, dirty }
    }
}

/// Resting position a reveal returns to when the fingers are lifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lock {
    Up,
    #[default]
    Down,
}

impl Lock {
    pub fn target(self) -> f64 {
        match self {
            Lock::Up => UNIT,
            Lock::Down => 0.,
        }
    }
}

pub type OverviewTicker = Ticker<Owner, NodeRef>;

/// The overview controller and its node tree.
pub struct Overview<H: Host> {
    pub(crate) host: H,
    pub(crate) options: Rc<Options>,
    pub(crate) ticker: OverviewTicker,

    pub(crate) workspaces: SlotMap<WorkspaceKey, Workspace>,
    pub(crate) windows: SlotMap<WindowKey, Window>,
    /// Workspace nodes in desktop order.
    pub(crate) order: Vec<WorkspaceKey>,

    pub(crate) started: bool,
    pub(crate) dirty: Dirty,

    pub(crate) window_reveal: ValueKey,
    pub(crate) workspace_reveal: ValueKey,
    pub(crate) workspace_switch: ValueKey,
    pub(crate) window_switch: CyclicKey,

    pub(crate) window_lock: Lock,
    pub(crate) workspace_lock: Lock,
    pub(crate) switch_direction: SwitchDirection,
    pub(crate) fine_controlled: bool,

    /// Index of the active workspace.
    pub(crate) current: usize,
    /// Horizontal offset of the workspace strip in pixels.
    pub(crate) switch_offset: f64,
    pub(crate) all_loaded: bool,
    pub(crate) load_threshold: Option<f64>,
    pub(crate) workspace_overview_enabled: bool,
    pub(crate) pending_carry: i64,
    pub(crate) should_window_switch: bool,

    pub(crate) focus: Option<WindowKey>,
    /// Windows whose minimize animation holds the session open.
    pub(crate) retained: u32,
    pub(crate) panels_enabled: bool,
    /// Windows closed from the overview while maximized.
    pub(crate) closed_maximized: HashSet<WindowId>,
}

impl<H: Host> Overview<H> {
    pub fn new(
        host: H,
        options: Rc<Options>,
        clock: Clock,
        timer: Box<dyn FrameTimer>,
    ) -> anyhow::Result<Self> {
        let mut ticker = Ticker::new(clock, options.frame_rate, timer);

        let workspace_count = host.workspaces().len();
        let current = host.active_workspace();

        let owner = |dirty| Owner::new(NodeRef::Overview, dirty);
        let window_reveal = ticker.insert(options.reveal()?, owner(Dirty::WINDOW_REVEAL));
        let workspace_reveal = ticker.insert(options.reveal()?, owner(Dirty::WORKSPACE_REVEAL));
        let mut switch = options.workspace_switch(workspace_count)?;
        switch.jump_to(current as f64 * UNIT);
        let workspace_switch = ticker.insert(switch, owner(Dirty::WORKSPACE_SWITCH));
        let window_switch = ticker.insert_cyclic(options.window_switch()?, owner(Dirty::WINDOW_SWITCH));

        Ok(Self {
            host,
            options,
            ticker,
            workspaces: SlotMap::with_key(),
            windows: SlotMap::with_key(),
            order: Vec::new(),
            started: false,
            dirty: Dirty::empty(),
            window_reveal,
            workspace_reveal,
            workspace_switch,
            window_switch,
            window_lock: Lock::Down,
            workspace_lock: Lock::Down,
            switch_direction: SwitchDirection::Still,
            fine_controlled: false,
            current,
            switch_offset: 0.,
            all_loaded: false,
            load_threshold: None,
            workspace_overview_enabled: false,
            pending_carry: 0,
            should_window_switch: false,
            focus: None,
            retained: 0,
            panels_enabled: true,
            closed_maximized: HashSet::new(),
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn clock(&self) -> &Clock {
        self.ticker.clock()
    }

    pub fn ticker(&self) -> &OverviewTicker {
        &self.ticker
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_fine_controlled(&self) -> bool {
        self.fine_controlled
    }

    /// Whether anything is still moving or waiting for recomputation.
    pub fn is_animating(&self) -> bool {
        self.ticker.is_armed()
    }

    pub fn window_reveal(&self) -> &EasedValue {
        self.value(self.window_reveal)
    }

    pub fn workspace_reveal(&self) -> &EasedValue {
        self.value(self.workspace_reveal)
    }

    pub fn workspace_switch(&self) -> &EasedValue {
        self.value(self.workspace_switch)
    }

    pub fn window_switch_phase(&self) -> f64 {
        self.ticker
            .get_cyclic(self.window_switch)
            .map_or(0., |value| value.current())
    }

    fn value(&self, key: ValueKey) -> &EasedValue {
        // Controller values live as long as the overview.
        match self.ticker.get(key) {
            Some(value) => value,
            None => unreachable!("controller value was removed"),
        }
    }

    pub fn window_lock(&self) -> Lock {
        self.window_lock
    }

    pub fn workspace_lock(&self) -> Lock {
        self.workspace_lock
    }

    pub fn current_workspace(&self) -> usize {
        self.current
    }

    pub fn workspace_count(&self) -> usize {
        self.order.len()
    }

    pub fn is_workspace_overview_enabled(&self) -> bool {
        self.workspace_overview_enabled
    }

    pub fn retained(&self) -> u32 {
        self.retained
    }

    pub fn switch_offset(&self) -> f64 {
        self.switch_offset
    }

    pub fn workspace_key(&self, id: WorkspaceId) -> Option<WorkspaceKey> {
        self.order
            .iter()
            .copied()
            .find(|&key| self.workspaces[key].id == id)
    }

    pub fn workspace_index(&self, key: WorkspaceKey) -> Option<usize> {
        self.order.iter().position(|&k| k == key)
    }

    pub fn workspace(&self, key: WorkspaceKey) -> Option<&Workspace> {
        self.workspaces.get(key)
    }

    pub fn workspace_at(&self, idx: usize) -> Option<&Workspace> {
        self.order.get(idx).map(|&key| &self.workspaces[key])
    }

    pub fn window_key(&self, id: WindowId) -> Option<WindowKey> {
        self.windows
            .iter()
            .find(|(_, win)| win.info.id == id)
            .map(|(key, _)| key)
    }

    pub fn window(&self, key: WindowKey) -> Option<&Window> {
        self.windows.get(key)
    }

    pub fn focus_window(&self) -> Option<WindowId> {
        self.focus
            .and_then(|key| self.windows.get(key))
            .map(|win| win.info.id)
    }

    /// Width of one workspace on the switch strip, margin included.
    pub(crate) fn strip_step(&self) -> f64 {
        self.host.output_size().x + self.options.workspace_margin
    }

    fn dirty_slot(&mut self, node: NodeRef) -> Option<&mut Dirty> {
        match node {
            NodeRef::Overview => Some(&mut self.dirty),
            NodeRef::Workspace(key) => self.workspaces.get_mut(key).map(|ws| &mut ws.dirty),
            NodeRef::Window(key) => self.windows.get_mut(key).map(|win| &mut win.dirty),
        }
    }

    /// Sets `flags` on `node`, queueing it if it was clean.
    pub(crate) fn mark_dirty(&mut self, node: NodeRef, flags: Dirty) {
        if flags.is_empty() {
            return;
        }
        let Some(slot) = self.dirty_slot(node) else {
            return;
        };
        if slot.contains(flags) {
            return;
        }
        let was_clean = slot.is_empty();
        slot.insert(flags);
        if was_clean {
            self.ticker.mark_dirty(node.priority(), node);
        }
    }

    pub(crate) fn mark_all_workspaces(&mut self, flags: Dirty) {
        for idx in 0..self.order.len() {
            self.mark_dirty(NodeRef::Workspace(self.order[idx]), flags);
        }
    }

    pub(crate) fn mark_loaded_workspaces(&mut self, flags: Dirty) {
        for idx in 0..self.order.len() {
            let key = self.order[idx];
            if self.workspaces[key].loaded {
                self.mark_dirty(NodeRef::Workspace(key), flags);
            }
        }
    }

    /// Advances all values to the current time and recomputes dirty nodes.
    pub fn on_frame(&mut self) -> anyhow::Result<()> {
        let now = self.ticker.clock().now();
        let changes = self.ticker.advance(now);
        let res = self.drain(changes);
        self.ticker.finish_tick();
        res
    }

    fn drain(&mut self, changes: Vec<ValueChange<Owner>>) -> anyhow::Result<()> {
        for change in changes {
            if let AnyValue::Cyclic(_) = change.value {
                self.pending_carry += change.carry;
            }
            self.mark_dirty(change.owner.node, change.owner.dirty);
        }

        for priority in Priority::ALL {
            let mut nodes = self.ticker.take_dirty(priority).into_iter();
            let mut still_dirty = Vec::new();
            let mut res = Ok(());
            for node in nodes.by_ref() {
                match self.recompute(node) {
                    Ok(true) => still_dirty.push(node),
                    Ok(false) => (),
                    Err(err) => {
                        still_dirty.push(node);
                        res = Err(err);
                        break;
                    }
                }
            }
            still_dirty.extend(nodes);
            self.ticker.requeue_dirty(priority, still_dirty);
            res?;
        }

        Ok(())
    }

    fn recompute(&mut self, node: NodeRef) -> anyhow::Result<bool> {
        trace!("recomputing {node:?}");
        match node {
            NodeRef::Overview => self.recompute_overview(),
            NodeRef::Workspace(key) => Ok(self.recompute_workspace(key)),
            NodeRef::Window(key) => Ok(self.recompute_window(key)),
        }
    }

    /// Puts the scheduler back into a usable state after a frame failed halfway.
    ///
    /// A panic may have swallowed the flags of the node it hit, so a started overview always
    /// follows its values once more on the next frame.
    pub fn recover_from_failed_frame(&mut self) {
        if self.ticker.in_tick() {
            self.ticker.finish_tick();
        }
        if self.started {
            self.dirty |= Dirty::WINDOW_REVEAL | Dirty::WORKSPACE_REVEAL | Dirty::WORKSPACE_SWITCH;
        }

        let mut nodes = Vec::new();
        if !self.dirty.is_empty() {
            nodes.push(NodeRef::Overview);
        }
        nodes.extend(
            self.workspaces
                .iter()
                .filter(|(_, ws)| !ws.dirty.is_empty())
                .map(|(key, _)| NodeRef::Workspace(key)),
        );
        nodes.extend(
            self.windows
                .iter()
                .filter(|(_, win)| !win.dirty.is_empty())
                .map(|(key, _)| NodeRef::Window(key)),
        );
        for node in nodes {
            self.ticker.requeue_dirty(node.priority(), vec![node]);
        }
    }
}
