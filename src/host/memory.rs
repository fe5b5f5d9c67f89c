use std::collections::HashMap;

use anyhow::bail;
use glam::DVec2;
use tracing::{debug, trace};

use super::{
    Host, Inventory, Placement, Stage, Visual, WindowId, WindowInfo, WorkspaceId,
};
use crate::input::Event;
use crate::utils::Rect;

/// Request the overview issued to the desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    AppendWorkspace(WorkspaceId),
    RemoveWorkspace(WorkspaceId),
    ActivateWorkspace(WorkspaceId),
    ActivateWindow(WindowId),
    MinimizeWindow(WindowId),
    CloseWindow(WindowId),
    SafeRestart,
}

/// Failure injected into workspace activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Error,
    Panic,
}

#[derive(Debug)]
struct MemoryWorkspace {
    id: WorkspaceId,
    windows: Vec<WindowInfo>,
}

/// In-memory desktop that records everything drawn on it.
///
/// Requests take effect immediately. The notifications a real desktop would send back for them
/// are collected and handed out through [`Host::take_events`].
#[derive(Debug)]
pub struct MemoryHost {
    output_size: DVec2,
    workspaces: Vec<MemoryWorkspace>,
    active: usize,
    focused: Option<WindowId>,
    next_id: u64,
    clock: u32,
    events: Vec<Event>,

    pub requests: Vec<Request>,
    pub placements: HashMap<Visual, Placement>,
    pub captions: HashMap<WindowId, String>,
    pub alphas: HashMap<Visual, f32>,
    /// Raise and lower calls, newest last.
    pub stacking: Vec<(Visual, bool)>,
    pub stage_visible: bool,
    pub panels_alpha: f32,
    pub panels_visible: bool,
    pub fullscreen: bool,
    /// Makes every workspace activation fail until cleared.
    pub activation_fault: Option<Fault>,
}

impl MemoryHost {
    pub fn new(output_size: DVec2) -> Self {
        Self {
            output_size,
            workspaces: Vec::new(),
            active: 0,
            focused: None,
            next_id: 1,
            clock: 0,
            events: Vec::new(),
            requests: Vec::new(),
            placements: HashMap::new(),
            captions: HashMap::new(),
            alphas: HashMap::new(),
            stacking: Vec::new(),
            stage_visible: false,
            panels_alpha: 1.,
            panels_visible: true,
            fullscreen: false,
            activation_fault: None,
        }
    }

    /// Desktop with one workspace per entry of `windows`, holding that many windows.
    ///
    /// Workspaces get the ids from 1 up in order, windows are numbered after them.
    pub fn with_layout(output_size: DVec2, windows: &[usize]) -> Self {
        let mut host = Self::new(output_size);
        let workspaces: Vec<_> = windows.iter().map(|_| host.add_workspace()).collect();
        for (ws, &count) in workspaces.into_iter().zip(windows) {
            for i in 0..count {
                let step = 40. * i as f64;
                let rect = Rect::new(50. + step, 60. + step, 800., 600.);
                host.add_window(ws, &format!("window {i}"), rect);
            }
        }
        if windows.is_empty() {
            host.add_workspace();
        }
        host
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add_workspace(&mut self) -> WorkspaceId {
        let id = WorkspaceId(self.next_id());
        self.workspaces.push(MemoryWorkspace {
            id,
            windows: Vec::new(),
        });
        id
    }

    pub fn add_window(&mut self, workspace: WorkspaceId, title: &str, geometry: Rect) -> WindowId {
        let id = WindowId(self.next_id());
        self.clock += 1;
        let mut info = WindowInfo::new(id, workspace, geometry);
        info.title = title.to_owned();
        info.user_time = self.clock;
        if let Some(ws) = self.workspaces.iter_mut().find(|ws| ws.id == workspace) {
            ws.windows.push(info);
        }
        id
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut WindowInfo> {
        self.workspaces
            .iter_mut()
            .flat_map(|ws| ws.windows.iter_mut())
            .find(|win| win.id == id)
    }

    pub fn remove_window(&mut self, id: WindowId) -> Option<WindowInfo> {
        for ws in &mut self.workspaces {
            if let Some(idx) = ws.windows.iter().position(|win| win.id == id) {
                if self.focused == Some(id) {
                    self.focused = None;
                }
                return Some(ws.windows.remove(idx));
            }
        }
        None
    }

    pub fn set_focused(&mut self, id: Option<WindowId>) {
        self.focused = id;
    }

    pub fn workspace_id(&self, idx: usize) -> Option<WorkspaceId> {
        self.workspaces.get(idx).map(|ws| ws.id)
    }

    pub fn placement(&self, visual: Visual) -> Option<Placement> {
        self.placements.get(&visual).copied()
    }

    /// Visual raised most recently.
    pub fn top(&self) -> Option<Visual> {
        self.stacking
            .iter()
            .rev()
            .find(|(_, raised)| *raised)
            .map(|(visual, _)| *visual)
    }
}

impl Inventory for MemoryHost {
    fn output_size(&self) -> DVec2 {
        self.output_size
    }

    fn workspaces(&self) -> Vec<WorkspaceId> {
        self.workspaces.iter().map(|ws| ws.id).collect()
    }

    fn active_workspace(&self) -> usize {
        self.active
    }

    fn windows(&self, workspace: WorkspaceId) -> Vec<WindowInfo> {
        self.workspaces
            .iter()
            .find(|ws| ws.id == workspace)
            .map(|ws| ws.windows.clone())
            .unwrap_or_default()
    }

    fn window(&self, id: WindowId) -> Option<WindowInfo> {
        self.workspaces
            .iter()
            .flat_map(|ws| ws.windows.iter())
            .find(|win| win.id == id)
            .cloned()
    }

    fn focused_window(&self) -> Option<WindowId> {
        self.focused
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    fn append_workspace(&mut self) -> WorkspaceId {
        let id = self.add_workspace();
        debug!("appended workspace {id:?}");
        self.requests.push(Request::AppendWorkspace(id));
        id
    }

    fn remove_workspace(&mut self, id: WorkspaceId) {
        self.requests.push(Request::RemoveWorkspace(id));
        let Some(idx) = self.workspaces.iter().position(|ws| ws.id == id) else {
            return;
        };
        if self.workspaces.len() == 1 {
            return;
        }

        // Windows of a removed workspace move to its neighbour.
        let removed = self.workspaces.remove(idx);
        let target = idx.min(self.workspaces.len() - 1);
        let target_id = self.workspaces[target].id;
        self.workspaces[target]
            .windows
            .extend(removed.windows.into_iter().map(|mut win| {
                win.workspace = target_id;
                win
            }));
        if self.active > idx || self.active >= self.workspaces.len() {
            self.active = self.active.saturating_sub(1);
        }
    }

    fn activate_workspace(&mut self, id: WorkspaceId) -> anyhow::Result<()> {
        match self.activation_fault {
            Some(Fault::Error) => bail!("activation of workspace {id:?} refused"),
            Some(Fault::Panic) => panic!("activation of workspace {id:?} crashed"),
            None => (),
        }

        self.requests.push(Request::ActivateWorkspace(id));
        if let Some(idx) = self.workspaces.iter().position(|ws| ws.id == id) {
            if self.active != idx {
                self.active = idx;
                self.events.push(Event::WorkspaceActivated);
            }
        }
        Ok(())
    }

    fn activate_window(&mut self, id: WindowId) {
        self.requests.push(Request::ActivateWindow(id));
        self.clock += 1;
        let clock = self.clock;
        if let Some(win) = self.window_mut(id) {
            win.minimized = false;
            win.user_time = clock;
            self.focused = Some(id);
            self.events.push(Event::WindowChanged { window: id });
        }
    }

    fn minimize_window(&mut self, id: WindowId) {
        self.requests.push(Request::MinimizeWindow(id));
        if let Some(win) = self.window_mut(id) {
            win.minimized = true;
            if self.focused == Some(id) {
                self.focused = None;
            }
            self.events.push(Event::WindowChanged { window: id });
        }
    }

    fn close_window(&mut self, id: WindowId) {
        self.requests.push(Request::CloseWindow(id));
        if let Some(info) = self.remove_window(id) {
            self.events.push(Event::WindowRemoved {
                workspace: info.workspace,
                window: id,
            });
        }
    }
}

impl Stage for MemoryHost {
    fn show(&mut self, visible: bool) {
        debug!("overview stage visible: {visible}");
        self.stage_visible = visible;
    }

    fn place(&mut self, visual: Visual, placement: Placement) {
        trace!("placing {visual:?} at {placement:?}");
        self.placements.insert(visual, placement);
    }

    fn set_alpha(&mut self, visual: Visual, alpha: f32) {
        self.alphas.insert(visual, alpha);
    }

    fn raise(&mut self, visual: Visual) {
        self.stacking.push((visual, true));
    }

    fn lower(&mut self, visual: Visual) {
        self.stacking.push((visual, false));
    }

    fn remove(&mut self, visual: Visual) {
        self.placements.remove(&visual);
        self.alphas.remove(&visual);
        if let Visual::Caption(id) = visual {
            self.captions.remove(&id);
        }
    }

    fn set_caption(&mut self, window: WindowId, text: &str) {
        self.captions.insert(window, text.to_owned());
    }

    fn set_panels_alpha(&mut self, alpha: f32) {
        self.panels_alpha = alpha;
    }

    fn set_panels_visible(&mut self, visible: bool) {
        self.panels_visible = visible;
    }
}

impl Host for MemoryHost {
    fn request_safe_restart(&mut self) {
        debug!("safe restart requested");
        self.requests.push(Request::SafeRestart);
    }

    fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
