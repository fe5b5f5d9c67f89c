//! Boundary between the overview and the desktop it runs on.
//!
//! The overview never owns windows or workspaces. It reads them through [`Inventory`], asks for
//! changes through [`Inventory`]'s intent methods, and draws through [`Stage`].

use glam::DVec2;

use crate::input::Event;
use crate::utils::Rect;

mod memory;

pub use memory::{Fault, MemoryHost, Request};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkspaceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

/// Snapshot of a desktop window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub id: WindowId,
    pub workspace: WorkspaceId,
    pub title: String,
    /// Frame of the window on its workspace.
    pub geometry: Rect,
    /// Where the window goes when minimized, usually its taskbar button.
    pub icon_geometry: Option<Rect>,
    pub minimized: bool,
    /// Maximized on both axes, or fullscreen.
    pub maximized: bool,
    /// Normal application window, as opposed to docks, desktop icons and popups.
    pub interesting: bool,
    pub always_on_top: bool,
    pub can_minimize: bool,
    /// Timestamp of the last user interaction, used for recency ordering.
    pub user_time: u32,
}

impl WindowInfo {
    pub fn new(id: WindowId, workspace: WorkspaceId, geometry: Rect) -> Self {
        Self {
            id,
            workspace,
            title: String::new(),
            geometry,
            icon_geometry: None,
            minimized: false,
            maximized: false,
            interesting: true,
            always_on_top: false,
            can_minimize: true,
            user_time: 0,
        }
    }
}

/// Read access to the desktop, plus the requests the overview may issue.
pub trait Inventory {
    /// Size of the primary output in logical pixels.
    fn output_size(&self) -> DVec2;
    fn workspaces(&self) -> Vec<WorkspaceId>;
    fn active_workspace(&self) -> usize;
    /// Windows of a workspace, in stacking order from bottom to top.
    fn windows(&self, workspace: WorkspaceId) -> Vec<WindowInfo>;
    fn window(&self, id: WindowId) -> Option<WindowInfo>;
    fn focused_window(&self) -> Option<WindowId>;
    /// Whether a fullscreen window covers the output.
    fn is_fullscreen(&self) -> bool {
        false
    }

    fn append_workspace(&mut self) -> WorkspaceId;
    fn remove_workspace(&mut self, id: WorkspaceId);
    /// Switches the desktop to a workspace. The desktop may refuse.
    fn activate_workspace(&mut self, id: WorkspaceId) -> anyhow::Result<()>;
    fn activate_window(&mut self, id: WindowId);
    fn minimize_window(&mut self, id: WindowId);
    fn close_window(&mut self, id: WindowId);
}

/// Things the overview draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visual {
    /// Background behind all workspaces.
    Backdrop,
    Workspace(WorkspaceId),
    /// Darkening gradient over a workspace while windows are revealed.
    WorkspaceShade(WorkspaceId),
    WorkspaceCaptions(WorkspaceId),
    /// "No windows" label of an empty workspace.
    EmptyLabel(WorkspaceId),
    Window(WindowId),
    Caption(WindowId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: DVec2,
    pub scale: f64,
    pub alpha: f32,
}

impl Placement {
    pub fn new(position: DVec2, scale: f64, alpha: f32) -> Self {
        Self {
            position,
            scale,
            alpha,
        }
    }
}

/// Presentation surface of the overview.
pub trait Stage {
    /// Shows or hides the overview stage. The real windows are hidden while it is shown.
    fn show(&mut self, visible: bool);
    fn place(&mut self, visual: Visual, placement: Placement);
    fn set_alpha(&mut self, visual: Visual, alpha: f32);
    fn raise(&mut self, visual: Visual);
    fn lower(&mut self, visual: Visual);
    fn remove(&mut self, _visual: Visual) {}
    /// Text shown in the caption under a window thumbnail.
    fn set_caption(&mut self, _window: WindowId, _text: &str) {}
    fn set_panels_alpha(&mut self, alpha: f32);
    fn set_panels_visible(&mut self, visible: bool);
}

pub trait Host: Inventory + Stage {
    /// Asks the surrounding shell to restart in a safe way. Used by the gesture watchdog.
    fn request_safe_restart(&mut self) {}

    /// Desktop notifications that became pending while handling requests.
    ///
    /// Hosts that deliver notifications through their own channel return nothing here.
    fn take_events(&mut self) -> Vec<Event> {
        Vec::new()
    }
}
