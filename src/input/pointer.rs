//! Pointer hover and clicks on overview thumbnails.

use tracing::trace;

use crate::animation::UNIT;
use crate::host::{Host, WindowId, WorkspaceId};
use crate::layout::{Dirty, NodeRef, Overview, WindowKey, WorkspaceKey};

const PRIMARY_BUTTON: u32 = 1;
const MIDDLE_BUTTON: u32 = 2;

/// Thumbnail under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Window(WindowId),
    Workspace(WorkspaceId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Enter,
    Leave,
    Press(u32),
    Release(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub target: PointerTarget,
    pub action: PointerAction,
}

impl PointerEvent {
    pub fn new(target: PointerTarget, action: PointerAction) -> Self {
        Self { target, action }
    }
}

impl<H: Host> Overview<H> {
    pub fn on_pointer(&mut self, event: PointerEvent) -> anyhow::Result<()> {
        if !self.is_started() {
            trace!("ignoring pointer event outside of a session: {event:?}");
            return Ok(());
        }

        match event.target {
            PointerTarget::Window(id) => {
                let Some(key) = self.window_key(id) else {
                    return Ok(());
                };
                if !self.window_pointer(key, event.action)? {
                    let workspace = self.windows[key].workspace;
                    self.workspace_pointer(workspace, event.action)?;
                }
            }
            PointerTarget::Workspace(id) => {
                if let Some(key) = self.workspace_key(id) {
                    self.workspace_pointer(key, event.action)?;
                }
            }
        }
        Ok(())
    }

    /// Middle clicks on windows go to the workspace when it can be removed instead.
    fn middle_click_removes_workspace(&self) -> bool {
        self.workspace_overview_enabled && self.order.len() > 1
    }

    /// Returns whether the window consumed the event.
    fn window_pointer(&mut self, key: WindowKey, action: PointerAction) -> anyhow::Result<bool> {
        let win = &mut self.windows[key];
        if win.idle {
            return Ok(false);
        }

        match action {
            PointerAction::Enter => {
                win.hovered = true;
                self.set_window_hover(key, UNIT);
                Ok(false)
            }
            PointerAction::Leave => {
                win.hovered = false;
                win.clicked = false;
                self.set_window_hover(key, 0.);
                Ok(false)
            }
            PointerAction::Press(button) => {
                win.hovered = true;
                let workspace = win.workspace;
                self.set_workspace_hovered(workspace, true);

                let consumed = match button {
                    PRIMARY_BUTTON => true,
                    MIDDLE_BUTTON => !self.middle_click_removes_workspace(),
                    _ => false,
                };
                if consumed {
                    self.windows[key].clicked = true;
                }
                Ok(consumed)
            }
            PointerAction::Release(button) => {
                let was_clicked = std::mem::take(&mut win.clicked);
                if !win.hovered || !was_clicked {
                    return Ok(false);
                }

                match button {
                    PRIMARY_BUTTON => {
                        self.set_window_hover(key, 0.);
                        self.windows[key].activated = true;
                        self.mark_dirty(NodeRef::Window(key), Dirty::PLACEMENT);
                        self.activate_clone(key)?;
                        Ok(true)
                    }
                    MIDDLE_BUTTON if !self.middle_click_removes_workspace() => {
                        self.set_window_hover(key, 0.);
                        let (id, maximized) = {
                            let info = &self.windows[key].info;
                            (info.id, info.maximized)
                        };
                        if maximized {
                            self.note_closed_maximized(id);
                        }
                        self.host.close_window(id);
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            }
        }
    }

    fn set_workspace_hovered(&mut self, key: WorkspaceKey, hovered: bool) {
        if let Some(ws) = self.workspaces.get_mut(key) {
            ws.hovered = hovered;
            self.renew_workspace_hover(key);
        }
    }

    fn workspace_pointer(&mut self, key: WorkspaceKey, action: PointerAction) -> anyhow::Result<()> {
        let Some(ws) = self.workspaces.get_mut(key) else {
            return Ok(());
        };

        match action {
            PointerAction::Enter => {
                ws.hovered = true;
            }
            PointerAction::Leave => {
                ws.hovered = false;
                ws.clicked = false;
            }
            PointerAction::Press(_) => {
                ws.hovered = true;
                ws.clicked = true;
            }
            PointerAction::Release(button) => {
                let was_clicked = std::mem::take(&mut ws.clicked);
                if ws.hovered && was_clicked {
                    match button {
                        PRIMARY_BUTTON => {
                            self.renew_workspace_hover(key);
                            return self.on_workspace_clicked(key);
                        }
                        MIDDLE_BUTTON if self.middle_click_removes_workspace() => {
                            self.renew_workspace_hover(key);
                            return self.remove_workspace(key);
                        }
                        _ => (),
                    }
                }
            }
        }

        self.renew_workspace_hover(key);
        Ok(())
    }
}
