//! Inbound events and their routing.

use tracing::trace;

use crate::host::{Host, WindowId, WorkspaceId};
use crate::layout::Overview;

mod gesture;
mod pointer;

pub use gesture::{GestureController, GestureEvent, GestureState, SwipeTracker};
pub use pointer::{PointerAction, PointerEvent, PointerTarget};

/// Everything the overview reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Gesture(GestureEvent),
    Pointer(PointerEvent),
    WindowAdded {
        workspace: WorkspaceId,
        window: WindowId,
    },
    WindowRemoved {
        workspace: WorkspaceId,
        window: WindowId,
    },
    /// Geometry, minimized or maximized state of a window changed.
    WindowChanged {
        window: WindowId,
    },
    WorkspaceActivated,
    ToggleWindowOverview,
    ToggleWorkspaceOverview,
}

/// Routes one event to the part of the overview that handles it.
pub(crate) fn process_event<H: Host>(
    overview: &mut Overview<H>,
    gestures: &mut GestureController,
    event: Event,
) -> anyhow::Result<()> {
    trace!("processing {event:?}");

    use Event::*;
    match event {
        Gesture(event) => gestures.handle(overview, event),
        Pointer(event) => overview.on_pointer(event),
        WindowAdded { workspace, window } => overview.on_window_added(workspace, window),
        WindowRemoved { workspace, window } => overview.on_window_removed(workspace, window),
        WindowChanged { window } => {
            overview.on_window_changed(window);
            Ok(())
        }
        WorkspaceActivated => overview.on_workspace_activated(),
        ToggleWindowOverview => overview.toggle_window_overview(),
        ToggleWorkspaceOverview => overview.toggle_workspace_overview(),
    }
}
