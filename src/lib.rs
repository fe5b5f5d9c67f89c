//! Touchpad-driven window and workspace overview.
//!
//! Three- and four-finger swipes reveal a grid of the windows of the current workspace, cycle
//! through them, or fold the workspaces into a grid and switch between them. Everything is driven
//! by eased values advanced on a frame timer, see [`animation`], feeding a tree of overview nodes,
//! see [`layout`]. The desktop itself sits behind the traits of [`host`].

pub mod animation;
pub mod cli;
pub mod diagnostics;
pub mod frame_timer;
pub mod host;
pub mod input;
pub mod layout;
pub mod replay;
pub mod state;
pub mod utils;
