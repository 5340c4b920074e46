//! Terminal User Interface module.
//!
//! A single tree panel over the hierarchy, a status bar, and a title dialog
//! for creating and renaming nodes. Server requests run on background tasks
//! and come back through the `AppEvent` channel.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Background task event processing
//! - `render` - Layout and dialog overlay
//! - `helpers` - Request spawning and panic capture
//! - `tree_view` - Hierarchy panel widget
//! - `status` - Status bar widget

mod events;
mod helpers;
mod input;
mod loop_runner;
mod render;
mod status;
mod tree_view;

pub use loop_runner::{run, Action};
