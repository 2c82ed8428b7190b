//! tasklane - taskbar core for wlroots-based Wayland compositors.
//!
//! Tracks open windows through `zwlr_foreign_toplevel_manager_v1` and lays
//! them out as equally sized tasks on a panel. Painting is left to the
//! embedding panel, which reads [`Taskbar`] and sends clicks back as
//! activate / toggle-minimize requests.

pub mod client;
pub mod config;
pub mod icon;
pub mod layout;
pub mod registry;
pub mod state;
pub mod task;
pub mod taskbar;
pub mod toplevel;
pub mod tracing;
pub mod types;

pub use icon::{IconConfig, IconLookup, IconResolver};
pub use layout::{BarGeometry, TaskSlot};
pub use task::{EventOutcome, RequestOutcome, Task, TaskId, TaskRequest};
pub use taskbar::{Diagnostics, Redraw, Taskbar};
pub use toplevel::{StateFlags, ToplevelEvent, ToplevelHandle};
