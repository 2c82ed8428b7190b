//! State machine types and validation for tasklane.
//!
//! This module formalizes the task lifecycle driven by the compositor:
//!
//! ```text
//!          manager: toplevel(handle)
//!                    │
//!                    ▼
//!             ┌─────────────┐   title / app_id / state
//!             │    Live     │ ◄──────────────────────┐
//!             │ (app_id may │ ───────────────────────┘
//!             │  be empty)  │
//!             └──────┬──────┘
//!                    │ handle: closed
//!                    ▼
//!             ┌─────────────┐
//!             │  Released   │  handle destroyed exactly once,
//!             └─────────────┘  task removed from the taskbar
//! ```
//!
//! Any event that names a released handle is a protocol violation and is
//! recorded rather than applied.

use serde::{Deserialize, Serialize};

/// State transition events that can be traced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "transition", rename_all = "snake_case")]
pub enum TaskTransition {
    /// A toplevel was announced and a task created for it
    TaskCreated { task: String, toplevel: u32 },
    /// The app id of a task was overwritten
    AppIdChanged { task: String, app_id: String },
    /// A state event replaced the task's flags
    StateChanged {
        task: String,
        active: bool,
        minimized: bool,
    },
    /// A request was sent to the compositor for a task
    RequestSent { task: String, request: String },
    /// A task was removed from the taskbar
    TaskClosed { task: String, reason: CloseReason },
}

/// Reason a task was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The compositor sent `closed` for the handle
    ToplevelClosed,
    /// The taskbar itself was torn down
    Shutdown,
}

/// State violations that can be detected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateViolation {
    pub kind: ViolationKind,
    pub description: String,
}

/// Types of state violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Two live tasks are bound to the same toplevel
    DuplicateHandle,
    /// Handle map points at a task that no longer exists
    DanglingHandleEntry,
    /// Live task missing from the handle map
    UnmappedTask,
    /// Render order and task storage disagree
    OrderMismatch,
    /// Task still in the collection after its handle was released
    ReleasedHandleLive,
}
