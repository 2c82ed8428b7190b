//! Shared types used across multiple modules.
//!
//! This module contains geometry and snapshot types so that the layout,
//! taskbar and binary can exchange data without depending on each other.

use serde::{Deserialize, Serialize};

/// A rectangle representing geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// X coordinate one past the right edge
    pub fn right(&self) -> i32 {
        self.x.saturating_add(i32::try_from(self.width).unwrap_or(i32::MAX))
    }

    /// Whether a horizontal coordinate falls inside this rectangle
    pub fn contains_x(&self, x: i32) -> bool {
        x >= self.x && x < self.right()
    }
}

/// Serializable rectangle for snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectSnapshot {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl From<Rect> for RectSnapshot {
    fn from(r: Rect) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

/// Read-copy of the whole taskbar, safe to hand to another thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskbarSnapshot {
    pub available_width: u32,
    pub task_count: usize,
    pub seat_bound: bool,
    pub tasks: Vec<TaskSnapshot>,
}

/// Snapshot of a single task in render order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: String,
    pub toplevel: u32,
    pub app_id: String,
    pub title: String,
    pub active: bool,
    pub minimized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<String>,
    pub slot: RectSnapshot,
}
