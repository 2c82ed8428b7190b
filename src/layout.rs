//! Taskbar layout.
//!
//! Tasks are laid out left to right in a single row. Every task gets the
//! same width:
//!
//! ```text
//! width = min(max_task_width, (W - 2*padding - spacing*(N-1)) / N)
//! x[i]  = padding + i * (width + spacing)
//! ```
//!
//! The layout is a pure function of the task count and the bar geometry;
//! it is recomputed on every read and never cached.

use crate::task::TaskId;
use crate::types::Rect;

/// Smallest width a task is ever given
pub const MIN_TASK_WIDTH: u32 = 1;

/// Fixed bar geometry used for one layout computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarGeometry {
    /// Width available to the taskbar
    pub width: u32,
    /// Panel height
    pub height: u32,
    /// Padding before the first and after the last task
    pub padding_horizontal: u32,
    /// Padding above and below each task
    pub padding_vertical: u32,
    /// Gap between adjacent tasks
    pub spacing: u32,
    /// Upper bound for a task's width (0 = unlimited)
    pub max_task_width: u32,
}

impl Default for BarGeometry {
    fn default() -> Self {
        Self {
            width: 0,
            height: 30,
            padding_horizontal: 2,
            padding_vertical: 2,
            spacing: 2,
            max_task_width: 200,
        }
    }
}

impl BarGeometry {
    /// Height of a task item inside the panel
    pub fn item_height(&self) -> u32 {
        self.height.saturating_sub(self.padding_vertical.saturating_mul(2))
    }
}

/// Per-task width for a given task count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutPlan {
    pub task_width: u32,
    /// The computed width was not positive and was raised to the minimum
    pub clamped: bool,
}

/// Compute the shared task width. Returns `None` when there are no tasks.
pub fn plan(count: usize, geometry: &BarGeometry) -> Option<LayoutPlan> {
    if count == 0 {
        return None;
    }

    let n = count as i64;
    let available = geometry.width as i64
        - 2 * geometry.padding_horizontal as i64
        - (geometry.spacing as i64).saturating_mul(n - 1);
    let mut width = available / n;
    // 0 disables the cap, as the panel's taskbar plugin does
    if geometry.max_task_width > 0 {
        width = width.min(geometry.max_task_width as i64);
    }

    if width < MIN_TASK_WIDTH as i64 {
        return Some(LayoutPlan {
            task_width: MIN_TASK_WIDTH,
            clamped: true,
        });
    }
    Some(LayoutPlan {
        task_width: width as u32,
        clamped: false,
    })
}

/// Rectangle of the task at `index` in render order
pub fn slot_rect(plan: &LayoutPlan, index: usize, geometry: &BarGeometry) -> Rect {
    let stride = plan.task_width as i64 + geometry.spacing as i64;
    let x = (geometry.padding_horizontal as i64).saturating_add((index as i64).saturating_mul(stride));
    Rect::new(
        i32::try_from(x).unwrap_or(i32::MAX),
        i32::try_from(geometry.padding_vertical).unwrap_or(i32::MAX),
        plan.task_width,
        geometry.item_height(),
    )
}

/// Position of one task on the bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSlot {
    pub id: TaskId,
    pub index: usize,
    pub rect: Rect,
}

impl TaskSlot {
    pub fn x_offset(&self) -> i32 {
        self.rect.x
    }

    pub fn width(&self) -> u32 {
        self.rect.width
    }
}

/// Lay out tasks in the given order
pub fn compute_slots(ids: &[TaskId], geometry: &BarGeometry) -> (Vec<TaskSlot>, bool) {
    let Some(plan) = plan(ids.len(), geometry) else {
        return (Vec::new(), false);
    };

    let slots = ids
        .iter()
        .enumerate()
        .map(|(index, &id)| TaskSlot {
            id,
            index,
            rect: slot_rect(&plan, index, geometry),
        })
        .collect();
    (slots, plan.clamped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn geometry(width: u32, padding: u32, spacing: u32, max: u32) -> BarGeometry {
        BarGeometry {
            width,
            height: 30,
            padding_horizontal: padding,
            padding_vertical: 2,
            spacing,
            max_task_width: max,
        }
    }

    fn ids(n: usize) -> Vec<TaskId> {
        let mut map: SlotMap<TaskId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_plan_empty() {
        assert_eq!(plan(0, &geometry(620, 10, 2, 200)), None);
    }

    #[test]
    fn test_plan_three_tasks() {
        let p = plan(3, &geometry(620, 10, 2, 200)).unwrap();
        assert_eq!(p.task_width, 198);
        assert!(!p.clamped);
    }

    #[test]
    fn test_plan_capped_by_max() {
        let p = plan(1, &geometry(620, 10, 2, 200)).unwrap();
        assert_eq!(p.task_width, 200);
    }

    #[test]
    fn test_plan_unlimited_max() {
        let p = plan(1, &geometry(620, 10, 2, 0)).unwrap();
        assert_eq!(p.task_width, 600);
    }

    #[test]
    fn test_plan_tiny_max_is_still_a_cap() {
        let p = plan(1, &geometry(620, 10, 2, 1)).unwrap();
        assert_eq!(p.task_width, 1);
        assert!(!p.clamped);
    }

    #[test]
    fn test_plan_clamps_to_minimum() {
        let p = plan(50, &geometry(40, 10, 2, 200)).unwrap();
        assert_eq!(p.task_width, MIN_TASK_WIDTH);
        assert!(p.clamped);
    }

    #[test]
    fn test_slot_offsets() {
        let g = geometry(620, 10, 2, 200);
        let (slots, clamped) = compute_slots(&ids(3), &g);
        assert!(!clamped);
        let xs: Vec<i32> = slots.iter().map(|s| s.x_offset()).collect();
        assert_eq!(xs, vec![10, 210, 410]);
        assert!(slots.iter().all(|s| s.width() == 198));
        assert!(slots.iter().all(|s| s.rect.y == 2 && s.rect.height == 26));
    }

    #[test]
    fn test_compute_slots_is_pure() {
        let g = geometry(1000, 4, 3, 150);
        let ids = ids(5);
        assert_eq!(compute_slots(&ids, &g), compute_slots(&ids, &g));
    }

    #[test]
    fn test_item_height_saturates() {
        let g = BarGeometry {
            height: 3,
            padding_vertical: 2,
            ..BarGeometry::default()
        };
        assert_eq!(g.item_height(), 0);
    }

    #[test]
    fn test_huge_padding_does_not_overflow() {
        let g = BarGeometry {
            width: 620,
            padding_vertical: 3_000_000_000,
            ..BarGeometry::default()
        };
        assert_eq!(g.item_height(), 0);

        let (slots, clamped) = compute_slots(&ids(2), &g);
        assert!(!clamped);
        assert_eq!(slots[0].rect.y, i32::MAX);
        assert_eq!(slots[0].rect.height, 0);
    }
}
