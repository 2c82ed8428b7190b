//! The taskbar: ordered registry of live tasks.
//!
//! The taskbar is the only owner of tasks. It creates one when the manager
//! announces a toplevel, routes handle events to it by protocol id, and
//! drops it exactly once when the handle closes. Render order is insertion
//! order; attribute changes never reorder tasks.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};
use slotmap::SlotMap;

use crate::icon::IconLookup;
use crate::layout::{self, BarGeometry, TaskSlot};
use crate::state::{CloseReason, StateViolation, TaskTransition, ViolationKind};
use crate::task::{apply_event, EventOutcome, RequestOutcome, Task, TaskId};
use crate::toplevel::{ToplevelEvent, ToplevelHandle};
use crate::tracing::{EventLogEntry, EventTracer};
use crate::types::{TaskSnapshot, TaskbarSnapshot};

/// What the renderer needs to repaint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redraw {
    /// Tasks were added or removed, or the geometry changed
    Layout,
    /// One task's attributes changed; positions are unaffected
    Task(TaskId),
}

pub type RedrawCallback = Box<dyn FnMut(Redraw)>;

/// Number of one-shot warnings emitted so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Activation attempted without a seat
    pub no_seat: u32,
    /// Layout entered the clamped state
    pub width_clamped: u32,
}

pub struct Taskbar<H: ToplevelHandle> {
    tasks: SlotMap<TaskId, Task<H>>,
    /// Render order
    order: Vec<TaskId>,
    /// Protocol id of the bound toplevel -> task
    by_handle: HashMap<u32, TaskId>,
    seat: Option<H::Seat>,
    geometry: BarGeometry,
    icons: IconLookup,
    tracer: EventTracer,
    redraw: Option<RedrawCallback>,
    warned_no_seat: bool,
    /// Set while the layout is clamped, so the warning fires once per entry
    geometry_warned: Cell<bool>,
    diagnostics: Cell<Diagnostics>,
}

impl<H: ToplevelHandle> Taskbar<H> {
    pub fn new(geometry: BarGeometry, icons: IconLookup) -> Self {
        Self {
            tasks: SlotMap::with_key(),
            order: Vec::new(),
            by_handle: HashMap::new(),
            seat: None,
            geometry,
            icons,
            tracer: EventTracer::new(),
            redraw: None,
            warned_no_seat: false,
            geometry_warned: Cell::new(false),
            diagnostics: Cell::new(Diagnostics::default()),
        }
    }

    // ------------------------------------------------------------------
    // Collaborators
    // ------------------------------------------------------------------

    /// Bind or drop the seat used for activation. Returns the previous seat
    /// so the caller can release it.
    pub fn set_seat(&mut self, seat: Option<H::Seat>) -> Option<H::Seat> {
        match (&self.seat, &seat) {
            (None, Some(_)) => log::info!("Seat bound, activation enabled"),
            (Some(_), None) => log::warn!("Seat removed, activation disabled"),
            _ => {}
        }
        std::mem::replace(&mut self.seat, seat)
    }

    pub fn has_seat(&self) -> bool {
        self.seat.is_some()
    }

    /// Register the renderer's repaint hook
    pub fn set_redraw_callback(&mut self, callback: impl FnMut(Redraw) + 'static) {
        self.redraw = Some(Box::new(callback));
    }

    fn notify(&mut self, redraw: Redraw) {
        if let Some(callback) = self.redraw.as_mut() {
            callback(redraw);
        }
    }

    pub fn geometry(&self) -> &BarGeometry {
        &self.geometry
    }

    pub fn set_geometry(&mut self, geometry: BarGeometry) {
        if self.geometry != geometry {
            self.geometry = geometry;
            self.notify(Redraw::Layout);
        }
    }

    /// Update the width handed to the taskbar by the panel
    pub fn set_available_width(&mut self, width: u32) {
        if self.geometry.width != width {
            log::debug!("Available width {} -> {}", self.geometry.width, width);
            self.geometry.width = width;
            self.notify(Redraw::Layout);
        }
    }

    // ------------------------------------------------------------------
    // Manager and handle events
    // ------------------------------------------------------------------

    /// A new toplevel was announced by the manager
    pub fn on_toplevel_announced(&mut self, handle: H) -> TaskId {
        let toplevel = handle.protocol_id();
        self.tracer.trace_protocol_event("toplevel", Some(toplevel), "");

        if let Some(&existing) = self.by_handle.get(&toplevel) {
            log::warn!(
                "Toplevel {} announced twice, keeping task {:?}",
                toplevel,
                existing
            );
            self.tracer
                .trace_violation(Some(toplevel), "duplicate announcement");
            handle.release();
            return existing;
        }

        let id = self.tasks.insert_with_key(|id| Task::new(id, handle));
        self.order.push(id);
        self.by_handle.insert(toplevel, id);

        log::info!("Tracking toplevel {} as task {:?}", toplevel, id);
        self.tracer.trace_transition(
            Some(toplevel),
            &TaskTransition::TaskCreated {
                task: format!("{:?}", id),
                toplevel,
            },
        );
        self.notify(Redraw::Layout);
        id
    }

    /// Route one handle event to its task
    pub fn on_toplevel_event(&mut self, toplevel: u32, event: ToplevelEvent) -> EventOutcome {
        let name = event.name();
        log::debug!("Toplevel {}: {:?}", toplevel, event);
        self.tracer
            .trace_protocol_event(name, Some(toplevel), &describe(&event));

        let Some(&id) = self.by_handle.get(&toplevel) else {
            log::warn!("Ignoring {} for released toplevel {}", name, toplevel);
            self.tracer
                .trace_violation(Some(toplevel), &format!("{} after closed", name));
            return EventOutcome::Unchanged;
        };
        let Some(task) = self.tasks.get_mut(id) else {
            log::error!("Toplevel {} maps to missing task {:?}", toplevel, id);
            return EventOutcome::Unchanged;
        };

        let outcome = apply_event(task, event, &self.icons);
        match outcome {
            EventOutcome::Unchanged => {}
            EventOutcome::Changed => {
                let transition = match name {
                    "app_id" => Some(TaskTransition::AppIdChanged {
                        task: format!("{:?}", id),
                        app_id: task.app_id().to_string(),
                    }),
                    "state" => Some(TaskTransition::StateChanged {
                        task: format!("{:?}", id),
                        active: task.is_active(),
                        minimized: task.is_minimized(),
                    }),
                    _ => None,
                };
                if let Some(transition) = transition {
                    self.tracer.trace_transition(Some(toplevel), &transition);
                }
                self.notify(Redraw::Task(id));
            }
            EventOutcome::Closed => {
                self.remove_task(id, CloseReason::ToplevelClosed);
            }
        }
        outcome
    }

    /// Remove a task whose handle has closed.
    ///
    /// Fails if the task is not live; a task is only ever removed once.
    pub fn on_task_closed(&mut self, id: TaskId) -> Result<()> {
        if !self.tasks.contains_key(id) {
            log::error!("Close requested for unknown task {:?}", id);
            bail!("task {:?} is not live", id);
        }
        self.remove_task(id, CloseReason::ToplevelClosed);
        Ok(())
    }

    fn remove_task(&mut self, id: TaskId, reason: CloseReason) {
        let Some(mut task) = self.tasks.remove(id) else {
            return;
        };
        let toplevel = task.toplevel();
        self.order.retain(|&t| t != id);
        if self.by_handle.get(&toplevel) == Some(&id) {
            self.by_handle.remove(&toplevel);
        }
        task.release();

        log::info!("Removed task {:?} (toplevel {}, {:?})", id, toplevel, reason);
        self.tracer.trace_transition(
            Some(toplevel),
            &TaskTransition::TaskClosed {
                task: format!("{:?}", id),
                reason,
            },
        );
        if reason != CloseReason::Shutdown {
            self.notify(Redraw::Layout);
        }
    }

    /// Release every live handle and forget all tasks
    pub fn shutdown(&mut self) {
        if self.order.is_empty() {
            return;
        }
        log::info!("Releasing {} toplevel(s)", self.order.len());
        for id in std::mem::take(&mut self.order) {
            self.remove_task(id, CloseReason::Shutdown);
        }
        // Anything left here was never in the render order
        for (_, mut task) in self.tasks.drain() {
            task.release();
        }
        self.by_handle.clear();
    }

    // ------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------

    /// Focus a task's window
    pub fn activate(&mut self, id: TaskId) -> Result<RequestOutcome> {
        let Some(task) = self.tasks.get(id) else {
            bail!("task {:?} is not live", id);
        };
        let outcome = task.activate(self.seat.as_ref());
        self.record_request(id, outcome);
        Ok(outcome)
    }

    /// Click on a task: restore, minimize or raise it
    pub fn toggle_minimize(&mut self, id: TaskId) -> Result<RequestOutcome> {
        let Some(task) = self.tasks.get(id) else {
            bail!("task {:?} is not live", id);
        };
        let outcome = task.toggle_minimize(self.seat.as_ref());
        self.record_request(id, outcome);
        Ok(outcome)
    }

    fn record_request(&mut self, id: TaskId, outcome: RequestOutcome) {
        let toplevel = self.tasks.get(id).map(|t| t.toplevel());
        match outcome {
            RequestOutcome::Sent(request) => {
                log::debug!("Sent {} for task {:?}", request.name(), id);
                self.tracer.trace_transition(
                    toplevel,
                    &TaskTransition::RequestSent {
                        task: format!("{:?}", id),
                        request: request.name().to_string(),
                    },
                );
            }
            RequestOutcome::NoSeat => {
                if !self.warned_no_seat {
                    log::warn!("No seat bound; activation requests are ignored");
                    self.warned_no_seat = true;
                    self.count(|d| d.no_seat += 1);
                }
            }
            RequestOutcome::AlreadyActive => {
                log::debug!("Task {:?} is already active", id);
            }
            RequestOutcome::Released => {
                log::warn!("Request for task {:?} after its handle was released", id);
                self.tracer.trace_violation(toplevel, "request after release");
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn task_count(&self) -> usize {
        self.order.len()
    }

    /// Task at a position in render order
    pub fn task_at(&self, index: usize) -> Option<&Task<H>> {
        self.order.get(index).and_then(|&id| self.tasks.get(id))
    }

    pub fn task(&self, id: TaskId) -> Option<&Task<H>> {
        self.tasks.get(id)
    }

    pub fn task_by_toplevel(&self, toplevel: u32) -> Option<&Task<H>> {
        self.by_handle.get(&toplevel).and_then(|&id| self.tasks.get(id))
    }

    /// Tasks in render order
    pub fn iter(&self) -> impl Iterator<Item = &Task<H>> {
        self.order.iter().filter_map(|&id| self.tasks.get(id))
    }

    /// Current slots, recomputed from scratch on every call
    pub fn compute_layout(&self) -> Vec<TaskSlot> {
        let (slots, clamped) = layout::compute_slots(&self.order, &self.geometry);
        if clamped && !self.geometry_warned.get() {
            log::warn!(
                "Width {} too small for {} task(s), clamping to {}px",
                self.geometry.width,
                self.order.len(),
                layout::MIN_TASK_WIDTH
            );
            self.count(|d| d.width_clamped += 1);
        }
        self.geometry_warned.set(clamped);
        slots
    }

    /// Task under a horizontal click position
    pub fn task_at_point(&self, x: i32) -> Option<TaskId> {
        self.compute_layout()
            .into_iter()
            .find(|slot| slot.rect.contains_x(x))
            .map(|slot| slot.id)
    }

    /// Owned copy of the visible state
    pub fn snapshot(&self) -> TaskbarSnapshot {
        let tasks = self
            .compute_layout()
            .into_iter()
            .filter_map(|slot| {
                let task = self.tasks.get(slot.id)?;
                Some(TaskSnapshot {
                    id: format!("{:?}", slot.id),
                    toplevel: task.toplevel(),
                    app_id: task.app_id().to_string(),
                    title: task.title().to_string(),
                    active: task.is_active(),
                    minimized: task.is_minimized(),
                    icon_path: task.icon_path().map(|p| p.display().to_string()),
                    slot: slot.rect.into(),
                })
            })
            .collect();

        TaskbarSnapshot {
            available_width: self.geometry.width,
            task_count: self.order.len(),
            seat_bound: self.seat.is_some(),
            tasks,
        }
    }

    /// One-shot warning counters
    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.get()
    }

    fn count(&self, bump: impl FnOnce(&mut Diagnostics)) {
        let mut diagnostics = self.diagnostics.get();
        bump(&mut diagnostics);
        self.diagnostics.set(diagnostics);
    }

    pub fn event_log(&self, n: usize) -> Vec<EventLogEntry> {
        self.tracer.get_last(n)
    }

    pub fn tracer(&self) -> &EventTracer {
        &self.tracer
    }

    /// Check the registry invariants
    pub fn validate(&self) -> Vec<StateViolation> {
        let mut violations = Vec::new();

        // Check: every handle entry points at a live task bound to it
        for (&toplevel, &id) in &self.by_handle {
            match self.tasks.get(id) {
                None => violations.push(StateViolation {
                    kind: ViolationKind::DanglingHandleEntry,
                    description: format!("Toplevel {} maps to missing task {:?}", toplevel, id),
                }),
                Some(task) if task.toplevel() != toplevel => violations.push(StateViolation {
                    kind: ViolationKind::DanglingHandleEntry,
                    description: format!(
                        "Toplevel {} maps to task {:?} bound to {}",
                        toplevel,
                        id,
                        task.toplevel()
                    ),
                }),
                Some(_) => {}
            }
        }

        // Check: one live task per handle, each reachable from the map
        let mut seen = HashSet::new();
        for (id, task) in &self.tasks {
            if !seen.insert(task.toplevel()) {
                violations.push(StateViolation {
                    kind: ViolationKind::DuplicateHandle,
                    description: format!("Toplevel {} bound to more than one task", task.toplevel()),
                });
            }
            if self.by_handle.get(&task.toplevel()) != Some(&id) {
                violations.push(StateViolation {
                    kind: ViolationKind::UnmappedTask,
                    description: format!("Task {:?} missing from the handle map", id),
                });
            }
            if !task.is_bound() {
                violations.push(StateViolation {
                    kind: ViolationKind::ReleasedHandleLive,
                    description: format!("Task {:?} kept after its handle was released", id),
                });
            }
        }

        // Check: render order lists every task exactly once
        let ordered: HashSet<TaskId> = self.order.iter().copied().collect();
        if ordered.len() != self.order.len()
            || self.order.len() != self.tasks.len()
            || self.order.iter().any(|&id| !self.tasks.contains_key(id))
        {
            violations.push(StateViolation {
                kind: ViolationKind::OrderMismatch,
                description: format!(
                    "Render order has {} entries for {} tasks",
                    self.order.len(),
                    self.tasks.len()
                ),
            });
        }

        violations
    }
}

impl<H: ToplevelHandle> Drop for Taskbar<H> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Trace details for an event
fn describe(event: &ToplevelEvent) -> String {
    match event {
        ToplevelEvent::Title(title) => title.clone(),
        ToplevelEvent::AppId(app_id) => app_id.clone(),
        ToplevelEvent::State(flags) => format!("{:?}", flags),
        ToplevelEvent::Parent(Some(parent)) => format!("parent={}", parent),
        _ => String::new(),
    }
}
