//! Tasks: the local model of one toplevel window.
//!
//! A task owns its toplevel handle until the compositor closes the window.
//! All protocol events reach the task through [`apply_event`]; user actions
//! are translated into fire-and-forget requests whose results only show up
//! in a later state event.

use std::path::{Path, PathBuf};

use slotmap::new_key_type;

use crate::icon::IconLookup;
use crate::toplevel::{StateFlags, ToplevelEvent, ToplevelHandle};

new_key_type! {
    /// Unique identifier for a live task
    pub struct TaskId;
}

/// Request sent to the compositor on behalf of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRequest {
    Activate,
    Minimize,
    Unminimize,
}

impl TaskRequest {
    pub fn name(&self) -> &'static str {
        match self {
            TaskRequest::Activate => "activate",
            TaskRequest::Minimize => "minimize",
            TaskRequest::Unminimize => "unminimize",
        }
    }
}

/// What happened to a user action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The request went out to the compositor
    Sent(TaskRequest),
    /// Activation needs a seat and none is bound
    NoSeat,
    /// The task is already the active window
    AlreadyActive,
    /// The handle was released; the task is on its way out
    Released,
}

/// Effect of a protocol event on a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Nothing visible changed
    Unchanged,
    /// An attribute changed; the task needs repainting
    Changed,
    /// The handle was released; the task must be removed
    Closed,
}

/// A tracked toplevel window
#[derive(Debug)]
pub struct Task<H: ToplevelHandle> {
    id: TaskId,
    toplevel: u32,
    handle: Option<H>,
    app_id: String,
    title: String,
    state: StateFlags,
    icon_path: Option<PathBuf>,
}

impl<H: ToplevelHandle> Task<H> {
    /// Create a task bound to a freshly announced handle
    pub fn new(id: TaskId, handle: H) -> Self {
        Self {
            id,
            toplevel: handle.protocol_id(),
            handle: Some(handle),
            app_id: String::new(),
            title: String::new(),
            state: StateFlags::empty(),
            icon_path: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Protocol id of the bound toplevel
    pub fn toplevel(&self) -> u32 {
        self.toplevel
    }

    /// Application id; empty until the compositor sends one
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn state(&self) -> StateFlags {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.contains(StateFlags::ACTIVE)
    }

    pub fn is_minimized(&self) -> bool {
        self.state.contains(StateFlags::MINIMIZED)
    }

    pub fn icon_path(&self) -> Option<&Path> {
        self.icon_path.as_deref()
    }

    /// Whether the handle is still held
    pub fn is_bound(&self) -> bool {
        self.handle.is_some()
    }

    /// Click policy: restore if minimized, minimize if active, otherwise raise
    pub fn toggle_request(&self) -> TaskRequest {
        if self.is_minimized() {
            TaskRequest::Unminimize
        } else if self.is_active() {
            TaskRequest::Minimize
        } else {
            TaskRequest::Activate
        }
    }

    /// Ask the compositor to focus this window
    pub fn activate(&self, seat: Option<&H::Seat>) -> RequestOutcome {
        let Some(handle) = &self.handle else {
            return RequestOutcome::Released;
        };
        if self.is_active() {
            return RequestOutcome::AlreadyActive;
        }
        let Some(seat) = seat else {
            return RequestOutcome::NoSeat;
        };
        handle.request_activate(seat);
        RequestOutcome::Sent(TaskRequest::Activate)
    }

    /// Apply the click policy from [`Task::toggle_request`]
    pub fn toggle_minimize(&self, seat: Option<&H::Seat>) -> RequestOutcome {
        let Some(handle) = &self.handle else {
            return RequestOutcome::Released;
        };
        let request = self.toggle_request();
        match request {
            TaskRequest::Unminimize => handle.request_unminimize(),
            TaskRequest::Minimize => handle.request_minimize(),
            TaskRequest::Activate => match seat {
                Some(seat) => handle.request_activate(seat),
                None => return RequestOutcome::NoSeat,
            },
        }
        RequestOutcome::Sent(request)
    }

    /// Release the handle. Returns false if it was already released.
    pub fn release(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.release();
                true
            }
            None => false,
        }
    }
}

impl<H: ToplevelHandle> Drop for Task<H> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Apply one protocol event to a task
pub fn apply_event<H: ToplevelHandle>(
    task: &mut Task<H>,
    event: ToplevelEvent,
    icons: &IconLookup,
) -> EventOutcome {
    match event {
        ToplevelEvent::Title(title) => {
            if task.title == title {
                return EventOutcome::Unchanged;
            }
            task.title = title;
            EventOutcome::Changed
        }
        ToplevelEvent::AppId(app_id) => {
            task.icon_path = icons.resolve(&app_id);
            task.app_id = app_id;
            EventOutcome::Changed
        }
        ToplevelEvent::State(flags) => {
            if task.state == flags {
                return EventOutcome::Unchanged;
            }
            task.state = flags;
            EventOutcome::Changed
        }
        // Accepted but not tracked: output membership, batch boundaries
        // and parent links have no effect on the taskbar model.
        ToplevelEvent::OutputEnter
        | ToplevelEvent::OutputLeave
        | ToplevelEvent::Done
        | ToplevelEvent::Parent(_) => EventOutcome::Unchanged,
        ToplevelEvent::Closed => {
            if !task.release() {
                log::warn!("Toplevel {} closed twice", task.toplevel);
            }
            EventOutcome::Closed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug)]
    struct FakeHandle {
        id: u32,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl ToplevelHandle for FakeHandle {
        type Seat = ();

        fn protocol_id(&self) -> u32 {
            self.id
        }

        fn request_activate(&self, _seat: &()) {
            self.log.borrow_mut().push("activate");
        }

        fn request_minimize(&self) {
            self.log.borrow_mut().push("minimize");
        }

        fn request_unminimize(&self) {
            self.log.borrow_mut().push("unminimize");
        }

        fn release(self) {
            self.log.borrow_mut().push("release");
        }
    }

    fn make_task() -> (Task<FakeHandle>, Rc<RefCell<Vec<&'static str>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut ids: SlotMap<TaskId, ()> = SlotMap::with_key();
        let id = ids.insert(());
        let task = Task::new(id, FakeHandle { id: 7, log: log.clone() });
        (task, log)
    }

    #[test]
    fn test_new_task_is_empty() {
        let (task, _log) = make_task();
        assert_eq!(task.toplevel(), 7);
        assert_eq!(task.app_id(), "");
        assert_eq!(task.state(), StateFlags::empty());
        assert!(task.icon_path().is_none());
        assert!(task.is_bound());
    }

    #[test]
    fn test_state_is_replaced() {
        let (mut task, _log) = make_task();
        let icons = IconLookup::disabled();

        let both = StateFlags::ACTIVE | StateFlags::MINIMIZED;
        assert_eq!(apply_event(&mut task, ToplevelEvent::State(both), &icons), EventOutcome::Changed);
        apply_event(&mut task, ToplevelEvent::State(StateFlags::ACTIVE), &icons);
        assert_eq!(task.state(), StateFlags::ACTIVE);

        apply_event(&mut task, ToplevelEvent::State(StateFlags::empty()), &icons);
        assert_eq!(task.state(), StateFlags::empty());
    }

    #[test]
    fn test_app_id_last_write_wins() {
        let (mut task, _log) = make_task();
        let icons = IconLookup::disabled();

        apply_event(&mut task, ToplevelEvent::AppId("firefox".to_string()), &icons);
        apply_event(&mut task, ToplevelEvent::AppId("foot".to_string()), &icons);
        assert_eq!(task.app_id(), "foot");
    }

    #[test]
    fn test_title_does_not_touch_identity() {
        let (mut task, _log) = make_task();
        let icons = IconLookup::disabled();

        apply_event(&mut task, ToplevelEvent::Title("~/src".to_string()), &icons);
        assert_eq!(task.title(), "~/src");
        assert_eq!(task.app_id(), "");
        assert_eq!(task.state(), StateFlags::empty());
        assert_eq!(
            apply_event(&mut task, ToplevelEvent::Title("~/src".to_string()), &icons),
            EventOutcome::Unchanged
        );
    }

    #[test]
    fn test_inert_events() {
        let (mut task, log) = make_task();
        let icons = IconLookup::disabled();

        for event in [
            ToplevelEvent::OutputEnter,
            ToplevelEvent::OutputLeave,
            ToplevelEvent::Done,
            ToplevelEvent::Parent(Some(3)),
        ] {
            assert_eq!(apply_event(&mut task, event, &icons), EventOutcome::Unchanged);
        }
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_closed_releases_once() {
        let (mut task, log) = make_task();
        let icons = IconLookup::disabled();

        assert_eq!(apply_event(&mut task, ToplevelEvent::Closed, &icons), EventOutcome::Closed);
        assert!(!task.is_bound());
        assert!(!task.release());
        drop(task);
        assert_eq!(*log.borrow(), vec!["release"]);
    }

    #[test]
    fn test_drop_releases_live_handle() {
        let (task, log) = make_task();
        drop(task);
        assert_eq!(*log.borrow(), vec!["release"]);
    }

    #[test]
    fn test_toggle_policy() {
        let (mut task, log) = make_task();
        let icons = IconLookup::disabled();

        apply_event(&mut task, ToplevelEvent::State(StateFlags::MINIMIZED), &icons);
        assert_eq!(task.toggle_minimize(Some(&())), RequestOutcome::Sent(TaskRequest::Unminimize));

        // minimized wins over active
        apply_event(&mut task, ToplevelEvent::State(StateFlags::MINIMIZED | StateFlags::ACTIVE), &icons);
        assert_eq!(task.toggle_request(), TaskRequest::Unminimize);

        apply_event(&mut task, ToplevelEvent::State(StateFlags::ACTIVE), &icons);
        assert_eq!(task.toggle_minimize(Some(&())), RequestOutcome::Sent(TaskRequest::Minimize));

        apply_event(&mut task, ToplevelEvent::State(StateFlags::empty()), &icons);
        assert_eq!(task.toggle_minimize(Some(&())), RequestOutcome::Sent(TaskRequest::Activate));

        assert_eq!(*log.borrow(), vec!["unminimize", "minimize", "activate"]);
    }

    #[test]
    fn test_activate_guards() {
        let (mut task, log) = make_task();
        let icons = IconLookup::disabled();

        assert_eq!(task.activate(None), RequestOutcome::NoSeat);
        assert_eq!(task.toggle_minimize(None), RequestOutcome::NoSeat);

        apply_event(&mut task, ToplevelEvent::State(StateFlags::ACTIVE), &icons);
        assert_eq!(task.activate(Some(&())), RequestOutcome::AlreadyActive);
        assert!(log.borrow().is_empty());

        task.release();
        assert_eq!(task.activate(Some(&())), RequestOutcome::Released);
        assert_eq!(task.toggle_minimize(Some(&())), RequestOutcome::Released);
    }
}
