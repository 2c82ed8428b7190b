//! Wayland session: connection, event queue and protocol dispatch.
//!
//! Everything runs on one thread. The session owns the [`Taskbar`] and
//! feeds it from the `Dispatch` implementations below; the embedding panel
//! reads it back between dispatch rounds.

use std::os::fd::AsRawFd;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use wayland_client::backend::WaylandError;
use wayland_client::protocol::wl_registry::{self, WlRegistry};
use wayland_client::protocol::wl_seat::{self, WlSeat};
use wayland_client::{event_created_child, Connection, Dispatch, EventQueue, Proxy, QueueHandle};
use wayland_protocols_wlr::foreign_toplevel::v1::client::zwlr_foreign_toplevel_handle_v1::{
    self, ZwlrForeignToplevelHandleV1,
};
use wayland_protocols_wlr::foreign_toplevel::v1::client::zwlr_foreign_toplevel_manager_v1::{
    self, ZwlrForeignToplevelManagerV1,
};

use crate::registry::{self, Globals};
use crate::taskbar::Taskbar;
use crate::toplevel::ToplevelEvent;

/// Taskbar driven by the wlr foreign toplevel protocol
pub type WaylandTaskbar = Taskbar<ZwlrForeignToplevelHandleV1>;

/// How long to wait for compositor events before running housekeeping
pub const POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Dispatch state shared by every protocol object
pub struct WaylandState {
    pub taskbar: WaylandTaskbar,
    registry: WlRegistry,
    globals: Globals,
    /// Global name and proxy of the bound manager
    manager: Option<(u32, ZwlrForeignToplevelManagerV1)>,
    /// Global name of the bound seat
    seat_name: Option<u32>,
    /// Initial binding is done; later seats are bound as they appear
    bound: bool,
    finished: bool,
}

impl WaylandState {
    /// The compositor will send no more toplevels
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    fn bind_seat(&mut self, qh: &QueueHandle<Self>) {
        if let Some((name, seat)) = registry::bind_seat(&self.registry, &self.globals, qh) {
            self.seat_name = Some(name);
            if let Some(old) = self.taskbar.set_seat(Some(seat)) {
                release_seat(old);
            }
        }
    }
}

/// `wl_seat.release` exists from version 5; older seats are just dropped
fn release_seat(seat: WlSeat) {
    if seat.version() >= 5 {
        seat.release();
    }
}

/// A full or drained socket is retried on the next round
fn tolerate_would_block<T>(result: Result<T, WaylandError>) -> Result<(), WaylandError> {
    match result {
        Ok(_) => Ok(()),
        Err(WaylandError::Io(e)) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(()),
        Err(e) => Err(e),
    }
}

impl Dispatch<WlRegistry, ()> for WaylandState {
    fn event(
        state: &mut Self,
        _registry: &WlRegistry,
        event: wl_registry::Event,
        _data: &(),
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } => {
                log::debug!("Global {} {} v{}", name, interface, version);
                state.globals.advertise(name, &interface, version);
                if state.bound && state.seat_name.is_none() && interface == registry::seat_interface() {
                    state.bind_seat(qh);
                }
            }
            wl_registry::Event::GlobalRemove { name } => {
                let removed = state.globals.remove(name);
                if state.seat_name == Some(name) {
                    state.seat_name = None;
                    if let Some(old) = state.taskbar.set_seat(None) {
                        release_seat(old);
                    }
                    if state.bound {
                        state.bind_seat(qh);
                    }
                } else if state.manager.as_ref().is_some_and(|(n, _)| *n == name) {
                    log::warn!("Toplevel manager global removed; no new toplevels will be seen");
                } else if let Some(global) = removed {
                    log::debug!("Global {} {} removed", name, global.interface);
                }
            }
            _ => {}
        }
    }
}

impl Dispatch<ZwlrForeignToplevelManagerV1, ()> for WaylandState {
    fn event(
        state: &mut Self,
        _manager: &ZwlrForeignToplevelManagerV1,
        event: zwlr_foreign_toplevel_manager_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            zwlr_foreign_toplevel_manager_v1::Event::Toplevel { toplevel } => {
                state.taskbar.on_toplevel_announced(toplevel);
            }
            zwlr_foreign_toplevel_manager_v1::Event::Finished => {
                log::info!("Toplevel manager finished");
                // The server destroys the manager after this event
                state.manager = None;
                state.finished = true;
            }
            _ => {}
        }
    }

    event_created_child!(WaylandState, ZwlrForeignToplevelManagerV1, [
        zwlr_foreign_toplevel_manager_v1::EVT_TOPLEVEL_OPCODE => (ZwlrForeignToplevelHandleV1, ()),
    ]);
}

impl Dispatch<ZwlrForeignToplevelHandleV1, ()> for WaylandState {
    fn event(
        state: &mut Self,
        handle: &ZwlrForeignToplevelHandleV1,
        event: zwlr_foreign_toplevel_handle_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        let toplevel = handle.id().protocol_id();
        match ToplevelEvent::from_wire(event) {
            Some(event) => {
                state.taskbar.on_toplevel_event(toplevel, event);
            }
            None => log::debug!("Toplevel {}: unknown event ignored", toplevel),
        }
    }
}

impl Dispatch<WlSeat, ()> for WaylandState {
    fn event(
        _state: &mut Self,
        _seat: &WlSeat,
        event: wl_seat::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_seat::Event::Name { name } = event {
            log::debug!("Seat name: {}", name);
        }
    }
}

/// A connected session
pub struct Session {
    conn: Connection,
    queue: EventQueue<WaylandState>,
    pub state: WaylandState,
}

impl Session {
    /// Connect to `$WAYLAND_DISPLAY`, bind globals and load the initial
    /// toplevel list
    pub fn connect(taskbar: WaylandTaskbar) -> Result<Self> {
        let conn = Connection::connect_to_env().context("Failed to connect to Wayland display")?;
        let mut queue = conn.new_event_queue();
        let qh = queue.handle();
        let registry = conn.display().get_registry(&qh, ());

        let mut state = WaylandState {
            taskbar,
            registry,
            globals: Globals::new(),
            manager: None,
            seat_name: None,
            bound: false,
            finished: false,
        };

        queue
            .roundtrip(&mut state)
            .context("Failed to read Wayland globals")?;
        log::info!("Display advertised {} globals", state.globals.len());

        let manager = registry::bind_toplevel_manager(&state.registry, &state.globals, &qh)?;
        state.manager = Some(manager);
        state.bind_seat(&qh);
        state.bound = true;

        // Second roundtrip delivers the toplevels that already exist
        queue
            .roundtrip(&mut state)
            .context("Failed to read initial toplevels")?;
        log::info!("Tracking {} toplevel(s)", state.taskbar.task_count());

        Ok(Self { conn, queue, state })
    }

    /// Dispatch until the manager finishes or the connection fails.
    ///
    /// `on_idle` runs after every dispatch round, including timeouts.
    pub fn run<F>(&mut self, mut on_idle: F) -> Result<()>
    where
        F: FnMut(&mut WaylandTaskbar),
    {
        on_idle(&mut self.state.taskbar);
        while !self.state.finished {
            self.dispatch_once(POLL_TIMEOUT)?;
            on_idle(&mut self.state.taskbar);
        }
        Ok(())
    }

    /// Wait up to `timeout` for events and dispatch them
    pub fn dispatch_once(&mut self, timeout: Duration) -> Result<()> {
        self.queue
            .dispatch_pending(&mut self.state)
            .context("Failed to dispatch Wayland events")?;
        tolerate_would_block(self.queue.flush()).context("Failed to flush Wayland requests")?;

        let Some(guard) = self.queue.prepare_read() else {
            // Events are already queued; dispatch them on the next round
            return Ok(());
        };

        let mut poll_fd = libc::pollfd {
            fd: guard.connection_fd().as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        // SAFETY: poll_fd is a valid pollfd for the duration of the call
        let ready = unsafe { libc::poll(&mut poll_fd, 1, timeout_ms) };
        if ready < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() != std::io::ErrorKind::Interrupted {
                bail!("poll on Wayland socket failed: {}", err);
            }
            return Ok(());
        }
        if ready == 0 {
            return Ok(());
        }

        tolerate_would_block(guard.read()).context("Failed to read from Wayland socket")?;
        self.queue
            .dispatch_pending(&mut self.state)
            .context("Failed to dispatch Wayland events")?;
        Ok(())
    }

    /// Stop the manager and release every handle
    pub fn shutdown(&mut self) -> Result<()> {
        if let Some((_, manager)) = self.state.manager.take() {
            manager.stop();
        }
        self.state.taskbar.shutdown();
        if let Some(seat) = self.state.taskbar.set_seat(None) {
            release_seat(seat);
        }
        self.conn.flush().context("Failed to flush Wayland requests")?;
        Ok(())
    }
}
