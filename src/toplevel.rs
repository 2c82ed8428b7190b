//! Toplevel handles and protocol event translation.
//!
//! A toplevel handle is the compositor's proxy for one open window. The
//! taskbar never talks to `zwlr_foreign_toplevel_handle_v1` directly: it goes
//! through the [`ToplevelHandle`] trait for requests and receives events as
//! the closed [`ToplevelEvent`] set, so the task state machine can be driven
//! without a compositor.

use bitflags::bitflags;
use wayland_client::protocol::wl_seat::WlSeat;
use wayland_client::Proxy;
use wayland_protocols_wlr::foreign_toplevel::v1::client::zwlr_foreign_toplevel_handle_v1::{
    self, ZwlrForeignToplevelHandleV1,
};

bitflags! {
    /// Toplevel state tracked by a task.
    ///
    /// Always rebuilt from the complete array sent by the compositor.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct StateFlags: u32 {
        /// The window has keyboard focus
        const ACTIVE    = 1 << 0;
        /// The window is minimized
        const MINIMIZED = 1 << 1;
    }
}

impl StateFlags {
    /// Build flags from the raw `state` array (native-endian u32 values).
    ///
    /// States this taskbar does not track (maximized, fullscreen, anything
    /// newer) are skipped; a trailing partial value is ignored.
    pub fn from_wire(bytes: &[u8]) -> Self {
        let mut flags = StateFlags::empty();
        for chunk in bytes.chunks_exact(4) {
            let value = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            match zwlr_foreign_toplevel_handle_v1::State::try_from(value) {
                Ok(zwlr_foreign_toplevel_handle_v1::State::Activated) => flags |= StateFlags::ACTIVE,
                Ok(zwlr_foreign_toplevel_handle_v1::State::Minimized) => flags |= StateFlags::MINIMIZED,
                _ => {}
            }
        }
        flags
    }
}

/// Events delivered for a single toplevel, in server order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToplevelEvent {
    /// Window title; informational only
    Title(String),
    /// Application id; overwrites the previous value
    AppId(String),
    /// Complete current state
    State(StateFlags),
    /// Toplevel became visible on an output
    OutputEnter,
    /// Toplevel stopped being visible on an output
    OutputLeave,
    /// End of an atomic batch of property events
    Done,
    /// Parent toplevel changed (protocol id of the parent, if any)
    Parent(Option<u32>),
    /// The window is gone; the handle must be released
    Closed,
}

impl ToplevelEvent {
    /// Short name used in logs and the event trace
    pub fn name(&self) -> &'static str {
        match self {
            ToplevelEvent::Title(_) => "title",
            ToplevelEvent::AppId(_) => "app_id",
            ToplevelEvent::State(_) => "state",
            ToplevelEvent::OutputEnter => "output_enter",
            ToplevelEvent::OutputLeave => "output_leave",
            ToplevelEvent::Done => "done",
            ToplevelEvent::Parent(_) => "parent",
            ToplevelEvent::Closed => "closed",
        }
    }

    /// Translate a wire event. Returns `None` for events added in protocol
    /// versions newer than this crate understands.
    pub fn from_wire(event: zwlr_foreign_toplevel_handle_v1::Event) -> Option<Self> {
        use zwlr_foreign_toplevel_handle_v1::Event;

        let translated = match event {
            Event::Title { title } => ToplevelEvent::Title(title),
            Event::AppId { app_id } => ToplevelEvent::AppId(app_id),
            Event::State { state } => ToplevelEvent::State(StateFlags::from_wire(&state)),
            Event::OutputEnter { .. } => ToplevelEvent::OutputEnter,
            Event::OutputLeave { .. } => ToplevelEvent::OutputLeave,
            Event::Done => ToplevelEvent::Done,
            Event::Parent { parent } => {
                ToplevelEvent::Parent(parent.map(|p| p.id().protocol_id()))
            }
            Event::Closed => ToplevelEvent::Closed,
            _ => return None,
        };
        Some(translated)
    }
}

/// Requests a task can make on its remote toplevel.
///
/// Requests are fire-and-forget: the effect, if any, arrives later as a
/// [`ToplevelEvent::State`].
pub trait ToplevelHandle {
    /// Input context required for activation
    type Seat;

    /// Identity of the remote object, unique among live toplevels
    fn protocol_id(&self) -> u32;

    /// Ask the compositor to focus and raise the window
    fn request_activate(&self, seat: &Self::Seat);

    /// Ask the compositor to minimize the window
    fn request_minimize(&self);

    /// Ask the compositor to restore a minimized window
    fn request_unminimize(&self);

    /// Destroy the local proxy. Consumes the handle so it cannot be used again.
    fn release(self);
}

impl ToplevelHandle for ZwlrForeignToplevelHandleV1 {
    type Seat = WlSeat;

    fn protocol_id(&self) -> u32 {
        self.id().protocol_id()
    }

    fn request_activate(&self, seat: &WlSeat) {
        self.activate(seat);
    }

    fn request_minimize(&self) {
        self.set_minimized();
    }

    fn request_unminimize(&self) {
        self.unset_minimized();
    }

    fn release(self) {
        self.destroy();
    }
}
