//! Registry binder.
//!
//! Collects the globals advertised by the display and binds the two this
//! crate needs: the foreign toplevel manager (required) and a seat
//! (optional, only used for activation).

use anyhow::{bail, Result};
use wayland_client::protocol::wl_registry::WlRegistry;
use wayland_client::protocol::wl_seat::WlSeat;
use wayland_client::{Dispatch, Proxy, QueueHandle};
use wayland_protocols_wlr::foreign_toplevel::v1::client::zwlr_foreign_toplevel_manager_v1::ZwlrForeignToplevelManagerV1;

/// Highest `zwlr_foreign_toplevel_manager_v1` version understood
pub const TOPLEVEL_MANAGER_VERSION: u32 = 3;

/// Highest `wl_seat` version understood
pub const SEAT_VERSION: u32 = 7;

/// One advertised global
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub name: u32,
    pub interface: String,
    pub version: u32,
}

/// Globals currently advertised, in announcement order
#[derive(Debug, Default)]
pub struct Globals {
    list: Vec<Global>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a `global` event. A re-used name replaces the old entry.
    pub fn advertise(&mut self, name: u32, interface: &str, version: u32) {
        self.list.retain(|g| g.name != name);
        self.list.push(Global {
            name,
            interface: interface.to_string(),
            version,
        });
    }

    /// Record a `global_remove` event
    pub fn remove(&mut self, name: u32) -> Option<Global> {
        let index = self.list.iter().position(|g| g.name == name)?;
        Some(self.list.remove(index))
    }

    /// First global implementing an interface
    pub fn find(&self, interface: &str) -> Option<&Global> {
        self.list.iter().find(|g| g.interface == interface)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Global> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// Version to bind: the lower of what the server offers and what we speak
pub fn negotiate_version(advertised: u32, understood: u32) -> u32 {
    advertised.min(understood)
}

/// Interface name of the toplevel manager global
pub fn toplevel_manager_interface() -> &'static str {
    ZwlrForeignToplevelManagerV1::interface().name
}

/// Interface name of the seat global
pub fn seat_interface() -> &'static str {
    WlSeat::interface().name
}

/// Bind the toplevel manager. Fails if the compositor does not offer it.
pub fn bind_toplevel_manager<D>(
    registry: &WlRegistry,
    globals: &Globals,
    qh: &QueueHandle<D>,
) -> Result<(u32, ZwlrForeignToplevelManagerV1)>
where
    D: Dispatch<ZwlrForeignToplevelManagerV1, ()> + 'static,
{
    let Some(global) = globals.find(toplevel_manager_interface()) else {
        bail!("foreign-toplevel-management protocol not supported by compositor");
    };
    let version = negotiate_version(global.version, TOPLEVEL_MANAGER_VERSION);
    let manager = registry.bind::<ZwlrForeignToplevelManagerV1, _, D>(global.name, version, qh, ());
    log::info!(
        "Bound {} v{} (global {})",
        global.interface,
        version,
        global.name
    );
    Ok((global.name, manager))
}

/// Bind the first advertised seat, if any
pub fn bind_seat<D>(
    registry: &WlRegistry,
    globals: &Globals,
    qh: &QueueHandle<D>,
) -> Option<(u32, WlSeat)>
where
    D: Dispatch<WlSeat, ()> + 'static,
{
    let Some(global) = globals.find(seat_interface()) else {
        log::warn!("No wl_seat advertised; task activation is unavailable");
        return None;
    };
    let version = negotiate_version(global.version, SEAT_VERSION);
    let seat = registry.bind::<WlSeat, _, D>(global.name, version, qh, ());
    log::info!("Bound wl_seat v{} (global {})", version, global.name);
    Some((global.name, seat))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_version() {
        assert_eq!(negotiate_version(2, TOPLEVEL_MANAGER_VERSION), 2);
        assert_eq!(negotiate_version(9, TOPLEVEL_MANAGER_VERSION), 3);
        assert_eq!(negotiate_version(9, SEAT_VERSION), 7);
    }

    #[test]
    fn test_interface_names() {
        assert_eq!(toplevel_manager_interface(), "zwlr_foreign_toplevel_manager_v1");
        assert_eq!(seat_interface(), "wl_seat");
    }

    #[test]
    fn test_globals_find_and_remove() {
        let mut globals = Globals::new();
        globals.advertise(1, "wl_compositor", 6);
        globals.advertise(7, "wl_seat", 9);
        globals.advertise(8, "wl_seat", 9);
        assert_eq!(globals.len(), 3);

        assert_eq!(globals.find("wl_seat").map(|g| g.name), Some(7));
        assert_eq!(globals.remove(7).map(|g| g.interface), Some("wl_seat".to_string()));
        assert_eq!(globals.find("wl_seat").map(|g| g.name), Some(8));
        assert!(globals.remove(7).is_none());
        assert!(globals.find("zwlr_foreign_toplevel_manager_v1").is_none());
    }

    #[test]
    fn test_globals_readvertise_replaces() {
        let mut globals = Globals::new();
        globals.advertise(3, "wl_seat", 5);
        globals.advertise(3, "wl_seat", 7);
        assert_eq!(globals.len(), 1);
        assert_eq!(globals.find("wl_seat").map(|g| g.version), Some(7));
    }
}
