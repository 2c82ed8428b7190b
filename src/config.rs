//! Configuration file support for tasklane.
//!
//! Loads settings from ~/.config/tasklane/config.toml if it exists,
//! otherwise uses sensible defaults.
//!
//! The file types are resolved into the runtime values the core consumes:
//! [`BarGeometry`] for layout and [`IconLookup`] for icons.

use serde::Deserialize;
use std::path::PathBuf;

use crate::icon::{IconConfig, IconLookup, XdgIconResolver};
use crate::layout::BarGeometry;

/// Top-level configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub panel: PanelConfig,
    pub taskbar: TaskbarConfig,
}

/// Panel dimensions
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PanelConfig {
    /// Panel height in pixels
    pub height: u32,
    /// Width given to the taskbar (0 = whole surface)
    pub width: u32,
}

/// Taskbar item geometry and icons
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TaskbarConfig {
    pub padding_horizontal: u32,
    pub padding_vertical: u32,
    pub spacing: u32,
    /// Upper bound for a task's width (0 = unlimited)
    pub task_maximum_size: u32,
    pub show_icons: bool,
    pub icon_size: u32,
    pub icon_scale: f32,
    pub icon_theme: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self { height: 30, width: 0 }
    }
}

impl Default for TaskbarConfig {
    fn default() -> Self {
        Self {
            padding_horizontal: 2,
            padding_vertical: 2,
            spacing: 2,
            task_maximum_size: 200,
            show_icons: true,
            icon_size: 22,
            icon_scale: 1.0,
            icon_theme: "hicolor".to_string(),
        }
    }
}

impl Config {
    /// Load config from default path (~/.config/tasklane/config.toml)
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tasklane")
            .join("config.toml")
    }

    /// Load config from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config: {}", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Layout geometry for a panel surface of the given width
    pub fn bar_geometry(&self, surface_width: u32) -> BarGeometry {
        let width = if self.panel.width > 0 {
            self.panel.width
        } else {
            surface_width
        };
        BarGeometry {
            width,
            height: self.panel.height,
            padding_horizontal: self.taskbar.padding_horizontal,
            padding_vertical: self.taskbar.padding_vertical,
            spacing: self.taskbar.spacing,
            max_task_width: self.taskbar.task_maximum_size,
        }
    }

    pub fn icon_config(&self) -> IconConfig {
        let scale = if self.taskbar.icon_scale > 0.0 {
            self.taskbar.icon_scale
        } else {
            log::warn!("Invalid icon_scale {}, using 1.0", self.taskbar.icon_scale);
            1.0
        };
        IconConfig {
            size: self.taskbar.icon_size,
            scale,
        }
    }

    /// Icon lookup backed by the XDG resolver, or a disabled one
    pub fn icon_lookup(&self) -> IconLookup {
        if !self.taskbar.show_icons {
            return IconLookup::disabled();
        }
        IconLookup::new(
            Box::new(XdgIconResolver::new(&self.taskbar.icon_theme)),
            self.icon_config(),
        )
    }
}
