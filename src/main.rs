//! tasklane - print the live taskbar of a Wayland session
//!
//! Connects to the compositor, tracks every toplevel and reports the task
//! layout whenever it changes.
//!
//! # Examples
//!
//! ```bash
//! # Log the layout for a 1920px panel
//! tasklane --width 1920
//!
//! # Stream layout snapshots as JSON lines
//! tasklane --json | jq .tasks
//! ```

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;

use tasklane::client::{Session, WaylandTaskbar};
use tasklane::config::Config;
use tasklane::Taskbar;

/// tasklane - Wayland taskbar core
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/tasklane/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Panel surface width in pixels
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Print layout snapshots as JSON lines
    #[arg(long)]
    json: bool,

    /// Check registry invariants after every change
    #[arg(long)]
    validate: bool,
}

fn report(taskbar: &WaylandTaskbar, cli: &Cli) -> Result<()> {
    if cli.json {
        let line = serde_json::to_string(&taskbar.snapshot()).context("Failed to serialize snapshot")?;
        println!("{}", line);
    } else {
        log::info!("{} task(s)", taskbar.task_count());
        for slot in taskbar.compute_layout() {
            if let Some(task) = taskbar.task(slot.id) {
                log::info!(
                    "  [{}] x={} w={} {} {:?}{}{}",
                    slot.index,
                    slot.x_offset(),
                    slot.width(),
                    if task.app_id().is_empty() { "?" } else { task.app_id() },
                    task.title(),
                    if task.is_active() { " active" } else { "" },
                    if task.is_minimized() { " minimized" } else { "" },
                );
            }
        }
    }

    if cli.validate {
        for violation in taskbar.validate() {
            log::error!("{:?}: {}", violation.kind, violation.description);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let cli = Cli::parse();
    log::info!("Starting tasklane");

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path.clone()),
        None => Config::load(),
    };

    let mut taskbar = Taskbar::new(config.bar_geometry(cli.width), config.icon_lookup());
    let dirty = Rc::new(Cell::new(true));
    let flag = dirty.clone();
    taskbar.set_redraw_callback(move |_| flag.set(true));

    let mut session = Session::connect(taskbar)?;
    let result = session.run(|taskbar| {
        if dirty.replace(false) {
            if let Err(e) = report(taskbar, &cli) {
                log::warn!("{:#}", e);
            }
        }
    });

    session.shutdown()?;
    result
}
