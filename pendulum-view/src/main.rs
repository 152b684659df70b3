//! Application entry point for the double pendulum viewer.
//!
//! All physics is computed before the window opens; the window only
//! replays the precomputed frames through [`Viewer`].

mod viewer;

use anyhow::Context;
use log::error;
use pendulum_core::{Config, phases};
use viewer::Viewer;

const TITLE: &str = "Double Pendulum with Trajectory";

/// Precomputes the trajectory, then starts the native eframe application.
///
/// ### Returns
/// - `Ok(())` once the window is closed.
/// - `Err` if the configuration is invalid, integration fails, or eframe
///   cannot create the window. Nothing is drawn in the first two cases.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cfg = Config::default();
    let playback = phases::prepare(&cfg)
        .inspect_err(|e| error!("cannot start playback: {e}"))
        .context("failed to precompute the pendulum trajectory")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(TITLE)
            .with_inner_size([cfg.surface_size.x as f32, cfg.surface_size.y as f32])
            .with_resizable(false),
        ..Default::default()
    };

    eframe::run_native(
        TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(Viewer::new(&cfg, playback)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe failed: {e}"))
}
