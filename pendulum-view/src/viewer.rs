//! eframe/egui host for the double pendulum playback.
//!
//! This module defines [`Viewer`], which owns the precomputed
//! [`Playback`] and implements [`eframe::App`], and [`EguiSurface`], the
//! [`Surface`] the playback draws into.

use eframe::App;
use glam::DVec2;
use log::info;
use pendulum_core::{
    Config,
    playback::{Playback, PlaybackState, Surface},
};
use std::time::Duration;

const BACKGROUND_COLOR: egui::Color32 = egui::Color32::WHITE;
const PENDULUM_COLOR: egui::Color32 = egui::Color32::BLACK;
const TRAJECTORY_COLOR: egui::Color32 = egui::Color32::from_rgb(0, 0, 255);
const LINK_WIDTH: f32 = 2.0;
const TRAJECTORY_WIDTH: f32 = 1.0;

#[inline]
fn to_pos(p: DVec2) -> egui::Pos2 {
    egui::pos2(p.x as f32, p.y as f32)
}

/// A [`Surface`] that records egui shapes.
///
/// Draw calls go into a pending list; [`Surface::present`] publishes it as
/// the displayed list, which egui repaints every frame until the next
/// present. Coordinates are relative to the top-left of the drawing area.
#[derive(Default)]
pub struct EguiSurface {
    pending: Vec<egui::Shape>,
    presented: Vec<egui::Shape>,
    quit: bool,
}

impl EguiSurface {
    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    /// The last presented shapes, shifted so that surface `(0, 0)` lands at `offset`.
    pub fn shapes_at(&self, offset: egui::Vec2) -> impl Iterator<Item = egui::Shape> + '_ {
        self.presented.iter().cloned().map(move |mut shape| {
            shape.translate(offset);
            shape
        })
    }
}

impl Surface for EguiSurface {
    fn clear(&mut self) {
        self.pending.clear();
    }

    fn draw_line_segment(&mut self, p0: DVec2, p1: DVec2) {
        self.pending.push(egui::Shape::line_segment(
            [to_pos(p0), to_pos(p1)],
            egui::Stroke::new(LINK_WIDTH, PENDULUM_COLOR),
        ));
    }

    fn draw_filled_circle(&mut self, center: DVec2, radius: f64) {
        self.pending.push(egui::Shape::circle_filled(
            to_pos(center),
            radius as f32,
            PENDULUM_COLOR,
        ));
    }

    fn draw_polyline(&mut self, points: &[DVec2]) {
        self.pending.push(egui::Shape::line(
            points.iter().copied().map(to_pos).collect(),
            egui::Stroke::new(TRAJECTORY_WIDTH, TRAJECTORY_COLOR),
        ));
    }

    fn present(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.presented);
        self.pending.clear();
    }

    fn poll_quit(&mut self) -> bool {
        self.quit
    }
}

/// Fixed-rate tick scheduling driven by egui's clock.
///
/// egui calls back whenever it repaints, so instead of sleeping the viewer
/// asks [`TickClock::due`] whether a tick boundary has passed and schedules
/// the next repaint with [`TickClock::until_next`].
#[derive(Debug)]
pub struct TickClock {
    interval: f64,
    last_tick: Option<f64>,
}

impl TickClock {
    pub fn new(rate_hz: f64) -> Self {
        Self {
            interval: 1.0 / rate_hz,
            last_tick: None,
        }
    }

    /// Returns `true` and starts a new period if a tick is due at `now`.
    ///
    /// Periods stay anchored to the schedule so late repaints do not slow
    /// the rate. After a whole missed interval the schedule restarts at
    /// `now` instead of bursting to catch up.
    pub fn due(&mut self, now: f64) -> bool {
        let next = match self.last_tick {
            None => now,
            Some(last) if now - last < self.interval => return false,
            Some(last) if now - last >= 2.0 * self.interval => now,
            Some(last) => last + self.interval,
        };
        self.last_tick = Some(next);
        true
    }

    pub fn until_next(&self, now: f64) -> Duration {
        let remaining = match self.last_tick {
            Some(last) => last + self.interval - now,
            None => 0.0,
        };
        Duration::from_secs_f64(remaining.clamp(0.0, self.interval))
    }
}

/// Main application state for the pendulum window.
///
/// ### Fields
/// - `playback` - Precomputed frames, trail and playback state.
/// - `surface` - Retained shapes of the last presented frame.
/// - `clock` - Fixed-rate tick schedule (`Config::tick_rate_hz`).
pub struct Viewer {
    playback: Playback,
    surface: EguiSurface,
    clock: TickClock,
}

impl Viewer {
    pub fn new(cfg: &Config, playback: Playback) -> Self {
        Self {
            playback,
            surface: EguiSurface::default(),
            clock: TickClock::new(cfg.tick_rate_hz),
        }
    }

    /// Advances playback by one tick if the clock says one is due.
    ///
    /// ### Returns
    /// The playback state after this call.
    fn step(&mut self, now: f64, quit: bool) -> PlaybackState {
        if quit {
            self.surface.request_quit();
        }
        if self.playback.is_stopped() || quit || self.clock.due(now) {
            self.playback.tick(&mut self.surface)
        } else {
            self.playback.state()
        }
    }
}

impl App for Viewer {
    /// eframe callback: polls the stop signal, ticks on schedule and paints
    /// the last presented frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let (now, quit) = ctx.input(|i| {
            (
                i.time,
                i.viewport().close_requested() || i.key_pressed(egui::Key::Escape),
            )
        });

        let was_stopped = self.playback.is_stopped();
        let state = self.step(now, quit);
        if state == PlaybackState::Stopped && !was_stopped {
            info!("closing after {} rendered ticks", self.playback.ticks());
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(BACKGROUND_COLOR))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let painter = ui.painter_at(rect);
                painter.extend(self.surface.shapes_at(rect.min.to_vec2()));
            });

        if state != PlaybackState::Stopped {
            ctx.request_repaint_after(self.clock.until_next(now));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pendulum_core::phases;

    fn test_viewer() -> Viewer {
        let cfg = Config {
            t1: 1.0,
            sample_count: 4,
            ..Config::default()
        };
        let playback = phases::prepare(&cfg).unwrap();
        Viewer::new(&cfg, playback)
    }

    #[test]
    fn present_publishes_pending_shapes() {
        let mut surface = EguiSurface::default();
        surface.clear();
        surface.draw_line_segment(DVec2::ZERO, DVec2::new(1.0, 1.0));
        surface.draw_filled_circle(DVec2::new(1.0, 1.0), 10.0);
        assert_eq!(surface.shapes_at(egui::Vec2::ZERO).count(), 0);

        surface.present();
        assert_eq!(surface.shapes_at(egui::Vec2::ZERO).count(), 2);

        // Clearing starts a new frame but keeps showing the old one.
        surface.clear();
        surface.draw_polyline(&[DVec2::ZERO, DVec2::X]);
        assert_eq!(surface.shapes_at(egui::Vec2::ZERO).count(), 2);
        surface.present();
        assert_eq!(surface.shapes_at(egui::Vec2::ZERO).count(), 1);
    }

    #[test]
    fn shapes_are_offset_into_the_drawing_area() {
        let mut surface = EguiSurface::default();
        surface.draw_filled_circle(DVec2::new(5.0, 6.0), 2.0);
        surface.present();

        let shape = surface.shapes_at(egui::vec2(100.0, 50.0)).next().unwrap();
        match shape {
            egui::Shape::Circle(c) => assert_eq!(c.center, egui::pos2(105.0, 56.0)),
            other => panic!("expected a circle, got {other:?}"),
        }
    }

    #[test]
    fn tick_clock_fires_once_per_interval() {
        let mut clock = TickClock::new(10.0);

        assert!(clock.due(0.0));
        assert!(!clock.due(0.05));
        assert_eq!(clock.until_next(0.05), Duration::from_secs_f64(0.05));
        assert!(clock.due(0.1));
        assert!(!clock.due(0.15));
        assert!(clock.due(0.35));
        assert!(!clock.due(0.44));
        assert!(clock.due(0.45));
        assert_eq!(clock.until_next(10.0), Duration::ZERO);
    }

    #[test]
    fn late_repaints_do_not_shift_the_schedule() {
        let mut clock = TickClock::new(10.0);
        assert!(clock.due(0.0));

        // 30 ms late: the next boundary is still 0.2, not 0.23.
        assert!(clock.due(0.13));
        assert!(!clock.due(0.19));
        assert!(clock.due(0.205));
        assert!(!clock.due(0.29));
        assert!(clock.due(0.301));
    }

    #[test]
    fn step_renders_on_schedule_only() {
        let mut viewer = test_viewer();

        assert_eq!(viewer.step(0.0, false), PlaybackState::Running);
        assert_eq!(viewer.playback.ticks(), 1);

        viewer.step(0.001, false);
        assert_eq!(viewer.playback.ticks(), 1);

        viewer.step(1.0, false);
        assert_eq!(viewer.playback.ticks(), 2);
    }

    #[test]
    fn quit_stops_playback_without_rendering() {
        let mut viewer = test_viewer();
        viewer.step(0.0, false);

        assert_eq!(viewer.step(0.001, true), PlaybackState::Stopped);
        assert_eq!(viewer.playback.ticks(), 1);
        assert_eq!(viewer.playback.trail().len(), 1);

        // Stays stopped even if the quit flag is not repeated.
        assert_eq!(viewer.step(5.0, false), PlaybackState::Stopped);
        assert_eq!(viewer.playback.ticks(), 1);
    }
}
