//! Display-independent playback of precomputed frames.
//!
//! [`Playback`] is a small state machine: every [`Playback::tick`] either
//! observes the stop signal and halts, or draws one frame through a
//! [`Surface`], records the outer bob in the [`Trail`] and advances the
//! frame index, wrapping to the first frame after the last one. No physics
//! runs here; frames are computed up front by [`crate::phases::prepare`].

use crate::{
    error::{Result, SimError},
    trail::{Trail, TrailPolicy},
    types::Frame,
};
use glam::DVec2;
use log::{debug, info};
use std::{
    thread,
    time::{Duration, Instant},
};

/// Drawing and input capabilities the playback loop needs from a host.
///
/// All coordinates are surface pixels.
pub trait Surface {
    fn clear(&mut self);
    fn draw_line_segment(&mut self, p0: DVec2, p1: DVec2);
    fn draw_filled_circle(&mut self, center: DVec2, radius: f64);
    fn draw_polyline(&mut self, points: &[DVec2]);
    /// Publishes everything drawn since the last [`Surface::clear`].
    fn present(&mut self);
    /// `true` once the host has been asked to stop.
    fn poll_quit(&mut self) -> bool;
}

/// Blocks the caller until the next tick boundary.
pub trait Throttle {
    fn throttle_to_rate(&mut self, hz: f64);
}

/// Sleep-based [`Throttle`] for hosts that own their loop.
///
/// Ticks are spaced `1 / hz` apart. A caller that falls behind is not
/// made to catch up; the schedule restarts from the late tick.
#[derive(Debug, Default)]
pub struct FixedRateClock {
    last: Option<Instant>,
}

impl FixedRateClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Throttle for FixedRateClock {
    fn throttle_to_rate(&mut self, hz: f64) {
        let now = Instant::now();
        if !(hz.is_finite() && hz > 0.0) {
            self.last = Some(now);
            return;
        }

        let period = Duration::from_secs_f64(1.0 / hz);
        let target = self.last.map_or(now, |last| last + period);
        if target > now {
            thread::sleep(target - now);
        }
        self.last = Some(target.max(now));
    }
}

/// World (meters) to surface (pixels) mapping: `origin + p * scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenMapping {
    pub origin: DVec2,
    pub scale: f64,
}

impl ScreenMapping {
    /// `origin` is the pixel position of the pivot, `scale` is pixels per meter.
    pub fn new(origin: DVec2, scale: f64) -> Self {
        Self { origin, scale }
    }

    #[inline]
    pub fn to_screen(&self, p: DVec2) -> DVec2 {
        self.origin + p * self.scale
    }
}

/// Where the playback state machine is after a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    /// A frame was drawn and the next one follows.
    Running,
    /// The last frame was drawn and the index wrapped back to zero.
    Looping,
    /// The stop signal was observed. Terminal.
    Stopped,
}

/// Owns the frame sequence, the current index and the outer-bob trail.
#[derive(Debug)]
pub struct Playback {
    frames: Vec<Frame>,
    mapping: ScreenMapping,
    bob_radius: f64,
    index: usize,
    ticks: usize,
    state: PlaybackState,
    trail: Trail,
}

impl Playback {
    /// Creates a playback positioned on the first frame.
    ///
    /// ### Parameters
    /// - `frames` - Precomputed frames, played in order and looped.
    /// - `mapping` - World to surface transform for bobs and trail.
    /// - `bob_radius` - Radius of both bob markers, in pixels.
    /// - `policy` - Retention policy for the trail.
    ///
    /// ### Returns
    /// - `Ok(Playback)` in the `Running` state with index 0.
    /// - `Err(SimError::EmptyFrames)` if there is nothing to play.
    pub fn new(
        frames: Vec<Frame>,
        mapping: ScreenMapping,
        bob_radius: f64,
        policy: TrailPolicy,
    ) -> Result<Self> {
        if frames.is_empty() {
            return Err(SimError::EmptyFrames);
        }
        Ok(Self {
            frames,
            mapping,
            bob_radius,
            index: 0,
            ticks: 0,
            state: PlaybackState::Running,
            trail: Trail::new(policy),
        })
    }

    /// Index of the frame the next tick will draw.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of ticks that rendered a frame.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// State reached by the most recent tick; `Running` before the first.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Length of the loop, in frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// The frame at [`Playback::index`].
    pub fn current_frame(&self) -> &Frame {
        &self.frames[self.index]
    }

    /// Outer-bob positions recorded so far, in surface pixels.
    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    /// World to surface transform applied to every drawn point.
    pub fn mapping(&self) -> ScreenMapping {
        self.mapping
    }

    /// `true` once the stop signal has been observed.
    pub fn is_stopped(&self) -> bool {
        self.state == PlaybackState::Stopped
    }

    /// Runs one tick against `surface`.
    ///
    /// The stop signal is polled first; once observed, nothing is drawn
    /// or recorded and every later call is a no-op returning `Stopped`.
    pub fn tick<S: Surface + ?Sized>(&mut self, surface: &mut S) -> PlaybackState {
        if self.is_stopped() {
            return self.state;
        }
        if surface.poll_quit() {
            info!(
                "stop requested after {} ticks at frame {}",
                self.ticks, self.index
            );
            self.state = PlaybackState::Stopped;
            return self.state;
        }

        let frame = self.frames[self.index];
        let pivot = self.mapping.to_screen(DVec2::ZERO);
        let bob1 = self.mapping.to_screen(frame.bob1);
        let bob2 = self.mapping.to_screen(frame.bob2);

        surface.clear();
        surface.draw_line_segment(pivot, bob1);
        surface.draw_line_segment(bob1, bob2);
        surface.draw_filled_circle(bob1, self.bob_radius);
        surface.draw_filled_circle(bob2, self.bob_radius);
        if self.trail.len() > 1 {
            surface.draw_polyline(self.trail.as_slice());
        }
        surface.present();

        self.trail.push(bob2);
        self.ticks += 1;
        self.index += 1;

        if self.index == self.frames.len() {
            self.index = 0;
            self.trail.on_wrap();
            debug!("playback wrapped after {} ticks", self.ticks);
            self.state = PlaybackState::Looping;
        } else {
            self.state = PlaybackState::Running;
        }
        self.state
    }

    /// Ticks until the stop signal, throttling to `hz` between ticks.
    ///
    /// ### Returns
    /// The number of ticks that rendered a frame.
    pub fn run<S, T>(&mut self, surface: &mut S, throttle: &mut T, hz: f64) -> usize
    where
        S: Surface + ?Sized,
        T: Throttle + ?Sized,
    {
        while self.tick(surface) != PlaybackState::Stopped {
            throttle.throttle_to_rate(hz);
        }
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Clear,
        Line(DVec2, DVec2),
        Circle(DVec2, f64),
        Polyline(usize),
        Present,
    }

    /// Records draw calls; raises quit on the `quit_on`-th poll (1-based).
    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
        polls: usize,
        quit_on: Option<usize>,
    }

    impl Surface for Recorder {
        fn clear(&mut self) {
            self.ops.push(Op::Clear);
        }
        fn draw_line_segment(&mut self, p0: DVec2, p1: DVec2) {
            self.ops.push(Op::Line(p0, p1));
        }
        fn draw_filled_circle(&mut self, center: DVec2, radius: f64) {
            self.ops.push(Op::Circle(center, radius));
        }
        fn draw_polyline(&mut self, points: &[DVec2]) {
            self.ops.push(Op::Polyline(points.len()));
        }
        fn present(&mut self) {
            self.ops.push(Op::Present);
        }
        fn poll_quit(&mut self) -> bool {
            self.polls += 1;
            self.quit_on.is_some_and(|n| self.polls >= n)
        }
    }

    impl Recorder {
        fn presents(&self) -> usize {
            self.ops.iter().filter(|op| **op == Op::Present).count()
        }
    }

    #[derive(Default)]
    struct CountingThrottle {
        calls: usize,
        last_hz: f64,
    }

    impl Throttle for CountingThrottle {
        fn throttle_to_rate(&mut self, hz: f64) {
            self.calls += 1;
            self.last_hz = hz;
        }
    }

    fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame {
                bob1: DVec2::new(i as f64, 0.0),
                bob2: DVec2::new(i as f64, -1.0),
            })
            .collect()
    }

    fn playback(n: usize, policy: TrailPolicy) -> Playback {
        Playback::new(
            frames(n),
            ScreenMapping::new(DVec2::ZERO, 1.0),
            10.0,
            policy,
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_empty_frames() {
        let err = Playback::new(
            Vec::new(),
            ScreenMapping::new(DVec2::ZERO, 1.0),
            10.0,
            TrailPolicy::Unbounded,
        )
        .unwrap_err();
        assert!(matches!(err, SimError::EmptyFrames));
    }

    #[test]
    fn starts_running_at_first_frame() {
        let pb = playback(3, TrailPolicy::Unbounded);
        assert_eq!(pb.state(), PlaybackState::Running);
        assert_eq!(pb.index(), 0);
        assert_eq!(pb.ticks(), 0);
        assert!(pb.trail().is_empty());
        assert_eq!(pb.current_frame(), &frames(3)[0]);
    }

    #[test]
    fn index_wraps_and_trail_keeps_growing() {
        let n = 7;
        let mut pb = playback(n, TrailPolicy::Unbounded);
        let mut surface = Recorder::default();

        for k in 1..=3 * n + 4 {
            let state = pb.tick(&mut surface);
            assert_eq!(pb.index(), k % n);
            assert_eq!(pb.trail().len(), k);
            let expected = if k % n == 0 {
                PlaybackState::Looping
            } else {
                PlaybackState::Running
            };
            assert_eq!(state, expected);
        }
        assert_eq!(surface.presents(), 3 * n + 4);
    }

    #[test]
    fn first_tick_draws_links_and_bobs_without_trail() {
        let mapping = ScreenMapping::new(DVec2::new(500.0, 500.0), 200.0);
        let mut pb = Playback::new(frames(2), mapping, 10.0, TrailPolicy::Unbounded).unwrap();
        let mut surface = Recorder::default();

        pb.tick(&mut surface);

        let pivot = DVec2::new(500.0, 500.0);
        let bob1 = DVec2::new(500.0, 500.0);
        let bob2 = DVec2::new(500.0, 300.0);
        assert_eq!(
            surface.ops,
            vec![
                Op::Clear,
                Op::Line(pivot, bob1),
                Op::Line(bob1, bob2),
                Op::Circle(bob1, 10.0),
                Op::Circle(bob2, 10.0),
                Op::Present,
            ]
        );
        assert_eq!(pb.trail().last(), Some(bob2));
    }

    #[test]
    fn trail_is_drawn_once_it_has_two_points() {
        let mut pb = playback(5, TrailPolicy::Unbounded);
        let mut surface = Recorder::default();

        for _ in 0..3 {
            pb.tick(&mut surface);
        }

        let polylines: Vec<_> = surface
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Polyline(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(polylines, vec![2]);
    }

    #[test]
    fn stop_on_first_tick_renders_nothing() {
        let mut pb = playback(4, TrailPolicy::Unbounded);
        let mut surface = Recorder {
            quit_on: Some(1),
            ..Default::default()
        };

        assert_eq!(pb.tick(&mut surface), PlaybackState::Stopped);
        assert!(surface.ops.is_empty());
        assert_eq!(pb.trail().len(), 0);

        // Stopped is terminal: no more polling, no more drawing.
        assert_eq!(pb.tick(&mut surface), PlaybackState::Stopped);
        assert_eq!(surface.polls, 1);
        assert!(surface.ops.is_empty());
    }

    #[test]
    fn run_stops_after_signal_and_reports_rendered_ticks() {
        let mut pb = playback(4, TrailPolicy::Unbounded);
        let mut surface = Recorder {
            quit_on: Some(10),
            ..Default::default()
        };
        let mut throttle = CountingThrottle::default();

        let rendered = pb.run(&mut surface, &mut throttle, 30.0);

        assert_eq!(rendered, 9);
        assert_eq!(pb.state(), PlaybackState::Stopped);
        assert_eq!(pb.trail().len(), 9);
        assert_eq!(pb.index(), 9 % 4);
        assert_eq!(surface.presents(), 9);
        assert_eq!(throttle.calls, 9);
        assert_eq!(throttle.last_hz, 30.0);
    }

    #[test]
    fn capped_trail_stays_bounded_across_loops() {
        let mut pb = playback(3, TrailPolicy::Capped(5));
        let mut surface = Recorder::default();

        for _ in 0..20 {
            pb.tick(&mut surface);
        }
        assert_eq!(pb.ticks(), 20);
        assert_eq!(pb.trail().len(), 5);
    }

    #[test]
    fn reset_on_wrap_trail_restarts_each_loop() {
        let mut pb = playback(3, TrailPolicy::ResetOnWrap);
        let mut surface = Recorder::default();

        pb.tick(&mut surface);
        pb.tick(&mut surface);
        assert_eq!(pb.trail().len(), 2);
        assert_eq!(pb.tick(&mut surface), PlaybackState::Looping);
        assert!(pb.trail().is_empty());
        pb.tick(&mut surface);
        assert_eq!(pb.trail().len(), 1);
    }

    #[test]
    fn single_frame_loops_every_tick() {
        let mut pb = playback(1, TrailPolicy::Unbounded);
        let mut surface = Recorder::default();

        assert_eq!(pb.tick(&mut surface), PlaybackState::Looping);
        assert_eq!(pb.tick(&mut surface), PlaybackState::Looping);
        assert_eq!(pb.index(), 0);
        assert_eq!(pb.trail().len(), 2);
    }

    #[test]
    fn fixed_rate_clock_spaces_ticks() {
        let mut clock = FixedRateClock::new();
        let start = Instant::now();
        for _ in 0..4 {
            clock.throttle_to_rate(200.0);
        }
        assert!(start.elapsed() >= Duration::from_millis(15));
    }
}
