use crate::{
    dynamics::PhysicalParameters,
    error::{Result, SimError},
    integrator::Tolerances,
    playback::ScreenMapping,
    trail::TrailPolicy,
    types::StateVector,
};
use glam::DVec2;
use std::f64::consts::FRAC_PI_4;

/// Startup constants for a replay session.
///
/// Everything is fixed before the first frame: the physics, the initial
/// state, the solution grid and the display geometry. [`Config::default`]
/// gives the classic setup: two unit links released from `π/4` and
/// sampled 5000 times over 20 seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    pub params: PhysicalParameters,
    pub initial: StateVector,

    pub t0: f64,
    pub t1: f64,
    pub sample_count: usize,
    pub tolerances: Tolerances,

    pub tick_rate_hz: f64,
    pub scale_pixels_per_meter: f64,
    pub surface_size: DVec2,
    pub bob_radius_px: f64,
    pub trail_policy: TrailPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            params: PhysicalParameters {
                m1: 1.0,
                m2: 1.0,
                l1: 1.0,
                l2: 1.0,
                g: -9.81,
            },
            initial: StateVector::at_rest(FRAC_PI_4, FRAC_PI_4),
            t0: 0.0,
            t1: 20.0,
            sample_count: 5000,
            tolerances: Tolerances::default(),
            tick_rate_hz: 30.0,
            scale_pixels_per_meter: 200.0,
            surface_size: DVec2::new(1000.0, 1000.0),
            bob_radius_px: 10.0,
            trail_policy: TrailPolicy::Capped(20_000),
        }
    }
}

impl Config {
    /// Checks every startup constant before any work is done.
    ///
    /// ### Returns
    /// - `Ok(())` if the configuration can be integrated and played back.
    /// - `Err(SimError::InvalidConfig)` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let p = &self.params;
        for (name, v) in [("m1", p.m1), ("m2", p.m2), ("l1", p.l1), ("l2", p.l2)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(invalid(format!(
                    "{name} must be positive and finite, got {v}"
                )));
            }
        }
        if !p.g.is_finite() {
            return Err(invalid(format!("g must be finite, got {}", p.g)));
        }
        if !self.initial.is_finite() {
            return Err(invalid(format!(
                "initial state must be finite, got {:?}",
                self.initial
            )));
        }
        if !(self.t0.is_finite() && self.t1.is_finite() && self.t1 > self.t0) {
            return Err(invalid(format!(
                "time span must be finite with t1 > t0, got [{}, {}]",
                self.t0, self.t1
            )));
        }
        if self.sample_count < 2 {
            return Err(invalid(format!(
                "sample_count must be at least 2, got {}",
                self.sample_count
            )));
        }
        self.tolerances.validate()?;
        if !(self.tick_rate_hz.is_finite() && self.tick_rate_hz > 0.0) {
            return Err(invalid(format!(
                "tick_rate_hz must be positive, got {}",
                self.tick_rate_hz
            )));
        }
        if !(self.scale_pixels_per_meter.is_finite() && self.scale_pixels_per_meter > 0.0) {
            return Err(invalid(format!(
                "scale_pixels_per_meter must be positive, got {}",
                self.scale_pixels_per_meter
            )));
        }
        Ok(())
    }

    /// Maps meters to surface pixels with the pivot at the surface centre.
    pub fn screen_mapping(&self) -> ScreenMapping {
        ScreenMapping::new(self.surface_size * 0.5, self.scale_pixels_per_meter)
    }
}

fn invalid(msg: String) -> SimError {
    SimError::InvalidConfig(msg)
}
