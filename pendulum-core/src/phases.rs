//! Startup pipeline from configuration to a ready-to-play [`Playback`].
//!
//! All physics happens here, once, before the first frame is shown:
//! 1. [`solve_phase`] — validate the configuration and integrate the
//!    equations of motion into a [`SolutionTrace`].
//! 2. [`projection_phase`] — turn every sample into bob positions.
//! 3. [`prepare`] — run both and hand the frames to a [`Playback`].

use crate::{
    config::Config, dynamics::PhysicalParameters, error::Result, playback::Playback, projector,
    solution::SolutionTrace, types::Frame,
};
use log::info;

/// Validates `cfg` and integrates the pendulum over `[cfg.t0, cfg.t1]`.
///
/// ### Returns
/// - `Ok(SolutionTrace)` with exactly `cfg.sample_count` samples.
/// - `Err(SimError::InvalidConfig)` if a constant is out of range.
/// - `Err(SimError::IntegrationFailure)` if the solver gives up.
pub fn solve_phase(cfg: &Config) -> Result<SolutionTrace> {
    cfg.validate()?;
    info!(
        "integrating {} samples over [{}, {}] s",
        cfg.sample_count, cfg.t0, cfg.t1
    );
    let trace = SolutionTrace::integrate(
        &cfg.params,
        cfg.initial,
        cfg.t0,
        cfg.t1,
        cfg.sample_count,
        cfg.tolerances,
    )?;
    let stats = trace.stats();
    info!(
        "integration done: {} accepted / {} rejected steps, {} evaluations",
        stats.accepted_steps, stats.rejected_steps, stats.fn_evals
    );
    Ok(trace)
}

/// Projects the whole trace into frames, eagerly.
pub fn projection_phase(trace: &SolutionTrace, params: &PhysicalParameters) -> Vec<Frame> {
    projector::project_trace(trace, params)
}

/// Front-loads all physics and returns a playback on its first frame.
pub fn prepare(cfg: &Config) -> Result<Playback> {
    let trace = solve_phase(cfg)?;
    let frames = projection_phase(&trace, &cfg.params);
    Playback::new(
        frames,
        cfg.screen_mapping(),
        cfg.bob_radius_px,
        cfg.trail_policy,
    )
}
