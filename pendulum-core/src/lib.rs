//! Double pendulum trajectory generation and looping playback.
//!
//! Main components:
//! - [`dynamics`] — physical parameters and the equations of motion.
//! - [`integrator`] — adaptive Dormand–Prince 5(4) solver with dense output.
//! - [`solution`] — the sampled solution trace of one run.
//! - [`projector`] — angular state to Cartesian bob positions.
//! - [`playback`] — frame playback state machine and host traits.
//! - [`trail`] — accumulated outer-bob path and its retention policy.
//! - [`phases`] — startup pipeline from [`config::Config`] to playback.
//! - [`config`] — startup constants.
//! - [`error`] — error types.
//! - [`types`] — shared state and frame types.

pub mod config;
pub mod dynamics;
pub mod error;
pub mod integrator;
pub mod phases;
pub mod playback;
pub mod projector;
pub mod solution;
pub mod trail;
pub mod types;

pub use config::Config;
pub use error::{FailureCause, Result, SimError};
