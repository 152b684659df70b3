use crate::{
    dynamics::PhysicalParameters,
    error::Result,
    integrator::{DenseSamples, Dopri5, SolverStats, Tolerances},
    types::StateVector,
};

/// The pendulum's state sampled on a uniform grid over `[t0, t1]`.
///
/// Built once by [`SolutionTrace::integrate`] and read-only afterwards.
/// The first sample is the initial state exactly, the first and last
/// times are `t0` and `t1` exactly, and times strictly increase.
#[derive(Clone, Debug, PartialEq)]
pub struct SolutionTrace {
    times: Vec<f64>,
    states: Vec<StateVector>,
    stats: SolverStats,
}

impl SolutionTrace {
    /// Integrates the double pendulum over `[t0, t1]` and samples it
    /// `samples` times.
    ///
    /// ### Parameters
    /// - `params` - Masses, lengths and gravity.
    /// - `initial` - State at `t0`.
    /// - `t0`, `t1` - Span bounds, `t1 > t0`.
    /// - `samples` - Number of equally spaced samples, at least 2.
    /// - `tolerances` - Local error targets for the adaptive solver.
    ///
    /// ### Returns
    /// The full trace, or the first error encountered. No partial trace is
    /// ever produced.
    pub fn integrate(
        params: &PhysicalParameters,
        initial: StateVector,
        t0: f64,
        t1: f64,
        samples: usize,
        tolerances: Tolerances,
    ) -> Result<Self> {
        Dopri5::new(tolerances)
            .solve(params, t0, t1, initial.to_array(), samples)
            .map(Self::from)
    }

    /// Number of samples, equal to the requested sample count.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Sample times, strictly increasing from `t0` to `t1`.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// States aligned index for index with [`SolutionTrace::times`].
    pub fn states(&self) -> &[StateVector] {
        &self.states
    }

    /// Step and evaluation counters from the solve that produced this trace.
    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    /// `(t, state)` pairs in time order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, StateVector)> + '_ {
        self.times.iter().copied().zip(self.states.iter().copied())
    }

    pub fn first(&self) -> Option<(f64, StateVector)> {
        self.iter().next()
    }

    /// The sample at `t1`, or `None` for an empty trace.
    pub fn last(&self) -> Option<(f64, StateVector)> {
        if self.is_empty() {
            return None;
        }
        let i = self.len() - 1;
        Some((self.times[i], self.states[i]))
    }
}

impl From<DenseSamples<4>> for SolutionTrace {
    fn from(samples: DenseSamples<4>) -> Self {
        Self {
            times: samples.times,
            states: samples
                .states
                .into_iter()
                .map(StateVector::from_array)
                .collect(),
            stats: samples.stats,
        }
    }
}
