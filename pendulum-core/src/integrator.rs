//! Adaptive Dormand–Prince 5(4) integration with dense output.
//!
//! The solver advances with its own step sizes, chosen so that the embedded
//! 4th-order error estimate stays under `atol + rtol * |y|` in the RMS norm,
//! and reports the solution on a uniform sample grid by evaluating the
//! 4th-order continuous extension of each accepted step. The sample grid
//! never influences the step sequence, so the trace is identical whether
//! 10 or 10 000 samples are requested at the shared times.
//!
//! Failure is all-or-nothing: a non-finite derivative, a step that shrinks
//! below the floating-point resolution of `t`, or an exhausted step budget
//! aborts the whole span with [`SimError::IntegrationFailure`].

use crate::error::{FailureCause, Result, SimError};
use log::debug;

/// A first-order system `dy/dt = f(t, y)` with `N` real components.
pub trait OdeSystem<const N: usize> {
    fn rhs(&self, t: f64, y: &[f64; N]) -> [f64; N];
}

/// Relative/absolute local error targets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            rtol: 1e-3,
            atol: 1e-6,
        }
    }
}

impl Tolerances {
    pub fn new(rtol: f64, atol: f64) -> Self {
        Self { rtol, atol }
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !(positive(self.rtol) && positive(self.atol)) {
            return Err(SimError::InvalidConfig(format!(
                "tolerances must be positive and finite, got rtol = {}, atol = {}",
                self.rtol, self.atol
            )));
        }
        Ok(())
    }
}

/// Counters collected during one [`Dopri5::solve`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub fn_evals: usize,
}

/// Samples of an `N`-dimensional solution on a uniform time grid.
///
/// `times` starts at `t0`, ends at `t1` exactly and is strictly increasing;
/// `states[0]` is the initial value as given.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseSamples<const N: usize> {
    pub times: Vec<f64>,
    pub states: Vec<[f64; N]>,
    pub stats: SolverStats,
}

// Dormand–Prince 5(4) tableau.
const C: [f64; 6] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0];

const A: [[f64; 5]; 6] = [
    [0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
    ],
];

const B: [f64; 6] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];

// Difference between the 5th- and embedded 4th-order weights (7 stages, FSAL).
const E: [f64; 7] = [
    -71.0 / 57600.0,
    0.0,
    71.0 / 16695.0,
    -71.0 / 1920.0,
    17253.0 / 339200.0,
    -22.0 / 525.0,
    1.0 / 40.0,
];

// Continuous extension: y(t + θh) = y + h * Σ_s k_s * Σ_j P[s][j] θ^(j+1).
const P: [[f64; 4]; 7] = [
    [
        1.0,
        -8048581381.0 / 2820520608.0,
        8663915743.0 / 2820520608.0,
        -12715105075.0 / 11282082432.0,
    ],
    [0.0, 0.0, 0.0, 0.0],
    [
        0.0,
        131558114200.0 / 32700410799.0,
        -68118460800.0 / 10900136933.0,
        87487479700.0 / 32700410799.0,
    ],
    [
        0.0,
        -1754552775.0 / 470086768.0,
        14199869525.0 / 1410260304.0,
        -10690763975.0 / 1880347072.0,
    ],
    [
        0.0,
        127303824393.0 / 49829197408.0,
        -318862633887.0 / 49829197408.0,
        701980252875.0 / 199316789632.0,
    ],
    [
        0.0,
        -282668133.0 / 205662961.0,
        2019193451.0 / 616988883.0,
        -1453857185.0 / 822651844.0,
    ],
    [
        0.0,
        40617522.0 / 29380423.0,
        -110615467.0 / 29380423.0,
        69997945.0 / 29380423.0,
    ],
];

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
const ERROR_EXPONENT: f64 = -1.0 / 5.0;

/// Adaptive explicit Runge–Kutta 5(4) solver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dopri5 {
    pub tolerances: Tolerances,
    /// Upper bound on the internal step; `f64::INFINITY` means the span length.
    pub max_step: f64,
    /// Budget of attempted steps (accepted plus rejected).
    pub max_steps: usize,
}

impl Default for Dopri5 {
    fn default() -> Self {
        Self::new(Tolerances::default())
    }
}

impl Dopri5 {
    pub fn new(tolerances: Tolerances) -> Self {
        Self {
            tolerances,
            max_step: f64::INFINITY,
            max_steps: 1_000_000,
        }
    }

    pub fn with_max_step(mut self, max_step: f64) -> Self {
        self.max_step = max_step;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Integrates `sys` from `(t0, y0)` to `t1` and samples `samples`
    /// equally spaced times covering `[t0, t1]` inclusive.
    ///
    /// ### Parameters
    /// - `sys` - Right-hand side of the ODE.
    /// - `t0`, `t1` - Span bounds; `t1` must be greater than `t0`.
    /// - `y0` - Initial value; reported unchanged as the first sample.
    /// - `samples` - Number of grid points, at least 2.
    ///
    /// ### Returns
    /// - `Ok(DenseSamples)` with exactly `samples` entries.
    /// - `Err(SimError::InvalidConfig)` for a malformed request.
    /// - `Err(SimError::IntegrationFailure)` if the span cannot be completed.
    pub fn solve<S, const N: usize>(
        &self,
        sys: &S,
        t0: f64,
        t1: f64,
        y0: [f64; N],
        samples: usize,
    ) -> Result<DenseSamples<N>>
    where
        S: OdeSystem<N> + ?Sized,
    {
        self.tolerances.validate()?;
        let grid = sample_grid(t0, t1, samples)?;
        if y0.iter().any(|v| !v.is_finite()) {
            return Err(SimError::InvalidConfig(format!(
                "initial value must be finite, got {y0:?}"
            )));
        }
        if !(self.max_step > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "max_step must be positive, got {}",
                self.max_step
            )));
        }

        let mut stepper = Stepper::new(sys, self, t0, y0);
        let mut times = Vec::with_capacity(samples);
        let mut states = Vec::with_capacity(samples);

        times.push(t0);
        states.push(y0);
        let mut next = 1;

        stepper.start(t1)?;
        while next < grid.len() {
            let step = stepper.advance(t1)?;
            while next < grid.len() && grid[next] <= step.t_new {
                let t = grid[next];
                let y = if t == step.t_new {
                    stepper.y
                } else {
                    step.interpolate(t)
                };
                times.push(t);
                states.push(y);
                next += 1;
            }
        }

        debug!(
            "dopri5 finished [{t0}, {t1}]: {} accepted, {} rejected, {} evaluations",
            stepper.stats.accepted_steps, stepper.stats.rejected_steps, stepper.stats.fn_evals
        );

        Ok(DenseSamples {
            times,
            states,
            stats: stepper.stats,
        })
    }
}

/// `samples` equally spaced times over `[t0, t1]`, last one pinned to `t1`.
fn sample_grid(t0: f64, t1: f64, samples: usize) -> Result<Vec<f64>> {
    if !(t0.is_finite() && t1.is_finite() && t1 > t0) {
        return Err(SimError::InvalidConfig(format!(
            "time span must be finite with t1 > t0, got [{t0}, {t1}]"
        )));
    }
    if samples < 2 {
        return Err(SimError::InvalidConfig(format!(
            "at least 2 samples are required, got {samples}"
        )));
    }

    let step = (t1 - t0) / (samples - 1) as f64;
    let mut grid: Vec<f64> = (0..samples).map(|i| t0 + i as f64 * step).collect();
    grid[samples - 1] = t1;

    if grid.windows(2).any(|w| w[1] <= w[0]) {
        return Err(SimError::InvalidConfig(format!(
            "{samples} samples over [{t0}, {t1}] are not distinct in f64"
        )));
    }
    Ok(grid)
}

/// One accepted step, kept for dense output over `[t_old, t_new]`.
struct AcceptedStep<const N: usize> {
    t_old: f64,
    t_new: f64,
    h: f64,
    y_old: [f64; N],
    q: [[f64; 4]; N],
}

impl<const N: usize> AcceptedStep<N> {
    fn interpolate(&self, t: f64) -> [f64; N] {
        let x = (t - self.t_old) / self.h;
        let powers = [x, x * x, x * x * x, x * x * x * x];
        let mut y = self.y_old;
        for (yi, qi) in y.iter_mut().zip(&self.q) {
            let poly: f64 = qi.iter().zip(&powers).map(|(q, p)| q * p).sum();
            *yi += self.h * poly;
        }
        y
    }
}

/// Mutable integration state between accepted steps.
struct Stepper<'a, S: ?Sized, const N: usize> {
    sys: &'a S,
    cfg: &'a Dopri5,
    t: f64,
    y: [f64; N],
    f: [f64; N],
    h_abs: f64,
    stats: SolverStats,
}

impl<'a, S, const N: usize> Stepper<'a, S, N>
where
    S: OdeSystem<N> + ?Sized,
{
    fn new(sys: &'a S, cfg: &'a Dopri5, t0: f64, y0: [f64; N]) -> Self {
        Self {
            sys,
            cfg,
            t: t0,
            y: y0,
            f: [0.0; N],
            h_abs: 0.0,
            stats: SolverStats::default(),
        }
    }

    fn eval(&mut self, t: f64, y: &[f64; N]) -> Result<[f64; N]> {
        self.stats.fn_evals += 1;
        let dy = self.sys.rhs(t, y);
        if dy.iter().all(|v| v.is_finite()) {
            Ok(dy)
        } else {
            Err(self.failure(FailureCause::NonFiniteDerivative))
        }
    }

    fn failure(&self, cause: FailureCause) -> SimError {
        SimError::IntegrationFailure {
            cause,
            t: self.t,
            state: self.y.to_vec(),
        }
    }

    fn max_step(&self, t1: f64) -> f64 {
        self.cfg.max_step.min(t1 - self.t)
    }

    /// Evaluates `f(t0, y0)` and picks the first step size.
    fn start(&mut self, t1: f64) -> Result<()> {
        let y0 = self.y;
        self.f = self.eval(self.t, &y0)?;
        self.h_abs = self.initial_step(t1)?;
        Ok(())
    }

    fn initial_step(&mut self, t1: f64) -> Result<f64> {
        let Tolerances { rtol, atol } = self.cfg.tolerances;
        let (t0, y0, f0) = (self.t, self.y, self.f);

        let scale: [f64; N] = std::array::from_fn(|i| atol + y0[i].abs() * rtol);
        let scaled_y0: [f64; N] = std::array::from_fn(|i| y0[i] / scale[i]);
        let scaled_f0: [f64; N] = std::array::from_fn(|i| f0[i] / scale[i]);
        let d0 = rms_norm(&scaled_y0);
        let d1 = rms_norm(&scaled_f0);

        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        }
        .min(self.max_step(t1));

        let y1: [f64; N] = std::array::from_fn(|i| y0[i] + h0 * f0[i]);
        let f1 = self.eval(t0 + h0, &y1)?;
        let scaled_df: [f64; N] = std::array::from_fn(|i| (f1[i] - f0[i]) / scale[i]);
        let d2 = rms_norm(&scaled_df) / h0;

        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / 5.0)
        };

        Ok((100.0 * h0).min(h1).min(self.max_step(t1)))
    }

    /// Takes one accepted step towards `t1`, retrying with smaller steps
    /// until the local error estimate is within tolerance.
    fn advance(&mut self, t1: f64) -> Result<AcceptedStep<N>> {
        let Tolerances { rtol, atol } = self.cfg.tolerances;
        let min_step = (10.0 * f64::EPSILON * self.t.abs()).max(f64::MIN_POSITIVE);

        self.h_abs = self.h_abs.min(self.max_step(t1)).max(min_step);
        let mut rejected = false;

        loop {
            if self.stats.accepted_steps + self.stats.rejected_steps >= self.cfg.max_steps {
                return Err(self.failure(FailureCause::TooManySteps(self.cfg.max_steps)));
            }
            if self.h_abs < min_step {
                return Err(self.failure(FailureCause::StepSizeUnderflow(self.h_abs)));
            }

            let mut t_new = self.t + self.h_abs;
            if t_new > t1 {
                t_new = t1;
            }
            let h = t_new - self.t;

            let (y_new, k) = self.rk_step(h)?;

            let err: [f64; N] = std::array::from_fn(|i| {
                let e: f64 = (0..7).map(|s| E[s] * k[s][i]).sum();
                let sc = atol + self.y[i].abs().max(y_new[i].abs()) * rtol;
                h * e / sc
            });
            let err_norm = rms_norm(&err);

            if err_norm < 1.0 {
                let mut factor = if err_norm == 0.0 {
                    MAX_FACTOR
                } else {
                    (SAFETY * err_norm.powf(ERROR_EXPONENT)).min(MAX_FACTOR)
                };
                if rejected {
                    factor = factor.min(1.0);
                }

                let q: [[f64; 4]; N] = std::array::from_fn(|i| {
                    std::array::from_fn(|j| (0..7).map(|s| k[s][i] * P[s][j]).sum())
                });
                let step = AcceptedStep {
                    t_old: self.t,
                    t_new,
                    h,
                    y_old: self.y,
                    q,
                };

                self.t = t_new;
                self.y = y_new;
                self.f = k[6];
                self.h_abs *= factor;
                self.stats.accepted_steps += 1;
                return Ok(step);
            }

            self.h_abs *= (SAFETY * err_norm.powf(ERROR_EXPONENT)).max(MIN_FACTOR);
            self.stats.rejected_steps += 1;
            rejected = true;
        }
    }

    /// Stages of one trial step of size `h`; `k[6]` is `f(t + h, y_new)`.
    fn rk_step(&mut self, h: f64) -> Result<([f64; N], [[f64; N]; 7])> {
        let mut k = [[0.0; N]; 7];
        k[0] = self.f;

        for s in 1..6 {
            let y_stage: [f64; N] = std::array::from_fn(|i| {
                let dy: f64 = (0..s).map(|j| A[s][j] * k[j][i]).sum();
                self.y[i] + h * dy
            });
            k[s] = self.eval(self.t + C[s] * h, &y_stage)?;
        }

        let y_new: [f64; N] = std::array::from_fn(|i| {
            let dy: f64 = (0..6).map(|s| B[s] * k[s][i]).sum();
            self.y[i] + h * dy
        });
        k[6] = self.eval(self.t + h, &y_new)?;

        Ok((y_new, k))
    }
}

fn rms_norm<const N: usize>(v: &[f64; N]) -> f64 {
    if N == 0 {
        return 0.0;
    }
    (v.iter().map(|x| x * x).sum::<f64>() / N as f64).sqrt()
}
