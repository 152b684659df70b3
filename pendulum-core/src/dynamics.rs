//! Equations of motion for the planar double pendulum.
//!
//! Point masses on massless rigid rods, frictionless pivots, uniform
//! gravity. The closed form below divides by a coefficient that can get
//! arbitrarily small for some mass ratios and link angles; it is evaluated
//! as is and any non-finite result is left for the integrator to report.

use crate::{integrator::OdeSystem, types::StateVector};

/// Masses (kg), rod lengths (m) and the signed gravitational constant (m/s²).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicalParameters {
    pub m1: f64,
    pub m2: f64,
    pub l1: f64,
    pub l2: f64,
    pub g: f64,
}

/// Time derivative of `s` under the parameters `p`.
///
/// Returns `{omega1, domega1, omega2, domega2}` packed as a [`StateVector`].
/// Pure: the same input always yields bit-identical output.
pub fn derivative(s: &StateVector, p: &PhysicalParameters) -> StateVector {
    let PhysicalParameters { m1, m2, l1, l2, g } = *p;
    let m = m1 + m2;

    let delta = s.theta2 - s.theta1;
    let (sin_d, cos_d) = delta.sin_cos();
    let sin1 = s.theta1.sin();
    let sin2 = s.theta2.sin();
    let w1_sq = s.omega1 * s.omega1;
    let w2_sq = s.omega2 * s.omega2;

    let den1 = m * l1 - m2 * l1 * cos_d * cos_d;
    let den2 = (l2 / l1) * den1;

    let coupling1 = m2 * l1 * w1_sq * sin_d * cos_d + m2 * l2 * w2_sq * sin_d;
    let gravity1 = m2 * g * sin2 * cos_d - m * g * sin1;
    let domega1 = (coupling1 + gravity1) / den1;

    let coupling2 = -m2 * l2 * w2_sq * sin_d * cos_d - m * l1 * w1_sq * sin_d;
    let gravity2 = m * g * sin1 * cos_d - m * g * sin2;
    let domega2 = (coupling2 + gravity2) / den2;

    StateVector::new(s.omega1, domega1, s.omega2, domega2)
}

impl OdeSystem<4> for PhysicalParameters {
    #[inline]
    fn rhs(&self, _t: f64, y: &[f64; 4]) -> [f64; 4] {
        derivative(&StateVector::from_array(*y), self).to_array()
    }
}
