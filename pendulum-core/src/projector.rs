use crate::{
    dynamics::PhysicalParameters,
    solution::SolutionTrace,
    types::{Frame, StateVector},
};
use glam::DVec2;

/// Cartesian bob positions for one state, pivot at the origin, `y` up.
///
/// `bob1 = l1 * (sin θ1, -cos θ1)` and `bob2 = bob1 + l2 * (sin θ2, -cos θ2)`.
#[inline]
pub fn project(s: &StateVector, p: &PhysicalParameters) -> Frame {
    let (sin1, cos1) = s.theta1.sin_cos();
    let (sin2, cos2) = s.theta2.sin_cos();

    let bob1 = DVec2::new(p.l1 * sin1, -p.l1 * cos1);
    let bob2 = bob1 + DVec2::new(p.l2 * sin2, -p.l2 * cos2);
    Frame { bob1, bob2 }
}

/// Projects every sample of `trace`, in order.
pub fn project_trace(trace: &SolutionTrace, p: &PhysicalParameters) -> Vec<Frame> {
    trace.states().iter().map(|s| project(s, p)).collect()
}
