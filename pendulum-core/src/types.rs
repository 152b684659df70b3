use glam::DVec2;

/// Instantaneous state of the double pendulum.
///
/// Angles are in radians measured from the downward vertical, angular
/// velocities in rad/s. The array form used by the integrator is
/// `[theta1, omega1, theta2, omega2]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StateVector {
    pub theta1: f64,
    pub omega1: f64,
    pub theta2: f64,
    pub omega2: f64,
}

impl StateVector {
    /// Packs the four components in integrator order.
    pub const fn new(theta1: f64, omega1: f64, theta2: f64, omega2: f64) -> Self {
        Self {
            theta1,
            omega1,
            theta2,
            omega2,
        }
    }

    /// A state with both links at the given angles and no motion.
    pub const fn at_rest(theta1: f64, theta2: f64) -> Self {
        Self::new(theta1, 0.0, theta2, 0.0)
    }

    /// `[theta1, omega1, theta2, omega2]`, the layout the integrator works on.
    pub const fn to_array(self) -> [f64; 4] {
        [self.theta1, self.omega1, self.theta2, self.omega2]
    }

    /// Inverse of [`StateVector::to_array`].
    pub const fn from_array(y: [f64; 4]) -> Self {
        Self::new(y[0], y[1], y[2], y[3])
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Cartesian bob positions for one sample, in meters, pivot at the origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Frame {
    pub bob1: DVec2,
    pub bob2: DVec2,
}
