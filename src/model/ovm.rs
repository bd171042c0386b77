/// The optimal velocity model with a follow-the-leader term.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimalVelocity {
    sensitivity: f64,
    relaxation: f64,
    max_vel: f64,
    jam_spacing: f64,
    shape: f64,
    length: f64,
}

/// The parameters of the optimal velocity model.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OvmParams {
    /// Gain on the difference to the optimal velocity, in 1/s.
    pub sensitivity: f64,
    /// Gain on the follow-the-leader term, in m<sup>2</sup>/s.
    pub relaxation: f64,
    /// The free-flow velocity in m/s.
    pub max_velocity: f64,
    /// The spacing scale of the velocity curve, in m.
    pub jam_spacing: f64,
    /// The dimensionless inflection point of the velocity curve.
    pub shape: f64,
}

impl OptimalVelocity {
    /// Creates a new model with the default vehicle length.
    pub fn new(params: &OvmParams) -> Self {
        Self {
            sensitivity: params.sensitivity,
            relaxation: params.relaxation,
            max_vel: params.max_velocity,
            jam_spacing: params.jam_spacing,
            shape: params.shape,
            length: super::VEHICLE_LENGTH,
        }
    }

    /// The model's parameters.
    pub fn params(&self) -> OvmParams {
        OvmParams {
            sensitivity: self.sensitivity,
            relaxation: self.relaxation,
            max_velocity: self.max_vel,
            jam_spacing: self.jam_spacing,
            shape: self.shape,
        }
    }

    pub fn vehicle_length(&self) -> f64 {
        self.length
    }

    pub fn max_velocity(&self) -> f64 {
        self.max_vel
    }

    pub(super) fn set_max_velocity(&mut self, vel: f64) {
        self.max_vel = vel;
    }

    /// Computes the acceleration of a vehicle.
    ///
    /// # Arguments
    /// * `spacing` - The gap to the vehicle ahead (m).
    /// * `vel` - The velocity of the simulated vehicle (m/s).
    /// * `spacing_rate` - The leader's velocity minus own velocity (m/s).
    ///
    /// The spacing is not guarded: at zero spacing, as left by a collision,
    /// the result is infinite, or NaN if the spacing rate is also zero.
    pub fn accelerate(&self, spacing: f64, vel: f64, spacing_rate: f64) -> f64 {
        let optimal = self.steady_state_velocity(spacing);
        self.sensitivity * (optimal - vel) + self.relaxation * (spacing_rate / spacing.powi(2))
    }

    /// The optimal velocity for the given spacing.
    pub fn steady_state_velocity(&self, spacing: f64) -> f64 {
        let offset = self.shape.tanh();
        let curve = (spacing / self.jam_spacing - self.shape).tanh();
        self.max_vel * (curve + offset) / (1. + offset)
    }

    /// The equilibrium spacing for the given velocity, or `None` if the
    /// velocity lies outside `[0, max_vel)`.
    pub fn steady_state_spacing(&self, vel: f64) -> Option<f64> {
        if !(0.0..self.max_vel).contains(&vel) {
            return None;
        }
        let offset = self.shape.tanh();
        let curve = vel * (1. + offset) / self.max_vel - offset;
        Some(self.jam_spacing * (curve.atanh() + self.shape))
    }
}
