/// The smallest spacing used when evaluating the model, in m.
/// Keeps the interaction term finite when vehicles touch.
const MIN_SPACING: f64 = 1e-3; // m

/// Iterations used when inverting the equilibrium relation.
const BISECTION_ITERS: usize = 100;

/// The intelligent driver model.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntelligentDriver {
    max_acc: f64,
    comf_dec: f64,
    desired_vel: f64,
    exponent: f64,
    headway: f64,
    min_gap: f64,
    length: f64,
}

/// The parameters of the intelligent driver model.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IdmParams {
    /// The vehicle's maximum acceleration in m/s<sup>2</sup>.
    pub max_acceleration: f64,
    /// The comfortable deceleration in m/s<sup>2</sup>, a positive number.
    pub comf_deceleration: f64,
    /// The free-flow velocity in m/s.
    pub desired_velocity: f64,
    /// The acceleration exponent.
    pub exponent: f64,
    /// The desired time headway in s.
    pub time_headway: f64,
    /// The jam spacing in m.
    pub min_gap: f64,
}

impl IntelligentDriver {
    /// Creates a new model with the default vehicle length.
    pub fn new(params: &IdmParams) -> Self {
        Self {
            max_acc: params.max_acceleration,
            comf_dec: params.comf_deceleration,
            desired_vel: params.desired_velocity,
            exponent: params.exponent,
            headway: params.time_headway,
            min_gap: params.min_gap,
            length: super::VEHICLE_LENGTH,
        }
    }

    /// The model's parameters.
    pub fn params(&self) -> IdmParams {
        IdmParams {
            max_acceleration: self.max_acc,
            comf_deceleration: self.comf_dec,
            desired_velocity: self.desired_vel,
            exponent: self.exponent,
            time_headway: self.headway,
            min_gap: self.min_gap,
        }
    }

    pub fn vehicle_length(&self) -> f64 {
        self.length
    }

    pub fn desired_velocity(&self) -> f64 {
        self.desired_vel
    }

    pub(super) fn set_desired_velocity(&mut self, vel: f64) {
        self.desired_vel = vel;
    }

    /// Computes the acceleration of a vehicle.
    ///
    /// # Arguments
    /// * `spacing` - The gap to the vehicle ahead (m).
    /// * `vel` - The velocity of the simulated vehicle (m/s).
    /// * `spacing_rate` - The leader's velocity minus own velocity (m/s).
    pub fn accelerate(&self, spacing: f64, vel: f64, spacing_rate: f64) -> f64 {
        let spacing = if spacing.abs() < MIN_SPACING {
            MIN_SPACING
        } else {
            spacing
        };
        let factor = 1. / (2. * (self.max_acc * self.comf_dec).sqrt());
        let dynamic = vel * self.headway - vel * spacing_rate * factor;
        let ss = self.min_gap + f64::max(0.0, dynamic);
        let free = (vel / self.desired_vel).powf(self.exponent);
        let term = ss / spacing;
        self.max_acc * (1. - free - term * term)
    }

    /// The equilibrium spacing for the given velocity, or `None` if the
    /// velocity is not below the desired velocity.
    pub fn steady_state_spacing(&self, vel: f64) -> Option<f64> {
        let free = 1. - (vel / self.desired_vel).powf(self.exponent);
        (vel >= 0.0 && free > 0.0).then(|| (self.min_gap + vel * self.headway) / free.sqrt())
    }

    /// The equilibrium velocity for the given spacing.
    ///
    /// The equilibrium spacing grows monotonically with velocity on
    /// `[0, desired_vel)`, so the relation is inverted by bisection.
    pub fn steady_state_velocity(&self, spacing: f64) -> f64 {
        if spacing <= self.min_gap {
            return 0.0;
        }
        let (mut lo, mut hi) = (0.0, self.desired_vel);
        for _ in 0..BISECTION_ITERS {
            let mid = 0.5 * (lo + hi);
            match self.steady_state_spacing(mid) {
                Some(s) if s < spacing => lo = mid,
                _ => hi = mid,
            }
        }
        0.5 * (lo + hi)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn model() -> IntelligentDriver {
        IntelligentDriver::new(&IdmParams {
            max_acceleration: 1.0,
            comf_deceleration: 1.5,
            desired_velocity: 15.0,
            exponent: 4.0,
            time_headway: 1.5,
            min_gap: 2.0,
        })
    }

    #[test]
    fn free_road_acceleration() {
        let idm = model();
        // Standing start with an enormous gap is close to the maximum acceleration.
        assert_approx_eq!(idm.accelerate(1e6, 0.0, 0.0), 1.0, 1e-6);
        // At the desired velocity only the interaction term remains.
        assert!(idm.accelerate(1e6, 15.0, 0.0) < 0.0);
    }

    #[test]
    fn braking_term_only_when_closing() {
        let idm = model();
        // A leader pulling away cannot shrink the desired gap below `min_gap`.
        let receding = idm.accelerate(10.0, 5.0, 100.0);
        assert_approx_eq!(receding, 1.0 - (5.0f64 / 15.0).powi(4) - 0.04);
        let closing = idm.accelerate(10.0, 5.0, -2.0);
        assert!(closing < idm.accelerate(10.0, 5.0, 0.0));
    }

    #[test]
    fn zero_spacing_is_finite() {
        let idm = model();
        let acc = idm.accelerate(0.0, 3.0, 0.0);
        assert!(acc.is_finite());
        assert_approx_eq!(acc, idm.accelerate(1e-3, 3.0, 0.0));
    }

    #[test]
    fn steady_state_round_trip() {
        let idm = model();
        let vel = idm.steady_state_velocity(10.0);
        assert!(vel > 5.0 && vel < 5.5);
        assert_approx_eq!(idm.steady_state_spacing(vel).unwrap(), 10.0, 1e-9);
        assert_approx_eq!(idm.accelerate(10.0, vel, 0.0), 0.0, 1e-9);
        assert_eq!(idm.steady_state_spacing(15.0), None);
        assert_eq!(idm.steady_state_velocity(1.0), 0.0);
    }
}
