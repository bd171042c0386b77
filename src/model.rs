//! Car following models and their assignment to vehicles.

use crate::ModelId;
use slotmap::SlotMap;

pub use idm::{IdmParams, IntelligentDriver};
pub use ovm::{OptimalVelocity, OvmParams};

mod idm;
mod ovm;

/// The length of every simulated vehicle, in m.
pub const VEHICLE_LENGTH: f64 = 5.0; // m

/// A car following model, which maps a vehicle's local kinematic state to an acceleration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CarFollowingModel {
    /// The intelligent driver model.
    Idm(IntelligentDriver),
    /// The optimal velocity model with a follow-the-leader term.
    Ovm(OptimalVelocity),
}

impl CarFollowingModel {
    /// Computes the acceleration of a vehicle in m/s<sup>2</sup>.
    ///
    /// # Arguments
    /// * `spacing` - The gap to the vehicle ahead (m).
    /// * `vel` - The velocity of the simulated vehicle (m/s).
    /// * `spacing_rate` - The leader's velocity minus own velocity (m/s).
    pub fn accelerate(&self, spacing: f64, vel: f64, spacing_rate: f64) -> f64 {
        match self {
            Self::Idm(m) => m.accelerate(spacing, vel, spacing_rate),
            Self::Ovm(m) => m.accelerate(spacing, vel, spacing_rate),
        }
    }

    /// The velocity at which a vehicle with the given spacing has zero acceleration.
    pub fn steady_state_velocity(&self, spacing: f64) -> f64 {
        match self {
            Self::Idm(m) => m.steady_state_velocity(spacing),
            Self::Ovm(m) => m.steady_state_velocity(spacing),
        }
    }

    /// The spacing at which a vehicle with the given velocity has zero acceleration,
    /// if such a spacing exists.
    pub fn steady_state_spacing(&self, vel: f64) -> Option<f64> {
        match self {
            Self::Idm(m) => m.steady_state_spacing(vel),
            Self::Ovm(m) => m.steady_state_spacing(vel),
        }
    }

    /// The desired (free-flow) velocity in m/s.
    pub fn desired_speed(&self) -> f64 {
        match self {
            Self::Idm(m) => m.desired_velocity(),
            Self::Ovm(m) => m.max_velocity(),
        }
    }

    /// Sets the desired (free-flow) velocity, leaving every other parameter untouched.
    pub fn set_desired_speed(&mut self, vel: f64) {
        match self {
            Self::Idm(m) => m.set_desired_velocity(vel),
            Self::Ovm(m) => m.set_max_velocity(vel),
        }
    }

    /// The vehicle length in m.
    pub fn vehicle_length(&self) -> f64 {
        match self {
            Self::Idm(m) => m.vehicle_length(),
            Self::Ovm(m) => m.vehicle_length(),
        }
    }
}

impl From<IntelligentDriver> for CarFollowingModel {
    fn from(model: IntelligentDriver) -> Self {
        Self::Idm(model)
    }
}

impl From<OptimalVelocity> for CarFollowingModel {
    fn from(model: OptimalVelocity) -> Self {
        Self::Ovm(model)
    }
}

/// Assigns a car following model to every vehicle on the ring.
///
/// Vehicles index into a small set of shared model instances. Models inside a set
/// are never mutated; overriding a vehicle's model produces a new set holding an
/// independent copy, so vehicles sharing the original keep their behaviour.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelSet {
    /// The distinct model instances.
    models: SlotMap<ModelId, CarFollowingModel>,
    /// The model used by each vehicle, indexed by vehicle.
    assignment: Vec<ModelId>,
}

impl ModelSet {
    /// Creates a set in which all `count` vehicles share a single model.
    pub fn uniform(model: impl Into<CarFollowingModel>, count: usize) -> Self {
        let mut models = SlotMap::with_key();
        let id = models.insert(model.into());
        Self {
            models,
            assignment: vec![id; count],
        }
    }

    /// Creates a set in which every vehicle has its own model.
    pub fn from_models<M: Into<CarFollowingModel>>(iter: impl IntoIterator<Item = M>) -> Self {
        let mut models = SlotMap::with_key();
        let assignment = iter
            .into_iter()
            .map(|model| models.insert(model.into()))
            .collect();
        Self { models, assignment }
    }

    /// The number of vehicles covered by the set.
    pub fn len(&self) -> usize {
        self.assignment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignment.is_empty()
    }

    /// The model used by the given vehicle.
    pub fn get(&self, vehicle: usize) -> &CarFollowingModel {
        &self.models[self.assignment[vehicle]]
    }

    /// The ID of the model used by the given vehicle.
    pub fn id_of(&self, vehicle: usize) -> ModelId {
        self.assignment[vehicle]
    }

    /// Gets a model by ID.
    pub fn model(&self, id: ModelId) -> Option<&CarFollowingModel> {
        self.models.get(id)
    }

    /// The number of distinct model instances.
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Returns an iterator over the model of each vehicle, in vehicle order.
    pub fn iter(&self) -> impl Iterator<Item = &CarFollowingModel> {
        self.assignment.iter().map(|id| &self.models[*id])
    }

    /// Returns a copy of this set in which `vehicle` uses its own copy of its
    /// current model, with the desired velocity replaced by `vel`.
    pub fn with_desired_speed(&self, vehicle: usize, vel: f64) -> Self {
        let mut model = self.get(vehicle).clone();
        model.set_desired_speed(vel);
        let mut set = self.clone();
        set.assignment[vehicle] = set.models.insert(model);
        set.prune();
        set
    }

    /// Removes models which no vehicle uses.
    fn prune(&mut self) {
        let assignment = &self.assignment;
        self.models.retain(|id, _| assignment.contains(&id));
    }
}

impl PartialEq for ModelSet {
    /// Two sets are equal if every vehicle uses an equal model.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ovm() -> CarFollowingModel {
        OptimalVelocity::new(&OvmParams {
            sensitivity: 0.8,
            relaxation: 20.0,
            max_velocity: 9.8,
            jam_spacing: 2.0,
            shape: 2.0,
        })
        .into()
    }

    #[test]
    fn uniform_set_shares_one_model() {
        let set = ModelSet::uniform(ovm(), 22);
        assert_eq!(set.len(), 22);
        assert_eq!(set.model_count(), 1);
        assert!((0..22).all(|i| set.id_of(i) == set.id_of(0)));
    }

    #[test]
    fn override_copies_before_mutating() {
        let original = ModelSet::uniform(ovm(), 4);
        let overridden = original.with_desired_speed(0, 7.0);

        assert_eq!(original.get(0).desired_speed(), 9.8);
        assert_eq!(overridden.get(0).desired_speed(), 7.0);
        assert_eq!(overridden.model_count(), 2);
        assert_ne!(overridden.id_of(0), overridden.id_of(1));
        for i in 1..4 {
            assert_eq!(overridden.get(i), original.get(i));
        }
        assert_ne!(overridden, original);
    }

    #[test]
    fn repeated_override_does_not_accumulate() {
        let original = ModelSet::from_models([ovm(), ovm()]);
        let once = original.with_desired_speed(1, 5.0);
        let twice = once.with_desired_speed(1, 6.0);
        assert_eq!(twice.model_count(), 2);
        assert_eq!(twice.get(1).desired_speed(), 6.0);
        assert_eq!(twice.get(0), original.get(0));
    }

    #[test]
    fn set_desired_speed_keeps_other_params() {
        let mut model = ovm();
        model.set_desired_speed(3.0);
        match model {
            CarFollowingModel::Ovm(m) => {
                let params = m.params();
                assert_eq!(params.max_velocity, 3.0);
                assert_eq!(params.sensitivity, 0.8);
                assert_eq!(params.relaxation, 20.0);
            }
            CarFollowingModel::Idm(_) => unreachable!(),
        }
    }
}
