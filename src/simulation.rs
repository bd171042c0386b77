use crate::control::{ControlContext, SpeedLimitController};
use crate::error::{ConfigError, Error, Result};
use crate::history::History;
use crate::model::ModelSet;
use crate::sensor::{RoadsideSensor, SensorLog};
use crate::util::ring_pairs;
use log::{info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// The smallest initial gap between neighbouring vehicles, in m.
const MIN_INITIAL_SPACING: f64 = 1.0; // m

/// A simulation of vehicles following one another around a ring road.
///
/// Vehicle `i` follows vehicle `i + 1`, and the last vehicle follows vehicle 0.
pub struct RingSimulation {
    /// The attributes the simulation was created with.
    attributes: RingAttributes,
    /// The models the simulation was created with.
    original: ModelSet,
    /// The models used for the next step.
    working: ModelSet,
    /// The speed limit controller.
    controller: SpeedLimitController,
    /// The state of every vehicle at every step.
    history: History,
    /// The roadside sensor at the origin of the ring.
    sensor: RoadsideSensor,
    /// Every collision so far.
    collisions: Vec<Collision>,
    /// The index of the most recently committed step.
    step: usize,
    /// The source of velocity perturbations.
    rng: ChaCha8Rng,
    /// The distribution of velocity perturbations.
    noise: Normal<f64>,
    /// Whether perturbations were applied during the previous step.
    perturbing: bool,
    /// Whether the controller has been consulted yet.
    controlling: bool,
}

/// The attributes of a ring road simulation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RingAttributes {
    /// The circumference of the ring in m.
    pub ring_length: f64,
    /// The number of vehicles on the ring.
    pub num_vehicles: usize,
    /// The duration of the run in s.
    pub total_sim_time: f64,
    /// The integration time step in s.
    pub time_step: f64,
    /// The time in s, from the start, during which no perturbations are applied.
    pub settle_time: f64,
    /// The time in s, from the start, at which perturbations stop.
    pub noise_injection_duration: f64,
    /// The standard deviation of the velocity perturbation applied per step, in m/s.
    pub noise_std_dev: f64,
    /// The controller is consulted before computing every state whose time is after this, in s.
    pub control_activation_time: f64,
    /// The initial velocity of every vehicle in m/s.
    pub initial_velocity: f64,
    /// Seeds the perturbations. A random seed is used if `None`.
    pub seed: Option<u64>,
}

impl Default for RingAttributes {
    fn default() -> Self {
        Self {
            ring_length: 100.0,
            num_vehicles: 22,
            total_sim_time: 900.0,
            time_step: 0.1,
            settle_time: 3.0,
            noise_injection_duration: 50.0,
            noise_std_dev: 0.05,
            control_activation_time: 300.0,
            initial_velocity: 0.0,
            seed: None,
        }
    }
}

/// A vehicle's spacing which would have become negative during a step.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Collision {
    /// The index of the step that was being computed.
    pub step: usize,
    /// The time of that step in s.
    pub time: f64,
    /// The following vehicle.
    pub vehicle: usize,
    /// How far the spacing would have fallen below zero, in m.
    pub overlap: f64,
}

impl RingAttributes {
    /// Checks that the attributes describe a runnable simulation.
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        let dt = self.time_step;
        if self.num_vehicles == 0 {
            return Err(ConfigError::NoVehicles);
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ConfigError::TimeStep(dt));
        }
        if !(self.total_sim_time.is_finite() && self.total_sim_time >= dt) {
            return Err(ConfigError::TotalTime {
                total: self.total_sim_time,
                dt,
            });
        }
        if !(self.ring_length / self.num_vehicles as f64 >= MIN_INITIAL_SPACING) {
            return Err(ConfigError::RingTooShort {
                length: self.ring_length,
                count: self.num_vehicles,
                min_spacing: MIN_INITIAL_SPACING,
            });
        }
        if self.noise_injection_duration > self.total_sim_time {
            return Err(ConfigError::NoiseWindow {
                noise_end: self.noise_injection_duration,
                total: self.total_sim_time,
            });
        }
        if !(self.noise_std_dev.is_finite() && self.noise_std_dev >= 0.0) {
            return Err(ConfigError::NoiseStdDev(self.noise_std_dev));
        }
        if !(self.settle_time.is_finite() && self.settle_time >= 0.0) {
            return Err(ConfigError::SettleTime(self.settle_time));
        }
        if !(self.initial_velocity.is_finite() && self.initial_velocity >= 0.0) {
            return Err(ConfigError::InitialVelocity(self.initial_velocity));
        }
        Ok(())
    }

    /// The number of states recorded over the run, including the initial state.
    pub fn num_steps(&self) -> usize {
        (self.total_sim_time / self.time_step).floor() as usize
    }
}

impl RingSimulation {
    /// Creates a new simulation with evenly spaced vehicles.
    ///
    /// # Parameters
    /// * `attributes` - The attributes of the simulation
    /// * `models` - The car following model of each vehicle
    /// * `controller` - The speed limit controller
    pub fn new(
        attributes: RingAttributes,
        models: ModelSet,
        controller: SpeedLimitController,
    ) -> std::result::Result<Self, ConfigError> {
        attributes.validate()?;
        let count = attributes.num_vehicles;
        if models.len() != count {
            return Err(ConfigError::ModelCount {
                expected: count,
                actual: models.len(),
            });
        }
        if let Some(vehicle) = controller.target_vehicle().filter(|v| *v >= count) {
            return Err(ConfigError::VehicleOutOfRange { vehicle, count });
        }
        let noise = Normal::new(0.0, attributes.noise_std_dev)
            .map_err(|_| ConfigError::NoiseStdDev(attributes.noise_std_dev))?;
        let rng = match attributes.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut history = History::new(count, attributes.num_steps());
        let spacing = attributes.ring_length / count as f64;
        let init = history.initial_mut();
        for veh in 0..count {
            init.pos[veh] = veh as f64 * spacing;
            init.vel[veh] = attributes.initial_velocity;
            init.spacing[veh] = spacing;
        }
        let sensor = RoadsideSensor::new(attributes.ring_length, history.positions(0));

        Ok(Self {
            attributes,
            working: models.clone(),
            original: models,
            controller,
            history,
            sensor,
            collisions: vec![],
            step: 0,
            rng,
            noise,
            perturbing: false,
            controlling: false,
        })
    }

    /// Advances the simulation by one time step.
    pub fn step(&mut self) -> Result<()> {
        if self.is_finished() {
            return Err(Error::Finished { steps: self.step });
        }
        // Phases are decided by the time of the state about to be computed.
        let time = (self.step + 1) as f64 * self.attributes.time_step;

        if time > self.attributes.control_activation_time {
            if !self.controlling {
                info!("speed limit control active from {:.1} s", time);
                self.controlling = true;
            }
            let ctx = ControlContext {
                time,
                positions: self.history.positions(self.step),
                velocities: self.history.velocities(self.step),
                sensor: self.sensor.log(),
            };
            self.working = self.controller.update(&self.original, &ctx)?;
        }

        let perturb = self.attributes.settle_time <= time
            && time < self.attributes.noise_injection_duration;
        if perturb != self.perturbing {
            match perturb {
                true => info!("injecting velocity perturbations from {:.1} s", time),
                false => info!("velocity perturbations stopped at {:.1} s", time),
            }
            self.perturbing = perturb;
        }

        self.integrate(perturb);
        Ok(())
    }

    /// Runs the simulation until every step has been simulated.
    pub fn run(&mut self) -> Result<()> {
        while !self.is_finished() {
            self.step()?;
        }
        info!("simulation finished at time {:.1} s", self.time());
        Ok(())
    }

    /// Whether every step has been simulated.
    pub fn is_finished(&self) -> bool {
        self.step + 1 >= self.history.steps()
    }

    /// Gets the index of the most recently simulated step.
    pub fn step_index(&self) -> usize {
        self.step
    }

    /// Gets the time of the most recently simulated step, in s.
    pub fn time(&self) -> f64 {
        self.step as f64 * self.attributes.time_step
    }

    /// The attributes the simulation was created with.
    pub fn attributes(&self) -> &RingAttributes {
        &self.attributes
    }

    /// The state of every vehicle at every step simulated so far.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// The samples recorded by the roadside sensor.
    pub fn sensor_log(&self) -> &SensorLog {
        self.sensor.log()
    }

    /// Every collision so far.
    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }

    /// The models the simulation was created with.
    pub fn original_models(&self) -> &ModelSet {
        &self.original
    }

    /// The models used for the most recent step.
    pub fn working_models(&self) -> &ModelSet {
        &self.working
    }

    /// The speed limit controller.
    pub fn controller(&self) -> &SpeedLimitController {
        &self.controller
    }

    /// Integrates the spacing, velocity and position of every vehicle, then
    /// updates the spacing rates and the roadside sensor.
    fn integrate(&mut self, perturb: bool) {
        let dt = self.attributes.time_step;
        let next = self.step + 1;
        let time = next as f64 * dt;
        let (prev, cur) = self.history.advance_mut(next);

        for veh in 0..prev.pos.len() {
            let spacing = prev.spacing[veh];
            let vel = prev.vel[veh];
            let rate = prev.spacing_rate[veh];

            let acc = self.working.get(veh).accelerate(spacing, vel, rate);
            let mut new_vel = vel + acc * dt;
            if perturb {
                new_vel += self.noise.sample(&mut self.rng);
            }

            let new_spacing = spacing + rate * dt;
            if new_spacing < 0.0 {
                warn!(
                    "collision: vehicle {} reached its leader at {:.1} s (overlap {:.3} m)",
                    veh, time, -new_spacing
                );
                self.collisions.push(Collision {
                    step: next,
                    time,
                    vehicle: veh,
                    overlap: -new_spacing,
                });
            }

            cur.acc[veh] = acc;
            cur.vel[veh] = f64::max(new_vel, 0.0);
            cur.spacing[veh] = f64::max(new_spacing, 0.0);
            // Positions advance with the velocity from the start of the step.
            cur.pos[veh] = prev.pos[veh] + vel * dt;
        }

        for (follower, leader) in ring_pairs(cur.vel.len()) {
            cur.spacing_rate[follower] = cur.vel[leader] - cur.vel[follower];
        }

        self.sensor.update(time, cur.pos, cur.vel);
        self.step = next;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::control::FixedSpeed;
    use crate::model::{IdmParams, IntelligentDriver};
    use assert_approx_eq::assert_approx_eq;

    fn idm() -> IntelligentDriver {
        IntelligentDriver::new(&IdmParams {
            max_acceleration: 1.0,
            comf_deceleration: 1.5,
            desired_velocity: 15.0,
            exponent: 4.0,
            time_headway: 1.5,
            min_gap: 2.0,
        })
    }

    fn attributes() -> RingAttributes {
        RingAttributes {
            ring_length: 100.0,
            num_vehicles: 10,
            total_sim_time: 10.0,
            time_step: 0.1,
            settle_time: 3.0,
            noise_injection_duration: 5.0,
            noise_std_dev: 0.1,
            control_activation_time: 100.0,
            initial_velocity: 0.0,
            seed: Some(7),
        }
    }

    fn sim(attributes: RingAttributes) -> std::result::Result<RingSimulation, ConfigError> {
        let models = ModelSet::uniform(idm(), attributes.num_vehicles);
        RingSimulation::new(attributes, models, SpeedLimitController::PassThrough)
    }

    #[test]
    fn initial_layout() {
        let sim = sim(attributes()).unwrap();
        let history = sim.history();
        assert_eq!(history.steps(), 100);
        assert_eq!(history.positions(0)[3], 30.0);
        assert!(history.spacings(0).iter().all(|s| *s == 10.0));
        assert!(history.spacing_rates(0).iter().all(|r| *r == 0.0));
        assert_eq!(sim.time(), 0.0);
    }

    #[test]
    fn rejects_invalid_attributes() {
        let cases = [
            (RingAttributes { num_vehicles: 0, ..attributes() }, ConfigError::NoVehicles),
            (RingAttributes { time_step: 0.0, ..attributes() }, ConfigError::TimeStep(0.0)),
            (
                RingAttributes { ring_length: 5.0, ..attributes() },
                ConfigError::RingTooShort {
                    length: 5.0,
                    count: 10,
                    min_spacing: MIN_INITIAL_SPACING,
                },
            ),
            (
                RingAttributes { noise_injection_duration: 20.0, ..attributes() },
                ConfigError::NoiseWindow { noise_end: 20.0, total: 10.0 },
            ),
            (
                RingAttributes { noise_std_dev: -1.0, ..attributes() },
                ConfigError::NoiseStdDev(-1.0),
            ),
            (
                RingAttributes { settle_time: -1.0, ..attributes() },
                ConfigError::SettleTime(-1.0),
            ),
            (
                RingAttributes { initial_velocity: -3.0, ..attributes() },
                ConfigError::InitialVelocity(-3.0),
            ),
        ];
        for (attributes, expected) in cases {
            assert_eq!(sim(attributes).err(), Some(expected));
        }
        let err = sim(RingAttributes { initial_velocity: f64::INFINITY, ..attributes() }).err();
        assert!(matches!(err, Some(ConfigError::InitialVelocity(v)) if v.is_infinite()));
        let err = sim(RingAttributes { settle_time: f64::NAN, ..attributes() }).err();
        assert!(matches!(err, Some(ConfigError::SettleTime(t)) if t.is_nan()));

        let models = ModelSet::uniform(idm(), 3);
        let err = RingSimulation::new(attributes(), models, SpeedLimitController::PassThrough);
        assert_eq!(
            err.err(),
            Some(ConfigError::ModelCount { expected: 10, actual: 3 })
        );
    }

    #[test]
    fn position_uses_previous_velocity() {
        let mut sim = sim(RingAttributes {
            initial_velocity: 2.0,
            noise_std_dev: 0.0,
            ..attributes()
        })
        .unwrap();
        sim.step().unwrap();
        let history = sim.history();
        assert_approx_eq!(history.positions(1)[0], 0.2);
        assert!(history.velocities(1)[0] != 2.0);
        sim.step().unwrap();
        let history = sim.history();
        assert_approx_eq!(history.positions(2)[0], 0.2 + 0.1 * history.velocities(1)[0]);
    }

    #[test]
    fn stepping_past_the_end_fails() {
        let mut sim = sim(attributes()).unwrap();
        sim.run().unwrap();
        assert!(sim.is_finished());
        assert_eq!(sim.step_index(), 99);
        assert!(matches!(sim.step(), Err(Error::Finished { steps: 99 })));
    }

    #[test]
    fn control_starts_after_activation_time() {
        let models = ModelSet::uniform(idm(), 10);
        let controller = FixedSpeed::new(&models, 7.0).unwrap().into();
        let attributes = RingAttributes { control_activation_time: 1.0, ..attributes() };
        let mut sim = RingSimulation::new(attributes, models.clone(), controller).unwrap();

        let mut first = None;
        while first.is_none() && !sim.is_finished() {
            sim.step().unwrap();
            if sim.working_models() != &models {
                first = Some(sim.step_index());
            }
        }
        // State 10 is at exactly 1 s, so state 11 is the first one after it.
        assert_eq!(first, Some(11));
    }

    #[test]
    fn perturbations_start_at_settle_time() {
        let quiet = RingAttributes {
            settle_time: 1.0,
            noise_std_dev: 0.0,
            initial_velocity: 2.0,
            ..attributes()
        };
        let noisy = RingAttributes { noise_std_dev: 0.1, ..quiet.clone() };
        let mut a = sim(quiet).unwrap();
        let mut b = sim(noisy).unwrap();
        a.run().unwrap();
        b.run().unwrap();

        let first = (0..a.history().steps())
            .find(|step| a.history().velocities(*step) != b.history().velocities(*step));
        assert_eq!(first, Some(10));
    }

    #[test]
    fn seeded_runs_repeat() {
        let mut a = sim(attributes()).unwrap();
        let mut b = sim(attributes()).unwrap();
        a.run().unwrap();
        b.run().unwrap();
        assert_eq!(a.history().velocities(99), b.history().velocities(99));
    }
}
