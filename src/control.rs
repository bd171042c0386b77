//! Variable speed limit controllers.

use crate::error::{ConfigError, ControlError};
use crate::model::ModelSet;
use crate::sensor::SensorLog;
use crate::util::Interval;
use log::debug;

/// The vehicle whose desired velocity is overridden, unless configured otherwise.
const DEFAULT_VEHICLE: usize = 0;

/// The state of the simulation made available to a controller.
#[derive(Clone, Copy, Debug)]
pub struct ControlContext<'a> {
    /// The current simulation time in s.
    pub time: f64,
    /// The unwrapped positions of the vehicles at the previous step.
    pub positions: &'a [f64],
    /// The velocities of the vehicles at the previous step.
    pub velocities: &'a [f64],
    /// The samples recorded by the roadside sensor.
    pub sensor: &'a SensorLog,
}

/// A variable speed limit controller, which decides the car following
/// model of each vehicle once control is active.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpeedLimitController {
    /// Leaves every vehicle with its original model.
    PassThrough,
    /// Overrides one vehicle's desired velocity with a constant.
    FixedSpeed(FixedSpeed),
    /// Overrides one vehicle's desired velocity with the average sensor speed.
    MovingAverage(MovingAverage),
}

impl SpeedLimitController {
    /// Computes the models to use for the upcoming step.
    ///
    /// # Parameters
    /// * `original` - The models the simulation was created with
    /// * `ctx` - The current state of the simulation
    pub fn update(
        &mut self,
        original: &ModelSet,
        ctx: &ControlContext,
    ) -> Result<ModelSet, ControlError> {
        match self {
            Self::PassThrough => Ok(original.clone()),
            Self::FixedSpeed(ctrl) => Ok(ctrl.models.clone()),
            Self::MovingAverage(ctrl) => ctrl.update(original, ctx),
        }
    }

    /// The vehicle whose model the controller overrides, if any.
    pub fn target_vehicle(&self) -> Option<usize> {
        match self {
            Self::PassThrough => None,
            Self::FixedSpeed(ctrl) => Some(ctrl.vehicle),
            Self::MovingAverage(ctrl) => Some(ctrl.vehicle),
        }
    }
}

impl From<FixedSpeed> for SpeedLimitController {
    fn from(ctrl: FixedSpeed) -> Self {
        Self::FixedSpeed(ctrl)
    }
}

impl From<MovingAverage> for SpeedLimitController {
    fn from(ctrl: MovingAverage) -> Self {
        Self::MovingAverage(ctrl)
    }
}

/// Commands a constant desired velocity to one vehicle.
///
/// The overridden models are computed once, on construction.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedSpeed {
    /// The overridden vehicle.
    vehicle: usize,
    /// The commanded velocity in m/s.
    target: f64,
    /// The models returned on every update.
    models: ModelSet,
}

impl FixedSpeed {
    /// Creates a controller commanding `target` m/s to vehicle 0.
    pub fn new(models: &ModelSet, target: f64) -> Result<Self, ConfigError> {
        Self::for_vehicle(models, DEFAULT_VEHICLE, target)
    }

    /// Creates a controller commanding `target` m/s to the given vehicle.
    pub fn for_vehicle(models: &ModelSet, vehicle: usize, target: f64) -> Result<Self, ConfigError> {
        if vehicle >= models.len() {
            return Err(ConfigError::VehicleOutOfRange {
                vehicle,
                count: models.len(),
            });
        }
        if !(target.is_finite() && target > 0.0) {
            return Err(ConfigError::TargetSpeed(target));
        }
        Ok(Self {
            vehicle,
            target,
            models: models.with_desired_speed(vehicle, target),
        })
    }

    /// The commanded velocity in m/s.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// The models returned on every update.
    pub fn models(&self) -> &ModelSet {
        &self.models
    }
}

/// Commands one vehicle to drive at the mean speed measured by the roadside
/// sensor over a trailing time window.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MovingAverage {
    /// The overridden vehicle.
    vehicle: usize,
    /// The length of the averaging window in s.
    window: f64,
    /// The fewest samples the window may hold.
    min_samples: usize,
    /// The times at which speeds were commanded, in s.
    command_times: Vec<f64>,
    /// The commanded speeds in m/s.
    commands: Vec<f64>,
}

impl MovingAverage {
    /// Creates a controller averaging over the last `window` seconds, which
    /// overrides vehicle 0 and requires at least one sample.
    pub fn new(window: f64) -> Result<Self, ConfigError> {
        if !(window.is_finite() && window > 0.0) {
            return Err(ConfigError::Window(window));
        }
        Ok(Self {
            vehicle: DEFAULT_VEHICLE,
            window,
            min_samples: 1,
            command_times: vec![],
            commands: vec![],
        })
    }

    /// Sets the overridden vehicle.
    pub fn with_vehicle(mut self, vehicle: usize) -> Self {
        self.vehicle = vehicle;
        self
    }

    /// Sets the fewest samples the window may hold, at least one.
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples.max(1);
        self
    }

    /// The length of the averaging window in s.
    pub fn window(&self) -> f64 {
        self.window
    }

    /// The speeds commanded so far, in m/s.
    pub fn speed_commands(&self) -> &[f64] {
        &self.commands
    }

    /// The times at which each speed was commanded, in s.
    pub fn command_times(&self) -> &[f64] {
        &self.command_times
    }

    fn update(&mut self, original: &ModelSet, ctx: &ControlContext) -> Result<ModelSet, ControlError> {
        let window = Interval::trailing(ctx.time, self.window);
        let (mean, count) = ctx.sensor.window_mean(window).unwrap_or((0.0, 0));
        if count < self.min_samples {
            return Err(ControlError::InsufficientSamples {
                found: count,
                required: self.min_samples,
                window,
            });
        }
        debug!("commanding {:.2} m/s to vehicle {} at {:.1} s", mean, self.vehicle, ctx.time);
        self.command_times.push(ctx.time);
        self.commands.push(mean);
        Ok(original.with_desired_speed(self.vehicle, mean))
    }
}
