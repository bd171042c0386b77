//! Error types.

use crate::util::Interval;

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the simulation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The simulation was constructed with invalid attributes.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The speed limit controller could not produce a command.
    #[error("control update failed: {0}")]
    Control(#[from] ControlError),

    /// Every pre-allocated step has already been simulated.
    #[error("simulation already finished after {steps} steps")]
    Finished { steps: usize },
}

/// Rejected construction parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one vehicle is required")]
    NoVehicles,

    #[error("time step must be positive and finite (got {0})")]
    TimeStep(f64),

    #[error("total simulation time {total} is shorter than one time step {dt}")]
    TotalTime { total: f64, dt: f64 },

    #[error("ring of {length} m leaves less than {min_spacing} m between {count} vehicles")]
    RingTooShort {
        length: f64,
        count: usize,
        min_spacing: f64,
    },

    #[error("noise window ends at {noise_end} s, after the end of the run at {total} s")]
    NoiseWindow { noise_end: f64, total: f64 },

    #[error("noise standard deviation must be non-negative (got {0})")]
    NoiseStdDev(f64),

    #[error("settle time must be non-negative and finite (got {0})")]
    SettleTime(f64),

    #[error("initial velocity must be non-negative and finite (got {0})")]
    InitialVelocity(f64),

    #[error("expected {expected} vehicle models, got {actual}")]
    ModelCount { expected: usize, actual: usize },

    #[error("vehicle {vehicle} does not exist on a ring of {count} vehicles")]
    VehicleOutOfRange { vehicle: usize, count: usize },

    #[error("target speed must be positive and finite (got {0})")]
    TargetSpeed(f64),

    #[error("averaging window must be positive (got {0})")]
    Window(f64),
}

/// Failures of the speed limit controller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControlError {
    #[error("found {found} sensor samples in {window:?}, at least {required} required")]
    InsufficientSamples {
        found: usize,
        required: usize,
        window: Interval<f64>,
    },
}
