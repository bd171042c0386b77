pub use control::{ControlContext, FixedSpeed, MovingAverage, SpeedLimitController};
pub use error::{ConfigError, ControlError, Error, Result};
pub use history::History;
pub use model::{
    CarFollowingModel, IdmParams, IntelligentDriver, ModelSet, OptimalVelocity, OvmParams,
    VEHICLE_LENGTH,
};
pub use sensor::{RoadsideSensor, SensorLog};
pub use simulation::{Collision, RingAttributes, RingSimulation};
use slotmap::new_key_type;
pub use slotmap::{Key, KeyData};
pub use util::Interval;

mod control;
mod error;
mod history;
mod model;
mod sensor;
mod simulation;
mod util;

new_key_type! {
    /// Unique ID of a [CarFollowingModel] within a [ModelSet].
    pub struct ModelId;
}
