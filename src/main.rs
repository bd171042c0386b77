use std::time::Instant;

use ring_vsl::{
    ModelSet, MovingAverage, OptimalVelocity, OvmParams, RingAttributes, RingSimulation,
    SpeedLimitController,
};

fn main() -> ring_vsl::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let attributes = RingAttributes::default();
    let ovm = OptimalVelocity::new(&OvmParams {
        sensitivity: 0.8,
        relaxation: 20.0,
        max_velocity: 9.8,
        jam_spacing: 2.0,
        shape: 2.0,
    });
    let models = ModelSet::uniform(ovm, attributes.num_vehicles);
    let controller = SpeedLimitController::from(MovingAverage::new(100.0)?);
    let mut sim = RingSimulation::new(attributes, models, controller)?;

    println!("Simulating...");
    let start = Instant::now();
    sim.run()?;
    println!(
        "Simulated {:.0} s in {:?} ({} sensor samples, {} collisions)",
        sim.time(),
        start.elapsed(),
        sim.sensor_log().len(),
        sim.collisions().len(),
    );

    if let SpeedLimitController::MovingAverage(ctrl) = sim.controller() {
        if let Some(last) = ctrl.speed_commands().last() {
            println!("Final commanded speed: {:.2} m/s", last);
        }
    }
    Ok(())
}
