//! The virtual roadside detection sensor.

use crate::util::Interval;
use itertools::izip;
use log::debug;

/// The speed samples recorded by a roadside sensor.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorLog {
    /// The times at which vehicles were detected, in s.
    times: Vec<f64>,
    /// The speeds of the detected vehicles, in m/s.
    speeds: Vec<f64>,
}

impl SensorLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends a sample.
    pub(crate) fn record(&mut self, time: f64, speed: f64) {
        self.times.push(time);
        self.speeds.push(speed);
    }

    /// The detection times in s, in non-decreasing order.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// The detected speeds in m/s.
    pub fn speeds(&self) -> &[f64] {
        &self.speeds
    }

    /// The number of samples.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Returns an iterator over the `(time, speed)` samples taken within `window`.
    pub fn samples_in(&self, window: Interval<f64>) -> impl Iterator<Item = (f64, f64)> + '_ {
        // Times are sorted, so only the tail of the log needs scanning.
        let start = self.times.partition_point(|t| *t < window.min);
        self.times[start..]
            .iter()
            .zip(&self.speeds[start..])
            .take_while(move |(t, _)| **t <= window.max)
            .map(|(t, s)| (*t, *s))
    }

    /// The mean speed of the samples taken within `window`, with the sample count.
    /// Returns `None` if the window holds no samples.
    pub fn window_mean(&self, window: Interval<f64>) -> Option<(f64, usize)> {
        let (sum, count) = self
            .samples_in(window)
            .fold((0.0, 0), |(sum, count), (_, speed)| (sum + speed, count + 1));
        (count > 0).then(|| (sum / count as f64, count))
    }
}

/// A zero-width detector at the origin of the ring, which samples the speed
/// of each vehicle as it passes.
///
/// A vehicle is detected when its wrapped position decreases between steps.
/// Consecutive detections of the same vehicle are dropped, which guards against
/// one crossing being reported twice. The guard only remembers the most recent
/// vehicle, so it cannot tell apart repeat crossings that are interleaved with
/// another vehicle's crossing.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoadsideSensor {
    /// The length of the ring in m.
    ring_length: f64,
    /// The wrapped positions at the previous step.
    prev_pos: Vec<f64>,
    /// The vehicle recorded by the most recent detection.
    last_seen: usize,
    /// The recorded samples.
    log: SensorLog,
}

impl RoadsideSensor {
    /// Creates a sensor, given the initial positions of the vehicles.
    ///
    /// Vehicle 0 starts as the most recently seen vehicle.
    pub fn new(ring_length: f64, positions: &[f64]) -> Self {
        Self {
            ring_length,
            prev_pos: positions.iter().map(|x| x.rem_euclid(ring_length)).collect(),
            last_seen: 0,
            log: SensorLog::new(),
        }
    }

    /// The samples recorded so far.
    pub fn log(&self) -> &SensorLog {
        &self.log
    }

    /// The vehicle recorded by the most recent detection.
    pub fn last_seen(&self) -> usize {
        self.last_seen
    }

    /// Processes a newly committed step. Returns the number of samples recorded.
    ///
    /// # Parameters
    /// * `time` - The time of the committed state in s
    /// * `positions` - The unwrapped positions of the vehicles
    /// * `velocities` - The velocities of the vehicles
    pub fn update(&mut self, time: f64, positions: &[f64], velocities: &[f64]) -> usize {
        let mut recorded = 0;
        for (veh, (prev, pos, vel)) in
            izip!(self.prev_pos.iter_mut(), positions, velocities).enumerate()
        {
            let wrapped = pos.rem_euclid(self.ring_length);
            if wrapped < *prev && veh != self.last_seen {
                debug!("sensor detected vehicle {} at {:.1} s, {:.2} m/s", veh, time, vel);
                self.log.record(time, *vel);
                self.last_seen = veh;
                recorded += 1;
            }
            *prev = wrapped;
        }
        recorded
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn detects_wrap_around() {
        let mut sensor = RoadsideSensor::new(100.0, &[50.0, 99.0]);
        assert_eq!(sensor.update(0.1, &[51.0, 101.0], &[10.0, 20.0]), 1);
        assert_eq!(sensor.log().times(), &[0.1]);
        assert_eq!(sensor.log().speeds(), &[20.0]);
        assert_eq!(sensor.last_seen(), 1);
        // No further wrap, no further samples.
        assert_eq!(sensor.update(0.2, &[52.0, 103.0], &[10.0, 20.0]), 0);
    }

    #[test]
    fn repeat_crossing_is_dropped() {
        let mut sensor = RoadsideSensor::new(10.0, &[9.0, 5.0]);
        sensor.update(1.0, &[11.0, 6.0], &[2.0, 1.0]);
        assert_eq!(sensor.log().len(), 0);
        // Vehicle 0 starts as the last seen vehicle, so its first crossing is dropped.
        sensor.update(2.0, &[15.0, 11.0], &[2.0, 5.0]);
        assert_eq!(sensor.log().len(), 1);
        sensor.update(3.0, &[16.0, 19.0], &[2.0, 10.0]);
        assert_eq!(sensor.log().len(), 1);
        // Vehicle 1 crosses again before anyone else does: dropped.
        sensor.update(4.0, &[17.0, 21.0], &[2.0, 10.5]);
        assert_eq!(sensor.log().len(), 1);
        sensor.update(5.0, &[21.0, 22.0], &[5.0, 0.5]);
        assert_eq!(sensor.log().times(), &[2.0, 5.0]);
        assert_eq!(sensor.log().speeds(), &[5.0, 5.0]);
        assert_eq!(sensor.last_seen(), 0);
    }

    #[test]
    fn window_mean() {
        let mut log = SensorLog::new();
        for (t, s) in [(1.0, 4.0), (2.0, 6.0), (3.0, 8.0), (5.0, 10.0)] {
            log.record(t, s);
        }
        let (mean, count) = log.window_mean(Interval::trailing(3.0, 1.5)).unwrap();
        assert_eq!(count, 2);
        assert_approx_eq!(mean, 7.0);
        let (mean, count) = log.window_mean(Interval::trailing(5.0, 10.0)).unwrap();
        assert_eq!(count, 4);
        assert_approx_eq!(mean, 7.0);
        assert_eq!(log.window_mean(Interval::new(3.5, 4.5)), None);
        assert_eq!(log.samples_in(Interval::new(2.0, 3.0)).count(), 2);
    }
}
