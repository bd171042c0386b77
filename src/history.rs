//! Pre-allocated per-step state of every vehicle.

/// The recorded state of every vehicle at every step of a run.
///
/// Each quantity is stored step-major, so the state of all vehicles at one
/// step is a contiguous slice.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct History {
    /// The number of vehicles.
    vehicles: usize,
    /// The number of steps that storage was allocated for.
    steps: usize,
    /// Unwrapped positions in m.
    pos: Vec<f64>,
    /// Velocities in m/s.
    vel: Vec<f64>,
    /// Gaps to the leader in m.
    spacing: Vec<f64>,
    /// Leader velocity minus own velocity in m/s.
    spacing_rate: Vec<f64>,
    /// Accelerations in m/s<sup>2</sup>.
    acc: Vec<f64>,
}

/// A mutable view of one step of the history.
pub(crate) struct StepMut<'a> {
    pub pos: &'a mut [f64],
    pub vel: &'a mut [f64],
    pub spacing: &'a mut [f64],
    pub spacing_rate: &'a mut [f64],
    pub acc: &'a mut [f64],
}

impl History {
    /// Allocates zeroed storage for `steps` steps of `vehicles` vehicles.
    pub(crate) fn new(vehicles: usize, steps: usize) -> Self {
        let len = vehicles * steps;
        Self {
            vehicles,
            steps,
            pos: vec![0.0; len],
            vel: vec![0.0; len],
            spacing: vec![0.0; len],
            spacing_rate: vec![0.0; len],
            acc: vec![0.0; len],
        }
    }

    /// The number of vehicles.
    pub fn vehicles(&self) -> usize {
        self.vehicles
    }

    /// The number of steps allocated, including the initial state.
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn range(&self, step: usize) -> std::ops::Range<usize> {
        assert!(step < self.steps, "step {step} out of range");
        step * self.vehicles..(step + 1) * self.vehicles
    }

    /// The unwrapped positions of all vehicles at a step.
    pub fn positions(&self, step: usize) -> &[f64] {
        &self.pos[self.range(step)]
    }

    /// The velocities of all vehicles at a step.
    pub fn velocities(&self, step: usize) -> &[f64] {
        &self.vel[self.range(step)]
    }

    /// The spacings of all vehicles at a step.
    pub fn spacings(&self, step: usize) -> &[f64] {
        &self.spacing[self.range(step)]
    }

    /// The spacing rates of all vehicles at a step.
    pub fn spacing_rates(&self, step: usize) -> &[f64] {
        &self.spacing_rate[self.range(step)]
    }

    /// The accelerations applied during the step that produced this state.
    pub fn accelerations(&self, step: usize) -> &[f64] {
        &self.acc[self.range(step)]
    }

    /// The position of one vehicle at every step.
    pub fn position_series(&self, vehicle: usize) -> impl Iterator<Item = f64> + '_ {
        self.series(&self.pos, vehicle)
    }

    /// The velocity of one vehicle at every step.
    pub fn velocity_series(&self, vehicle: usize) -> impl Iterator<Item = f64> + '_ {
        self.series(&self.vel, vehicle)
    }

    /// The spacing of one vehicle at every step.
    pub fn spacing_series(&self, vehicle: usize) -> impl Iterator<Item = f64> + '_ {
        self.series(&self.spacing, vehicle)
    }

    fn series<'a>(&self, data: &'a [f64], vehicle: usize) -> impl Iterator<Item = f64> + 'a {
        assert!(vehicle < self.vehicles, "vehicle {vehicle} out of range");
        data.iter().skip(vehicle).step_by(self.vehicles).copied()
    }

    /// Splits the history into the committed state at `step - 1` and a mutable view of `step`.
    pub(crate) fn advance_mut(&mut self, step: usize) -> (StepRef<'_>, StepMut<'_>) {
        assert!(step > 0 && step < self.steps, "step {step} out of range");
        let n = self.vehicles;
        let split = step * n;
        let (prev_pos, pos) = split_step(&mut self.pos, split, n);
        let (prev_vel, vel) = split_step(&mut self.vel, split, n);
        let (prev_spacing, spacing) = split_step(&mut self.spacing, split, n);
        let (prev_rate, spacing_rate) = split_step(&mut self.spacing_rate, split, n);
        let (_, acc) = split_step(&mut self.acc, split, n);
        (
            StepRef {
                pos: prev_pos,
                vel: prev_vel,
                spacing: prev_spacing,
                spacing_rate: prev_rate,
            },
            StepMut {
                pos,
                vel,
                spacing,
                spacing_rate,
                acc,
            },
        )
    }

    /// A mutable view of the initial state.
    pub(crate) fn initial_mut(&mut self) -> StepMut<'_> {
        let n = self.vehicles;
        StepMut {
            pos: &mut self.pos[..n],
            vel: &mut self.vel[..n],
            spacing: &mut self.spacing[..n],
            spacing_rate: &mut self.spacing_rate[..n],
            acc: &mut self.acc[..n],
        }
    }
}

/// Splits `data` into the `n` values before `split` and the `n` values from `split`.
fn split_step(data: &mut [f64], split: usize, n: usize) -> (&[f64], &mut [f64]) {
    let (before, after) = data.split_at_mut(split);
    (&before[split - n..], &mut after[..n])
}

/// A read-only view of one committed step of the history.
pub(crate) struct StepRef<'a> {
    pub pos: &'a [f64],
    pub vel: &'a [f64],
    pub spacing: &'a [f64],
    pub spacing_rate: &'a [f64],
}
