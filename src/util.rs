//! Miscellaneous utility structs and functions.

use std::fmt::Debug;

/// An interval on the real number line.
#[derive(Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

impl<T> Interval<T> {
    /// Creates a new interval.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: std::cmp::PartialOrd> Interval<T> {
    /// Returns true if this interval contains the value.
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

impl<T: std::ops::Sub<T, Output = T> + Copy> Interval<T> {
    /// Gets the magnitude of the interval.
    pub fn length(&self) -> T {
        self.max - self.min
    }

    /// Creates the interval of the given length which ends at `end`.
    pub fn trailing(end: T, length: T) -> Self {
        Self {
            min: end - length,
            max: end,
        }
    }
}

impl<T: Debug> Debug for Interval<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}

/// Yields `(follower, leader)` index pairs around a ring of `count` vehicles,
/// so the last vehicle is paired with the first.
pub fn ring_pairs(count: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..count).map(move |i| (i, if i + 1 == count { 0 } else { i + 1 }))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trailing_window() {
        let window = Interval::trailing(300.0, 100.0);
        assert_eq!(window, Interval::new(200.0, 300.0));
        assert!(window.contains(200.0));
        assert!(window.contains(300.0));
        assert!(!window.contains(300.1));
        assert_eq!(window.length(), 100.0);
    }

    #[test]
    fn ring_pairs_wrap() {
        let pairs: Vec<_> = ring_pairs(3).collect();
        assert_eq!(pairs, vec![(0, 1), (1, 2), (2, 0)]);
        assert_eq!(ring_pairs(1).collect::<Vec<_>>(), vec![(0, 0)]);
    }
}
