//! Probability-proportional selection over weighted candidates.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Source of uniform draws in `[0, 1)`.
///
/// Implemented for every `rand` generator. Tests substitute a fixed sequence
/// through [`CyclicSource`] to make selections reproducible.
pub trait RandomSource: Send {
    fn next_unit(&mut self) -> f64;
}

impl<R: RngCore + Send> RandomSource for R {
    fn next_unit(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Replays a fixed list of draws, wrapping around at the end.
///
/// An empty list always yields `0.0`.
#[derive(Debug, Clone, Default)]
pub struct CyclicSource {
    values: Vec<f64>,
    next: usize,
}

impl CyclicSource {
    /// Create a source replaying `values` in order.
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            next: 0,
        }
    }

    /// Number of draws taken so far.
    pub fn draws(&self) -> usize {
        self.next
    }
}

impl RandomSource for CyclicSource {
    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self
            .values
            .get(self.next % self.values.len())
            .copied()
            .unwrap_or_default();
        self.next += 1;
        value
    }
}

/// How a [`Choice`] was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceKind {
    /// Single candidate, no draw taken.
    Only,
    /// Cumulative weight passed the draw.
    Weighted,
    /// Rounding left the draw uncovered; the last candidate was taken.
    Fallback,
}

/// Index of the selected candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub index: usize,
    pub kind: ChoiceKind,
}

/// Picks one candidate with probability proportional to its weight.
///
/// The random source sits behind its own lock so draws from concurrent
/// callers never wait on the stats registry.
#[derive(Debug)]
pub struct WeightedSelector<R = StdRng> {
    rng: Mutex<R>,
}

impl WeightedSelector<StdRng> {
    /// Selector backed by a generator seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl Default for WeightedSelector<StdRng> {
    fn default() -> Self {
        Self::from_os_rng()
    }
}

impl<R: RandomSource> WeightedSelector<R> {
    /// Create a selector drawing from `rng`.
    pub fn new(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Choose an index into `weights`.
    ///
    /// Returns `None` only for an empty slice. A single weight is chosen
    /// without drawing. Otherwise one draw `r` is taken and the first index
    /// whose normalized cumulative weight exceeds `r` wins; if none does, the
    /// last index is returned.
    pub fn choose(&self, weights: &[f64]) -> Option<Choice> {
        match weights.len() {
            0 => return None,
            1 => {
                return Some(Choice {
                    index: 0,
                    kind: ChoiceKind::Only,
                });
            }
            _ => {}
        }

        let total: f64 = weights.iter().sum();
        let rnd = self.rng.lock().next_unit();

        let mut cumulative = 0.0;
        for (index, weight) in weights.iter().enumerate() {
            cumulative += weight / total;
            if cumulative > rnd {
                return Some(Choice {
                    index,
                    kind: ChoiceKind::Weighted,
                });
            }
        }

        Some(Choice {
            index: weights.len() - 1,
            kind: ChoiceKind::Fallback,
        })
    }

    /// Run `f` against the underlying random source.
    pub fn with_source<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        f(&mut self.rng.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index<R: RandomSource>(selector: &WeightedSelector<R>, weights: &[f64]) -> usize {
        selector.choose(weights).unwrap().index
    }

    #[test]
    fn test_empty_has_no_choice() {
        let selector = WeightedSelector::new(CyclicSource::new([0.5]));
        assert_eq!(selector.choose(&[]), None);
        assert_eq!(selector.with_source(|s| s.draws()), 0);
    }

    #[test]
    fn test_single_candidate_takes_no_draw() {
        let selector = WeightedSelector::new(CyclicSource::new([0.9, 0.1]));

        let choice = selector.choose(&[0.25]).unwrap();
        assert_eq!(choice.index, 0);
        assert_eq!(choice.kind, ChoiceKind::Only);
        assert_eq!(selector.with_source(|s| s.draws()), 0);

        // The first draw is still unused.
        assert_eq!(index(&selector, &[1.0, 1.0]), 1);
    }

    #[test]
    fn test_cumulative_boundaries() {
        let selector = WeightedSelector::new(CyclicSource::new([0.0, 0.3, 0.6, 0.9999]));
        let weights = [1.0, 1.0, 2.0];

        assert_eq!(index(&selector, &weights), 0);
        assert_eq!(index(&selector, &weights), 1);
        assert_eq!(index(&selector, &weights), 2);
        assert_eq!(index(&selector, &weights), 2);
    }

    #[test]
    fn test_draw_on_boundary_goes_to_next() {
        // cumulative must strictly exceed the draw
        let selector = WeightedSelector::new(CyclicSource::new([0.5]));
        assert_eq!(index(&selector, &[1.0, 1.0]), 1);
    }

    #[test]
    fn test_uncovered_draw_falls_back_to_last() {
        let selector = WeightedSelector::new(CyclicSource::new([1.0]));
        let choice = selector.choose(&[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(choice.index, 2);
        assert_eq!(choice.kind, ChoiceKind::Fallback);
    }

    #[test]
    fn test_degenerate_weights_fall_back_to_last() {
        let selector = WeightedSelector::new(CyclicSource::new([0.1]));

        let choice = selector.choose(&[0.0, 0.0]).unwrap();
        assert_eq!(choice.index, 1);
        assert_eq!(choice.kind, ChoiceKind::Fallback);

        let choice = selector.choose(&[f64::INFINITY, 1.0]).unwrap();
        assert_eq!(choice.kind, ChoiceKind::Fallback);
    }

    #[test]
    fn test_empty_cyclic_source() {
        let mut source = CyclicSource::default();
        assert_eq!(source.next_unit(), 0.0);
        assert_eq!(source.draws(), 0);
    }

    #[test]
    fn test_seeded_rng_is_proportional() {
        let selector = WeightedSelector::new(StdRng::seed_from_u64(7));
        let weights = [1.0, 3.0];
        let mut counts = [0usize; 2];

        for _ in 0..4000 {
            counts[index(&selector, &weights)] += 1;
        }

        let share = counts[1] as f64 / 4000.0;
        assert!((share - 0.75).abs() < 0.05, "share {share}");
    }
}
