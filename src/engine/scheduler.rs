//! Grain trigger timing and the engine's random source.

use rand::{rngs::SmallRng, Rng, SeedableRng};

// -------------------------------------------------------------------------------------------------

/// Converts a trigger interval into grain trigger events.
///
/// Each trigger interval is scaled by a random dither factor, so grains don't line up into a
/// periodic, metallic pattern. The scheduler also owns the random generator, which is used to
/// pick per-grain values at trigger time, so a single seed makes a whole engine reproducible.
#[derive(Debug, Clone)]
pub(crate) struct TriggerScheduler {
    /// Samples passed since the last trigger, plus overshoot of the last interval.
    accumulated: f64,
    /// Random interval scaling, drawn anew on every trigger.
    dither: f64,
    rng: SmallRng,
}

impl TriggerScheduler {
    /// Minimum and maximum interval dither factors.
    const DITHER_RANGE: std::ops::RangeInclusive<f64> = 0.9..=1.1;

    /// Create a new scheduler with a random generator seeded from the OS.
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    /// Create a new scheduler with a deterministically seeded random generator.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        let accumulated = 0.0;
        let dither = 0.0;
        Self {
            accumulated,
            dither,
            rng,
        }
    }

    /// Deterministically reseed the random generator. Timing state is not touched.
    pub fn seed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    /// Clear timing state, so the next evaluation triggers immediately.
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
        self.dither = 0.0;
    }

    /// Advance by one sample. Returns true when a new grain should be triggered at this sample.
    /// Triggers at most once per call.
    #[inline]
    pub fn evaluate(&mut self, interval_samples: f64) -> bool {
        debug_assert!(
            interval_samples.is_finite() && interval_samples > 0.0,
            "Invalid trigger interval: {interval_samples}"
        );
        let threshold = interval_samples * self.dither;
        let trigger = self.accumulated >= threshold;
        if trigger {
            // keep the overshoot, but never let it pile up when intervals shrink
            self.accumulated = (self.accumulated - threshold).min(interval_samples);
            self.dither = self.rng.random_range(Self::DITHER_RANGE);
        }
        self.accumulated += 1.0;
        trigger
    }

    /// Random value in range `[0.0, 1.0)`.
    #[inline]
    pub fn random_unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Random value in range `[-1.0, 1.0]`.
    #[inline]
    pub fn random_bipolar(&mut self) -> f32 {
        self.rng.random_range(-1.0..=1.0)
    }

    /// Random index in range `0..count`. `count` must not be zero.
    #[inline]
    pub fn random_index(&mut self, count: usize) -> usize {
        debug_assert!(count > 0, "Need a non empty index range");
        self.rng.random_range(0..count)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger_times(
        scheduler: &mut TriggerScheduler,
        interval: f64,
        samples: usize,
    ) -> Vec<usize> {
        (0..samples)
            .filter(|_| scheduler.evaluate(interval))
            .collect()
    }

    #[test]
    fn triggers_immediately_after_reset() {
        let mut scheduler = TriggerScheduler::with_seed(1);
        assert!(scheduler.evaluate(100.0));
        assert!(!scheduler.evaluate(100.0));
        for _ in 0..50 {
            scheduler.evaluate(100.0);
        }
        scheduler.reset();
        assert!(scheduler.evaluate(100.0));
    }

    #[test]
    fn dithered_intervals() {
        let mut scheduler = TriggerScheduler::with_seed(2);
        let times = trigger_times(&mut scheduler, 100.0, 100_000);
        // ~1000 triggers expected
        assert!((950..=1050).contains(&times.len()), "{}", times.len());
        let intervals = times.windows(2).map(|w| w[1] - w[0]).collect::<Vec<_>>();
        assert!(intervals.iter().all(|i| (89..=112).contains(i)));
        // dither must produce varying intervals
        assert!(intervals.iter().any(|i| *i != intervals[0]));
    }

    #[test]
    fn triggers_at_most_once_per_sample() {
        let mut scheduler = TriggerScheduler::with_seed(3);
        // intervals below a sample trigger on every sample
        let times = trigger_times(&mut scheduler, 0.01, 1000);
        assert_eq!(times.len(), 1000);
        // switching back to long intervals must not burst out accumulated triggers
        let times = trigger_times(&mut scheduler, 500.0, 1000);
        assert!(times.len() <= 3, "{}", times.len());
    }

    #[test]
    fn seeded_schedulers_are_deterministic() {
        let mut a = TriggerScheduler::with_seed(1234);
        let mut b = TriggerScheduler::with_seed(1234);
        assert_eq!(
            trigger_times(&mut a, 37.5, 10_000),
            trigger_times(&mut b, 37.5, 10_000)
        );
        assert_eq!(a.random_bipolar(), b.random_bipolar());
        assert_eq!(a.random_index(5), b.random_index(5));

        a.seed(99);
        b.seed(99);
        assert_eq!(a.random_unit(), b.random_unit());
    }

    #[test]
    fn random_ranges() {
        let mut scheduler = TriggerScheduler::with_seed(5);
        for _ in 0..1000 {
            assert!((-1.0..=1.0).contains(&scheduler.random_bipolar()));
            assert!((0.0..1.0).contains(&scheduler.random_unit()));
            assert!(scheduler.random_index(5) < 5);
        }
    }
}
