//! Precomputed grain envelope.

use std::sync::LazyLock;

use assume::assume;

// -------------------------------------------------------------------------------------------------

/// Precomputed raised cosine (Hann) grain window with `N` segments.
///
/// The table stores `N + 1` points, so the last segment interpolates towards the closing zero
/// and the envelope is zero at both ends.
pub(crate) struct WindowTable<const N: usize> {
    lut: Box<[f32]>,
}

impl<const N: usize> WindowTable<N> {
    const _VERIFY_N: () = assert!(N >= 2, "Grain window needs at least two segments");

    /// Precompute the window LUT.
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::_VERIFY_N;
        let lut = (0..=N)
            .map(|i| {
                let phase = i as f64 / N as f64;
                (0.5 * (1.0 - (2.0 * std::f64::consts::PI * phase).cos())) as f32
            })
            .collect::<Box<[f32]>>();
        Self { lut }
    }

    /// Evaluate the window at the given normalized phase in range `[0.0, 1.0)`, using linear
    /// interpolation between the LUT points.
    ///
    /// Phases outside of the valid range must be clamped by the caller.
    #[inline]
    pub fn lookup(&self, phase: f64) -> f32 {
        debug_assert!(
            (0.0..1.0).contains(&phase),
            "Window phase must be clamped by the caller, but is {phase}"
        );
        let index_float = phase * N as f64;
        let index = (index_float as usize).min(N - 1);
        let fraction = (index_float - index as f64) as f32;
        assume!(unsafe: index + 1 < self.lut.len(), "LUT holds N + 1 points");
        let start = self.lut[index];
        let end = self.lut[index + 1];
        start + (end - start) * fraction
    }
}

// -------------------------------------------------------------------------------------------------

/// Window resolution of the shared grain envelope table.
pub(crate) const GRAIN_WINDOW_SIZE: usize = 2048;

/// Static, shared lookup table for the grain envelope.
pub(crate) static GRAIN_WINDOW: LazyLock<WindowTable<GRAIN_WINDOW_SIZE>> =
    LazyLock::new(WindowTable::new);

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_at_both_ends() {
        let window = WindowTable::<1024>::new();
        assert_eq!(window.lookup(0.0), 0.0);
        assert!(window.lookup(1.0 - 1e-9) < 1e-6);
        assert!(window.lookup(1.0 / 1024.0) > 0.0);
    }

    #[test]
    fn peak_and_symmetry() {
        let window = &*GRAIN_WINDOW;
        assert!((window.lookup(0.5) - 1.0).abs() < 1e-6);
        for i in 1..100 {
            let phase = i as f64 / 200.0;
            let left = window.lookup(phase);
            let right = window.lookup(1.0 - phase);
            assert!((left - right).abs() < 1e-4, "{left} != {right} at {phase}");
            assert!((0.0..=1.0).contains(&left));
        }
    }

    #[test]
    fn interpolates_between_points() {
        let window = WindowTable::<4>::new();
        // points at 0, 0.5, 1, 0.5, 0
        assert!((window.lookup(0.125) - 0.25).abs() < 1e-6);
        assert!((window.lookup(0.375) - 0.75).abs() < 1e-6);
        assert!((window.lookup(0.875) - 0.25).abs() < 1e-6);
    }
}
