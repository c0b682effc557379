//! Smoothed parameter values, to avoid clicks on parameter changes.

use std::fmt::Debug;

// -------------------------------------------------------------------------------------------------

/// Sample rate at which smoother steps and inertia values are applied unscaled.
const REFERENCE_SAMPLE_RATE: f32 = 44100.0;

/// Factor which scales per sample changes, so ramps take the same time at all sample rates.
fn sample_rate_compensation(sample_rate: u32) -> f32 {
    assert!(sample_rate > 0, "Invalid sample rate");
    REFERENCE_SAMPLE_RATE / sample_rate as f32
}

// -------------------------------------------------------------------------------------------------

/// A f32 value which moves towards its target value in small steps, one step per sample frame.
pub trait SmoothedValue: Debug {
    /// The current, possibly still ramping value.
    #[must_use]
    fn current(&self) -> f32;
    /// The value the smoother is moving towards.
    #[must_use]
    fn target(&self) -> f32;

    /// Does the current value still differ from the target? When not, the target can be used
    /// directly.
    #[must_use]
    fn need_ramp(&self) -> bool;
    /// Move the current value one step towards the target.
    fn ramp(&mut self);

    /// Ramp by one step, if needed, and return the new current value.
    #[must_use]
    fn next(&mut self) -> f32 {
        if self.need_ramp() {
            self.ramp();
            self.current()
        } else {
            self.target()
        }
    }

    /// Jump to the given value without ramping.
    fn init(&mut self, value: f32);
    /// Start ramping towards a new target value.
    fn set_target(&mut self, target: f32);

    /// Sample rate at which `next` or `ramp` get called. Must be set before ramping.
    fn set_sample_rate(&mut self, sample_rate: u32);
}

// -------------------------------------------------------------------------------------------------

/// Approaches the target exponentially: each step covers a fixed fraction (the inertia) of the
/// remaining distance. Suits gain alike parameters such as a dry/wet mix.
#[derive(Debug, Clone)]
pub struct ExponentialSmoothedValue {
    current: f32,
    target: f32,
    inertia: f32,
    /// Zero until a sample rate got set.
    sample_rate_comp: f32,
}

impl ExponentialSmoothedValue {
    /// Create a smoother at `value` with the given inertia in range `(0, 1]`.
    pub fn with_inertia(value: f32, inertia: f32, sample_rate: u32) -> Self {
        assert!(inertia > 0.0 && inertia <= 1.0, "Invalid inertia");
        Self {
            current: value,
            target: value,
            inertia,
            sample_rate_comp: sample_rate_compensation(sample_rate),
        }
    }

    /// Fraction of the remaining distance which gets covered in one step. Clamped, so high
    /// sample rate compensations can't overshoot the target.
    #[inline]
    fn step_fraction(&self) -> f32 {
        (self.inertia * self.sample_rate_comp).min(1.0)
    }
}

impl SmoothedValue for ExponentialSmoothedValue {
    #[inline(always)]
    fn current(&self) -> f32 {
        self.current
    }

    #[inline(always)]
    fn target(&self) -> f32 {
        self.target
    }

    fn need_ramp(&self) -> bool {
        debug_assert!(self.sample_rate_comp > 0.0, "Smoother has no sample rate");
        const EPSILON: f32 = f32::EPSILON * 100.0;
        ((self.target - self.current) * self.step_fraction()).abs() > EPSILON
    }

    fn ramp(&mut self) {
        self.current += (self.target - self.current) * self.step_fraction();
    }

    fn init(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    fn set_target(&mut self, target: f32) {
        self.target = target;
        if !self.need_ramp() {
            self.current = target;
        }
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate_comp = sample_rate_compensation(sample_rate);
    }
}

impl From<f32> for ExponentialSmoothedValue {
    /// A smoother with a small default inertia. Needs a sample rate before ramping.
    fn from(value: f32) -> Self {
        Self {
            current: value,
            target: value,
            inertia: 0.02,
            sample_rate_comp: 0.0,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Moves towards the target in equal increments of roughly `step` per sample, and lands
/// exactly on the target. Suits parameters with a linear response such as a drive amount.
#[derive(Debug, Clone)]
pub struct LinearSmoothedValue {
    current: f32,
    target: f32,
    step: f32,
    increment: f32,
    remaining_steps: u32,
    /// Zero until a sample rate got set.
    sample_rate_comp: f32,
}

impl LinearSmoothedValue {
    /// Create a smoother at `value`, which moves `step` units per sample at 44.1 kHz.
    pub fn with_step(value: f32, step: f32, sample_rate: u32) -> Self {
        assert!(step > 0.0, "Invalid step");
        Self {
            current: value,
            target: value,
            step,
            increment: 0.0,
            remaining_steps: 0,
            sample_rate_comp: sample_rate_compensation(sample_rate),
        }
    }

    /// Plan a ramp from the current to the target value.
    fn start_ramp(&mut self) {
        let distance = self.target - self.current;
        let step = self.step * self.sample_rate_comp;
        self.remaining_steps = if step > 0.0 {
            (distance.abs() / step).round() as u32
        } else {
            0
        };
        if self.remaining_steps == 0 {
            self.current = self.target;
            self.increment = 0.0;
        } else {
            self.increment = distance / self.remaining_steps as f32;
        }
    }
}

impl SmoothedValue for LinearSmoothedValue {
    #[inline(always)]
    fn current(&self) -> f32 {
        self.current
    }

    #[inline(always)]
    fn target(&self) -> f32 {
        self.target
    }

    #[inline(always)]
    fn need_ramp(&self) -> bool {
        debug_assert!(self.sample_rate_comp > 0.0, "Smoother has no sample rate");
        self.remaining_steps > 0
    }

    fn ramp(&mut self) {
        if self.remaining_steps > 0 {
            self.remaining_steps -= 1;
            self.current = if self.remaining_steps == 0 {
                self.target
            } else {
                self.current + self.increment
            };
        }
    }

    fn init(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.increment = 0.0;
        self.remaining_steps = 0;
    }

    fn set_target(&mut self, target: f32) {
        self.target = target;
        self.start_ramp();
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate_comp = sample_rate_compensation(sample_rate);
        if self.remaining_steps > 0 {
            self.start_ramp();
        }
    }
}

impl From<f32> for LinearSmoothedValue {
    /// A smoother with a step of 0.01. Needs a sample rate before ramping.
    fn from(value: f32) -> Self {
        Self {
            current: value,
            target: value,
            step: 0.01,
            increment: 0.0,
            remaining_steps: 0,
            sample_rate_comp: 0.0,
        }
    }
}

// -------------------------------------------------------------------------------------------------
